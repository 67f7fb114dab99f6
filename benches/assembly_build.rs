//! Benchmarks for assembly construction.
//!
//! Every `add_connection` re-validates the whole graph, so these measure
//! the cost of incremental cycle checking at realistic pipeline sizes, plus
//! one end-to-end run of a wide fan-out.

use agentloom::agents::FnAgent;
use agentloom::assembly::Assembly;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rustc_hash::FxHashMap;
use serde_json::json;

fn noop_agent() -> FnAgent {
    FnAgent::from_sync(|_| Ok(json!(null)))
}

/// n0 -> n1 -> ... -> n{count-1}
fn build_linear(count: usize) -> Assembly {
    let mut assembly = Assembly::new();
    for i in 0..count {
        assembly.add_agent(format!("n{i}"), noop_agent()).unwrap();
    }
    for i in 0..count.saturating_sub(1) {
        assembly
            .add_connection(&format!("n{i}"), &format!("n{}", i + 1))
            .unwrap();
    }
    assembly
}

/// One root feeding `width` children.
fn build_fanout(width: usize) -> Assembly {
    let mut assembly = Assembly::new();
    assembly.add_agent("root", noop_agent()).unwrap();
    for i in 0..width {
        assembly.add_agent(format!("w{i}"), noop_agent()).unwrap();
        assembly.add_connection("root", &format!("w{i}")).unwrap();
    }
    assembly
}

/// Layers of `width` agents, each agent feeding one agent in the next layer.
fn build_layered(depth: usize, width: usize) -> Assembly {
    let mut assembly = Assembly::new();
    for layer in 0..depth {
        for i in 0..width {
            assembly
                .add_agent(format!("L{layer}_N{i}"), noop_agent())
                .unwrap();
        }
    }
    for layer in 0..depth.saturating_sub(1) {
        for i in 0..width {
            assembly
                .add_connection(
                    &format!("L{layer}_N{i}"),
                    &format!("L{}_N{}", layer + 1, i % width),
                )
                .unwrap();
        }
    }
    assembly
}

fn bench_assembly_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("assembly_build");

    for size in [10, 50, 100, 200] {
        group.bench_with_input(BenchmarkId::new("linear", size), &size, |b, &size| {
            b.iter(|| build_linear(size));
        });
    }

    for width in [10, 50, 100] {
        group.bench_with_input(BenchmarkId::new("fanout", width), &width, |b, &width| {
            b.iter(|| build_fanout(width));
        });
    }

    for (depth, width) in [(5, 10), (10, 10), (5, 20)] {
        group.bench_with_input(
            BenchmarkId::new("layered", format!("{depth}x{width}")),
            &(depth, width),
            |b, &(depth, width)| {
                b.iter(|| build_layered(depth, width));
            },
        );
    }

    group.finish();
}

fn bench_run(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap();
    let assembly = build_fanout(32);

    c.bench_function("run_fanout_32", |b| {
        b.to_async(&rt)
            .iter(|| async { assembly.run(FxHashMap::default()).await.unwrap() });
    });
}

criterion_group!(benches, bench_assembly_build, bench_run);
criterion_main!(benches);

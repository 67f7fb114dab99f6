mod common;

use agentloom::assembly::{Assembly, AssemblyError};
use common::*;
use proptest::prelude::*;
use serde_json::json;

fn block_on<F: std::future::Future<Output = ()>>(fut: F) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    rt.block_on(fut);
}

fn layer_ids(layer_sizes: &[usize]) -> Vec<Vec<String>> {
    layer_sizes
        .iter()
        .enumerate()
        .map(|(layer, size)| (0..*size).map(|i| format!("L{layer}_N{i}")).collect())
        .collect()
}

fn diamond_edges() -> Vec<(&'static str, &'static str)> {
    vec![
        ("a", "b"),
        ("a", "c"),
        ("b", "d"),
        ("c", "d"),
        ("d", "e"),
        ("d", "f"),
        ("e", "f"),
    ]
}

proptest! {
    /// Edges that only point from an earlier layer to a later one can never
    /// close a cycle, so every insertion must validate, and a run must
    /// execute every registered agent exactly once.
    #[test]
    fn prop_forward_edges_always_validate_and_every_agent_runs(
        layer_sizes in prop::collection::vec(1usize..4, 2..5),
        edge_seeds in prop::collection::vec(any::<u64>(), 0..40),
    ) {
        let layers = layer_ids(&layer_sizes);
        let mut assembly = Assembly::new();
        for layer in &layers {
            for id in layer {
                assembly.add_agent(id.clone(), const_agent(json!(1))).unwrap();
            }
        }

        // Baseline connectivity between consecutive layers, then extra
        // forward edges derived from the seeds (duplicates are no-ops).
        for pair in layers.windows(2) {
            for (i, from) in pair[0].iter().enumerate() {
                let to = &pair[1][i % pair[1].len()];
                assembly.add_connection(from, to).unwrap();
            }
        }
        for seed in &edge_seeds {
            let from_layer = (*seed as usize) % (layers.len() - 1);
            let span = layers.len() - 1 - from_layer;
            let to_layer = from_layer + 1 + ((*seed >> 8) as usize) % span;
            let from = &layers[from_layer][((*seed >> 16) as usize) % layers[from_layer].len()];
            let to = &layers[to_layer][((*seed >> 24) as usize) % layers[to_layer].len()];
            assembly.add_connection(from, to).unwrap();
        }

        let expected = assembly.len();
        block_on(async move {
            let report = assembly.run(no_seeds()).await.unwrap();
            assert_eq!(report.completion_order.len(), expected);
        });
    }
}

proptest! {
    /// Connecting any agent back to one of its (transitive) ancestors on a
    /// chain must fail, and the rejected edge must leave the chain intact.
    #[test]
    fn prop_back_edge_over_an_existing_path_is_rejected(
        len in 2usize..8,
        picks in any::<(prop::sample::Index, prop::sample::Index)>(),
    ) {
        let ids: Vec<String> = (0..len).map(|i| format!("n{i}")).collect();
        let mut assembly = Assembly::new();
        for id in &ids {
            assembly.add_agent(id.clone(), const_agent(json!(0))).unwrap();
        }
        for pair in ids.windows(2) {
            assembly.add_connection(&pair[0], &pair[1]).unwrap();
        }

        let (a, b) = (picks.0.index(len), picks.1.index(len));
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };

        let err = assembly.add_connection(&ids[hi], &ids[lo]).unwrap_err();
        let is_cycle = matches!(err, AssemblyError::CycleDetected { .. });
        prop_assert!(is_cycle);
        prop_assert_eq!(assembly.connection_count(), len - 1);
    }
}

proptest! {
    /// Acyclicity does not depend on the order connections are declared in.
    #[test]
    fn prop_any_insertion_order_of_a_dag_succeeds(
        edges in Just(diamond_edges()).prop_shuffle(),
    ) {
        let mut assembly = Assembly::new();
        for id in ["a", "b", "c", "d", "e", "f"] {
            assembly.add_agent(id, const_agent(json!(0))).unwrap();
        }
        for (from, to) in &edges {
            assembly.add_connection(from, to).unwrap();
        }
        prop_assert_eq!(assembly.connection_count(), edges.len());
    }
}

//! Diamond-shaped assembly: two branches fetched concurrently, one join.
//!
//! Run with: `cargo run --example fan_in`

use agentloom::agents::FnAgent;
use agentloom::assembly::Assembly;
use agentloom::telemetry;
use rustc_hash::FxHashMap;
use serde_json::{json, Value};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init();

    let mut assembly = Assembly::new();

    assembly.add_agent(
        "metrics",
        FnAgent::new(|_inputs| async move {
            tokio::time::sleep(std::time::Duration::from_millis(80)).await;
            Ok(json!({"visits": 1204}))
        }),
    )?;
    assembly.add_agent(
        "billing",
        FnAgent::new(|_inputs| async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            Ok(json!({"revenue": 640}))
        }),
    )?;
    assembly.add_agent(
        "report",
        FnAgent::from_sync(|inputs: Vec<Value>| {
            let mut merged = serde_json::Map::new();
            for input in &inputs {
                if let Some(object) = input.as_object() {
                    merged.extend(object.clone());
                }
            }
            Ok(Value::Object(merged))
        }),
    )?;
    assembly.add_connections(&["metrics", "billing"], &["report"])?;

    let report = assembly.run(FxHashMap::default()).await?;

    println!("completion order: {:?}", report.completion_order);
    println!("report output:    {}", report.output("report").expect("report ran"));
    for event in &report.events {
        println!("event: {event}");
    }
    Ok(())
}

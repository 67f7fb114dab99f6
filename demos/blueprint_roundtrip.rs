//! Export an assembly to JSON and rebuild it through a factory.
//!
//! Run with: `cargo run --example blueprint_roundtrip`

use std::sync::Arc;

use agentloom::agent::Agent;
use agentloom::agents::{FnAgent, LlmAgent, LlmConfig};
use agentloom::assembly::Assembly;
use agentloom::blueprint::AgentFactory;
use agentloom::telemetry;
use serde_json::json;

fn shout_agent() -> FnAgent {
    FnAgent::from_sync(|inputs| {
        let joined = inputs
            .iter()
            .filter_map(|value| value.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        Ok(json!(joined.to_uppercase()))
    })
    .named("shout")
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init();

    let mut assembly = Assembly::new();
    assembly.add_agent(
        "summarize",
        LlmAgent::new(LlmConfig {
            system_prompt: Some("You summarize in one sentence.".to_string()),
            user_prompt: Some("Summarize: {text}".to_string()),
            api_key_env: Some("OPENAI_API_KEY".to_string()),
            ..LlmConfig::default()
        }),
    )?;
    assembly.add_agent("shout", shout_agent())?;
    assembly.add_connection("summarize", "shout")?;

    let json = assembly.to_json()?;
    println!("blueprint:\n{json}");

    // The importing side resolves function names through its own registry;
    // "llm" is handled by the built-in constructor.
    let mut factory = AgentFactory::builtin();
    factory.register("function", |agent_id, config| {
        match config.get("name").and_then(|name| name.as_str()) {
            Some("shout") => Ok(Arc::new(shout_agent()) as Arc<dyn Agent>),
            other => Err(agentloom::blueprint::BlueprintError::UnknownKind {
                kind: format!("function:{}", other.unwrap_or("?")),
                agent_id: agent_id.to_string(),
            }),
        }
    });

    let rebuilt = Assembly::from_json(&json, &factory)?;
    println!(
        "rebuilt {} agents, {} connections; entries: {:?}",
        rebuilt.len(),
        rebuilt.connection_count(),
        rebuilt.entry_agents().collect::<Vec<_>>()
    );
    Ok(())
}

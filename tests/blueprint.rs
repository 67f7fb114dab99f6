mod common;

use std::io::Write as _;
use std::sync::Arc;

use agentloom::agent::Agent;
use agentloom::agents::{FnAgent, LlmAgent, LlmConfig};
use agentloom::assembly::{Assembly, AssemblyError};
use agentloom::blueprint::{AgentFactory, BlueprintError};
use common::*;
use serde_json::{json, Value};

fn llm_assembly() -> Assembly {
    let mut assembly = Assembly::new();
    assembly
        .add_agent(
            "draft",
            LlmAgent::new(LlmConfig {
                user_prompt: Some("Draft a note about {topic}".to_string()),
                ..LlmConfig::default()
            }),
        )
        .unwrap();
    assembly
        .add_agent(
            "polish",
            LlmAgent::new(LlmConfig {
                system_prompt: Some("You edit prose.".to_string()),
                ..LlmConfig::default()
            }),
        )
        .unwrap();
    assembly.add_connection("draft", "polish").unwrap();
    assembly
}

#[test]
fn export_is_sorted_and_deterministic() {
    let assembly = llm_assembly();
    let doc = assembly.to_document().unwrap();

    let ids: Vec<&str> = doc.agents.iter().map(|a| a.agent_id.as_str()).collect();
    assert_eq!(ids, vec!["draft", "polish"]);
    assert_eq!(doc.connections.len(), 1);
    assert_eq!(doc.connections[0].from, "draft");
    assert!(doc.agents.iter().find(|a| a.agent_id == "draft").unwrap().is_entry);
    assert!(!doc.agents.iter().find(|a| a.agent_id == "polish").unwrap().is_entry);

    assert_eq!(assembly.to_json().unwrap(), assembly.to_json().unwrap());
}

#[test]
fn llm_assembly_round_trips_through_the_builtin_factory() {
    let original = llm_assembly();
    let json = original.to_json().unwrap();

    let rebuilt = Assembly::from_json(&json, &AgentFactory::builtin()).unwrap();

    assert_eq!(rebuilt.len(), 2);
    assert_eq!(rebuilt.parent_count("polish"), Some(1));
    assert!(rebuilt.is_entry("draft"));
    // Re-export equals the first export byte for byte.
    assert_eq!(rebuilt.to_json().unwrap(), json);
}

#[test]
fn function_agents_round_trip_through_a_caller_factory() {
    let mut original = Assembly::new();
    original
        .add_agent("lhs", const_agent(json!(20)).named("twenty"))
        .unwrap();
    original
        .add_agent("rhs", const_agent(json!(22)).named("twenty_two"))
        .unwrap();
    original
        .add_agent("total", sum_agent().named("sum"))
        .unwrap();
    original.add_connections(&["lhs", "rhs"], &["total"]).unwrap();

    let mut factory = AgentFactory::new();
    factory.register("function", |agent_id, config| {
        let name = config.get("name").and_then(Value::as_str).unwrap_or_default();
        let agent: FnAgent = match name {
            "twenty" => const_agent(json!(20)),
            "twenty_two" => const_agent(json!(22)),
            "sum" => sum_agent(),
            _ => {
                return Err(BlueprintError::UnknownKind {
                    kind: format!("function:{name}"),
                    agent_id: agent_id.to_string(),
                })
            }
        };
        Ok(Arc::new(agent.named(name.to_string())) as Arc<dyn Agent>)
    });

    let json = original.to_json().unwrap();
    let rebuilt = Assembly::from_json(&json, &factory).unwrap();

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let report = rt.block_on(rebuilt.run(no_seeds())).unwrap();
    assert_eq!(report.output("total"), Some(&json!(42)));
}

#[test]
fn export_fails_for_agents_without_descriptors() {
    let mut assembly = Assembly::new();
    assembly.add_agent("anon", const_agent(json!(1))).unwrap();

    let err = assembly.to_document().unwrap_err();
    assert!(matches!(err, BlueprintError::UnserializableAgent { ref agent_id } if agent_id == "anon"));
}

#[test]
fn import_fails_for_unknown_kind() {
    let json = r#"{
        "agents": [
            {"agent_id": "x", "kind": "mystery", "config": {}, "is_entry": true}
        ],
        "connections": []
    }"#;

    let err = Assembly::from_json(json, &AgentFactory::builtin()).unwrap_err();
    assert!(matches!(err, BlueprintError::UnknownKind { ref kind, .. } if kind == "mystery"));
}

#[test]
fn import_replays_registration_validation() {
    // A cyclic document is rejected the same way hand-built cycles are.
    let cyclic = r#"{
        "agents": [
            {"agent_id": "a", "kind": "llm", "config": {}},
            {"agent_id": "b", "kind": "llm", "config": {}}
        ],
        "connections": [
            {"from": "a", "to": "b"},
            {"from": "b", "to": "a"}
        ]
    }"#;
    let err = Assembly::from_json(cyclic, &AgentFactory::builtin()).unwrap_err();
    assert!(matches!(
        err,
        BlueprintError::Assembly(AssemblyError::CycleDetected { .. })
    ));

    // So is a connection naming an agent the document never declares.
    let dangling = r#"{
        "agents": [
            {"agent_id": "a", "kind": "llm", "config": {}}
        ],
        "connections": [
            {"from": "a", "to": "ghost"}
        ]
    }"#;
    let err = Assembly::from_json(dangling, &AgentFactory::builtin()).unwrap_err();
    assert!(matches!(
        err,
        BlueprintError::Assembly(AssemblyError::UnknownAgentReference { .. })
    ));
}

#[test]
fn blueprint_survives_a_trip_through_disk() {
    let original = llm_assembly();
    let json = original.to_json().unwrap();

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    let read_back = std::fs::read_to_string(file.path()).unwrap();

    let rebuilt = Assembly::from_json(&read_back, &AgentFactory::builtin()).unwrap();
    assert_eq!(rebuilt.to_json().unwrap(), json);
}

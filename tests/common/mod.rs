#![allow(dead_code)]

//! Shared fixtures for integration tests.

use std::time::Duration;

use agentloom::agent::{Agent, AgentContext, AgentError};
use agentloom::agents::FnAgent;
use async_trait::async_trait;
use rustc_hash::FxHashMap;
use serde_json::{json, Value};

/// Agent that ignores its inputs and returns a fixed value.
pub fn const_agent(value: Value) -> FnAgent {
    FnAgent::from_sync(move |_| Ok(value.clone()))
}

/// Agent that sums every numeric input.
pub fn sum_agent() -> FnAgent {
    FnAgent::from_sync(|inputs: Vec<Value>| {
        Ok(json!(inputs.iter().filter_map(Value::as_i64).sum::<i64>()))
    })
}

/// Agent that sleeps before returning a fixed value, for ordering tests.
pub struct SlowAgent {
    pub delay_ms: u64,
    pub value: Value,
}

#[async_trait]
impl Agent for SlowAgent {
    async fn run(&self, _ctx: AgentContext, _inputs: Vec<Value>) -> Result<Value, AgentError> {
        tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        Ok(self.value.clone())
    }
}

/// Agent that always fails with the given message.
pub struct FailingAgent {
    pub message: &'static str,
}

#[async_trait]
impl Agent for FailingAgent {
    async fn run(&self, _ctx: AgentContext, _inputs: Vec<Value>) -> Result<Value, AgentError> {
        Err(AgentError::msg(self.message))
    }
}

/// Agent that leaves an intermediary record and emits an event.
pub struct TraceAgent {
    pub value: Value,
}

#[async_trait]
impl Agent for TraceAgent {
    async fn run(&self, ctx: AgentContext, inputs: Vec<Value>) -> Result<Value, AgentError> {
        ctx.emit("trace", "running")?;
        ctx.record_intermediary(json!({ "observed_inputs": inputs.len() }));
        Ok(self.value.clone())
    }
}

/// Build a seed map from literal pairs.
pub fn seeds(pairs: &[(&str, Value)]) -> FxHashMap<String, Value> {
    pairs
        .iter()
        .map(|(id, value)| (id.to_string(), value.clone()))
        .collect()
}

/// Empty seed map, for runs that need none.
pub fn no_seeds() -> FxHashMap<String, Value> {
    FxHashMap::default()
}

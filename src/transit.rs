//! Run-scoped data transit store for agent assemblies.
//!
//! [`DataTransit`] is the shared record of everything that flows through a
//! single run: the inputs handed to each agent, the auxiliary intermediary
//! values agents leave behind for diagnostics, and the single output each
//! agent produces. A fresh store is created inside every
//! [`run`](crate::assembly::Assembly::run) call and discarded with it;
//! callers receive the plain-data [`TransitSnapshot`] instead of the live
//! store.
//!
//! # Write discipline
//!
//! The store is mutated from many concurrently running agent tasks, but the
//! scheduler guarantees each agent id is written by exactly one task: the
//! scheduler records inputs and the output, and only the owning agent ever
//! appends intermediaries. Locks are held for map access only, never across
//! an `.await`.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Mutable, run-scoped store of recorded inputs, intermediary values, and
/// outputs, keyed by agent id.
///
/// # Examples
///
/// ```
/// use agentloom::transit::DataTransit;
/// use serde_json::json;
///
/// let transit = DataTransit::new();
/// transit.record_input("summarize", json!({"text": "raw document"}));
/// transit.record_output("summarize", json!("a summary"));
///
/// assert_eq!(transit.output("summarize"), Some(json!("a summary")));
/// assert_eq!(transit.inputs("summarize").len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct DataTransit {
    inner: Mutex<TransitInner>,
}

#[derive(Debug, Default, Clone)]
struct TransitInner {
    inputs: FxHashMap<String, Vec<Value>>,
    intermediary: FxHashMap<String, Vec<Value>>,
    outputs: FxHashMap<String, Value>,
}

impl DataTransit {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value to the agent's ordered input list.
    pub fn record_input(&self, agent_id: &str, value: Value) {
        self.inner
            .lock()
            .inputs
            .entry(agent_id.to_string())
            .or_default()
            .push(value);
    }

    /// Set the agent's output. Written exactly once per run, by the task
    /// that owns the agent.
    pub fn record_output(&self, agent_id: &str, value: Value) {
        self.inner.lock().outputs.insert(agent_id.to_string(), value);
    }

    /// Append an agent-defined auxiliary record. Carries no scheduling
    /// meaning; agents may call this any number of times.
    pub fn record_intermediary(&self, agent_id: &str, value: Value) {
        self.inner
            .lock()
            .intermediary
            .entry(agent_id.to_string())
            .or_default()
            .push(value);
    }

    /// The agent's recorded output, if it has finished.
    #[must_use]
    pub fn output(&self, agent_id: &str) -> Option<Value> {
        self.inner.lock().outputs.get(agent_id).cloned()
    }

    /// Every value recorded as an input to the agent, in recording order.
    #[must_use]
    pub fn inputs(&self, agent_id: &str) -> Vec<Value> {
        self.inner
            .lock()
            .inputs
            .get(agent_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Every intermediary value the agent has recorded, in recording order.
    #[must_use]
    pub fn intermediaries(&self, agent_id: &str) -> Vec<Value> {
        self.inner
            .lock()
            .intermediary
            .get(agent_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Clone the current contents into a plain-data snapshot.
    #[must_use]
    pub fn snapshot(&self) -> TransitSnapshot {
        let inner = self.inner.lock();
        TransitSnapshot {
            inputs: inner.inputs.clone(),
            intermediary: inner.intermediary.clone(),
            outputs: inner.outputs.clone(),
        }
    }
}

/// Immutable copy of a [`DataTransit`] at a point in time.
///
/// Returned inside [`RunReport`](crate::runner::RunReport) on success and
/// carried by [`RunError::AgentRun`](crate::runner::RunError) on failure, so
/// outputs recorded by completed agents stay visible either way.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransitSnapshot {
    pub inputs: FxHashMap<String, Vec<Value>>,
    pub intermediary: FxHashMap<String, Vec<Value>>,
    pub outputs: FxHashMap<String, Value>,
}

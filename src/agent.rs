//! The agent contract: a named unit of work with one asynchronous
//! execution entrypoint.
//!
//! An [`Agent`] receives a run-scoped [`AgentContext`] and an ordered input
//! list assembled from its predecessors' outputs (plus an optional caller
//! seed), and returns a single [`serde_json::Value`] result. The scheduler
//! owns all output and scheduling bookkeeping; agents may only read the
//! transit store and leave [intermediary](AgentContext::record_intermediary)
//! trace data.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::event_bus::Event;
use crate::transit::DataTransit;

/// Core trait for executable assembly agents.
///
/// # Design Principles
///
/// - **Single result**: every invocation returns exactly one value, which the
///   scheduler records as the agent's output for the run.
/// - **Merged inputs**: an agent with several predecessors receives all of
///   their outputs in one ordered list; how to merge them is the agent's
///   business. The relative order among independent predecessors is
///   unspecified.
/// - **Immutable results**: a recorded output is shared by every successor
///   task, so returned values must be treated as frozen once recorded.
///
/// # Examples
///
/// ```
/// use agentloom::agent::{Agent, AgentContext, AgentError};
/// use async_trait::async_trait;
/// use serde_json::{json, Value};
///
/// struct WordCount;
///
/// #[async_trait]
/// impl Agent for WordCount {
///     async fn run(&self, ctx: AgentContext, inputs: Vec<Value>) -> Result<Value, AgentError> {
///         let text = inputs
///             .first()
///             .and_then(Value::as_str)
///             .ok_or(AgentError::MissingInput { what: "text" })?;
///         ctx.record_intermediary(json!({"chars": text.len()}));
///         Ok(json!(text.split_whitespace().count()))
///     }
/// }
/// ```
#[async_trait]
pub trait Agent: Send + Sync {
    /// Execute this agent with the given context and merged input list.
    async fn run(&self, ctx: AgentContext, inputs: Vec<Value>) -> Result<Value, AgentError>;

    /// A serializable description of this agent (type tag plus config) for
    /// blueprint export. Agents that cannot be reconstructed from data
    /// return `None`, which is the default.
    fn descriptor(&self) -> Option<AgentDescriptor> {
        None
    }
}

/// Execution context handed to an agent for one invocation.
///
/// Grants read access to the run's transit store, the ability to leave
/// intermediary trace data under the agent's own id, and an event channel
/// for observability. There is deliberately no way to write outputs or
/// touch scheduling state from here.
#[derive(Clone, Debug)]
pub struct AgentContext {
    /// Id of the agent being executed.
    pub agent_id: String,
    /// Identifier of the run this invocation belongs to.
    pub run_id: Uuid,
    transit: Arc<DataTransit>,
    event_tx: flume::Sender<Event>,
    cancelled: Arc<AtomicBool>,
}

impl AgentContext {
    pub(crate) fn new(
        agent_id: String,
        run_id: Uuid,
        transit: Arc<DataTransit>,
        event_tx: flume::Sender<Event>,
        cancelled: Arc<AtomicBool>,
    ) -> Self {
        Self {
            agent_id,
            run_id,
            transit,
            event_tx,
            cancelled,
        }
    }

    /// Append an auxiliary record under this agent's id. Diagnostic only;
    /// never consulted by the scheduler.
    pub fn record_intermediary(&self, value: Value) {
        self.transit.record_intermediary(&self.agent_id, value);
    }

    /// Read another agent's recorded output, if it has finished. Outputs of
    /// all predecessors are already present by the time an agent starts.
    #[must_use]
    pub fn output_of(&self, agent_id: &str) -> Option<Value> {
        self.transit.output(agent_id)
    }

    /// True once any agent in this run has failed. Purely cooperative: the
    /// scheduler never aborts a running task, but long-running agents may
    /// poll this between units of work and bail out early instead of
    /// finishing wastefully.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Emit an agent-scoped event to the run's event bus.
    pub fn emit(
        &self,
        label: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<(), AgentContextError> {
        self.event_tx
            .send(Event::agent(self.agent_id.clone(), label, message))
            .map_err(|_| AgentContextError::EventBusUnavailable)
    }
}

/// Serializable identity of an agent: a type tag plus type-specific config.
///
/// The blueprint layer pairs descriptors with an
/// [`AgentFactory`](crate::blueprint::AgentFactory) so assemblies can be
/// written out and rebuilt without any dynamic symbol loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    /// Type tag looked up in the factory registry on import.
    pub kind: String,
    /// Type-specific configuration; must be enough to reconstruct the agent.
    #[serde(default)]
    pub config: Value,
}

impl AgentDescriptor {
    pub fn new(kind: impl Into<String>, config: Value) -> Self {
        Self {
            kind: kind.into(),
            config,
        }
    }
}

/// Errors that can occur when using [`AgentContext`] methods.
#[derive(Debug, Error, Diagnostic)]
pub enum AgentContextError {
    /// Event could not be sent because the run's event receiver is gone.
    #[error("failed to emit event: event bus unavailable")]
    #[diagnostic(
        code(agentloom::agent::event_bus_unavailable),
        help("The run's event bus receiver was dropped before the agent finished.")
    )]
    EventBusUnavailable,
}

/// Errors surfaced by agent execution.
///
/// Any error returned from [`Agent::run`] is fatal to the whole run call;
/// there is no retry and no isolation of the failing branch.
#[derive(Debug, Error, Diagnostic)]
pub enum AgentError {
    /// Expected input data is missing from the merged input list.
    #[error("missing expected input: {what}")]
    #[diagnostic(
        code(agentloom::agent::missing_input),
        help("Check that the upstream agents produced the required data.")
    )]
    MissingInput { what: &'static str },

    /// External provider or service error.
    #[error("provider error ({provider}): {message}")]
    #[diagnostic(code(agentloom::agent::provider))]
    Provider {
        provider: &'static str,
        message: String,
    },

    /// JSON serialization/deserialization error.
    #[error(transparent)]
    #[diagnostic(code(agentloom::agent::serde_json))]
    Serde(#[from] serde_json::Error),

    /// Input validation failed.
    #[error("validation failed: {0}")]
    #[diagnostic(
        code(agentloom::agent::validation),
        help("Check input data format and required fields.")
    )]
    ValidationFailed(String),

    /// Event bus communication error.
    #[error("event bus error: {0}")]
    #[diagnostic(code(agentloom::agent::event_bus))]
    EventBus(#[from] AgentContextError),

    /// Agent-defined failure with a free-form message.
    #[error("{0}")]
    #[diagnostic(code(agentloom::agent::other))]
    Other(String),
}

impl AgentError {
    /// Shorthand for an [`AgentError::Other`] with the given message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

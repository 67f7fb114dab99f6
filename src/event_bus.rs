//! Run-scoped diagnostic event channel.
//!
//! Every run owns a flume channel of [`Event`]s: the scheduler emits
//! lifecycle events (agent started, finished, failed) and agents emit their
//! own through [`AgentContext::emit`](crate::agent::AgentContext::emit).
//! [`Assembly::run`](crate::assembly::Assembly::run) drains the bus into the
//! returned report; [`run_with_bus`](crate::assembly::Assembly::run_with_bus)
//! lets a caller own the bus and consume events while the run is in flight.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where an event originated.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum EventScope {
    /// Emitted by an agent through its context.
    Agent { agent_id: String },
    /// Emitted by the scheduler about a task's lifecycle.
    Scheduler { run_id: Uuid },
    /// Emitted once per run boundary (start, complete, failed).
    Run { run_id: Uuid },
}

/// A single timestamped diagnostic event.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    pub when: DateTime<Utc>,
    pub scope: EventScope,
    pub label: String,
    pub message: String,
}

impl Event {
    pub fn agent(
        agent_id: impl Into<String>,
        label: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            when: Utc::now(),
            scope: EventScope::Agent {
                agent_id: agent_id.into(),
            },
            label: label.into(),
            message: message.into(),
        }
    }

    pub fn scheduler(run_id: Uuid, label: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            when: Utc::now(),
            scope: EventScope::Scheduler { run_id },
            label: label.into(),
            message: message.into(),
        }
    }

    pub fn run(run_id: Uuid, label: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            when: Utc::now(),
            scope: EventScope::Run { run_id },
            label: label.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scope {
            EventScope::Agent { agent_id } => {
                write!(f, "[{agent_id}] {}: {}", self.label, self.message)
            }
            EventScope::Scheduler { .. } => {
                write!(f, "[scheduler] {}: {}", self.label, self.message)
            }
            EventScope::Run { run_id } => write!(f, "[run {run_id}] {}: {}", self.label, self.message),
        }
    }
}

/// Unbounded event channel holding both ends.
///
/// # Examples
///
/// ```
/// use agentloom::event_bus::{Event, EventBus};
///
/// let bus = EventBus::default();
/// bus.sender().send(Event::agent("parser", "progress", "halfway")).unwrap();
/// assert_eq!(bus.drain().len(), 1);
/// ```
pub struct EventBus {
    sender: flume::Sender<Event>,
    receiver: flume::Receiver<Event>,
}

impl Default for EventBus {
    fn default() -> Self {
        let (sender, receiver) = flume::unbounded();
        Self { sender, receiver }
    }
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A clone of the producing end, handed to agent contexts and tasks.
    #[must_use]
    pub fn sender(&self) -> flume::Sender<Event> {
        self.sender.clone()
    }

    /// A clone of the consuming end, for live consumption (e.g.
    /// `receiver().recv_async()` from a separate task).
    #[must_use]
    pub fn receiver(&self) -> flume::Receiver<Event> {
        self.receiver.clone()
    }

    /// Collect every event currently queued, without blocking.
    #[must_use]
    pub fn drain(&self) -> Vec<Event> {
        self.receiver.try_iter().collect()
    }
}

//! Concurrent execution of an assembly.
//!
//! Scheduling is dynamic, not wave-based: a task is spawned for an agent
//! the instant its last pending predecessor completes, so independent
//! branches proceed at their own pace and a join point starts as soon as
//! its own predecessors are satisfied, never waiting on unrelated work.
//!
//! Per run, each agent moves through `Pending -> Ready -> Running -> Done`:
//! entry agents (predecessor count zero) are spawned immediately; every
//! finishing task records its output in the transit store, then decrements
//! each successor's countdown and spawns any successor that reaches zero.
//! Because the output is recorded before the successor task exists, every
//! consumer observes all of its producers' outputs without any extra
//! synchronization.
//!
//! The spawning task awaits the handles it spawned, so awaiting the entry
//! tasks transitively awaits the entire run. On the first agent failure the
//! run call returns that error; sibling branches already running are not
//! cancelled and may outlive the reported failure. A cooperative flag is
//! threaded through every task instead: the first failure raises it, and
//! agents that care can poll
//! [`AgentContext::is_cancelled`](crate::agent::AgentContext::is_cancelled)
//! to stop early on their own terms.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::stream::{FuturesUnordered, StreamExt};
use futures_util::FutureExt;
use miette::Diagnostic;
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::Value;
use thiserror::Error;
use tokio::task::{JoinError, JoinHandle};
use tracing::instrument;
use uuid::Uuid;

use crate::agent::{Agent, AgentContext, AgentError};
use crate::assembly::Assembly;
use crate::event_bus::{Event, EventBus};
use crate::transit::{DataTransit, TransitSnapshot};

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Identifier stamped on every event this run emitted.
    pub run_id: Uuid,
    /// Final contents of the run's transit store.
    pub transit: TransitSnapshot,
    /// Agent ids in the order their outputs were recorded. Among agents on
    /// independent branches this order is nondeterministic.
    pub completion_order: Vec<String>,
    /// Events drained from the run's bus. Empty when the caller supplied
    /// its own bus via [`Assembly::run_with_bus`].
    pub events: Vec<Event>,
}

impl RunReport {
    /// The recorded output of one agent.
    #[must_use]
    pub fn output(&self, agent_id: &str) -> Option<&Value> {
        self.transit.outputs.get(agent_id)
    }

    /// The recorded inputs of one agent. Treat multi-predecessor input
    /// lists as sets; their relative order is unspecified.
    #[must_use]
    pub fn inputs(&self, agent_id: &str) -> &[Value] {
        self.transit
            .inputs
            .get(agent_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Errors surfaced from the execution API.
#[derive(Debug, Error, Diagnostic)]
pub enum RunError {
    /// The first agent failure encountered. Carries the transit contents at
    /// failure time; outputs recorded by completed agents remain visible
    /// here, and sibling branches may still be running when this returns.
    #[error("agent '{agent_id}' failed: {source}")]
    #[diagnostic(
        code(agentloom::runner::agent_run),
        help("Inspect the carried transit snapshot for outputs recorded before the failure.")
    )]
    AgentRun {
        agent_id: String,
        #[source]
        source: AgentError,
        transit: TransitSnapshot,
    },

    /// An agent task panicked or was aborted.
    #[error("agent task join error: {0}")]
    #[diagnostic(code(agentloom::runner::join))]
    Join(#[from] JoinError),
}

#[derive(Debug)]
enum TaskFailure {
    Agent { agent_id: String, source: AgentError },
    Join(JoinError),
}

impl TaskFailure {
    fn into_run_error(self, transit: &DataTransit) -> RunError {
        match self {
            TaskFailure::Agent { agent_id, source } => RunError::AgentRun {
                agent_id,
                source,
                transit: transit.snapshot(),
            },
            TaskFailure::Join(err) => RunError::Join(err),
        }
    }
}

// Shared by every task of one run. The countdown map is this run's private
// copy of the predecessor counts; the assembly itself is never mutated.
struct RunContext {
    run_id: Uuid,
    agents: FxHashMap<String, Arc<dyn Agent>>,
    successors: FxHashMap<String, FxHashSet<String>>,
    predecessors: FxHashMap<String, FxHashSet<String>>,
    countdown: Mutex<FxHashMap<String, usize>>,
    transit: Arc<DataTransit>,
    completion_order: Mutex<Vec<String>>,
    event_tx: flume::Sender<Event>,
    // Set by the first failing task; read by agents that opt in to
    // cooperative early exit. Never used to abort anything.
    cancelled: Arc<AtomicBool>,
}

impl Assembly {
    /// Execute the assembly once with the given entry seeds.
    ///
    /// Seeds are optional extra inputs for entry agents, keyed by agent id;
    /// a seed for an agent that has predecessors is ignored with a warning.
    /// Graph mutation must be finished before the first run starts.
    ///
    /// # Errors
    ///
    /// The first [`AgentError`] raised by any agent, as
    /// [`RunError::AgentRun`]; or [`RunError::Join`] if a task panicked.
    pub async fn run(&self, seeds: FxHashMap<String, Value>) -> Result<RunReport, RunError> {
        let bus = EventBus::default();
        let mut report = self.run_with_bus(seeds, &bus).await?;
        report.events = bus.drain();
        Ok(report)
    }

    /// Like [`run`](Self::run), but emits events to a caller-owned bus so
    /// they can be consumed while the run is in flight. The returned
    /// report's `events` field is left empty.
    #[instrument(skip_all, fields(agents = self.len()))]
    pub async fn run_with_bus(
        &self,
        mut seeds: FxHashMap<String, Value>,
        bus: &EventBus,
    ) -> Result<RunReport, RunError> {
        let run_id = Uuid::new_v4();
        let event_tx = bus.sender();
        let _ = event_tx.send(Event::run(
            run_id,
            "start",
            format!("running assembly of {} agents", self.len()),
        ));

        let ctx = Arc::new(RunContext {
            run_id,
            agents: self.agents.clone(),
            successors: self.successors.clone(),
            predecessors: self.predecessors.clone(),
            countdown: Mutex::new(self.parent_count.clone()),
            transit: Arc::new(DataTransit::new()),
            completion_order: Mutex::new(Vec::new()),
            event_tx,
            cancelled: Arc::new(AtomicBool::new(false)),
        });

        let mut entry_tasks: FuturesUnordered<JoinHandle<Result<(), TaskFailure>>> =
            FuturesUnordered::new();
        for (agent_id, count) in &self.parent_count {
            if *count == 0 {
                if let Some(agent) = self.agents.get(agent_id) {
                    let seed = seeds.remove(agent_id);
                    entry_tasks.push(spawn_agent(
                        ctx.clone(),
                        agent_id.clone(),
                        agent.clone(),
                        seed,
                    ));
                }
            }
        }
        for agent_id in seeds.keys() {
            tracing::warn!(agent_id = %agent_id, "seed ignored: not an entry agent of this assembly");
        }

        while let Some(joined) = entry_tasks.next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(failure)) => {
                    let err = failure.into_run_error(&ctx.transit);
                    let _ = ctx.event_tx.send(Event::run(run_id, "failed", err.to_string()));
                    return Err(err);
                }
                Err(join_err) => return Err(RunError::Join(join_err)),
            }
        }

        let completion_order = ctx.completion_order.lock().clone();
        let _ = ctx.event_tx.send(Event::run(
            run_id,
            "complete",
            format!("{} agents finished", completion_order.len()),
        ));
        Ok(RunReport {
            run_id,
            transit: ctx.transit.snapshot(),
            completion_order,
            events: Vec::new(),
        })
    }
}

fn spawn_agent(
    ctx: Arc<RunContext>,
    agent_id: String,
    agent: Arc<dyn Agent>,
    seed: Option<Value>,
) -> JoinHandle<Result<(), TaskFailure>> {
    tokio::spawn(run_agent(ctx, agent_id, agent, seed))
}

// One task per agent. Boxed so a task can recursively spawn its successors.
fn run_agent(
    ctx: Arc<RunContext>,
    agent_id: String,
    agent: Arc<dyn Agent>,
    seed: Option<Value>,
) -> BoxFuture<'static, Result<(), TaskFailure>> {
    async move {
        // Predecessor outputs first (set order, no sequence guarantee),
        // then the caller seed, if any.
        let mut inputs: Vec<Value> = Vec::new();
        if let Some(parents) = ctx.predecessors.get(&agent_id) {
            for parent in parents {
                if let Some(output) = ctx.transit.output(parent) {
                    inputs.push(output);
                }
            }
        }
        if let Some(seed) = seed {
            inputs.push(seed);
        }
        for value in &inputs {
            ctx.transit.record_input(&agent_id, value.clone());
        }

        tracing::debug!(agent_id = %agent_id, inputs = inputs.len(), "agent task started");
        let _ = ctx.event_tx.send(Event::scheduler(
            ctx.run_id,
            "agent_start",
            format!("'{agent_id}' started with {} inputs", inputs.len()),
        ));

        let agent_ctx = AgentContext::new(
            agent_id.clone(),
            ctx.run_id,
            ctx.transit.clone(),
            ctx.event_tx.clone(),
            ctx.cancelled.clone(),
        );
        let output = match agent.run(agent_ctx, inputs).await {
            Ok(output) => output,
            Err(source) => {
                ctx.cancelled.store(true, Ordering::Relaxed);
                tracing::error!(agent_id = %agent_id, error = %source, "agent failed");
                let _ = ctx.event_tx.send(Event::scheduler(
                    ctx.run_id,
                    "agent_failed",
                    format!("'{agent_id}' failed: {source}"),
                ));
                return Err(TaskFailure::Agent { agent_id, source });
            }
        };

        ctx.transit.record_output(&agent_id, output);
        ctx.completion_order.lock().push(agent_id.clone());
        let _ = ctx.event_tx.send(Event::scheduler(
            ctx.run_id,
            "agent_done",
            format!("'{agent_id}' finished"),
        ));

        // Cascade readiness: the countdown is decremented under the lock,
        // but the spawn happens outside it.
        let mut spawned = Vec::new();
        if let Some(successor_ids) = ctx.successors.get(&agent_id) {
            for successor_id in successor_ids {
                let ready = {
                    let mut countdown = ctx.countdown.lock();
                    match countdown.get_mut(successor_id) {
                        Some(remaining) if *remaining > 0 => {
                            *remaining -= 1;
                            *remaining == 0
                        }
                        _ => false,
                    }
                };
                if ready {
                    if let Some(successor) = ctx.agents.get(successor_id) {
                        spawned.push(spawn_agent(
                            ctx.clone(),
                            successor_id.clone(),
                            successor.clone(),
                            None,
                        ));
                    }
                }
            }
        }

        for handle in spawned {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(failure)) => return Err(failure),
                Err(join_err) => return Err(TaskFailure::Join(join_err)),
            }
        }
        Ok(())
    }
    .boxed()
}

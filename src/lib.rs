//! # Agentloom: DAG-driven Agent Assembly Framework
//!
//! Agentloom composes named units of work ("agents") into a directed
//! acyclic graph and executes them concurrently: each agent starts the
//! moment every one of its predecessors has produced a result, and not
//! before, with multiple-predecessor results merged into a single ordered
//! input list.
//!
//! ## Core Concepts
//!
//! - **Agents**: async units of work with one `run` entrypoint
//! - **Assembly**: the agent registry plus the connection set, kept acyclic
//!   by eager validation on every insertion
//! - **Data transit**: the run-scoped store of inputs, intermediary trace
//!   values, and outputs, keyed by agent id
//! - **Runner**: dynamic (non-barrier) concurrent scheduling; a join point
//!   starts the instant its own predecessors are done
//! - **Blueprints**: JSON persistence with factory-based reconstruction
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use agentloom::agents::FnAgent;
//! use agentloom::assembly::Assembly;
//! use rustc_hash::FxHashMap;
//! use serde_json::{json, Value};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut assembly = Assembly::new();
//!
//! // Two independent entry agents...
//! assembly.add_agent("left", FnAgent::from_sync(|_| Ok(json!(1))))?;
//! assembly.add_agent("right", FnAgent::from_sync(|_| Ok(json!(2))))?;
//!
//! // ...feeding one join point that sums whatever arrives.
//! assembly.add_agent("sum", FnAgent::from_sync(|inputs: Vec<Value>| {
//!     Ok(json!(inputs.iter().filter_map(Value::as_i64).sum::<i64>()))
//! }))?;
//! assembly.add_connections(&["left", "right"], &["sum"])?;
//!
//! let report = assembly.run(FxHashMap::default()).await?;
//! assert_eq!(report.output("sum"), Some(&json!(3)));
//! # Ok(())
//! # }
//! ```
//!
//! ## Execution Semantics
//!
//! - For any acyclic assembly, a run executes every registered agent
//!   exactly once; re-running the same assembly starts from scratch with a
//!   fresh store and countdown.
//! - Input lists merge predecessor outputs in *set* order; callers must
//!   not depend on relative ordering among independent predecessors. An
//!   entry agent's caller-provided seed is appended after predecessor
//!   outputs.
//! - The first agent failure fails the run call; sibling branches already
//!   running are not cancelled and may outlive the reported failure. The
//!   error carries a snapshot of everything recorded up to that point.
//!
//! ## Module Guide
//!
//! - [`agent`] - The [`Agent`](agent::Agent) trait, execution context, and
//!   error types
//! - [`agents`] - Built-in closure and chat-completions agents
//! - [`assembly`] - Registration API and eager cycle validation
//! - [`runner`] - Concurrent run execution and reports
//! - [`transit`] - Run-scoped data transit store
//! - [`blueprint`] - JSON persistence and the agent factory registry
//! - [`event_bus`] - Run-scoped diagnostic events
//! - [`telemetry`] - Tracing bootstrap

pub mod agent;
pub mod agents;
pub mod assembly;
pub mod blueprint;
pub mod event_bus;
pub mod runner;
pub mod telemetry;
pub mod transit;

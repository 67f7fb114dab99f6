//! Registration API for building an assembly: agents first, then
//! connections, each connection validated against the whole graph.

use std::sync::Arc;

use miette::Diagnostic;
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use super::validate;
use crate::agent::Agent;

/// A directed acyclic assembly of named agents.
///
/// The assembly owns all registered agents for its lifetime and keeps three
/// mutually consistent derived views per agent: its successor set, its
/// predecessor set, and its predecessor count. The count is fixed at
/// definition time and never mutated by execution; each
/// [`run`](Assembly::run) call allocates its own countdown from it, so one
/// assembly can be run any number of times.
///
/// # Examples
///
/// ```
/// use agentloom::agents::FnAgent;
/// use agentloom::assembly::Assembly;
/// use serde_json::{json, Value};
///
/// let mut assembly = Assembly::new();
/// assembly.add_agent("fetch", FnAgent::from_sync(|_| Ok(json!("body"))))?;
/// assembly.add_agent("parse", FnAgent::from_sync(|inputs: Vec<Value>| {
///     Ok(json!(inputs.len()))
/// }))?;
/// assembly.add_connection("fetch", "parse")?;
///
/// assert!(assembly.is_entry("fetch"));
/// assert_eq!(assembly.parent_count("parse"), Some(1));
/// # Ok::<(), agentloom::assembly::AssemblyError>(())
/// ```
#[derive(Clone, Default)]
pub struct Assembly {
    pub(crate) agents: FxHashMap<String, Arc<dyn Agent>>,
    pub(crate) successors: FxHashMap<String, FxHashSet<String>>,
    pub(crate) predecessors: FxHashMap<String, FxHashSet<String>>,
    pub(crate) parent_count: FxHashMap<String, usize>,
}

impl std::fmt::Debug for Assembly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assembly")
            .field("agents", &self.agents.keys().collect::<Vec<_>>())
            .field("successors", &self.successors)
            .field("predecessors", &self.predecessors)
            .field("parent_count", &self.parent_count)
            .finish()
    }
}

impl Assembly {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a single agent under a unique id.
    ///
    /// # Errors
    ///
    /// [`AssemblyError::DuplicateAgentId`] if the id is already taken.
    pub fn add_agent(
        &mut self,
        id: impl Into<String>,
        agent: impl Agent + 'static,
    ) -> Result<(), AssemblyError> {
        self.add_shared_agent(id, Arc::new(agent))
    }

    /// Register an already-shared agent. Same semantics as
    /// [`add_agent`](Self::add_agent); used by the blueprint layer and the
    /// batch form.
    pub fn add_shared_agent(
        &mut self,
        id: impl Into<String>,
        agent: Arc<dyn Agent>,
    ) -> Result<(), AssemblyError> {
        let id = id.into();
        if self.agents.contains_key(&id) {
            return Err(AssemblyError::DuplicateAgentId { id });
        }
        self.parent_count.insert(id.clone(), 0);
        self.agents.insert(id, agent);
        Ok(())
    }

    /// Register several agents at once. Stops at the first duplicate id.
    pub fn add_agents<I, S>(&mut self, agents: I) -> Result<(), AssemblyError>
    where
        I: IntoIterator<Item = (S, Arc<dyn Agent>)>,
        S: Into<String>,
    {
        for (id, agent) in agents {
            self.add_shared_agent(id, agent)?;
        }
        Ok(())
    }

    /// Declare that `from` feeds `to`.
    ///
    /// Duplicate connections are no-ops. A committed connection is validated
    /// against the whole current graph; if it would close a cycle it is
    /// rolled back from all three derived views before the error returns,
    /// leaving the assembly exactly as it was.
    ///
    /// # Errors
    ///
    /// [`AssemblyError::UnknownAgentReference`] if either id is
    /// unregistered; [`AssemblyError::CycleDetected`] if the connection
    /// would make the graph cyclic.
    pub fn add_connection(&mut self, from: &str, to: &str) -> Result<(), AssemblyError> {
        for id in [from, to] {
            if !self.agents.contains_key(id) {
                return Err(AssemblyError::UnknownAgentReference {
                    id: id.to_string(),
                    from: from.to_string(),
                    to: to.to_string(),
                });
            }
        }
        if self
            .successors
            .get(from)
            .is_some_and(|succs| succs.contains(to))
        {
            return Ok(());
        }

        self.successors
            .entry(from.to_string())
            .or_default()
            .insert(to.to_string());
        self.predecessors
            .entry(to.to_string())
            .or_default()
            .insert(from.to_string());
        if let Some(count) = self.parent_count.get_mut(to) {
            *count += 1;
        }

        if validate::is_acyclic(&self.parent_count, &self.successors) {
            Ok(())
        } else {
            self.remove_connection(from, to);
            Err(AssemblyError::CycleDetected {
                from: from.to_string(),
                to: to.to_string(),
            })
        }
    }

    /// Declare the full cross-product of connections: every agent in
    /// `from_ids` feeds every agent in `to_ids`, one connection at a time.
    pub fn add_connections(
        &mut self,
        from_ids: &[&str],
        to_ids: &[&str],
    ) -> Result<(), AssemblyError> {
        for from in from_ids {
            for to in to_ids {
                self.add_connection(from, to)?;
            }
        }
        Ok(())
    }

    // Rollback helper for a just-committed connection. Restores the exact
    // prior state, dropping set entries the insertion created.
    fn remove_connection(&mut self, from: &str, to: &str) {
        if let Some(succs) = self.successors.get_mut(from) {
            succs.remove(to);
            if succs.is_empty() {
                self.successors.remove(from);
            }
        }
        if let Some(preds) = self.predecessors.get_mut(to) {
            preds.remove(from);
            if preds.is_empty() {
                self.predecessors.remove(to);
            }
        }
        if let Some(count) = self.parent_count.get_mut(to) {
            *count -= 1;
        }
    }

    /// Number of registered agents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    #[must_use]
    pub fn contains_agent(&self, id: &str) -> bool {
        self.agents.contains_key(id)
    }

    /// Ids of all registered agents, in no particular order.
    pub fn agent_ids(&self) -> impl Iterator<Item = &str> {
        self.agents.keys().map(String::as_str)
    }

    /// Number of distinct connections in the assembly.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.successors.values().map(FxHashSet::len).sum()
    }

    /// The agent's predecessor count at definition time.
    #[must_use]
    pub fn parent_count(&self, id: &str) -> Option<usize> {
        self.parent_count.get(id).copied()
    }

    /// Whether the agent has no predecessors and therefore starts as soon
    /// as a run begins.
    #[must_use]
    pub fn is_entry(&self, id: &str) -> bool {
        self.parent_count(id) == Some(0)
    }

    /// Ids of all entry agents, in no particular order.
    pub fn entry_agents(&self) -> impl Iterator<Item = &str> {
        self.parent_count
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(id, _)| id.as_str())
    }

    /// The agents fed by `id`, if any.
    #[must_use]
    pub fn successors_of(&self, id: &str) -> Option<&FxHashSet<String>> {
        self.successors.get(id)
    }

    /// The agents feeding `id`, if any.
    #[must_use]
    pub fn predecessors_of(&self, id: &str) -> Option<&FxHashSet<String>> {
        self.predecessors.get(id)
    }
}

/// Errors surfaced synchronously from the registration API.
#[derive(Debug, Error, Diagnostic)]
pub enum AssemblyError {
    /// The id is already registered.
    #[error("agent id '{id}' is already registered")]
    #[diagnostic(
        code(agentloom::assembly::duplicate_agent_id),
        help("Every agent in an assembly needs a unique id.")
    )]
    DuplicateAgentId { id: String },

    /// A connection referenced an id that was never registered.
    #[error("unknown agent '{id}' in connection '{from}' -> '{to}'")]
    #[diagnostic(
        code(agentloom::assembly::unknown_agent),
        help("Register both agents before connecting them.")
    )]
    UnknownAgentReference {
        id: String,
        from: String,
        to: String,
    },

    /// The connection would make the graph cyclic.
    #[error("connection '{from}' -> '{to}' would close a cycle")]
    #[diagnostic(
        code(agentloom::assembly::cycle_detected),
        help("Assemblies must stay acyclic; the offending connection was rolled back.")
    )]
    CycleDetected { from: String, to: String },
}

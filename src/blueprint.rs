//! Blueprint persistence: write an assembly out as a JSON document and
//! rebuild it through an explicit factory.
//!
//! A document enumerates agents (id, type tag, type-specific config) and a
//! connection list of `{from, to}` pairs. Reconstruction goes through the
//! public registration API only, with agent construction delegated to an
//! [`AgentFactory`]: a registry mapping a type tag to a constructor
//! closure, populated at startup by whichever module defines the concrete
//! agent implementations. Nothing is ever resolved by symbol name at
//! runtime.
//!
//! Export is deterministic: agents sort by id, connections by
//! `(from, to)`, so the same assembly always serializes to the same bytes.

use std::sync::Arc;

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::agent::Agent;
use crate::agents::{LlmAgent, LlmConfig};
use crate::assembly::{Assembly, AssemblyError};

/// Persisted form of an assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblyDoc {
    pub agents: Vec<AgentDoc>,
    pub connections: Vec<ConnectionDoc>,
}

/// One agent entry: identity, type tag, and the config the factory needs
/// to rebuild it. `is_entry` is derived information for readers of the
/// document; import ignores it and recomputes entry status from the
/// connection list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDoc {
    pub agent_id: String,
    pub kind: String,
    #[serde(default)]
    pub config: Value,
    #[serde(default)]
    pub is_entry: bool,
}

/// One directed connection.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionDoc {
    pub from: String,
    pub to: String,
}

type ConstructorFn = dyn Fn(&str, &Value) -> Result<Arc<dyn Agent>, BlueprintError> + Send + Sync;

/// Registry of agent constructors, keyed by type tag.
///
/// # Examples
///
/// ```
/// use agentloom::agents::FnAgent;
/// use agentloom::blueprint::AgentFactory;
/// use serde_json::json;
/// use std::sync::Arc;
///
/// let mut factory = AgentFactory::builtin();
/// factory.register("function", |_agent_id, config| {
///     let name = config.get("name").and_then(|n| n.as_str()).unwrap_or_default();
///     let echo = FnAgent::from_sync(|inputs| Ok(json!(inputs))).named(name);
///     Ok(Arc::new(echo) as Arc<dyn agentloom::agent::Agent>)
/// });
/// assert!(factory.contains("llm"));
/// assert!(factory.contains("function"));
/// ```
#[derive(Default)]
pub struct AgentFactory {
    constructors: FxHashMap<String, Arc<ConstructorFn>>,
}

impl AgentFactory {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-loaded with the crate's serializable agent kinds
    /// (currently `"llm"`). `"function"` agents need a caller-supplied
    /// constructor that resolves their symbolic names.
    #[must_use]
    pub fn builtin() -> Self {
        let mut factory = Self::new();
        factory.register("llm", |agent_id, config| {
            let config: LlmConfig =
                serde_json::from_value(config.clone()).map_err(|source| {
                    BlueprintError::InvalidConfig {
                        agent_id: agent_id.to_string(),
                        source,
                    }
                })?;
            Ok(Arc::new(LlmAgent::new(config)) as Arc<dyn Agent>)
        });
        factory
    }

    /// Register (or replace) the constructor for a type tag.
    pub fn register<F>(&mut self, kind: impl Into<String>, constructor: F)
    where
        F: Fn(&str, &Value) -> Result<Arc<dyn Agent>, BlueprintError> + Send + Sync + 'static,
    {
        self.constructors.insert(kind.into(), Arc::new(constructor));
    }

    #[must_use]
    pub fn contains(&self, kind: &str) -> bool {
        self.constructors.contains_key(kind)
    }

    fn construct(
        &self,
        kind: &str,
        agent_id: &str,
        config: &Value,
    ) -> Result<Arc<dyn Agent>, BlueprintError> {
        let constructor =
            self.constructors
                .get(kind)
                .ok_or_else(|| BlueprintError::UnknownKind {
                    kind: kind.to_string(),
                    agent_id: agent_id.to_string(),
                })?;
        constructor(agent_id, config)
    }
}

impl Assembly {
    /// Export this assembly as a document.
    ///
    /// # Errors
    ///
    /// [`BlueprintError::UnserializableAgent`] if any agent returns no
    /// [descriptor](crate::agent::Agent::descriptor).
    pub fn to_document(&self) -> Result<AssemblyDoc, BlueprintError> {
        let mut agents = Vec::with_capacity(self.len());
        for (agent_id, agent) in &self.agents {
            let descriptor =
                agent
                    .descriptor()
                    .ok_or_else(|| BlueprintError::UnserializableAgent {
                        agent_id: agent_id.clone(),
                    })?;
            agents.push(AgentDoc {
                agent_id: agent_id.clone(),
                kind: descriptor.kind,
                config: descriptor.config,
                is_entry: self.is_entry(agent_id),
            });
        }
        agents.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));

        let mut connections = Vec::with_capacity(self.connection_count());
        for (from, successors) in &self.successors {
            for to in successors {
                connections.push(ConnectionDoc {
                    from: from.clone(),
                    to: to.clone(),
                });
            }
        }
        connections.sort();

        Ok(AssemblyDoc {
            agents,
            connections,
        })
    }

    /// Export as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, BlueprintError> {
        Ok(serde_json::to_string_pretty(&self.to_document()?)?)
    }

    /// Rebuild an assembly from a document, constructing each agent via the
    /// factory and replaying every connection through the registration API.
    pub fn from_document(
        doc: &AssemblyDoc,
        factory: &AgentFactory,
    ) -> Result<Self, BlueprintError> {
        let mut assembly = Assembly::new();
        for agent_doc in &doc.agents {
            let agent = factory.construct(&agent_doc.kind, &agent_doc.agent_id, &agent_doc.config)?;
            assembly.add_shared_agent(agent_doc.agent_id.clone(), agent)?;
        }
        for connection in &doc.connections {
            assembly.add_connection(&connection.from, &connection.to)?;
        }
        Ok(assembly)
    }

    /// Rebuild an assembly from a JSON string.
    pub fn from_json(json: &str, factory: &AgentFactory) -> Result<Self, BlueprintError> {
        let doc: AssemblyDoc = serde_json::from_str(json)?;
        Self::from_document(&doc, factory)
    }
}

/// Errors from blueprint export and import.
#[derive(Debug, Error, Diagnostic)]
pub enum BlueprintError {
    /// No constructor registered for a type tag found in the document.
    #[error("no constructor registered for agent kind '{kind}' (agent '{agent_id}')")]
    #[diagnostic(
        code(agentloom::blueprint::unknown_kind),
        help("Register the kind with AgentFactory::register before importing.")
    )]
    UnknownKind { kind: String, agent_id: String },

    /// An agent without a descriptor cannot be exported.
    #[error("agent '{agent_id}' does not describe itself for export")]
    #[diagnostic(
        code(agentloom::blueprint::unserializable_agent),
        help("Implement Agent::descriptor for every agent that should round-trip through a blueprint.")
    )]
    UnserializableAgent { agent_id: String },

    /// A constructor rejected the persisted config.
    #[error("invalid config for agent '{agent_id}': {source}")]
    #[diagnostic(code(agentloom::blueprint::invalid_config))]
    InvalidConfig {
        agent_id: String,
        #[source]
        source: serde_json::Error,
    },

    /// Registration failed while replaying the document.
    #[error(transparent)]
    #[diagnostic(code(agentloom::blueprint::assembly))]
    Assembly(#[from] AssemblyError),

    /// The document itself failed to parse or serialize.
    #[error(transparent)]
    #[diagnostic(code(agentloom::blueprint::serde_json))]
    Serde(#[from] serde_json::Error),
}

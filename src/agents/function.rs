//! Closure-backed agent.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde_json::{json, Value};

use crate::agent::{Agent, AgentContext, AgentDescriptor, AgentError};

type BoxedAgentFn =
    dyn Fn(Vec<Value>) -> BoxFuture<'static, Result<Value, AgentError>> + Send + Sync;

/// An agent that delegates to a closure over the merged input list.
///
/// Closures cannot be serialized, so a plain `FnAgent` exports no
/// descriptor. Give it a symbolic name with [`named`](Self::named) and it
/// round-trips through blueprints as kind `"function"` with
/// `{"name": ...}` config, to be resolved by the importing side's factory.
///
/// # Examples
///
/// ```
/// use agentloom::agents::FnAgent;
/// use serde_json::{json, Value};
///
/// let total = FnAgent::from_sync(|inputs: Vec<Value>| {
///     Ok(json!(inputs.iter().filter_map(Value::as_i64).sum::<i64>()))
/// });
///
/// let fetch = FnAgent::new(|_inputs| async move { Ok(json!("body")) })
///     .named("fetch_page");
/// ```
pub struct FnAgent {
    func: Arc<BoxedAgentFn>,
    name: Option<String>,
}

impl FnAgent {
    /// Wrap an async closure.
    pub fn new<F, Fut>(func: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, AgentError>> + Send + 'static,
    {
        Self {
            func: Arc::new(move |inputs| func(inputs).boxed()),
            name: None,
        }
    }

    /// Wrap a synchronous closure.
    pub fn from_sync<F>(func: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Value, AgentError> + Send + Sync + 'static,
    {
        Self::new(move |inputs| std::future::ready(func(inputs)))
    }

    /// Attach the symbolic name under which this agent is exported and
    /// reconstructed.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The symbolic name, if one was attached.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

#[async_trait]
impl Agent for FnAgent {
    async fn run(&self, _ctx: AgentContext, inputs: Vec<Value>) -> Result<Value, AgentError> {
        (self.func)(inputs).await
    }

    fn descriptor(&self) -> Option<AgentDescriptor> {
        self.name
            .as_ref()
            .map(|name| AgentDescriptor::new("function", json!({ "name": name })))
    }
}

//! Chat-completions agent.
//!
//! Prompts are templates: `{field}` placeholders are filled from the
//! top-level fields of each input object, applied input by input, so a
//! fan-in agent can draw fields from several predecessors. The API key is
//! resolved from an environment variable named in the config, never stored
//! in the config itself.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::agent::{Agent, AgentContext, AgentDescriptor, AgentError};

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{(\w+)\}").expect("placeholder pattern is valid"));

fn default_model() -> String {
    "gpt-4".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

/// Configuration for an [`LlmAgent`]. Serializable, so these agents
/// round-trip through blueprints under the `"llm"` kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_model")]
    pub model: String,
    /// Sent verbatim as the system message, if present.
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// User message template; `{field}` placeholders are filled from the
    /// inputs.
    #[serde(default)]
    pub user_prompt: Option<String>,
    /// Name of the environment variable holding the API key. `None` sends
    /// the request unauthenticated (local endpoints, test servers).
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            system_prompt: None,
            user_prompt: None,
            api_key_env: None,
            base_url: default_base_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// An agent that builds a prompt from its inputs, posts it to a
/// chat-completions endpoint, and returns the first choice's content.
///
/// The rendered prompt is recorded as an intermediary before the request
/// goes out, so failed calls still leave a trace of what was sent.
pub struct LlmAgent {
    config: LlmConfig,
    client: reqwest::Client,
}

impl LlmAgent {
    #[must_use]
    pub fn new(config: LlmConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    fn api_key(&self) -> Result<Option<String>, AgentError> {
        match &self.config.api_key_env {
            Some(alias) => std::env::var(alias).map(Some).map_err(|_| {
                AgentError::Provider {
                    provider: "llm",
                    message: format!("API key environment variable '{alias}' is not set"),
                }
            }),
            None => Ok(None),
        }
    }

    fn build_messages(&self, inputs: &[Value]) -> Vec<ChatMessage> {
        let mut messages = Vec::new();
        if let Some(system) = &self.config.system_prompt {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        if let Some(user) = &self.config.user_prompt {
            let mut content = user.clone();
            for input in inputs {
                content = render_template(&content, input);
            }
            messages.push(ChatMessage {
                role: "user".to_string(),
                content,
            });
        }
        if messages.is_empty() {
            messages.push(ChatMessage {
                role: "user".to_string(),
                content: String::new(),
            });
        }
        messages
    }
}

#[async_trait]
impl Agent for LlmAgent {
    async fn run(&self, ctx: AgentContext, inputs: Vec<Value>) -> Result<Value, AgentError> {
        let messages = self.build_messages(&inputs);
        ctx.record_intermediary(json!({ "prompt": &messages }));

        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let mut request = self.client.post(&url).json(&ChatRequest {
            model: &self.config.model,
            messages: &messages,
        });
        if let Some(key) = self.api_key()? {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|err| AgentError::Provider {
            provider: "llm",
            message: err.to_string(),
        })?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Provider {
                provider: "llm",
                message: format!("chat completion returned {status}: {body}"),
            });
        }
        let completion: ChatResponse =
            response.json().await.map_err(|err| AgentError::Provider {
                provider: "llm",
                message: err.to_string(),
            })?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::Provider {
                provider: "llm",
                message: "chat completion contained no choices".to_string(),
            })?;
        Ok(Value::String(choice.message.content))
    }

    fn descriptor(&self) -> Option<AgentDescriptor> {
        serde_json::to_value(&self.config)
            .ok()
            .map(|config| AgentDescriptor::new("llm", config))
    }
}

// Fill `{field}` placeholders from the top-level fields of one input.
// Unknown placeholders are left as-is so a later input can fill them.
fn render_template(template: &str, context: &Value) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &regex::Captures<'_>| {
            let key = &caps[1];
            match context.get(key) {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

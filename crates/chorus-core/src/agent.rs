//! Agents
//!
//! An agent is a named participant with its own model settings, message
//! history and tool set. `generate` is the only operation that talks to the
//! completion provider; everything else appends to history.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{AgentError, RegistryError, Result};
use crate::message::{History, Message};
use crate::name::generate_agent_name;
use crate::provider::{CompletionProvider, CompletionRequest, GenerationOptions, ReasoningEffort};
use crate::tool::{Dispatcher, ToolDescriptor};

/// Part an agent plays in a conversation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    Orchestrator,
    #[default]
    Worker,
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Orchestrator => write!(f, "orchestrator"),
            Self::Worker => write!(f, "worker"),
        }
    }
}

/// The main Agent struct
pub struct Agent {
    name: String,
    role: AgentRole,
    provider: Arc<dyn CompletionProvider>,
    options: GenerationOptions,
    history: History,
    tools: Dispatcher,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("role", &self.role)
            .field("provider", &self.provider.name())
            .field("model", &self.options.model)
            .field("history", &self.history.len())
            .field("tools", &self.tools.names())
            .finish()
    }
}

impl Agent {
    pub fn builder() -> AgentBuilder {
        AgentBuilder::new()
    }

    /// Append `extra`, ask the provider for the next assistant message, and
    /// record it.
    ///
    /// Extras are kept even when the call fails; the history is append-only.
    pub async fn generate(&mut self, extra: impl IntoIterator<Item = Message>) -> Result<Message> {
        for message in extra {
            self.history.push(message);
        }

        let specs = self.tools.specs();
        let request = CompletionRequest {
            options: &self.options,
            messages: self.history.messages(),
            tools: &specs,
        };

        tracing::debug!(
            agent = %self.name,
            model = %self.options.model,
            messages = self.history.len(),
            tools = specs.len(),
            "Requesting completion"
        );

        let completion = self
            .provider
            .complete(&request)
            .await
            .map_err(|source| AgentError::Generation {
                agent: self.name.clone(),
                source: Box::new(source),
            })?;

        self.history.push(completion.message.clone());
        Ok(completion.message)
    }

    pub fn add_system_message(&mut self, content: impl Into<String>) {
        self.history.push(Message::system(content));
    }

    pub fn add_user_message(&mut self, content: impl Into<String>) {
        self.history.push(Message::user(content));
    }

    /// Answer the tool call `call_id`
    pub fn add_tool_result(&mut self, call_id: impl Into<String>, content: impl Into<String>) {
        self.history.push(Message::tool(content, call_id));
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn role(&self) -> AgentRole {
        self.role
    }

    pub fn model(&self) -> &str {
        &self.options.model
    }

    pub const fn options(&self) -> &GenerationOptions {
        &self.options
    }

    pub const fn history(&self) -> &History {
        &self.history
    }

    pub const fn tools(&self) -> &Dispatcher {
        &self.tools
    }

    pub fn tools_mut(&mut self) -> &mut Dispatcher {
        &mut self.tools
    }

    pub fn provider(&self) -> Arc<dyn CompletionProvider> {
        Arc::clone(&self.provider)
    }
}

/// Builder for [`Agent`]
pub struct AgentBuilder {
    name: Option<String>,
    role: AgentRole,
    provider: Option<Arc<dyn CompletionProvider>>,
    options: GenerationOptions,
    system_message: Option<String>,
    tools: Vec<ToolDescriptor>,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            name: None,
            role: AgentRole::Worker,
            provider: None,
            options: GenerationOptions::default(),
            system_message: None,
            tools: Vec::new(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub const fn role(mut self, role: AgentRole) -> Self {
        self.role = role;
        self
    }

    pub const fn orchestrator(self) -> Self {
        self.role(AgentRole::Orchestrator)
    }

    pub fn provider(mut self, provider: Arc<dyn CompletionProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.options.model = model.into();
        self
    }

    pub fn system_message(mut self, message: impl Into<String>) -> Self {
        self.system_message = Some(message.into());
        self
    }

    pub const fn temperature(mut self, temp: f32) -> Self {
        self.options.temperature = Some(temp);
        self
    }

    pub const fn top_p(mut self, top_p: f32) -> Self {
        self.options.top_p = Some(top_p);
        self
    }

    pub const fn max_tokens(mut self, max: u32) -> Self {
        self.options.max_tokens = Some(max);
        self
    }

    pub const fn seed(mut self, seed: i64) -> Self {
        self.options.seed = Some(seed);
        self
    }

    pub const fn reasoning_effort(mut self, effort: ReasoningEffort) -> Self {
        self.options.reasoning_effort = Some(effort);
        self
    }

    pub fn options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn tool(mut self, tool: ToolDescriptor) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn tools(mut self, tools: impl IntoIterator<Item = ToolDescriptor>) -> Self {
        self.tools.extend(tools);
        self
    }

    pub fn build(self) -> Result<Agent> {
        let provider = self
            .provider
            .ok_or_else(|| AgentError::Config("Provider is required".into()))?;

        let mut tools = Dispatcher::new();
        tools
            .register_all(self.tools)
            .map_err(|e: RegistryError| AgentError::Config(e.to_string()))?;

        let history = self
            .system_message
            .map_or_else(History::new, History::with_system_prompt);

        Ok(Agent {
            name: self.name.unwrap_or_else(generate_agent_name),
            role: self.role,
            provider,
            options: self.options,
            history,
            tools,
        })
    }
}

//! Completion Provider Strategy Pattern
//!
//! Defines a common interface for completion backends (any OpenAI-compatible
//! endpoint, local runners, test doubles) so agents work with any backend
//! without code changes.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use chorus_core::provider::{CompletionProvider, CompletionRequest};
//!
//! let completion = provider.complete(&request).await?;
//! history.push(completion.message);
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::message::Message;

/// Reasoning effort hint for models that support it
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    #[default]
    Low,
    Medium,
    High,
}

/// Sampling configuration for one agent
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Model identifier (e.g., "ai/gpt-oss", "gpt-4o")
    pub model: String,

    /// Temperature for sampling
    #[serde(default)]
    pub temperature: Option<f32>,

    /// Maximum tokens to generate
    #[serde(default)]
    pub max_tokens: Option<u32>,

    /// Top-p nucleus sampling
    #[serde(default)]
    pub top_p: Option<f32>,

    /// Seed for reproducible sampling
    #[serde(default)]
    pub seed: Option<i64>,

    #[serde(default)]
    pub reasoning_effort: Option<ReasoningEffort>,
}

pub const DEFAULT_MODEL: &str = "ai/gpt-oss";

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.into(),
            temperature: None,
            max_tokens: None,
            top_p: None,
            seed: Some(0),
            reasoning_effort: Some(ReasoningEffort::Low),
        }
    }
}

/// Tool description advertised to the model
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON-schema object describing the arguments
    pub parameters: Value,
}

/// One completion request: full history plus the callable tools
#[derive(Clone, Copy, Debug)]
pub struct CompletionRequest<'a> {
    pub options: &'a GenerationOptions,
    pub messages: &'a [Message],
    pub tools: &'a [ToolSpec],
}

/// Response from a completion
#[derive(Clone, Debug)]
pub struct Completion {
    /// The assistant message, including any tool calls
    pub message: Message,

    /// Model that generated this response
    pub model: String,

    /// Token usage statistics (if available)
    pub usage: Option<TokenUsage>,

    /// Finish reason
    pub finish_reason: Option<FinishReason>,
}

impl Completion {
    pub fn new(message: Message, model: impl Into<String>) -> Self {
        Self {
            message,
            model: model.into(),
            usage: None,
            finish_reason: None,
        }
    }
}

/// Token usage statistics
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Reason for completion finishing
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
}

/// Information about a model
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    #[serde(default)]
    pub owned_by: Option<String>,
}

/// Strategy trait for completion providers
///
/// Implement this trait to add support for new backends.
/// Agents work exclusively through this interface.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &str;

    /// Generate the next assistant message
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<Completion>;

    /// Check if the provider is available and configured correctly
    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    /// List available models
    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        Ok(Vec::new())
    }
}

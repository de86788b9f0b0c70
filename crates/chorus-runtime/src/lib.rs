//! # chorus-runtime
//!
//! Completion providers for the chorus agent system.
//!
//! ## Providers
//!
//! - **OpenAI-compatible**: any `/chat/completions` endpoint with native tool
//!   calling (OpenAI, Docker Model Runner, vLLM, llama.cpp server, ...)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use chorus_runtime::{OpenAiConfig, OpenAiProvider};
//!
//! let provider = OpenAiProvider::new(OpenAiConfig::from_env())?;
//! let agent = Agent::builder()
//!     .provider(Arc::new(provider))
//!     .build()?;
//! ```

pub mod openai;

pub use openai::{OpenAiConfig, OpenAiProvider};

// Re-export core types for convenience
pub use chorus_core::{AgentError, CompletionProvider, Message, Result, Role};

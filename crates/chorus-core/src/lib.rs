//! # chorus-core
//!
//! Agents, tool dispatch and the orchestrated multi-agent conversation.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       Conversation                            │
//! │  ┌──────────────┐   DelegateTask   ┌──────────────┐           │
//! │  │ Orchestrator │─────────────────►│   Workers    │           │
//! │  │    Agent     │                  │   (Agents)   │           │
//! │  └──────┬───────┘                  └──────┬───────┘           │
//! │         │                                 │                   │
//! │  ┌──────▼───────┐  ┌────────────────────┐ │                   │
//! │  │  Dispatcher  │  │ CompletionProvider │◄┘                   │
//! │  │ (local/remote│  │     (Strategy)     │                     │
//! │  │    tools)    │  └────────────────────┘                     │
//! │  └──────────────┘                                             │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `CompletionProvider` trait keeps agents independent of the backend;
//! remote tools plug into the same `Dispatcher` as local functions.

pub mod agent;
pub mod builtin;
pub mod conversation;
pub mod error;
pub mod message;
pub mod name;
pub mod observe;
pub mod provider;
pub mod tool;

#[cfg(test)]
pub(crate) mod testing;

pub use agent::{Agent, AgentBuilder, AgentRole};
pub use builtin::{Workspace, standard_tools};
pub use conversation::{Conversation, ConversationState, DelegateError};
pub use error::{
    AgentError, ConversationError, DispatchError, FailureKind, RegistryError, Result, ToolError,
};
pub use message::{History, Message, Role, ToolCall};
pub use observe::{Event, NullObserver, Observer, TracingObserver};
pub use provider::{Completion, CompletionProvider, CompletionRequest, GenerationOptions, ToolSpec};
pub use tool::{Dispatcher, ParameterSchema, ToolDescriptor, ToolHandler};

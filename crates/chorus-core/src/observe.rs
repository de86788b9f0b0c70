//! Observability
//!
//! Components never log through a global; they report [`Event`]s to an
//! [`Observer`] handed to them at construction. [`TracingObserver`] forwards
//! everything to `tracing`, which is what the binary installs.

use std::fmt;

use crate::error::FailureKind;

/// Something worth recording happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event<'a> {
    /// The orchestrator is about to generate for `turn` (1-based)
    TurnStarted { conversation: &'a str, turn: usize },

    /// A tool call was answered successfully
    ToolCompleted {
        agent: &'a str,
        tool: &'a str,
        call_id: &'a str,
    },

    /// A tool call failed; the error text was fed back to the model
    ToolFailed {
        agent: &'a str,
        tool: &'a str,
        call_id: &'a str,
        kind: FailureKind,
        error: &'a str,
    },

    /// A task was handed to a worker
    Delegated { worker: &'a str },

    Finished { turns: usize },

    Aborted { reason: &'a str },

    /// The transport dropped an incoming frame
    FrameDiscarded { source: &'a str, reason: &'a str },

    /// One line of a provider subprocess's stderr
    ProviderStderr { source: &'a str, line: &'a str },
}

impl fmt::Display for Event<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TurnStarted { conversation, turn } => {
                write!(f, "conversation {conversation}: turn {turn}")
            }
            Self::ToolCompleted { agent, tool, .. } => write!(f, "{agent}: {tool} ok"),
            Self::ToolFailed {
                agent, tool, kind, error, ..
            } => write!(f, "{agent}: {tool} failed ({kind}): {error}"),
            Self::Delegated { worker } => write!(f, "delegated to {worker}"),
            Self::Finished { turns } => write!(f, "finished after {turns} turns"),
            Self::Aborted { reason } => write!(f, "aborted: {reason}"),
            Self::FrameDiscarded { source, reason } => {
                write!(f, "{source}: discarded frame: {reason}")
            }
            Self::ProviderStderr { source, line } => write!(f, "{source}: {line}"),
        }
    }
}

/// Sink for [`Event`]s
pub trait Observer: Send + Sync {
    fn on_event(&self, event: &Event<'_>);
}

/// Forwards events to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn on_event(&self, event: &Event<'_>) {
        match event {
            Event::TurnStarted { conversation, turn } => {
                tracing::info!(conversation, turn, "Orchestrator turn");
            }
            Event::ToolCompleted {
                agent, tool, call_id,
            } => tracing::debug!(agent, tool, call_id, "Tool call completed"),
            Event::ToolFailed {
                agent,
                tool,
                call_id,
                kind,
                error,
            } => tracing::warn!(agent, tool, call_id, %kind, error, "Tool call failed"),
            Event::Delegated { worker } => tracing::info!(worker, "Delegating task"),
            Event::Finished { turns } => tracing::info!(turns, "Conversation finished"),
            Event::Aborted { reason } => tracing::error!(reason, "Conversation aborted"),
            Event::FrameDiscarded { source, reason } => {
                tracing::debug!(source, reason, "Discarded frame");
            }
            Event::ProviderStderr { source, line } => tracing::debug!(source, "{line}"),
        }
    }
}

/// Drops every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl Observer for NullObserver {
    fn on_event(&self, _event: &Event<'_>) {}
}

//! Error Types

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types
#[derive(Error, Debug)]
pub enum AgentError {
    /// Completion provider error
    #[error("Provider error: {0}")]
    Provider(String),

    /// Provider unavailable or not responding
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Rate limited
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// A completion call made on behalf of an agent failed
    #[error("generation error for agent '{agent}': {source}")]
    Generation {
        agent: String,
        #[source]
        source: Box<AgentError>,
    },

    /// Turn budget of a conversation exhausted without `Finish`
    #[error("max turns reached ({0})")]
    MaxTurns(usize),

    /// The conversation was already aborted by an earlier run
    #[error("conversation aborted: {0}")]
    Aborted(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AgentError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ProviderUnavailable(_) | Self::RateLimited(_) => true,
            Self::Generation { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

/// Failures while building a tool namespace
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("tool already registered: {0}")]
    DuplicateTool(String),

    #[error("tool name must be non-empty")]
    EmptyName,
}

/// Which stage of a tool call failed.
///
/// All three surface identically to the model (as tool-result text); the kind
/// exists so logs can tell a malformed call apart from a failing handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    UnknownTool,
    Decode,
    Handler,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownTool => write!(f, "unknown_tool"),
            Self::Decode => write!(f, "decode"),
            Self::Handler => write!(f, "handler"),
        }
    }
}

/// Error reported by a tool handler
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    /// Arguments did not match the handler's declared shape
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// The handler ran and reported a failure
    #[error("{0}")]
    Failed(String),
}

/// Error returned by `Dispatcher::dispatch`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("failed to decode arguments for {tool}: {message}")]
    Decode { tool: String, message: String },

    #[error("{tool} failed: {message}")]
    Handler { tool: String, message: String },
}

impl DispatchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::UnknownTool(_) => FailureKind::UnknownTool,
            Self::Decode { .. } => FailureKind::Decode,
            Self::Handler { .. } => FailureKind::Handler,
        }
    }

    pub(crate) fn from_tool(tool: &str, err: ToolError) -> Self {
        match err {
            ToolError::InvalidArguments(message) => Self::Decode {
                tool: tool.to_string(),
                message,
            },
            ToolError::Failed(message) => Self::Handler {
                tool: tool.to_string(),
                message,
            },
        }
    }
}

/// Conversation construction failures. A conversation that fails to build
/// never starts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversationError {
    #[error("duplicate agent name: {0}")]
    DuplicateAgent(String),

    #[error("multiple orchestrators found: {first}, {second}")]
    MultipleOrchestrators { first: String, second: String },

    #[error("no orchestrator found")]
    NoOrchestrator,

    #[error("conversation requires at least 2 agents (1 orchestrator + 1 worker)")]
    TooFewAgents,

    #[error("max_turns must be greater than zero")]
    ZeroTurnBudget,

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_error_retryability_follows_source() {
        let err = AgentError::Generation {
            agent: "lead".into(),
            source: Box::new(AgentError::RateLimited("slow down".into())),
        };
        assert!(err.is_retryable());

        let err = AgentError::Generation {
            agent: "lead".into(),
            source: Box::new(AgentError::Auth("bad key".into())),
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_only_transient_provider_errors_are_retryable() {
        assert!(AgentError::ProviderUnavailable("refused".into()).is_retryable());
        assert!(AgentError::RateLimited("429".into()).is_retryable());
        assert!(!AgentError::Provider("400".into()).is_retryable());
        assert!(!AgentError::Config("Provider is required".into()).is_retryable());
        assert!(!AgentError::MaxTurns(20).is_retryable());

        let json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(!AgentError::from(json).is_retryable());
    }

    #[test]
    fn test_dispatch_error_kinds() {
        assert_eq!(
            DispatchError::UnknownTool("x".into()).kind(),
            FailureKind::UnknownTool
        );
        let decode = DispatchError::from_tool("t", ToolError::InvalidArguments("bad".into()));
        assert_eq!(decode.kind(), FailureKind::Decode);
        let failed = DispatchError::from_tool("t", ToolError::Failed("boom".into()));
        assert_eq!(failed.kind(), FailureKind::Handler);
        assert_eq!(failed.to_string(), "t failed: boom");
    }

    #[test]
    fn test_max_turns_message() {
        assert!(AgentError::MaxTurns(20).to_string().contains("max turns reached"));
    }
}

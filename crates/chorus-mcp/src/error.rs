//! Error Types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, McpError>;

/// Transport and protocol errors.
///
/// `Remote` and `ToolFailed` come from a live provider; everything else means
/// the channel itself is unusable or the handshake never completed.
#[derive(Error, Debug)]
pub enum McpError {
    /// The provider process could not be started
    #[error("failed to spawn tool provider '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("tool provider process has no {0} pipe")]
    MissingPipe(&'static str),

    /// The transport shut down before a response arrived
    #[error("transport closed")]
    Closed,

    #[error("failed to write frame: {0}")]
    Write(#[source] std::io::Error),

    #[error("failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),

    /// The provider answered with a JSON-RPC error object
    #[error("remote error {code}: {message}")]
    Remote { code: i64, message: String },

    #[error("initialize handshake failed: {0}")]
    Handshake(String),

    #[error("client is not initialized")]
    NotInitialized,

    /// `tools/call` returned `isError: true`
    #[error("tool call failed: {0}")]
    ToolFailed(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl McpError {
    /// True for failures of the channel rather than of one call
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Spawn { .. } | Self::MissingPipe(_) | Self::Closed | Self::Write(_)
        )
    }
}

//! # chorus-mcp
//!
//! Talks to tool providers: external processes speaking newline-delimited
//! JSON-RPC 2.0 (the Model Context Protocol) over stdio.
//!
//! ```rust,ignore
//! use chorus_mcp::{ServerConfig, ToolProviderClient};
//!
//! let client = Arc::new(ToolProviderClient::connect(&config, observer).await?);
//! dispatcher.register_all(client.tool_descriptors().await?)?;
//! ```

pub mod client;
pub mod error;
pub mod protocol;
pub mod remote;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{ToolProviderClient, collect_text};
pub use error::{McpError, Result};
pub use remote::RemoteTool;
pub use transport::{ServerConfig, Transport};

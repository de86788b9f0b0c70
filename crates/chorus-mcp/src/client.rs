//! Tool Provider Client
//!
//! MCP client over a [`Transport`]: the `initialize` handshake, `tools/list`
//! and `tools/call`. Listed tools become [`ToolDescriptor`]s that plug into a
//! local dispatcher.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chorus_core::observe::Observer;
use chorus_core::tool::ToolDescriptor;
use serde_json::{Value, json};

use crate::error::{McpError, Result};
use crate::protocol::{
    CallToolResult, Content, ListToolsResult, METHOD_INITIALIZE, METHOD_INITIALIZED,
    METHOD_TOOLS_CALL, METHOD_TOOLS_LIST, ProviderTool, initialize_params,
};
use crate::remote::RemoteTool;
use crate::transport::{ServerConfig, Transport};

pub const CLIENT_NAME: &str = "chorus";
pub const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Concatenate the text fragments of a tool result, each followed by a
/// newline. Non-text fragments are dropped.
pub fn collect_text(content: &[Content]) -> String {
    content
        .iter()
        .filter_map(Content::as_text)
        .fold(String::new(), |mut out, text| {
            out.push_str(text);
            out.push('\n');
            out
        })
}

/// Client for one tool provider
#[derive(Debug)]
pub struct ToolProviderClient {
    transport: Transport,
    initialized: AtomicBool,
}

impl ToolProviderClient {
    /// Spawn the provider and complete the handshake
    pub async fn connect(config: &ServerConfig, observer: Arc<dyn Observer>) -> Result<Self> {
        let client = Self::from_transport(Transport::spawn(config, observer)?);
        if let Err(e) = client.initialize().await {
            client.close().await;
            return Err(e);
        }
        Ok(client)
    }

    pub const fn from_transport(transport: Transport) -> Self {
        Self {
            transport,
            initialized: AtomicBool::new(false),
        }
    }

    /// `initialize` followed by `notifications/initialized`
    pub async fn initialize(&self) -> Result<Value> {
        let server = self
            .transport
            .send(METHOD_INITIALIZE, initialize_params(CLIENT_NAME, CLIENT_VERSION))
            .await
            .map_err(|e| McpError::Handshake(e.to_string()))?;
        self.transport
            .notify(METHOD_INITIALIZED, None)
            .await
            .map_err(|e| McpError::Handshake(e.to_string()))?;

        self.initialized.store(true, Ordering::Release);
        let server_name = server
            .pointer("/serverInfo/name")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        tracing::info!(provider = %self.label(), server = server_name, "Tool provider initialized");
        Ok(server)
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.initialized.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(McpError::NotInitialized)
        }
    }

    pub async fn list_tools(&self) -> Result<Vec<ProviderTool>> {
        self.ensure_initialized()?;
        let result = self.transport.send(METHOD_TOOLS_LIST, json!({})).await?;
        let listed: ListToolsResult = serde_json::from_value(result)
            .map_err(|e| McpError::InvalidResponse(format!("tools/list: {e}")))?;
        tracing::debug!(provider = %self.label(), tools = listed.tools.len(), "Listed tools");
        Ok(listed.tools)
    }

    /// Call a tool and return its text output
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<String> {
        self.ensure_initialized()?;
        let result = self
            .transport
            .send(METHOD_TOOLS_CALL, json!({ "name": name, "arguments": arguments }))
            .await?;
        let result: CallToolResult = serde_json::from_value(result)
            .map_err(|e| McpError::InvalidResponse(format!("tools/call: {e}")))?;

        let text = collect_text(&result.content);
        if result.is_error {
            let message = text.trim_end();
            return Err(McpError::ToolFailed(if message.is_empty() {
                "tool execution failed".to_string()
            } else {
                message.to_string()
            }));
        }
        Ok(text)
    }

    /// Every listed tool, bound to this client
    pub async fn tool_descriptors(self: &Arc<Self>) -> Result<Vec<ToolDescriptor>> {
        let tools = self.list_tools().await?;
        Ok(tools
            .into_iter()
            .map(|tool| RemoteTool::descriptor(Arc::clone(self), tool))
            .collect())
    }

    pub async fn close(&self) {
        self.transport.close().await;
    }

    pub fn label(&self) -> &str {
        self.transport.label()
    }

    pub const fn transport(&self) -> &Transport {
        &self.transport
    }
}

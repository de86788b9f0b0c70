//! Remote tool binding

use std::sync::Arc;

use async_trait::async_trait;
use chorus_core::error::ToolError;
use chorus_core::tool::{ToolDescriptor, ToolHandler};
use serde_json::Value;

use crate::client::ToolProviderClient;
use crate::error::McpError;
use crate::protocol::ProviderTool;

/// Forwards dispatches to `tools/call` on the owning provider
pub struct RemoteTool {
    client: Arc<ToolProviderClient>,
    name: String,
}

impl RemoteTool {
    /// Descriptor whose schema is the provider's, passed through unchanged
    pub fn descriptor(client: Arc<ToolProviderClient>, tool: ProviderTool) -> ToolDescriptor {
        let handler = Arc::new(Self {
            client,
            name: tool.name.clone(),
        });
        ToolDescriptor::new(
            tool.name,
            tool.description.unwrap_or_default(),
            tool.input_schema,
            handler,
        )
    }
}

#[async_trait]
impl ToolHandler for RemoteTool {
    async fn call(&self, args: Value) -> Result<String, ToolError> {
        if !args.is_object() {
            return Err(ToolError::InvalidArguments(format!(
                "expected a JSON object, got {args}"
            )));
        }
        self.client
            .call_tool(&self.name, args)
            .await
            .map_err(|e| self.failure(&e))
    }
}

impl RemoteTool {
    /// A dead provider is reported back to the model as text like any other
    /// tool failure; only the log level tells them apart.
    fn failure(&self, error: &McpError) -> ToolError {
        let provider = self.client.label();
        if error.is_transport() {
            tracing::error!(provider, tool = %self.name, %error, "Tool provider unavailable");
            ToolError::Failed(format!("tool provider '{provider}' unavailable: {error}"))
        } else {
            tracing::debug!(provider, tool = %self.name, %error, "Remote tool failed");
            ToolError::Failed(error.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::scripted_provider;
    use serde_json::json;

    async fn search_tool() -> (Arc<ToolProviderClient>, ToolDescriptor) {
        let client = Arc::new(ToolProviderClient::from_transport(scripted_provider(
            |method, params| match method {
                "initialize" => Ok(json!({"protocolVersion": "2024-11-05"})),
                "tools/list" => Ok(json!({"tools": [{"name": "search"}]})),
                "tools/call" if params["arguments"]["query"] == "boom" => Ok(json!({
                    "content": [{"type": "text", "text": "index offline"}],
                    "isError": true
                })),
                "tools/call" => Ok(json!({"content": [{"type": "text", "text": "hit"}]})),
                _ => Err((-32601, "Method not found".to_string())),
            },
        )));
        client.initialize().await.unwrap();
        let tool = client.tool_descriptors().await.unwrap().remove(0);
        (client, tool)
    }

    #[tokio::test]
    async fn test_remote_call_and_tool_failure() {
        let (_client, tool) = search_tool().await;
        assert_eq!(tool.name, "search");
        assert_eq!(tool.handler.call(json!({"query": "rust"})).await.unwrap(), "hit\n");

        match tool.handler.call(json!({"query": "boom"})).await.unwrap_err() {
            ToolError::Failed(message) => assert!(message.contains("index offline")),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            tool.handler.call(json!(["not", "an", "object"])).await,
            Err(ToolError::InvalidArguments(_))
        ));
    }

    #[tokio::test]
    async fn test_closed_provider_is_reported_unavailable() {
        let (client, tool) = search_tool().await;
        client.close().await;

        match tool.handler.call(json!({"query": "rust"})).await.unwrap_err() {
            ToolError::Failed(message) => {
                assert!(message.starts_with("tool provider 'fake' unavailable"), "{message}");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}

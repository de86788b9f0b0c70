//! Wire Format
//!
//! Newline-delimited JSON-RPC 2.0 frames plus the handful of MCP payloads the
//! client needs.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::McpError;

pub const JSONRPC_VERSION: &str = "2.0";
pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub const METHOD_INITIALIZE: &str = "initialize";
pub const METHOD_INITIALIZED: &str = "notifications/initialized";
pub const METHOD_TOOLS_LIST: &str = "tools/list";
pub const METHOD_TOOLS_CALL: &str = "tools/call";

/// JSON-RPC "internal error", used when an error object carries no code
const INTERNAL_ERROR: i64 = -32603;

#[derive(Debug, Serialize)]
pub struct RequestFrame<'a> {
    pub jsonrpc: &'static str,
    pub method: &'a str,
    pub params: &'a Value,
    pub id: u64,
}

#[derive(Debug, Serialize)]
pub struct NotificationFrame<'a> {
    pub jsonrpc: &'static str,
    pub method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<&'a Value>,
}

#[derive(Debug, Deserialize)]
struct IncomingFrame {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

/// What the reader loop should do with one line
#[derive(Debug)]
pub enum Incoming {
    /// Deliver to the pending request `id`
    Response {
        id: u64,
        outcome: Result<Value, McpError>,
    },
    /// Drop the frame
    Discard(&'static str),
}

/// Classify one raw frame. Never fails: anything unusable is a `Discard`.
pub fn classify(line: &[u8]) -> Incoming {
    let Ok(frame) = serde_json::from_slice::<IncomingFrame>(line) else {
        return Incoming::Discard("malformed frame");
    };
    if frame.method.is_some() {
        return Incoming::Discard("server-initiated message");
    }
    let Some(id) = frame.id.as_ref().and_then(Value::as_u64) else {
        return Incoming::Discard("missing or non-integer id");
    };

    let outcome = match frame.error {
        Some(error) if !error.is_null() => Err(remote_error(&error)),
        _ => Ok(frame.result.unwrap_or(Value::Null)),
    };
    Incoming::Response { id, outcome }
}

fn remote_error(error: &Value) -> McpError {
    McpError::Remote {
        code: error
            .get("code")
            .and_then(Value::as_i64)
            .unwrap_or(INTERNAL_ERROR),
        message: error
            .get("message")
            .and_then(Value::as_str)
            .map_or_else(|| error.to_string(), str::to_string),
    }
}

/// Parameters of the `initialize` request
pub fn initialize_params(client_name: &str, client_version: &str) -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {
            "roots": { "listChanged": true },
            "sampling": {}
        },
        "clientInfo": {
            "name": client_name,
            "version": client_version
        }
    })
}

fn empty_schema() -> Value {
    json!({ "type": "object", "properties": {} })
}

/// A tool advertised by `tools/list`
#[derive(Clone, Debug, Deserialize)]
pub struct ProviderTool {
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Passed through to the model untouched
    #[serde(rename = "inputSchema", default = "empty_schema")]
    pub input_schema: Value,
}

#[derive(Debug, Deserialize)]
pub struct ListToolsResult {
    #[serde(default)]
    pub tools: Vec<ProviderTool>,
}

/// One fragment of a `tools/call` result
#[derive(Clone, Debug, Deserialize)]
pub struct Content {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub text: Option<String>,
}

impl Content {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: "text".into(),
            text: Some(text.into()),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        if self.kind == "text" {
            self.text.as_deref()
        } else {
            None
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CallToolResult {
    #[serde(default)]
    pub content: Vec<Content>,

    #[serde(rename = "isError", default)]
    pub is_error: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(line: &str) -> (u64, Result<Value, McpError>) {
        match classify(line.as_bytes()) {
            Incoming::Response { id, outcome } => (id, outcome),
            Incoming::Discard(reason) => panic!("discarded: {reason}"),
        }
    }

    #[test]
    fn test_request_frame_shape() {
        let params = json!({"x": 1});
        let frame = RequestFrame {
            jsonrpc: JSONRPC_VERSION,
            method: "tools/list",
            params: &params,
            id: 7,
        };
        assert_eq!(
            serde_json::to_value(&frame).unwrap(),
            json!({"jsonrpc": "2.0", "method": "tools/list", "params": {"x": 1}, "id": 7})
        );
    }

    #[test]
    fn test_result_and_null_result() {
        let (id, outcome) = response(r#"{"jsonrpc":"2.0","id":3,"result":{"ok":true}}"#);
        assert_eq!(id, 3);
        assert_eq!(outcome.unwrap(), json!({"ok": true}));

        let (_, outcome) = response(r#"{"jsonrpc":"2.0","id":4,"result":null}"#);
        assert_eq!(outcome.unwrap(), Value::Null);
    }

    #[test]
    fn test_error_object() {
        let (_, outcome) =
            response(r#"{"jsonrpc":"2.0","id":5,"error":{"code":-32601,"message":"Method not found"}}"#);
        match outcome.unwrap_err() {
            McpError::Remote { code, message } => {
                assert_eq!(code, -32601);
                assert_eq!(message, "Method not found");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_discarded_frames() {
        for line in [
            "not json",
            r#"{"jsonrpc":"2.0","method":"notifications/progress","params":{}}"#,
            r#"{"jsonrpc":"2.0","method":"sampling/createMessage","id":9,"params":{}}"#,
            r#"{"jsonrpc":"2.0","id":"abc","result":{}}"#,
            r#"{"jsonrpc":"2.0","result":{}}"#,
        ] {
            assert!(matches!(classify(line.as_bytes()), Incoming::Discard(_)), "{line}");
        }
        assert!(matches!(classify(&[0xff, 0xfe, b'\n']), Incoming::Discard(_)));
    }

    #[test]
    fn test_call_result_decoding() {
        let result: CallToolResult = serde_json::from_value(json!({
            "content": [
                {"type": "text", "text": "a"},
                {"type": "image", "data": "...", "mimeType": "image/png"}
            ],
            "isError": false
        }))
        .unwrap();
        assert_eq!(result.content.len(), 2);
        assert_eq!(result.content[0].as_text(), Some("a"));
        assert_eq!(result.content[1].as_text(), None);
    }
}

//! OpenAI-compatible Completion Provider
//!
//! Implementation of `CompletionProvider` for `/chat/completions` endpoints
//! with native tool calling.

use std::time::Duration;

use async_trait::async_trait;
use chorus_core::{
    error::{AgentError, Result},
    message::{Message, Role, ToolCall},
    provider::{
        Completion, CompletionProvider, CompletionRequest, FinishReason, ModelInfo, TokenUsage,
        ToolSpec,
    },
};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Provider configuration
#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    /// API root, without the trailing `/chat/completions`
    pub base_url: String,

    /// Bearer token; local runners usually need none
    pub api_key: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            api_key: None,
            timeout_secs: 120,
        }
    }
}

impl OpenAiConfig {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key,
            ..Self::default()
        }
    }

    /// Read `CHORUS_BASE_URL` and `CHORUS_API_KEY` / `OPENAI_API_KEY`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let present = |key: &str| lookup(key).filter(|v| !v.is_empty());
        Self {
            base_url: present("CHORUS_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.into()),
            api_key: present("CHORUS_API_KEY").or_else(|| present("OPENAI_API_KEY")),
            ..Self::default()
        }
    }
}

/// OpenAI-compatible provider
pub struct OpenAiProvider {
    client: reqwest::Client,
    config: OpenAiConfig,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("base_url", &self.config.base_url)
            .field("api_key", &self.config.api_key.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

impl OpenAiProvider {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AgentError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(OpenAiConfig::from_env())
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.config.base_url.trim_end_matches('/'))
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    /// Build the `/chat/completions` body
    fn build_request_body(request: &CompletionRequest<'_>) -> Value {
        let options = request.options;
        let mut body = json!({
            "model": options.model,
            "messages": Self::convert_messages(request.messages),
        });

        if !request.tools.is_empty() {
            body["tools"] = Value::Array(request.tools.iter().map(Self::convert_tool).collect());
        }
        if let Some(temperature) = options.temperature {
            body["temperature"] = json!(temperature);
        }
        if let Some(top_p) = options.top_p {
            body["top_p"] = json!(top_p);
        }
        if let Some(max_tokens) = options.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        if let Some(seed) = options.seed {
            body["seed"] = json!(seed);
        }
        if let Some(effort) = options.reasoning_effort {
            body["reasoning_effort"] = json!(effort);
        }

        body
    }

    fn convert_tool(tool: &ToolSpec) -> Value {
        // backends reject function parameters without a top-level object type
        let parameters = if tool.parameters.get("type").is_some() {
            tool.parameters.clone()
        } else {
            json!({ "type": "object", "properties": {} })
        };
        json!({
            "type": "function",
            "function": {
                "name": tool.name,
                "description": tool.description,
                "parameters": parameters
            }
        })
    }

    /// Convert agent messages to the wire format
    fn convert_messages(messages: &[Message]) -> Vec<Value> {
        messages
            .iter()
            .map(|m| {
                let mut msg = json!({
                    "role": m.role.to_string(),
                    "content": m.content,
                });

                if m.role == Role::Assistant && m.has_tool_calls() {
                    msg["tool_calls"] = m
                        .tool_calls
                        .iter()
                        .map(|tc| {
                            json!({
                                "id": tc.id,
                                "type": "function",
                                "function": {
                                    "name": tc.name,
                                    "arguments": tc.arguments
                                }
                            })
                        })
                        .collect();
                }
                if let Some(id) = &m.tool_call_id {
                    msg["tool_call_id"] = json!(id);
                }

                msg
            })
            .collect()
    }

    /// Turn a response body into a completion
    fn parse_response(response: ChatResponse, requested_model: &str) -> Result<Completion> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::Provider("no choices in response".into()))?;

        let tool_calls: Vec<ToolCall> = choice
            .message
            .tool_calls
            .into_iter()
            .map(|tc| {
                let id = tc
                    .id
                    .filter(|id| !id.is_empty())
                    .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4().simple()));
                ToolCall::new(id, tc.function.name, tc.function.arguments)
            })
            .collect();
        let content = choice.message.content.unwrap_or_default();

        let finish_reason = choice.finish_reason.as_deref().map(|reason| match reason {
            "length" => FinishReason::Length,
            "tool_calls" | "function_call" => FinishReason::ToolCalls,
            "content_filter" => FinishReason::ContentFilter,
            _ => FinishReason::Stop,
        });

        Ok(Completion {
            message: Message::assistant_with_tools(content, tool_calls),
            model: response.model.unwrap_or_else(|| requested_model.to_string()),
            usage: response.usage,
            finish_reason,
        })
    }

    fn status_error(status: StatusCode, body: &str) -> AgentError {
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| v.pointer("/error/message").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| body.to_string());
        let message = format!("{status}: {message}");

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AgentError::Auth(message),
            StatusCode::TOO_MANY_REQUESTS => AgentError::RateLimited(message),
            s if s.is_server_error() => AgentError::ProviderUnavailable(message),
            _ => AgentError::Provider(message),
        }
    }
}

fn transport_error(err: &reqwest::Error) -> AgentError {
    if err.is_connect() || err.is_timeout() {
        AgentError::ProviderUnavailable(err.to_string())
    } else {
        AgentError::Provider(err.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ResponseToolCall>,
}

#[derive(Debug, Deserialize)]
struct ResponseToolCall {
    #[serde(default)]
    id: Option<String>,
    function: ResponseFunction,
}

#[derive(Debug, Deserialize)]
struct ResponseFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelInfo>,
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<Completion> {
        let body = Self::build_request_body(request);

        let response = self
            .authorized(self.client.post(self.endpoint("chat/completions")))
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| transport_error(&e))?;
        if !status.is_success() {
            return Err(Self::status_error(status, &text));
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| AgentError::Provider(format!("failed to parse response: {e}")))?;
        let completion = Self::parse_response(parsed, &request.options.model)?;

        tracing::debug!(
            model = %completion.model,
            tool_calls = completion.message.tool_calls.len(),
            finish_reason = ?completion.finish_reason,
            "Completion received"
        );
        Ok(completion)
    }

    async fn health_check(&self) -> Result<bool> {
        match self.list_models().await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!("Completion endpoint health check failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let response = self
            .authorized(self.client.get(self.endpoint("models")))
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| transport_error(&e))?;
        if !status.is_success() {
            return Err(Self::status_error(status, &text));
        }
        let models: ModelList = serde_json::from_str(&text)?;
        Ok(models.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chorus_core::provider::{GenerationOptions, ReasoningEffort};

    #[test]
    fn test_config_defaults() {
        let config = OpenAiConfig::default();
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_config_lookup_precedence() {
        let config = OpenAiConfig::from_lookup(|key| match key {
            "CHORUS_BASE_URL" => Some("http://localhost:12434/engines/v1".into()),
            "CHORUS_API_KEY" => Some(String::new()),
            "OPENAI_API_KEY" => Some("sk-test".into()),
            _ => None,
        });
        assert_eq!(config.base_url, "http://localhost:12434/engines/v1");
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn test_endpoint_joins_cleanly() {
        let provider =
            OpenAiProvider::new(OpenAiConfig::new("http://localhost:8080/v1/", None)).unwrap();
        assert_eq!(
            provider.endpoint("chat/completions"),
            "http://localhost:8080/v1/chat/completions"
        );
    }

    #[test]
    fn test_request_body() {
        let options = GenerationOptions {
            temperature: Some(0.5),
            reasoning_effort: Some(ReasoningEffort::High),
            ..GenerationOptions::default()
        };
        let messages = vec![
            Message::system("You are helpful."),
            Message::assistant_with_tools(
                "",
                vec![ToolCall::new("call_1", "ReadFromFile", r#"{"filename":"a"}"#)],
            ),
            Message::tool("contents", "call_1"),
        ];
        let tools = vec![
            ToolSpec {
                name: "ReadFromFile".into(),
                description: "Read".into(),
                parameters: json!({"type": "object", "properties": {}, "required": []}),
            },
            ToolSpec {
                name: "bare".into(),
                description: String::new(),
                parameters: json!({}),
            },
        ];
        let request = CompletionRequest {
            options: &options,
            messages: &messages,
            tools: &tools,
        };

        let body = OpenAiProvider::build_request_body(&request);
        assert_eq!(body["model"], "ai/gpt-oss");
        assert_eq!(body["seed"], 0);
        assert_eq!(body["reasoning_effort"], "high");
        assert_eq!(body["temperature"], 0.5);
        assert!(body.get("top_p").is_none());

        let wire = &body["messages"];
        assert_eq!(wire[0]["role"], "system");
        assert_eq!(wire[1]["tool_calls"][0]["function"]["arguments"], r#"{"filename":"a"}"#);
        assert_eq!(wire[2]["role"], "tool");
        assert_eq!(wire[2]["tool_call_id"], "call_1");

        assert_eq!(body["tools"][0]["function"]["name"], "ReadFromFile");
        assert_eq!(body["tools"][1]["function"]["parameters"]["type"], "object");
    }

    #[test]
    fn test_parse_tool_call_response() {
        let raw = json!({
            "model": "gpt-4o",
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [
                        {"id": "call_9", "type": "function",
                         "function": {"name": "Finish", "arguments": "{\"result\":\"ok\"}"}},
                        {"type": "function", "function": {"name": "CreatePlan", "arguments": ""}}
                    ]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        });
        let response: ChatResponse = serde_json::from_value(raw).unwrap();
        let completion = OpenAiProvider::parse_response(response, "ai/gpt-oss").unwrap();

        assert_eq!(completion.model, "gpt-4o");
        assert_eq!(completion.finish_reason, Some(FinishReason::ToolCalls));
        assert_eq!(completion.usage.unwrap().total_tokens, 15);

        let calls = &completion.message.tool_calls;
        assert_eq!(calls[0].id, "call_9");
        assert_eq!(calls[0].arguments, r#"{"result":"ok"}"#);
        assert!(calls[1].id.starts_with("call_"));
        assert_eq!(completion.message.content, "");
    }

    #[test]
    fn test_empty_choices_is_error() {
        let response: ChatResponse = serde_json::from_value(json!({"choices": []})).unwrap();
        assert!(OpenAiProvider::parse_response(response, "m").is_err());
    }

    #[test]
    fn test_status_mapping() {
        let err = OpenAiProvider::status_error(
            StatusCode::UNAUTHORIZED,
            r#"{"error":{"message":"Incorrect API key"}}"#,
        );
        assert!(matches!(err, AgentError::Auth(ref m) if m.contains("Incorrect API key")));
        assert!(OpenAiProvider::status_error(StatusCode::TOO_MANY_REQUESTS, "").is_retryable());
        assert!(matches!(
            OpenAiProvider::status_error(StatusCode::BAD_REQUEST, "bad"),
            AgentError::Provider(_)
        ));
    }
}

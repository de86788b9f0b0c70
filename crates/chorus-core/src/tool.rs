//! Tool System
//!
//! Tools are registered by name in a [`Dispatcher`] and invoked with the raw
//! JSON arguments the model produced. Every handler has the same shape,
//! `(Value) -> Result<String, ToolError>`; typed handlers get there through
//! [`ToolDescriptor::function`] / [`ToolDescriptor::effect`], which decode the
//! arguments with serde and pair the handler with a statically declared
//! schema.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

use crate::error::{DispatchError, RegistryError, ToolError};
use crate::provider::ToolSpec;

/// Result text of handlers that only signal success
pub const SUCCESS: &str = "Success";

/// Scalar JSON-schema types a parameter (or an array element) may take
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Primitive {
    String,
    Integer,
    Number,
    Boolean,
}

impl Primitive {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }
}

/// Shape of one parameter. Nested objects are deliberately not expressible.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamType {
    Scalar(Primitive),
    Array(Primitive),
}

/// Parameter definition for tool schema
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParameterSchema {
    /// Parameter name (the JSON object key)
    pub name: String,

    pub param_type: ParamType,

    /// Human-readable description
    pub description: Option<String>,

    /// Whether this parameter is required
    pub required: bool,
}

impl ParameterSchema {
    pub fn new(name: impl Into<String>, param_type: ParamType, description: impl Into<String>) -> Self {
        let description = description.into();
        Self {
            name: name.into(),
            param_type,
            description: (!description.is_empty()).then_some(description),
            required: true,
        }
    }

    pub fn string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParamType::Scalar(Primitive::String), description)
    }

    pub fn integer(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParamType::Scalar(Primitive::Integer), description)
    }

    pub fn number(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParamType::Scalar(Primitive::Number), description)
    }

    pub fn boolean(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParamType::Scalar(Primitive::Boolean), description)
    }

    pub fn array(name: impl Into<String>, items: Primitive, description: impl Into<String>) -> Self {
        Self::new(name, ParamType::Array(items), description)
    }

    /// Mark the parameter as optional
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    fn property(&self) -> Value {
        let mut prop = match self.param_type {
            ParamType::Scalar(p) => json!({ "type": p.as_str() }),
            ParamType::Array(p) => json!({ "type": "array", "items": { "type": p.as_str() } }),
        };
        if let Some(desc) = &self.description {
            prop["description"] = Value::String(desc.clone());
        }
        prop
    }
}

/// Build the JSON-schema object for a parameter list:
/// `{type: "object", properties: {...}, required: [...]}`.
pub fn object_schema(params: &[ParameterSchema]) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for param in params {
        properties.insert(param.name.clone(), param.property());
        if param.required {
            required.push(Value::String(param.name.clone()));
        }
    }
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// Tool handler - implement to add new capabilities
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Execute the tool with already-parsed JSON arguments
    async fn call(&self, args: Value) -> Result<String, ToolError>;
}

/// Typed handler: decodes the arguments into `A`, then runs `f`.
pub struct FunctionTool<A, F> {
    f: F,
    _args: PhantomData<fn(A)>,
}

impl<A, F> FunctionTool<A, F> {
    pub const fn new(f: F) -> Self {
        Self {
            f,
            _args: PhantomData,
        }
    }
}

#[async_trait]
impl<A, F, Fut, E> ToolHandler for FunctionTool<A, F>
where
    A: DeserializeOwned + Send + 'static,
    F: Fn(A) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, E>> + Send,
    E: Display + Send,
{
    async fn call(&self, args: Value) -> Result<String, ToolError> {
        let args: A = serde_json::from_value(args)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
        (self.f)(args).await.map_err(|e| ToolError::Failed(e.to_string()))
    }
}

/// A named, described, callable tool
#[derive(Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    /// JSON-schema object; remote tools pass their provider's schema through
    pub parameters: Value,
    pub handler: Arc<dyn ToolHandler>,
}

impl std::fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
        handler: Arc<dyn ToolHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            handler,
        }
    }

    /// Tool backed by a typed `(A) -> Result<String, E>` function
    pub fn function<A, F, Fut, E>(
        name: impl Into<String>,
        description: impl Into<String>,
        params: &[ParameterSchema],
        f: F,
    ) -> Self
    where
        A: DeserializeOwned + Send + 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        Self::new(
            name,
            description,
            object_schema(params),
            Arc::new(FunctionTool::new(f)),
        )
    }

    /// Tool run for its effect; `Ok(())` is reported as [`SUCCESS`]
    pub fn effect<A, F, Fut, E>(
        name: impl Into<String>,
        description: impl Into<String>,
        params: &[ParameterSchema],
        f: F,
    ) -> Self
    where
        A: DeserializeOwned + Send + 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        Self::function(name, description, params, move |args: A| {
            let fut = f(args);
            async move { fut.await.map(|()| SUCCESS.to_string()) }
        })
    }

    /// Model-facing description without the handler
    pub fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.parameters.clone(),
        }
    }
}

/// Name → handler registry that performs the untyped-to-typed bridge
#[derive(Clone, Default, Debug)]
pub struct Dispatcher {
    tools: BTreeMap<String, ToolDescriptor>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool; an existing name is never overwritten
    pub fn register(&mut self, tool: ToolDescriptor) -> Result<(), RegistryError> {
        if tool.name.trim().is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.tools.contains_key(&tool.name) {
            return Err(RegistryError::DuplicateTool(tool.name));
        }
        self.tools.insert(tool.name.clone(), tool);
        Ok(())
    }

    /// Register several tools, stopping at the first collision
    pub fn register_all(
        &mut self,
        tools: impl IntoIterator<Item = ToolDescriptor>,
    ) -> Result<(), RegistryError> {
        tools.into_iter().try_for_each(|tool| self.register(tool))
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Decode `raw_args` and invoke the named tool
    pub async fn dispatch(&self, name: &str, raw_args: &str) -> Result<String, DispatchError> {
        let tool = self
            .get(name)
            .ok_or_else(|| DispatchError::UnknownTool(name.to_string()))?;

        let args = parse_arguments(raw_args).map_err(|e| DispatchError::Decode {
            tool: name.to_string(),
            message: e.to_string(),
        })?;

        tool.handler
            .call(args)
            .await
            .map_err(|e| DispatchError::from_tool(name, e))
    }

    /// All tool specs, ordered by name
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.values().map(ToolDescriptor::spec).collect()
    }

    /// All descriptors, ordered by name
    pub fn descriptors(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.values()
    }

    /// Get tool names
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Parse a raw argument payload. Models send `""` for argument-less calls.
pub(crate) fn parse_arguments(raw: &str) -> serde_json::Result<Value> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_str(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct EchoArgs {
        text: String,
    }

    #[derive(Deserialize)]
    struct RepeatArgs {
        word: String,
        times: usize,
    }

    fn echo_tool() -> ToolDescriptor {
        ToolDescriptor::function(
            "echo",
            "Echo the text back",
            &[ParameterSchema::string("text", "Text to echo")],
            |args: EchoArgs| async move { Ok::<_, String>(args.text) },
        )
    }

    fn failing_tool() -> ToolDescriptor {
        ToolDescriptor::function(
            "explode",
            "Always fails",
            &[],
            |_: Value| async move { Err::<String, _>("kaboom") },
        )
    }

    fn noop_tool() -> ToolDescriptor {
        ToolDescriptor::effect(
            "noop",
            "Does nothing",
            &[],
            |_: Value| async move { Ok::<(), String>(()) },
        )
    }

    fn registry() -> Dispatcher {
        let mut dispatcher = Dispatcher::new();
        dispatcher
            .register_all([echo_tool(), failing_tool(), noop_tool()])
            .unwrap();
        dispatcher
    }

    #[test]
    fn test_object_schema() {
        let schema = object_schema(&[
            ParameterSchema::string("agent_name", "Who to ask"),
            ParameterSchema::integer("count", "").optional(),
            ParameterSchema::array("steps", Primitive::String, "The steps"),
        ]);

        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["agent_name"]["type"], "string");
        assert_eq!(schema["properties"]["agent_name"]["description"], "Who to ask");
        assert!(schema["properties"]["count"].get("description").is_none());
        assert_eq!(schema["properties"]["steps"]["type"], "array");
        assert_eq!(schema["properties"]["steps"]["items"]["type"], "string");
        assert_eq!(schema["required"], json!(["agent_name", "steps"]));
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut dispatcher = registry();
        let err = dispatcher.register(echo_tool()).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateTool("echo".into()));
        assert_eq!(dispatcher.len(), 3);
    }

    #[tokio::test]
    async fn test_unknown_tool_independent_of_payload() {
        let dispatcher = registry();
        for payload in ["{}", "not json", "", r#"{"text":"hi"}"#] {
            let err = dispatcher.dispatch("missing", payload).await.unwrap_err();
            assert_eq!(err, DispatchError::UnknownTool("missing".into()));
        }
    }

    #[tokio::test]
    async fn test_valid_arguments_round_trip() {
        let dispatcher = registry();
        let out = dispatcher.dispatch("echo", r#"{"text":"X"}"#).await.unwrap();
        assert_eq!(out, "X");
    }

    #[tokio::test]
    async fn test_malformed_json_is_decode_error() {
        let dispatcher = registry();
        let err = dispatcher.dispatch("echo", "{text:").await.unwrap_err();
        assert!(matches!(err, DispatchError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_shape_mismatch_is_decode_error() {
        let mut dispatcher = Dispatcher::new();
        dispatcher
            .register(ToolDescriptor::function(
                "repeat",
                "Repeat a word",
                &[
                    ParameterSchema::string("word", "Word"),
                    ParameterSchema::integer("times", "Count"),
                ],
                |args: RepeatArgs| async move { Ok::<_, String>(args.word.repeat(args.times)) },
            ))
            .unwrap();

        let err = dispatcher
            .dispatch("repeat", r#"{"word":"a","times":"three"}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Decode { ref tool, .. } if tool == "repeat"));

        let out = dispatcher
            .dispatch("repeat", r#"{"word":"ab","times":3}"#)
            .await
            .unwrap();
        assert_eq!(out, "ababab");
    }

    #[tokio::test]
    async fn test_handler_error_is_distinct_from_decode() {
        let dispatcher = registry();
        let err = dispatcher.dispatch("explode", "{}").await.unwrap_err();
        assert_eq!(
            err,
            DispatchError::Handler {
                tool: "explode".into(),
                message: "kaboom".into()
            }
        );
    }

    #[tokio::test]
    async fn test_effect_handler_yields_success() {
        let dispatcher = registry();
        assert_eq!(dispatcher.dispatch("noop", "").await.unwrap(), SUCCESS);
    }

    #[test]
    fn test_specs_are_sorted_and_handler_free() {
        let specs = registry().specs();
        let names: Vec<_> = specs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["echo", "explode", "noop"]);
        assert_eq!(specs[0].parameters["required"], json!(["text"]));
    }
}

//! Builtin Tools
//!
//! Tools every agent gets: workspace file access and summarization. The
//! orchestrator additionally gets `CreatePlan`.

use std::fmt::Write as _;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

use crate::agent::Agent;
use crate::message::Message;
use crate::provider::{CompletionProvider, GenerationOptions};
use crate::tool::{ParameterSchema, Primitive, ToolDescriptor};

pub const WRITE_TO_FILE_TOOL: &str = "WriteToFile";
pub const READ_FROM_FILE_TOOL: &str = "ReadFromFile";
pub const SUMMARIZE_TOOL: &str = "Summarize";
pub const CREATE_PLAN_TOOL: &str = "CreatePlan";

/// Default workspace directory, relative to the working directory
pub const DEFAULT_WORKSPACE: &str = "workspace";

pub const PLAN_FILE: &str = "plan.txt";

const SUMMARIZER_PROMPT: &str = "You are a helpful assistant that summarizes text concisely.";

#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error("invalid filename '{0}': must be a relative path inside the workspace")]
    InvalidPath(String),

    #[error("file not found: {0}")]
    NotFound(String),

    #[error("failed to {action} {filename}: {source}")]
    Io {
        action: &'static str,
        filename: String,
        #[source]
        source: std::io::Error,
    },
}

/// Directory the file tools are confined to
#[derive(Clone, Debug)]
pub struct Workspace {
    root: PathBuf,
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new(DEFAULT_WORKSPACE)
    }
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a model-supplied filename to a path under the root
    pub fn resolve(&self, filename: &str) -> Result<PathBuf, WorkspaceError> {
        let relative = Path::new(filename);
        let confined = !filename.trim().is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !confined {
            return Err(WorkspaceError::InvalidPath(filename.to_string()));
        }
        Ok(self.root.join(relative))
    }

    pub async fn write(&self, filename: &str, content: &str) -> Result<(), WorkspaceError> {
        let path = self.resolve(filename)?;
        let io_err = |action: &'static str| {
            move |source: std::io::Error| WorkspaceError::Io {
                action,
                filename: filename.to_string(),
                source,
            }
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(io_err("create directory for"))?;
        }
        tokio::fs::write(&path, content).await.map_err(io_err("write"))
    }

    pub async fn read(&self, filename: &str) -> Result<String, WorkspaceError> {
        let path = self.resolve(filename)?;
        tokio::fs::read_to_string(&path).await.map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                WorkspaceError::NotFound(filename.to_string())
            } else {
                WorkspaceError::Io {
                    action: "read",
                    filename: filename.to_string(),
                    source,
                }
            }
        })
    }
}

#[derive(Debug, Deserialize)]
struct WriteArgs {
    filename: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ReadArgs {
    filename: String,
}

#[derive(Debug, Deserialize)]
struct SummarizeArgs {
    text: String,
}

#[derive(Debug, Deserialize)]
pub struct PlanArgs {
    pub steps: Vec<String>,
}

pub fn write_to_file_tool(workspace: Arc<Workspace>) -> ToolDescriptor {
    ToolDescriptor::function(
        WRITE_TO_FILE_TOOL,
        "Write content to a file in the workspace",
        &[
            ParameterSchema::string("filename", "The name of the file to write to"),
            ParameterSchema::string("content", "The content to write to the file"),
        ],
        move |args: WriteArgs| {
            let workspace = Arc::clone(&workspace);
            async move {
                workspace.write(&args.filename, &args.content).await?;
                Ok::<_, WorkspaceError>(format!("Successfully wrote to {}", args.filename))
            }
        },
    )
}

pub fn read_from_file_tool(workspace: Arc<Workspace>) -> ToolDescriptor {
    ToolDescriptor::function(
        READ_FROM_FILE_TOOL,
        "Read the content of a file in the workspace",
        &[ParameterSchema::string("filename", "The name of the file to read")],
        move |args: ReadArgs| {
            let workspace = Arc::clone(&workspace);
            async move { workspace.read(&args.filename).await }
        },
    )
}

/// Render a numbered plan
pub fn format_plan(steps: &[String]) -> String {
    let mut plan = String::from("Current Plan:\n");
    for (i, step) in steps.iter().enumerate() {
        let _ = writeln!(plan, "{}. {step}", i + 1);
    }
    plan
}

pub fn create_plan_tool(workspace: Arc<Workspace>) -> ToolDescriptor {
    ToolDescriptor::function(
        CREATE_PLAN_TOOL,
        "Define the plan of execution.",
        &[ParameterSchema::array(
            "steps",
            Primitive::String,
            "The list of steps for the plan",
        )],
        move |args: PlanArgs| {
            let workspace = Arc::clone(&workspace);
            async move {
                workspace
                    .write(PLAN_FILE, &format_plan(&args.steps))
                    .await
                    .map_err(|e| format!("failed to save plan: {e}"))?;
                Ok::<_, String>(format!(
                    "Plan created with {} steps and saved to {PLAN_FILE}.",
                    args.steps.len()
                ))
            }
        },
    )
}

/// Summarize through a fresh one-shot agent sharing `provider`
pub fn summarize_tool(
    provider: Arc<dyn CompletionProvider>,
    options: GenerationOptions,
) -> ToolDescriptor {
    ToolDescriptor::function(
        SUMMARIZE_TOOL,
        "Summarize a piece of text",
        &[ParameterSchema::string("text", "The text to summarize")],
        move |args: SummarizeArgs| {
            let provider = Arc::clone(&provider);
            let options = options.clone();
            async move {
                let mut summarizer = Agent::builder()
                    .name("Summarizer")
                    .provider(provider)
                    .options(options)
                    .system_message(SUMMARIZER_PROMPT)
                    .build()?;
                let reply = summarizer
                    .generate([Message::user(format!(
                        "Please summarize the following text:\n\n{}",
                        args.text
                    ))])
                    .await?;
                Ok::<_, crate::error::AgentError>(reply.content)
            }
        },
    )
}

/// `WriteToFile`, `ReadFromFile` and `Summarize`
pub fn standard_tools(
    workspace: &Arc<Workspace>,
    provider: Arc<dyn CompletionProvider>,
    options: GenerationOptions,
) -> Vec<ToolDescriptor> {
    vec![
        write_to_file_tool(Arc::clone(workspace)),
        read_from_file_tool(Arc::clone(workspace)),
        summarize_tool(provider, options),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DispatchError;
    use crate::testing::ScriptedProvider;
    use crate::tool::Dispatcher;
    use serde_json::json;

    fn dispatcher(workspace: &Arc<Workspace>) -> Dispatcher {
        let provider = ScriptedProvider::new(vec![Message::assistant("short")]);
        let mut dispatcher = Dispatcher::new();
        dispatcher
            .register_all(standard_tools(workspace, provider, GenerationOptions::default()))
            .unwrap();
        dispatcher.register(create_plan_tool(Arc::clone(workspace))).unwrap();
        dispatcher
    }

    #[test]
    fn test_resolve_rejects_escapes() {
        let ws = Workspace::new("/tmp/ws");
        assert!(ws.resolve("notes/a.txt").is_ok());
        assert!(ws.resolve("./a.txt").is_ok());
        assert!(ws.resolve("../secret").is_err());
        assert!(ws.resolve("a/../../b").is_err());
        assert!(ws.resolve("/etc/passwd").is_err());
        assert!(ws.resolve("").is_err());
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Arc::new(Workspace::new(dir.path().join("workspace")));
        let tools = dispatcher(&ws);

        let out = tools
            .dispatch(
                WRITE_TO_FILE_TOOL,
                &json!({"filename": "notes/a.txt", "content": "hello"}).to_string(),
            )
            .await
            .unwrap();
        assert_eq!(out, "Successfully wrote to notes/a.txt");

        let out = tools
            .dispatch(READ_FROM_FILE_TOOL, r#"{"filename":"notes/a.txt"}"#)
            .await
            .unwrap();
        assert_eq!(out, "hello");
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Arc::new(Workspace::new(dir.path()));
        let err = dispatcher(&ws)
            .dispatch(READ_FROM_FILE_TOOL, r#"{"filename":"nope.txt"}"#)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            DispatchError::Handler {
                tool: READ_FROM_FILE_TOOL.into(),
                message: "file not found: nope.txt".into()
            }
        );
    }

    #[tokio::test]
    async fn test_create_plan_writes_numbered_steps() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Arc::new(Workspace::new(dir.path()));
        let out = dispatcher(&ws)
            .dispatch(CREATE_PLAN_TOOL, r#"{"steps":["research","write"]}"#)
            .await
            .unwrap();
        assert_eq!(out, "Plan created with 2 steps and saved to plan.txt.");

        let plan = std::fs::read_to_string(dir.path().join(PLAN_FILE)).unwrap();
        assert_eq!(plan, "Current Plan:\n1. research\n2. write\n");
    }

    #[tokio::test]
    async fn test_summarize_uses_fresh_agent() {
        let provider = ScriptedProvider::new(vec![Message::assistant("tl;dr")]);
        let mut tools = Dispatcher::new();
        tools
            .register(summarize_tool(provider.clone(), GenerationOptions::default()))
            .unwrap();

        let out = tools
            .dispatch(SUMMARIZE_TOOL, r#"{"text":"a very long text"}"#)
            .await
            .unwrap();
        assert_eq!(out, "tl;dr");

        let seen = provider.requests();
        assert_eq!(seen[0].messages.len(), 2);
        assert_eq!(seen[0].messages[0].content, SUMMARIZER_PROMPT);
        assert!(seen[0].messages[1].content.ends_with("a very long text"));
    }
}

//! Orchestrated Conversation
//!
//! One orchestrator agent drives a bounded number of turns. It can delegate
//! tasks to named workers (`DelegateTask`), write a plan (`CreatePlan`) and
//! end the conversation (`Finish`). Every tool call the orchestrator makes is
//! answered with a tool message, errors included, before the next turn.
//!
//! ```text
//!            ┌──────────────┐  no tool calls   ┌──────────────┐
//!   run() ──►│ Running(n)   │─────────────────►│ Running(n+1) │
//!            └──────┬───────┘                  └──────────────┘
//!                   │ tool calls
//!            ┌──────▼────────────────────┐ Finish  ┌──────────────────┐
//!            │ AwaitingToolResolution(n) │────────►│ Finished(result) │
//!            └───────────────────────────┘         └──────────────────┘
//!   generation failure / turn budget exhausted ──► Aborted(reason)
//! ```

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::agent::{Agent, AgentRole};
use crate::builtin::{Workspace, create_plan_tool};
use crate::error::{AgentError, ConversationError, DispatchError, Result, ToolError};
use crate::message::{Message, ToolCall};
use crate::observe::{Event, Observer, TracingObserver};
use crate::tool::{ParameterSchema, ToolDescriptor, ToolHandler, object_schema, parse_arguments};

pub const DELEGATE_TOOL: &str = "DelegateTask";
pub const FINISH_TOOL: &str = "Finish";

pub const DEFAULT_MAX_TURNS: usize = 20;

/// Tool-call rounds a worker may run per delegated task
pub const DEFAULT_WORKER_MAX_STEPS: usize = 10;

const FINISHED_REPLY: &str = "Conversation finished.";

#[derive(Debug, Clone, Deserialize)]
pub struct DelegateArgs {
    pub agent_name: String,
    pub instructions: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FinishArgs {
    pub result: String,
}

/// Where a conversation is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationState {
    /// Turn `turn` is generating
    Running { turn: usize },
    /// Tool calls of turn `turn` are being answered
    AwaitingToolResolution { turn: usize },
    Finished { result: String },
    Aborted { reason: String },
}

impl ConversationState {
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished { .. } | Self::Aborted { .. })
    }
}

/// Why a `DelegateTask` call failed
#[derive(Error, Debug)]
pub enum DelegateError {
    #[error("agent '{name}' not found. Available agents: {available}")]
    UnknownAgent { name: String, available: String },

    #[error("cannot delegate to the orchestrator")]
    SelfDelegation,

    #[error("worker failed: {0}")]
    Worker(#[source] AgentError),
}

/// Handler registered for names the conversation resolves itself. It only
/// runs if the orchestrator's dispatcher is used directly.
struct ReservedTool;

#[async_trait]
impl ToolHandler for ReservedTool {
    async fn call(&self, _args: Value) -> std::result::Result<String, ToolError> {
        Err(ToolError::Failed(
            "only available inside a running conversation".into(),
        ))
    }
}

fn reserved_tools() -> [ToolDescriptor; 2] {
    let handler: Arc<dyn ToolHandler> = Arc::new(ReservedTool);
    [
        ToolDescriptor::new(
            DELEGATE_TOOL,
            "Delegate a task to a worker agent. Returns the worker's output.",
            object_schema(&[
                ParameterSchema::string("agent_name", "The name of the agent to delegate to"),
                ParameterSchema::string("instructions", "The task instructions for the agent"),
            ]),
            Arc::clone(&handler),
        ),
        ToolDescriptor::new(
            FINISH_TOOL,
            "Call this when the objective is met.",
            object_schema(&[ParameterSchema::string(
                "result",
                "The final result of the conversation",
            )]),
            handler,
        ),
    ]
}

fn decode_args<T: DeserializeOwned>(tool: &str, raw: &str) -> std::result::Result<T, DispatchError> {
    parse_arguments(raw)
        .and_then(serde_json::from_value)
        .map_err(|e| DispatchError::Decode {
            tool: tool.to_string(),
            message: e.to_string(),
        })
}

/// A bounded multi-agent conversation
pub struct Conversation {
    id: Uuid,
    orchestrator: Agent,
    workers: BTreeMap<String, Agent>,
    max_turns: usize,
    worker_max_steps: usize,
    turn: usize,
    state: ConversationState,
    finish_result: Option<String>,
    started: bool,
    observer: Arc<dyn Observer>,
}

impl std::fmt::Debug for Conversation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conversation")
            .field("id", &self.id)
            .field("orchestrator", &self.orchestrator.name())
            .field("workers", &self.workers.keys().collect::<Vec<_>>())
            .field("max_turns", &self.max_turns)
            .field("turn", &self.turn)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Conversation {
    /// Build a conversation whose plan is written to the default workspace
    pub fn new(agents: Vec<Agent>) -> std::result::Result<Self, ConversationError> {
        Self::with_workspace(agents, Arc::new(Workspace::default()))
    }

    pub fn with_workspace(
        agents: Vec<Agent>,
        workspace: Arc<Workspace>,
    ) -> std::result::Result<Self, ConversationError> {
        let mut seen = HashSet::new();
        for agent in &agents {
            if !seen.insert(agent.name()) {
                return Err(ConversationError::DuplicateAgent(agent.name().to_string()));
            }
        }

        let mut orchestrators = agents
            .iter()
            .filter(|a| a.role() == AgentRole::Orchestrator)
            .map(Agent::name);
        let first = orchestrators.next().map(str::to_string);
        if let Some(second) = orchestrators.next() {
            return Err(ConversationError::MultipleOrchestrators {
                first: first.unwrap_or_default(),
                second: second.to_string(),
            });
        }
        if first.is_none() {
            return Err(ConversationError::NoOrchestrator);
        }
        if agents.len() < 2 {
            return Err(ConversationError::TooFewAgents);
        }

        let mut orchestrator = None;
        let mut workers = BTreeMap::new();
        for agent in agents {
            match agent.role() {
                AgentRole::Orchestrator => orchestrator = Some(agent),
                AgentRole::Worker => {
                    workers.insert(agent.name().to_string(), agent);
                }
            }
        }
        let mut orchestrator = orchestrator.ok_or(ConversationError::NoOrchestrator)?;

        let tools = orchestrator.tools_mut();
        tools.register_all(reserved_tools())?;
        tools.register(create_plan_tool(workspace))?;

        Ok(Self {
            id: Uuid::new_v4(),
            orchestrator,
            workers,
            max_turns: DEFAULT_MAX_TURNS,
            worker_max_steps: DEFAULT_WORKER_MAX_STEPS,
            turn: 0,
            state: ConversationState::Running { turn: 0 },
            finish_result: None,
            started: false,
            observer: Arc::new(TracingObserver),
        })
    }

    /// Set the turn budget
    pub fn with_max_turns(mut self, max_turns: usize) -> std::result::Result<Self, ConversationError> {
        if max_turns == 0 {
            return Err(ConversationError::ZeroTurnBudget);
        }
        self.max_turns = max_turns;
        Ok(self)
    }

    #[must_use]
    pub fn with_worker_max_steps(mut self, steps: usize) -> Self {
        self.worker_max_steps = steps;
        self
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    /// Drive the conversation until `Finish` is called or the turn budget
    /// runs out.
    ///
    /// A finished conversation returns its result again without generating.
    pub async fn run(&mut self, objective: &str) -> Result<String> {
        match &self.state {
            ConversationState::Finished { result } => return Ok(result.clone()),
            ConversationState::Aborted { reason } => {
                return Err(AgentError::Aborted(reason.clone()));
            }
            _ => {}
        }

        if !self.started {
            self.orchestrator
                .add_user_message(format!("Objective: {objective}"));
            self.started = true;
        }

        let conversation = self.id.to_string();
        loop {
            if let Some(result) = self.finish_result.clone() {
                self.observer.on_event(&Event::Finished { turns: self.turn });
                self.state = ConversationState::Finished {
                    result: result.clone(),
                };
                return Ok(result);
            }
            if self.turn >= self.max_turns {
                break;
            }

            self.turn += 1;
            let turn = self.turn;
            self.state = ConversationState::Running { turn };
            self.observer.on_event(&Event::TurnStarted {
                conversation: &conversation,
                turn,
            });

            let reply = match self.orchestrator.generate(std::iter::empty()).await {
                Ok(reply) => reply,
                Err(e) => {
                    self.abort(format!("orchestrator generation failed: {e}"));
                    return Err(e);
                }
            };

            // Plain text never ends the conversation; only Finish does.
            if !reply.has_tool_calls() {
                continue;
            }

            self.state = ConversationState::AwaitingToolResolution { turn };
            for call in &reply.tool_calls {
                let content = self.resolve_call(call).await;
                self.orchestrator.add_tool_result(&call.id, content);
            }
        }

        self.abort("max turns reached".to_string());
        Err(AgentError::MaxTurns(self.max_turns))
    }

    /// Answer one orchestrator tool call; errors become `Error: ...` text
    async fn resolve_call(&mut self, call: &ToolCall) -> String {
        let outcome = match call.name.as_str() {
            DELEGATE_TOOL => match decode_args::<DelegateArgs>(DELEGATE_TOOL, &call.arguments) {
                Ok(args) => self.delegate_task(args).await.map_err(|e| DispatchError::Handler {
                    tool: DELEGATE_TOOL.to_string(),
                    message: e.to_string(),
                }),
                Err(e) => Err(e),
            },
            FINISH_TOOL => decode_args::<FinishArgs>(FINISH_TOOL, &call.arguments).map(|args| {
                self.finish(args.result);
                FINISHED_REPLY.to_string()
            }),
            name => self.orchestrator.tools().dispatch(name, &call.arguments).await,
        };

        report(self.observer.as_ref(), self.orchestrator.name(), call, outcome)
    }

    /// Hand `instructions` to a worker and return its final reply.
    ///
    /// The worker keeps its history across delegations.
    pub async fn delegate_task(&mut self, args: DelegateArgs) -> std::result::Result<String, DelegateError> {
        if args.agent_name == self.orchestrator.name() {
            return Err(DelegateError::SelfDelegation);
        }
        let available = self.worker_names().join(", ");
        let worker = self
            .workers
            .get_mut(&args.agent_name)
            .ok_or_else(|| DelegateError::UnknownAgent {
                name: args.agent_name.clone(),
                available,
            })?;

        self.observer.on_event(&Event::Delegated {
            worker: &args.agent_name,
        });
        run_worker(
            worker,
            &args.instructions,
            self.worker_max_steps,
            self.observer.as_ref(),
        )
        .await
        .map_err(DelegateError::Worker)
    }

    /// Record the final result. Only the first call takes effect.
    pub fn finish(&mut self, result: impl Into<String>) -> bool {
        if self.finish_result.is_some() {
            return false;
        }
        self.finish_result = Some(result.into());
        true
    }

    fn abort(&mut self, reason: String) {
        self.observer.on_event(&Event::Aborted { reason: &reason });
        self.state = ConversationState::Aborted { reason };
    }

    pub const fn id(&self) -> Uuid {
        self.id
    }

    pub const fn state(&self) -> &ConversationState {
        &self.state
    }

    /// Turns started so far
    pub const fn turn(&self) -> usize {
        self.turn
    }

    pub const fn max_turns(&self) -> usize {
        self.max_turns
    }

    pub const fn orchestrator(&self) -> &Agent {
        &self.orchestrator
    }

    pub fn worker(&self, name: &str) -> Option<&Agent> {
        self.workers.get(name)
    }

    /// Worker names, sorted
    pub fn worker_names(&self) -> Vec<&str> {
        self.workers.keys().map(String::as_str).collect()
    }
}

/// Run one delegated task, resolving the worker's own tool calls
async fn run_worker(
    worker: &mut Agent,
    instructions: &str,
    max_steps: usize,
    observer: &dyn Observer,
) -> Result<String> {
    let mut reply = worker
        .generate([Message::user(format!("Task: {instructions}"))])
        .await?;

    let mut steps = 0;
    while reply.has_tool_calls() {
        if steps == max_steps {
            // leave no call unanswered in the worker's history
            for call in &reply.tool_calls {
                worker.add_tool_result(&call.id, "Error: tool step limit reached");
            }
            break;
        }
        steps += 1;

        for call in &reply.tool_calls {
            let outcome = worker.tools().dispatch(&call.name, &call.arguments).await;
            let content = report(observer, worker.name(), call, outcome);
            worker.add_tool_result(&call.id, content);
        }
        reply = worker.generate(std::iter::empty()).await?;
    }

    Ok(reply.content)
}

fn report(
    observer: &dyn Observer,
    agent: &str,
    call: &ToolCall,
    outcome: std::result::Result<String, DispatchError>,
) -> String {
    match outcome {
        Ok(text) => {
            observer.on_event(&Event::ToolCompleted {
                agent,
                tool: &call.name,
                call_id: &call.id,
            });
            text
        }
        Err(e) => {
            let error = e.to_string();
            observer.on_event(&Event::ToolFailed {
                agent,
                tool: &call.name,
                call_id: &call.id,
                kind: e.kind(),
                error: &error,
            });
            format!("Error: {error}")
        }
    }
}

//! In-memory doubles for unit tests

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use crate::error::{AgentError, Result};
use crate::message::{Message, ToolCall};
use crate::observe::{Event, Observer};
use crate::provider::{Completion, CompletionProvider, CompletionRequest};

/// What a provider saw on one call
#[derive(Clone, Debug)]
pub struct SeenRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub tools: Vec<String>,
}

enum Script {
    Queue(VecDeque<Message>),
    Repeat(Message),
}

/// Completion provider that replays canned assistant messages
pub struct ScriptedProvider {
    script: Mutex<Script>,
    seen: Mutex<Vec<SeenRequest>>,
}

impl ScriptedProvider {
    /// Reply with `replies` in order, then fail
    pub fn new(replies: Vec<Message>) -> Arc<Self> {
        Self::with_script(Script::Queue(replies.into()))
    }

    /// Reply with `reply` forever
    pub fn repeating(reply: Message) -> Arc<Self> {
        Self::with_script(Script::Repeat(reply))
    }

    fn with_script(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn requests(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<Completion> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SeenRequest {
                model: request.options.model.clone(),
                messages: request.messages.to_vec(),
                tools: request.tools.iter().map(|t| t.name.clone()).collect(),
            });

        let reply = match &mut *self.script.lock().unwrap_or_else(PoisonError::into_inner) {
            Script::Queue(queue) => queue.pop_front(),
            Script::Repeat(message) => Some(message.clone()),
        };
        reply
            .map(|message| Completion::new(message, request.options.model.clone()))
            .ok_or_else(|| AgentError::Provider("script exhausted".into()))
    }
}

/// Assistant message carrying a single tool call
pub fn call(id: &str, tool: &str, arguments: serde_json::Value) -> Message {
    Message::assistant_with_tools("", vec![ToolCall::new(id, tool, arguments.to_string())])
}

/// Observer that keeps rendered events
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<String>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Observer for RecordingObserver {
    fn on_event(&self, event: &Event<'_>) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.to_string());
    }
}

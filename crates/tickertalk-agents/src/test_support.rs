//! Test support: scripted models and stub sub-agents.
//!
//! `ScriptedModel` replays a fixed list of replies, one per model call, and
//! records every request it saw. Streamed replies are split after each space
//! so callers observe more than one chunk.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream;
use tickertalk_models::session_schema::DEFAULT_CHECKPOINT_NAMESPACE;
use tickertalk_store::{ChatArchive, SessionStore};

use crate::error::AgentError;
use crate::model::{ChatModel, ModelRequest, TextStream};
use crate::subagent::SubAgent;
use crate::supervisor::Supervisor;
use crate::turn::ChatContext;

/// One scripted model call.
#[derive(Debug, Clone)]
pub enum Step {
    Reply(String),
    /// The call itself fails.
    Fail(String),
    /// Streaming yields these chunks, then an error. `complete` just fails.
    BrokenStream(Vec<String>),
}

#[derive(Default)]
pub struct ScriptedModel {
    steps: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedModel {
    pub fn new<'a>(replies: impl IntoIterator<Item = &'a str>) -> Self {
        Self::from_steps(replies.into_iter().map(|r| Step::Reply(r.to_string())))
    }

    pub fn from_steps(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A model with nothing scripted: every call fails.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn next_step(&self, request: &ModelRequest) -> Step {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        self.steps
            .lock()
            .ok()
            .and_then(|mut steps| steps.pop_front())
            .unwrap_or_else(|| Step::Fail("script exhausted".to_string()))
    }
}

fn chunks(text: &str) -> Vec<String> {
    text.split_inclusive(' ').map(str::to_string).collect()
}

#[async_trait]
impl ChatModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &ModelRequest) -> Result<String, AgentError> {
        match self.next_step(request) {
            Step::Reply(text) => Ok(text),
            Step::Fail(message) => Err(AgentError::Cli(message)),
            Step::BrokenStream(_) => Err(AgentError::Stream("scripted stream break".to_string())),
        }
    }

    async fn stream(&self, request: &ModelRequest) -> Result<TextStream, AgentError> {
        let items: Vec<Result<String, AgentError>> = match self.next_step(request) {
            Step::Reply(text) => chunks(&text).into_iter().map(Ok).collect(),
            Step::Fail(message) => return Err(AgentError::Cli(message)),
            Step::BrokenStream(prefix) => prefix
                .into_iter()
                .map(Ok)
                .chain(std::iter::once(Err(AgentError::Stream(
                    "scripted stream break".to_string(),
                ))))
                .collect(),
        };
        Ok(Box::pin(stream::iter(items)))
    }
}

/// A sub-agent returning a fixed reply and recording its requests.
pub struct StubAgent {
    name: String,
    reply: Option<String>,
    requests: Mutex<Vec<String>>,
}

impl StubAgent {
    pub fn new(name: &str, reply: &str) -> Self {
        Self {
            name: name.to_string(),
            reply: Some(reply.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(name: &str) -> Self {
        Self {
            name: name.to_string(),
            reply: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl SubAgent for StubAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, request: &str, _user_name: &str) -> Result<String, AgentError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.to_string());
        }
        self.reply
            .clone()
            .ok_or_else(|| AgentError::Cli("Mock failure".to_string()))
    }
}

/// A chat context over an in-memory archive.
pub fn in_memory_context(
    supervisor_model: Arc<dyn ChatModel>,
    collector: Arc<dyn SubAgent>,
    analyst: Arc<dyn SubAgent>,
    max_tool_calls: usize,
) -> Result<Arc<ChatContext>, AgentError> {
    let store = SessionStore::open_in_memory()?;
    let archive = ChatArchive::new(store, 100, std::time::Duration::from_secs(60));
    Ok(Arc::new(ChatContext {
        archive: Arc::new(archive),
        supervisor: Arc::new(Supervisor::new(
            supervisor_model,
            collector,
            analyst,
            max_tool_calls,
        )),
        checkpoint_namespace: DEFAULT_CHECKPOINT_NAMESPACE.to_string(),
    }))
}

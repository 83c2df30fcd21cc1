use async_trait::async_trait;
use futures::stream::{self, BoxStream};
use tickertalk_models::Message;
use tracing::info;

use crate::error::AgentError;

/// Incremental model output, in arrival order.
pub type TextStream = BoxStream<'static, Result<String, AgentError>>;

/// One model invocation: a system prompt plus the conversation it sees.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub system_prompt: String,
    pub messages: Vec<Message>,
}

impl ModelRequest {
    pub fn new(system_prompt: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            messages,
        }
    }

    /// A request carrying a single user message.
    pub fn single(system_prompt: impl Into<String>, user_text: &str) -> Self {
        Self::new(system_prompt, vec![Message::user(user_text)])
    }
}

/// The language-model boundary. Mockable for testing.
#[async_trait]
pub trait ChatModel: Send + Sync {
    fn name(&self) -> &str;

    /// Run the model to completion and return its full reply.
    async fn complete(&self, request: &ModelRequest) -> Result<String, AgentError>;

    /// Run the model and yield its reply incrementally.
    ///
    /// The default buffers the whole reply and yields it as one chunk.
    async fn stream(&self, request: &ModelRequest) -> Result<TextStream, AgentError> {
        let text = self.complete(request).await?;
        Ok(Box::pin(stream::once(async move { Ok(text) })))
    }
}

/// `complete` bracketed by the before/after lifecycle log lines.
pub async fn complete_logged(
    model: &dyn ChatModel,
    agent: &str,
    user_name: &str,
    request: &ModelRequest,
) -> Result<String, AgentError> {
    info!(agent, model = model.name(), user_name, "Processing request for user");
    let result = model.complete(request).await;
    info!(agent, user_name, ok = result.is_ok(), "Completed request for user");
    result
}

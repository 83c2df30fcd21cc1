use std::sync::Arc;
use std::time::Instant;

use tickertalk_models::{ConversationState, Message};
use tracing::{debug, info, warn};

use crate::error::AgentError;
use crate::model::{complete_logged, ChatModel, ModelRequest, TextStream};
use crate::parser::parse_decision;
use crate::prompts::{for_user, supervisor_decision_prompt, supervisor_reply_prompt};
use crate::retention::{post_turn_trim, pre_turn_trim};
use crate::subagent::SubAgent;

/// The supervisor's next step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    CallCollector { request: String },
    CallAnalyst { request: String },
    RespondDirectly,
}

/// Routes a conversation to the collector and analyst, then writes the reply.
///
/// Every supervisor model call is bracketed by the retention hooks: the
/// pre-turn trim runs before it and the post-turn trim after it.
pub struct Supervisor {
    model: Arc<dyn ChatModel>,
    collector: Arc<dyn SubAgent>,
    analyst: Arc<dyn SubAgent>,
    max_tool_calls: usize,
}

impl Supervisor {
    pub fn new(
        model: Arc<dyn ChatModel>,
        collector: Arc<dyn SubAgent>,
        analyst: Arc<dyn SubAgent>,
        max_tool_calls: usize,
    ) -> Self {
        Self {
            model,
            collector,
            analyst,
            max_tool_calls,
        }
    }

    pub fn max_tool_calls(&self) -> usize {
        self.max_tool_calls
    }

    /// Pre-turn retention hook.
    pub fn before_model(conversation: &mut ConversationState) {
        if let Some(ops) = pre_turn_trim(conversation) {
            debug!(before = conversation.len(), "Pre-turn trim");
            conversation.apply(ops);
        }
    }

    /// Post-turn retention hook.
    pub fn after_model(conversation: &mut ConversationState) {
        if let Some(ops) = post_turn_trim(conversation) {
            debug!(before = conversation.len(), "Post-turn trim");
            conversation.apply(ops);
        }
    }

    /// Ask the model for the next step.
    pub async fn decide(
        &self,
        conversation: &mut ConversationState,
        user_name: &str,
    ) -> Result<Decision, AgentError> {
        Self::before_model(conversation);

        let request = ModelRequest::new(
            for_user(&supervisor_decision_prompt(), user_name),
            conversation.messages().to_vec(),
        );
        let raw = complete_logged(self.model.as_ref(), "supervisor", user_name, &request).await?;

        Self::after_model(conversation);
        Ok(parse_decision(&raw))
    }

    /// Run sub-agents until the model decides to respond or the tool-call
    /// limit is hit. Each sub-agent reply is appended to the conversation.
    /// Returns the number of sub-agent calls made.
    pub async fn route(
        &self,
        conversation: &mut ConversationState,
        user_name: &str,
    ) -> Result<usize, AgentError> {
        let mut calls = 0;
        while calls < self.max_tool_calls {
            let (agent, request) = match self.decide(conversation, user_name).await? {
                Decision::RespondDirectly => return Ok(calls),
                Decision::CallCollector { request } => (&self.collector, request),
                Decision::CallAnalyst { request } => (&self.analyst, request),
            };
            self.delegate(agent.as_ref(), &request, conversation, user_name)
                .await;
            calls += 1;
        }

        info!(calls, "Tool call limit reached, responding directly");
        Ok(calls)
    }

    /// Sub-agent failures are reported into the conversation, not propagated.
    async fn delegate(
        &self,
        agent: &dyn SubAgent,
        request: &str,
        conversation: &mut ConversationState,
        user_name: &str,
    ) {
        let start = Instant::now();
        let text = match agent.invoke(request, user_name).await {
            Ok(text) => {
                info!(agent = agent.name(), elapsed_ms = start.elapsed().as_millis(), "Agent succeeded");
                text
            }
            Err(e) => {
                warn!(agent = agent.name(), error = %e, elapsed_ms = start.elapsed().as_millis(), "Agent failed");
                format!("Agent failed: {e}")
            }
        };
        conversation.push(Message::assistant(format!("[{}] {text}", agent.name())));
    }

    /// Start streaming the user-facing reply.
    ///
    /// The caller appends the finished reply and applies [`Supervisor::after_model`].
    pub async fn respond(
        &self,
        conversation: &mut ConversationState,
        user_name: &str,
    ) -> Result<TextStream, AgentError> {
        Self::before_model(conversation);

        let request = ModelRequest::new(
            for_user(&supervisor_reply_prompt(), user_name),
            conversation.messages().to_vec(),
        );
        info!(agent = "supervisor", model = self.model.name(), user_name, "Processing request for user");
        self.model.stream(&request).await
    }
}

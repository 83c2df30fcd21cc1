use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, BoxStream, StreamExt};
use tickertalk_models::{ConversationState, Message};
use tickertalk_store::ChatArchive;
use tracing::{error, info, warn};

use crate::error::AgentError;
use crate::model::TextStream;
use crate::supervisor::Supervisor;

/// Shared resources a chat turn needs, built once per process.
pub struct ChatContext {
    pub archive: Arc<ChatArchive>,
    pub supervisor: Arc<Supervisor>,
    pub checkpoint_namespace: String,
}

/// One user request: route, stream the reply, persist.
pub struct ChatTurn {
    ctx: Arc<ChatContext>,
    input_text: String,
    user_name: String,
    session_id: String,
}

impl ChatTurn {
    pub fn new(
        ctx: Arc<ChatContext>,
        input_text: impl Into<String>,
        user_name: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            ctx,
            input_text: input_text.into(),
            user_name: user_name.into(),
            session_id: session_id.into(),
        }
    }

    /// The reply as a lazy stream of text chunks.
    ///
    /// Nothing runs until the first poll. Once the model stream is exhausted
    /// the conversation is checkpointed and the exchange persisted, exactly
    /// once. Dropping the stream early, or a model error, skips both.
    pub fn into_stream(self) -> BoxStream<'static, Result<String, AgentError>> {
        Box::pin(stream::unfold(Phase::Pending(self), step))
    }

    async fn begin(self) -> Result<ActiveTurn, AgentError> {
        info!(session_id = %self.session_id, user_name = %self.user_name, "Chat turn started");

        let mut conversation = match self
            .ctx
            .archive
            .load_checkpoint(&self.session_id, &self.ctx.checkpoint_namespace)
        {
            Ok(state) => state.unwrap_or_default(),
            Err(e) => {
                warn!(session_id = %self.session_id, error = %e, "Checkpoint unavailable, starting fresh");
                ConversationState::new()
            }
        };
        conversation.push(Message::user(self.input_text.as_str()));

        let supervisor = Arc::clone(&self.ctx.supervisor);
        let calls = supervisor.route(&mut conversation, &self.user_name).await?;
        let reply = supervisor.respond(&mut conversation, &self.user_name).await?;
        info!(session_id = %self.session_id, tool_calls = calls, "Streaming reply");

        Ok(ActiveTurn {
            turn: self,
            conversation,
            reply,
            answer: String::new(),
        })
    }
}

struct ActiveTurn {
    turn: ChatTurn,
    conversation: ConversationState,
    reply: TextStream,
    answer: String,
}

impl ActiveTurn {
    async fn finish(mut self) {
        let turn = &self.turn;
        info!(agent = "supervisor", user_name = %turn.user_name, "Completed request for user");

        self.conversation.push(Message::assistant(self.answer.as_str()));
        Supervisor::after_model(&mut self.conversation);

        if let Err(e) = turn.ctx.archive.save_checkpoint(
            &turn.session_id,
            &turn.ctx.checkpoint_namespace,
            &self.conversation,
        ) {
            error!(session_id = %turn.session_id, error = %e, "Error saving checkpoint");
        }

        turn.ctx
            .archive
            .record_exchange(
                &turn.session_id,
                &turn.user_name,
                &turn.input_text,
                &self.answer,
                Utc::now(),
            )
            .await;
    }
}

enum Phase {
    Pending(ChatTurn),
    Streaming(Box<ActiveTurn>),
    Done,
}

async fn step(mut phase: Phase) -> Option<(Result<String, AgentError>, Phase)> {
    loop {
        phase = match phase {
            Phase::Pending(turn) => match turn.begin().await {
                Ok(active) => Phase::Streaming(Box::new(active)),
                Err(e) => {
                    error!(error = %e, "Chat turn failed");
                    return Some((Err(e), Phase::Done));
                }
            },
            Phase::Streaming(mut active) => {
                let next = active.reply.next().await;
                match next {
                    Some(Ok(chunk)) if chunk.is_empty() => Phase::Streaming(active),
                    Some(Ok(chunk)) => {
                        active.answer.push_str(&chunk);
                        return Some((Ok(chunk), Phase::Streaming(active)));
                    }
                    Some(Err(e)) => {
                        warn!(session_id = %active.turn.session_id, error = %e, "Reply stream failed, not persisting");
                        return Some((Err(e), Phase::Done));
                    }
                    None => {
                        active.finish().await;
                        return None;
                    }
                }
            }
            Phase::Done => return None,
        };
    }
}

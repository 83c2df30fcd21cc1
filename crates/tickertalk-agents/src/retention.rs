//! Message-retention hooks.
//!
//! Two independent, stateless policies bound the conversation a model sees.
//! Neither mutates anything: each returns the ops to apply, or `None` when
//! the conversation is left as is.

use tickertalk_models::{ConversationState, MessageOp};

/// Before a model call: keep the first message plus a short tail.
///
/// With more than 3 messages the whole history is replaced by
/// `[first] + tail`, where the tail is the last 3 messages for an even count
/// and the last 4 for an odd count.
pub fn pre_turn_trim(state: &ConversationState) -> Option<Vec<MessageOp>> {
    let messages = state.messages();
    if messages.len() <= 3 {
        return None;
    }

    let tail = if messages.len() % 2 == 0 { 3 } else { 4 };
    let mut ops = Vec::with_capacity(tail + 2);
    ops.push(MessageOp::RemoveAll);
    ops.push(MessageOp::Add(messages[0].clone()));
    ops.extend(
        messages[messages.len() - tail..]
            .iter()
            .cloned()
            .map(MessageOp::Add),
    );
    Some(ops)
}

/// After a model call: drop the two oldest messages once there are more than 2.
pub fn post_turn_trim(state: &ConversationState) -> Option<Vec<MessageOp>> {
    let messages = state.messages();
    if messages.len() <= 2 {
        return None;
    }
    Some(
        messages[..2]
            .iter()
            .map(|m| MessageOp::Remove(m.id))
            .collect(),
    )
}

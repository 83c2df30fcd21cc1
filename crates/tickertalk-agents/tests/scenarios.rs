//! End-to-end chat turns with scripted models.
//!
//! Each test builds an in-memory archive and a supervisor whose model
//! replays a fixed script, then drives `ChatTurn::into_stream()` the way the
//! front-end does and checks what was streamed, checkpointed and persisted.

use std::sync::Arc;

use chrono::Utc;
use futures::StreamExt;
use tickertalk_agents::test_support::{in_memory_context, ScriptedModel, Step, StubAgent};
use tickertalk_agents::{ChatContext, ChatTurn};
use tickertalk_models::{date_bucket, Role};

const TRENDING: &str = r#"{"status":"success","data":{"trending_stocks":{"top_gainers":[{"company_name":"Tata Consultancy Services"}]}}}"#;

struct Harness {
    ctx: Arc<ChatContext>,
    model: Arc<ScriptedModel>,
    collector: Arc<StubAgent>,
}

fn harness(steps: Vec<Step>) -> Harness {
    let model = Arc::new(ScriptedModel::from_steps(steps));
    let collector = Arc::new(StubAgent::new("collect_market_data", TRENDING));
    let analyst = Arc::new(StubAgent::new("analyze_market_data", "Momentum is positive."));
    let ctx = in_memory_context(model.clone(), collector.clone(), analyst, 4).unwrap();
    Harness {
        ctx,
        model,
        collector,
    }
}

fn reply(text: &str) -> Step {
    Step::Reply(text.to_string())
}

#[tokio::test]
async fn show_trending_stocks() {
    let h = harness(vec![
        reply(r#"{"action": "collect_market_data", "request": "Show trending stocks"}"#),
        reply(r#"{"action": "respond"}"#),
        reply("Alice, today's top gainer is Tata Consultancy Services."),
    ]);

    let chunks: Vec<String> = ChatTurn::new(h.ctx.clone(), "Show trending stocks", "Alice", "s1")
        .into_stream()
        .map(|c| c.unwrap())
        .collect()
        .await;

    let answer = chunks.concat();
    assert!(chunks.len() > 1);
    assert_eq!(answer, "Alice, today's top gainer is Tata Consultancy Services.");
    assert_eq!(h.collector.requests(), vec!["Show trending stocks".to_string()]);

    // The reply call saw the question and the collector's envelope.
    let requests = h.model.requests();
    assert_eq!(requests.len(), 3);
    let reply_request = &requests[2];
    assert_eq!(reply_request.messages[0].content, "Show trending stocks");
    assert!(reply_request.messages[1]
        .content
        .starts_with("[collect_market_data] {\"status\":\"success\""));

    let session = h.ctx.archive.load_session("s1").unwrap().unwrap();
    assert_eq!(session.user_name, "Alice");
    assert_eq!(session.exchange_count(), 1);
    let today = &session.messages[&date_bucket(Utc::now())];
    assert_eq!(today[0].prompt, "Show trending stocks");
    assert_eq!(today[0].answer, answer);

    let history = h.ctx.archive.history("s1").await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].role, Role::Assistant);
}

#[tokio::test]
async fn checkpoint_carries_into_next_turn() {
    let h = harness(vec![
        reply(r#"{"action": "respond"}"#),
        reply("Hello Alice."),
        reply(r#"{"action": "respond"}"#),
        reply("Still here, Alice."),
    ]);

    let first: Vec<_> = ChatTurn::new(h.ctx.clone(), "Hi", "Alice", "s1")
        .into_stream()
        .collect()
        .await;
    assert!(first.iter().all(|c| c.is_ok()));

    let checkpoint = h
        .ctx
        .archive
        .load_checkpoint("s1", "chat")
        .unwrap()
        .unwrap();
    let contents: Vec<&str> = checkpoint.messages().iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["Hi", "Hello Alice."]);

    let _: Vec<_> = ChatTurn::new(h.ctx.clone(), "Still there?", "Alice", "s1")
        .into_stream()
        .collect()
        .await;

    let requests = h.model.requests();
    let second_decision: Vec<&str> = requests[2].messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(second_decision, vec!["Hi", "Hello Alice.", "Still there?"]);

    let session = h.ctx.archive.load_session("s1").unwrap().unwrap();
    assert_eq!(session.exchange_count(), 2);
}

#[tokio::test]
async fn stream_is_lazy() {
    let h = harness(vec![reply(r#"{"action": "respond"}"#), reply("Hi.")]);

    let stream = ChatTurn::new(h.ctx.clone(), "Hi", "Alice", "s1").into_stream();
    assert!(h.model.requests().is_empty());
    drop(stream);

    assert!(h.model.requests().is_empty());
    assert!(h.ctx.archive.load_session("s1").unwrap().is_none());
}

#[tokio::test]
async fn dropped_stream_skips_persistence() {
    let h = harness(vec![
        reply(r#"{"action": "respond"}"#),
        reply("A long answer that the user never finishes reading."),
    ]);

    let mut stream = ChatTurn::new(h.ctx.clone(), "Tell me everything", "Alice", "s1").into_stream();
    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first, "A ");
    drop(stream);

    assert!(h.ctx.archive.load_session("s1").unwrap().is_none());
    assert!(h.ctx.archive.load_checkpoint("s1", "chat").unwrap().is_none());
}

#[tokio::test]
async fn model_stream_error_surfaces_and_skips_persistence() {
    let h = harness(vec![
        reply(r#"{"action": "respond"}"#),
        Step::BrokenStream(vec!["Partial ".to_string(), "answer ".to_string()]),
    ]);

    let items: Vec<_> = ChatTurn::new(h.ctx.clone(), "Hi", "Alice", "s1")
        .into_stream()
        .collect()
        .await;

    assert_eq!(items.len(), 3);
    assert!(items[0].is_ok());
    assert!(items[1].is_ok());
    assert!(items[2].is_err());
    assert!(h.ctx.archive.load_session("s1").unwrap().is_none());
}

#[tokio::test]
async fn decision_failure_is_single_error_item() {
    let h = harness(vec![Step::Fail("model unavailable".to_string())]);

    let items: Vec<_> = ChatTurn::new(h.ctx.clone(), "Hi", "Alice", "s1")
        .into_stream()
        .collect()
        .await;

    assert_eq!(items.len(), 1);
    let err = items[0].as_ref().unwrap_err();
    assert!(err.to_string().contains("model unavailable"));
    assert!(h.ctx.archive.load_session("s1").unwrap().is_none());
}

#[tokio::test]
async fn sessions_are_isolated() {
    let h = harness(vec![
        reply(r#"{"action": "respond"}"#),
        reply("Hello Alice."),
        reply(r#"{"action": "respond"}"#),
        reply("Hello Bob."),
    ]);

    let _: Vec<_> = ChatTurn::new(h.ctx.clone(), "Hi", "Alice", "s1").into_stream().collect().await;
    let _: Vec<_> = ChatTurn::new(h.ctx.clone(), "Hi", "Bob", "s2").into_stream().collect().await;

    // The second session's first decision saw only its own message.
    let requests = h.model.requests();
    assert_eq!(requests[2].messages.len(), 1);

    let sessions = h.ctx.archive.list_sessions().unwrap();
    assert_eq!(sessions.len(), 2);
    let bob = h.ctx.archive.load_session("s2").unwrap().unwrap();
    assert_eq!(bob.user_name, "Bob");
}

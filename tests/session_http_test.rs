//! Integration tests for chat sessions over HTTP
//!
//! These tests drive a `ChatSession` against a mock server:
//! 1. History load and the opening greeting
//! 2. Multi-step turns with tool calls and world changes
//! 3. The continuation cap
//! 4. Design chat clearing

use async_trait::async_trait;
use mockito::{Matcher, Server};
use serde_json::json;
use serial_test::serial;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use world_chat_client::chat::{ActionDescriptor, SessionContext, WorldStatus};
use world_chat_client::error::GENERIC_FAILURE_MESSAGE;
use world_chat_client::{
    CharacterChatCalls, ChatPhase, ChatSession, ClientConfig, DesignChatCalls, HttpTransport,
    TurnError, WorldReconciler,
};

const THREAD: &str = "/api/worlds/w1/characters/c1/thread";
const ACTION: &str = "/api/worlds/w1/characters/c1/action";

fn config(server: &Server) -> ClientConfig {
    let mut config = ClientConfig::default();
    config.server.base_url = server.url();
    config.server.auth_key = "test-key".to_string();
    config
}

fn character_session(server: &Server) -> ChatSession<CharacterChatCalls> {
    let config = config(server);
    let transport = HttpTransport::new(&config).unwrap();
    ChatSession::new(
        Arc::new(CharacterChatCalls::new(transport)),
        SessionContext::new("w1", "c1"),
        &config.turn,
    )
}

#[derive(Default)]
struct CountingReconciler {
    count: AtomicUsize,
}

#[async_trait]
impl WorldReconciler for CountingReconciler {
    async fn reconcile(&self, _context: &SessionContext, _status: &WorldStatus) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
#[serial]
async fn test_character_greeting_then_tool_turn() {
    let mut server = Server::new_async().await;
    let history = server
        .mock("GET", THREAD)
        .match_header("authorization", "Bearer test-key")
        .with_status(200)
        .with_body(r#"{"history_response": {"messages": [], "chat_enabled": true}}"#)
        .create_async()
        .await;
    let greeting = server
        .mock("POST", THREAD)
        .match_body(Matcher::Json(json!({"command": "start", "user": ""})))
        .with_status(200)
        .with_body(r#"{"chat_response": {"id": "g1", "done": true, "reply": "Welcome!"}}"#)
        .create_async()
        .await;
    let start = server
        .mock("POST", THREAD)
        .match_body(Matcher::Json(json!({"command": "start", "user": "hello"})))
        .with_status(200)
        .with_body(
            r#"{"chat_response": {"id": "t1", "done": false, "tool_call": "lookup"},
                "world_status": {"changed": true, "response_message": "The guard waves"}}"#,
        )
        .create_async()
        .await;
    let cont = server
        .mock("POST", THREAD)
        .match_body(Matcher::Json(json!({"command": "continue", "id": "t1"})))
        .with_status(200)
        .with_body(r#"{"chat_response": {"id": "t1", "done": true, "user": "hello", "reply": "Hi there"}}"#)
        .create_async()
        .await;

    let reconciler = Arc::new(CountingReconciler::default());
    let session = character_session(&server).with_reconciler(reconciler.clone());

    let opening = session.load_history().await.unwrap();
    assert!(opening.unwrap().is_completed());

    let outcome = session.submit("hello").await.unwrap();
    assert!(outcome.is_completed());

    history.assert_async().await;
    greeting.assert_async().await;
    start.assert_async().await;
    cont.assert_async().await;

    let state = session.snapshot().await;
    assert_eq!(state.phase, ChatPhase::Ready);
    assert_eq!(state.history().len(), 2);
    assert_eq!(state.history()[0].reply, "Welcome!");
    assert_eq!(state.history()[1].user, "hello");
    assert_eq!(state.history()[1].reply, "Hi there");
    assert_eq!(state.history()[1].tool_call_log, vec!["lookup"]);
    assert_eq!(state.status_message, "The guard waves");
    assert_eq!(reconciler.count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
#[serial]
async fn test_action_turn_over_action_endpoint() {
    let mut server = Server::new_async().await;
    let start = server
        .mock("POST", ACTION)
        .match_body(Matcher::Json(
            json!({"command": "start", "action": "use", "item": "lamp"}),
        ))
        .with_status(200)
        .with_body(r#"{"chat_response": {"id": "a1", "done": false}}"#)
        .create_async()
        .await;
    let cont = server
        .mock("POST", ACTION)
        .match_body(Matcher::Json(json!({"command": "continue", "id": "a1"})))
        .with_status(200)
        .with_body(
            r#"{"chat_response": {"id": "a1", "done": true, "event": "You light the lamp",
                "reply": "Thank you", "chat_enabled": false}}"#,
        )
        .create_async()
        .await;

    let session = character_session(&server);
    let outcome = session
        .submit_action(ActionDescriptor::use_item("lamp"))
        .await
        .unwrap();

    start.assert_async().await;
    cont.assert_async().await;
    assert!(outcome.is_completed());
    let state = session.snapshot().await;
    assert_eq!(state.phase, ChatPhase::Disabled);
    assert_eq!(state.history()[0].event, "You light the lamp");
}

#[tokio::test]
#[serial]
async fn test_never_done_turn_stops_at_cap() {
    let mut server = Server::new_async().await;
    let start = server
        .mock("POST", THREAD)
        .match_body(Matcher::Json(json!({"command": "start", "user": "x"})))
        .with_status(200)
        .with_body(r#"{"chat_response": {"id": "t2", "done": false}}"#)
        .create_async()
        .await;
    let cont = server
        .mock("POST", THREAD)
        .match_body(Matcher::Json(json!({"command": "continue", "id": "t2"})))
        .with_status(200)
        .with_body(r#"{"chat_response": {"id": "t2", "done": false}}"#)
        .expect(20)
        .create_async()
        .await;

    let session = character_session(&server);
    let outcome = session.submit("x").await.unwrap();

    start.assert_async().await;
    cont.assert_async().await;
    assert!(matches!(
        outcome.error(),
        Some(TurnError::ProtocolExceeded { limit: 20, .. })
    ));
    let state = session.snapshot().await;
    assert_eq!(state.phase, ChatPhase::Ready);
    assert_eq!(state.live.user, "x");
    assert_eq!(state.live.error, GENERIC_FAILURE_MESSAGE);
}

#[tokio::test]
#[serial]
async fn test_server_error_keeps_input_for_retry() {
    let mut server = Server::new_async().await;
    let start = server
        .mock("POST", THREAD)
        .with_status(500)
        .with_body("internal error")
        .create_async()
        .await;

    let session = character_session(&server);
    let outcome = session.submit("hello").await.unwrap();

    start.assert_async().await;
    assert!(matches!(outcome.error(), Some(TurnError::Transport(_))));
    let state = session.snapshot().await;
    assert_eq!(state.live.user, "hello");
    assert!(state.history().is_empty());
}

#[tokio::test]
#[serial]
async fn test_design_chat_clear() {
    let mut server = Server::new_async().await;
    let history = server
        .mock("GET", "/api/design_chat")
        .with_status(200)
        .with_body(
            r#"{"history_response": {"messages": [{"id": "d0", "user": "make a world", "reply": "Done"}]}}"#,
        )
        .create_async()
        .await;
    let clear = server
        .mock("POST", "/api/design_chat")
        .match_body(Matcher::Json(json!({"command": "clear"})))
        .with_status(200)
        .with_body(r#"{"status": "ok"}"#)
        .create_async()
        .await;

    let config = config(&server);
    let session = ChatSession::new(
        Arc::new(DesignChatCalls::new(HttpTransport::new(&config).unwrap())),
        SessionContext::new("", ""),
        &config.turn,
    );

    assert!(session.load_history().await.unwrap().is_none());
    assert_eq!(session.snapshot().await.history().len(), 1);

    session.clear().await.unwrap();

    history.assert_async().await;
    clear.assert_async().await;
    let state = session.snapshot().await;
    assert!(state.history().is_empty());
    assert_eq!(state.phase, ChatPhase::Ready);
}

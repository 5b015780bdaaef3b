//! HTTP API tests
//!
//! Runs the full router (session layer included) in-process with axum-test.
//! Cookies are saved between requests so each `TestServer` behaves like one
//! browser.

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum_test::TestServer;
use common::mocks::{EchoMemoryService, MockLLMClient};
use memchat::api::routes::create_app;
use memchat::memory::{KeywordGate, MemoryStore};
use memchat::types::{ChatResponse, MessageRole, SessionResponse};
use memchat::utils::toml_config::{ConfigManager, MemchatConfig};
use memchat::AppState;
use serde_json::json;
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

// ============= Test Fixtures =============

const TEST_CONFIG: &str = r#"
[session]
welcome = "Hi! Tell me your name to get started."

[chat]
provider = "groq"

[memory]
backend = "local"

[providers.groq]
type = "openai"
api_key_env = "MEMCHAT_API_TEST_KEY"
default_model = "moonshotai/kimi-k2-instruct"

[personas.chef]
name = "Chef"
system_prompt = "You are a friendly chef. Only discuss cooking."
welcome = "What are we cooking today?"

[personas.coach]
system_prompt = "You are a fitness coach."
"#;

struct TestApp {
    server: TestServer,
    llm: MockLLMClient,
    memory: Arc<EchoMemoryService>,
}

fn test_state(config: &str, llm: &MockLLMClient, memory: &Arc<EchoMemoryService>) -> AppState {
    let config: MemchatConfig = toml::from_str(config).expect("test config parses");
    AppState::new(
        Arc::new(ConfigManager::from_config(config)),
        Arc::new(llm.clone()),
        MemoryStore::new(memory.clone(), Arc::new(KeywordGate::new())),
    )
}

fn test_app_with_llm(config: &str, llm: MockLLMClient) -> TestApp {
    let memory = Arc::new(EchoMemoryService::new());

    let server = TestServer::builder()
        .save_cookies()
        .build(create_app(test_state(config, &llm, &memory)))
        .expect("Failed to create test server");

    TestApp {
        server,
        llm,
        memory,
    }
}

fn test_app_with(config: &str, reply: &str) -> TestApp {
    test_app_with_llm(config, MockLLMClient::new(reply))
}

fn test_app(reply: &str) -> TestApp {
    test_app_with(TEST_CONFIG, reply)
}

async fn connect(server: &TestServer, name: &str) {
    server
        .post("/api/session/connect")
        .json(&json!({ "name": name }))
        .await
        .assert_status_ok();
}

// ============= Health Check Tests =============

#[tokio::test]
async fn test_health_check() {
    let app = test_app("unused");

    let response = app.server.get("/health").await;
    response.assert_status_ok();
    response.assert_text("OK");
}

#[tokio::test]
async fn test_openapi_document() {
    let app = test_app("unused");

    let response = app.server.get("/api/openapi.json").await;
    response.assert_status_ok();
    let doc: serde_json::Value = response.json();
    assert!(doc["paths"]["/api/chat"].is_object());
    assert!(doc["paths"]["/api/session/persona"].is_object());
}

// ============= Session Tests =============

#[tokio::test]
async fn test_welcome_is_shown_once() {
    let app = test_app("unused");

    let first: SessionResponse = app.server.get("/api/session").await.json();
    assert_eq!(
        first.welcome.as_deref(),
        Some("Hi! Tell me your name to get started.")
    );
    assert!(first.user_id.is_none());

    let second: SessionResponse = app.server.get("/api/session").await.json();
    assert!(second.welcome.is_none());
}

#[tokio::test]
async fn test_connect_trims_name() {
    let app = test_app("unused");

    let response = app
        .server
        .post("/api/session/connect")
        .json(&json!({ "name": "  Alex  " }))
        .await;
    response.assert_status_ok();

    let body: SessionResponse = response.json();
    assert_eq!(body.user_id.as_deref(), Some("Alex"));
}

#[tokio::test]
async fn test_connect_blank_name_is_rejected() {
    let app = test_app("unused");

    let response = app
        .server
        .post("/api/session/connect")
        .json(&json!({ "name": "   " }))
        .await;
    response.assert_status_bad_request();
}

#[tokio::test]
async fn test_disconnect_clears_session() {
    let app = test_app("Hello!");
    connect(&app.server, "Alex").await;
    app.server
        .post("/api/chat")
        .json(&json!({ "message": "hi" }))
        .await
        .assert_status_ok();

    let body: SessionResponse = app.server.post("/api/session/disconnect").await.json();
    assert!(body.user_id.is_none());
    assert!(body.history.is_empty());

    app.server
        .post("/api/chat")
        .json(&json!({ "message": "hi" }))
        .await
        .assert_status_unauthorized();
}

// ============= Chat Tests =============

#[tokio::test]
async fn test_chat_requires_connection() {
    let app = test_app("unused");

    let response = app
        .server
        .post("/api/chat")
        .json(&json!({ "message": "hello" }))
        .await;

    response.assert_status_unauthorized();
    let body: serde_json::Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("Connect"));
    assert!(app.llm.calls().is_empty());
}

#[tokio::test]
async fn test_chat_remembers_and_recalls() {
    let app = test_app("Nice to meet you!");
    connect(&app.server, "Alex").await;

    let response = app
        .server
        .post("/api/chat")
        .json(&json!({ "message": "My name is Alex and I live in Lahore" }))
        .await;
    response.assert_status_ok();

    let body: ChatResponse = response.json();
    assert_eq!(body.response.as_deref(), Some("Nice to meet you!"));
    assert_eq!(body.user_id, "Alex");
    assert_eq!(body.memories_used.as_deref(), Some("None."));
    assert!(body.stored);
    assert_eq!(
        app.memory.stored("Alex"),
        vec!["My name is Alex and I live in Lahore".to_string()]
    );

    let body: ChatResponse = app
        .server
        .post("/api/chat")
        .json(&json!({ "message": "Where do I live?" }))
        .await
        .json();
    assert!(body.memories_used.unwrap().contains("Lahore"));
    assert!(!body.stored);

    let session: SessionResponse = app.server.get("/api/session").await.json();
    assert_eq!(session.history.len(), 4);
}

#[tokio::test]
async fn test_blank_message_is_skipped() {
    let app = test_app("unused");
    connect(&app.server, "Alex").await;

    let body: ChatResponse = app
        .server
        .post("/api/chat")
        .json(&json!({ "message": "   " }))
        .await
        .json();

    assert!(body.response.is_none());
    assert_eq!(body.user_id, "Alex");
    assert!(app.llm.calls().is_empty());
}

#[tokio::test]
async fn test_anonymous_default_user() {
    let config = TEST_CONFIG.replace(
        "[session]\n",
        "[session]\nrequire_identity = false\ndefault_user_id = \"guest\"\n",
    );
    let app = test_app_with(&config, "Hello, guest");

    let body: ChatResponse = app
        .server
        .post("/api/chat")
        .json(&json!({ "message": "I like tea" }))
        .await
        .json();

    assert_eq!(body.user_id, "guest");
    assert_eq!(app.memory.stored("guest"), vec!["I like tea".to_string()]);
}

#[tokio::test]
async fn test_completion_failure_is_bad_gateway() {
    let config: MemchatConfig = toml::from_str(TEST_CONFIG).unwrap();
    let state = AppState::new(
        Arc::new(ConfigManager::from_config(config)),
        Arc::new(MockLLMClient::failing()),
        MemoryStore::new(
            Arc::new(EchoMemoryService::new()),
            Arc::new(KeywordGate::new()),
        ),
    );
    let server = TestServer::builder()
        .save_cookies()
        .build(create_app(state))
        .unwrap();
    connect(&server, "Alex").await;

    let response = server
        .post("/api/chat")
        .json(&json!({ "message": "hello" }))
        .await;
    response.assert_status(axum::http::StatusCode::BAD_GATEWAY);

    let session: SessionResponse = server.get("/api/session").await.json();
    assert!(session.history.is_empty());
}

#[tokio::test]
async fn test_concurrent_turns_keep_both_exchanges() {
    let llm = MockLLMClient::new("Noted.").with_delay(Duration::from_millis(50));
    let app = test_app_with_llm(TEST_CONFIG, llm);
    connect(&app.server, "Alex").await;

    let first = app
        .server
        .post("/api/chat")
        .json(&json!({ "message": "I like tea" }));
    let second = app
        .server
        .post("/api/chat")
        .json(&json!({ "message": "I live in Lahore" }));
    let (first, second) = tokio::join!(first.into_future(), second.into_future());
    first.assert_status_ok();
    second.assert_status_ok();

    let session: SessionResponse = app.server.get("/api/session").await.json();
    assert_eq!(session.history.len(), 4);

    let mut users: Vec<&str> = session
        .history
        .iter()
        .filter(|m| m.role == MessageRole::User)
        .map(|m| m.content.as_str())
        .collect();
    users.sort_unstable();
    assert_eq!(users, vec!["I like tea", "I live in Lahore"]);

    // The second turn saw the first one's exchange in its prompt
    let calls = app.llm.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].len(), calls[0].len() + 2);
}

// ============= Streaming Tests =============

#[tokio::test]
async fn test_chat_stream_emits_deltas_then_done() {
    let app = test_app("You live in Lahore.");
    connect(&app.server, "Alex").await;

    let response = app
        .server
        .post("/api/chat/stream")
        .json(&json!({ "message": "Where do I live?" }))
        .await;
    response.assert_status_ok();

    let body = response.text();
    assert!(body.contains("event: delta"));
    assert!(body.contains(r#"{"text":"You l"}"#));
    assert!(body.contains("event: done"));
    assert!(body.find("event: delta") < body.find("event: done"));
    assert!(!body.contains("event: error"));

    let session: SessionResponse = app.server.get("/api/session").await.json();
    assert_eq!(session.history.len(), 2);
    assert_eq!(session.history[1].content, "You live in Lahore.");
}

#[tokio::test]
async fn test_chat_stream_without_user_reports_error_event() {
    let app = test_app("unused");

    let response = app
        .server
        .post("/api/chat/stream")
        .json(&json!({ "message": "hello" }))
        .await;
    response.assert_status_ok();

    let body = response.text();
    assert!(body.contains("event: error"));
    assert!(!body.contains("event: done"));
}

fn session_cookie(response: &axum::response::Response) -> String {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .expect("session cookie is set")
        .to_string()
}

#[tokio::test]
async fn test_stream_turn_is_saved_when_client_goes_away() {
    let llm = MockLLMClient::new("You live in Lahore.").with_delay(Duration::from_millis(50));
    let memory = Arc::new(EchoMemoryService::new());
    let app = create_app(test_state(TEST_CONFIG, &llm, &memory));

    let connected = app
        .clone()
        .oneshot(
            Request::post("/api/session/connect")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"name": "Alex"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(connected.status(), StatusCode::OK);
    let cookie = session_cookie(&connected);

    let streamed = app
        .clone()
        .oneshot(
            Request::post("/api/chat/stream")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::COOKIE, &cookie)
                .body(Body::from(r#"{"message": "I live in Lahore"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(streamed.status(), StatusCode::OK);
    // Hang up before a single event is read
    drop(streamed);

    let mut history = Vec::new();
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let response = app
            .clone()
            .oneshot(
                Request::get("/api/session")
                    .header(header::COOKIE, &cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let session: SessionResponse = serde_json::from_slice(&bytes).unwrap();
        history = session.history;
        if !history.is_empty() {
            break;
        }
    }

    assert_eq!(history.len(), 2);
    assert_eq!(history[1].content, "You live in Lahore.");
    assert_eq!(memory.stored("Alex"), vec!["I live in Lahore".to_string()]);
}

// ============= Persona Tests =============

#[tokio::test]
async fn test_list_personas() {
    let app = test_app("unused");

    let personas: serde_json::Value = app.server.get("/api/personas").await.json();
    assert_eq!(
        personas,
        json!([
            {"key": "chef", "name": "Chef"},
            {"key": "coach", "name": "coach"}
        ])
    );
}

#[tokio::test]
async fn test_persona_switch_and_back() {
    let app = test_app("Let's cook!");
    connect(&app.server, "Alex").await;

    let response = app
        .server
        .put("/api/session/persona")
        .json(&json!({ "persona": "chef" }))
        .await;
    response.assert_status_ok();
    let body: SessionResponse = response.json();
    assert_eq!(body.persona.as_deref(), Some("chef"));
    assert_eq!(body.welcome.as_deref(), Some("What are we cooking today?"));
    assert_eq!(body.history[0].role, MessageRole::System);

    app.server
        .post("/api/chat")
        .json(&json!({ "message": "What should I make tonight?" }))
        .await
        .assert_status_ok();
    let prompt = &app.llm.calls()[0];
    assert_eq!(prompt[0].content, "You are a friendly chef. Only discuss cooking.");

    let body: SessionResponse = app
        .server
        .put("/api/session/persona")
        .json(&json!({ "persona": null }))
        .await
        .json();
    assert!(body.persona.is_none());
    assert_eq!(body.history.len(), 2);
    assert_eq!(body.history[0].role, MessageRole::User);
}

#[tokio::test]
async fn test_unknown_persona_is_not_found() {
    let app = test_app("unused");
    connect(&app.server, "Alex").await;

    let response = app
        .server
        .put("/api/session/persona")
        .json(&json!({ "persona": "pirate" }))
        .await;
    response.assert_status_not_found();

    let session: SessionResponse = app.server.get("/api/session").await.json();
    assert!(session.persona.is_none());
}

// ============= Memory Listing Tests =============

#[tokio::test]
async fn test_memories_listing() {
    let app = test_app("unused");
    // The echo service only returns facts sharing a word with the listing query
    app.memory.seed("general user facts", "Alex");
    app.memory.seed("Lives in Lahore", "Alex");
    app.memory.seed("general user facts about Sam", "Sam");
    connect(&app.server, "Alex").await;

    let body: serde_json::Value = app.server.get("/api/memories").await.json();
    assert_eq!(body["user_id"], "Alex");
    assert_eq!(body["memories"], json!(["general user facts"]));
}

#[tokio::test]
async fn test_memories_require_connection() {
    let app = test_app("unused");
    app.server.get("/api/memories").await.assert_status_unauthorized();
}

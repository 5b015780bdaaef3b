use crate::api::handlers::{chat, memory, session};
use crate::api::ApiDoc;
use crate::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Json, Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tower_sessions::{MemoryStore as SessionStore, SessionManagerLayer};
use utoipa::OpenApi;

/// Largest accepted request body
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Routes mounted under `/api`. Session state travels in the session cookie,
/// so the session layer must wrap the router this is merged into.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/session", get(session::get_session))
        .route("/session/connect", post(session::connect))
        .route("/session/disconnect", post(session::disconnect))
        .route("/session/persona", put(session::set_persona))
        .route("/personas", get(session::list_personas))
        .route("/chat", post(chat::chat))
        .route("/chat/stream", post(chat::chat_stream))
        .route("/memories", get(memory::list_memories))
        .route("/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
}

async fn health() -> &'static str {
    "OK"
}

/// The complete application: health check, `/api` routes, in-memory
/// per-browser sessions, request tracing and CORS.
pub fn create_app(state: AppState) -> Router {
    let sessions = SessionManagerLayer::new(SessionStore::default())
        .with_name("memchat.sid")
        .with_secure(false);

    Router::new()
        .route("/health", get(health))
        .nest("/api", create_router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                )
                .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
                .layer(sessions),
        )
        .with_state(state)
}

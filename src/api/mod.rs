//! HTTP API Handlers and Routes
//!
//! This module provides the REST API layer for memchat, built on the Axum web framework.
//!
//! # Module Structure
//!
//! - [`api::handlers`](crate::api::handlers) - Request handlers for each endpoint
//! - [`api::routes`](crate::api::routes) - Route definitions and router configuration
//!
//! # API Endpoints
//!
//! ## Session (`/api/session`)
//! - `GET /api/session` - Current user, persona, history (and the welcome text, once)
//! - `POST /api/session/connect` - Connect under a display name
//! - `POST /api/session/disconnect` - Forget user, persona and history
//! - `PUT /api/session/persona` - Switch persona (`null` for memory mode)
//! - `GET /api/personas` - List configured personas
//!
//! ## Chat (`/api/chat`)
//! - `POST /api/chat` - Send a message and receive the full reply
//! - `POST /api/chat/stream` - Send a message and receive `delta`/`done`/`error` SSE events
//! - `GET /api/memories` - Facts remembered about the connected user
//!
//! ## Health
//! - `GET /health` - Health check endpoint
//!
//! # Sessions
//!
//! Each browser gets a cookie-keyed session holding its conversation. Nothing
//! is persisted across restarts except what the memory service remembers.
//!
//! # OpenAPI Documentation
//!
//! The OpenAPI document is served at `/api/openapi.json`.

/// Request and response handlers for all API endpoints.
pub mod handlers;
/// Router configuration and route definitions.
pub mod routes;

use crate::types::{
    ChatMessage, ChatRequest, ChatResponse, ConnectRequest, MemoriesResponse, MessageRole,
    PersonaInfo, PersonaRequest, SessionResponse,
};

#[derive(utoipa::OpenApi)]
#[openapi(
    info(title = "memchat", description = "Memory-augmented chat API"),
    paths(
        handlers::session::get_session,
        handlers::session::connect,
        handlers::session::disconnect,
        handlers::session::list_personas,
        handlers::session::set_persona,
        handlers::chat::chat,
        handlers::chat::chat_stream,
        handlers::memory::list_memories,
    ),
    components(schemas(
        ChatRequest,
        ChatResponse,
        ConnectRequest,
        PersonaRequest,
        SessionResponse,
        PersonaInfo,
        MemoriesResponse,
        ChatMessage,
        MessageRole,
    )),
    tags(
        (name = "session", description = "Identity and persona"),
        (name = "chat", description = "Chat turns"),
        (name = "memory", description = "Long-term memory")
    )
)]
pub struct ApiDoc;

use crate::{
    chat::{ChatSession, SessionGuard, SESSION_KEY},
    types::{
        AppError, ConnectRequest, PersonaInfo, PersonaRequest, Result, SessionResponse,
    },
    AppState,
};
use axum::{extract::State, Json};
use tower_sessions::Session;

/// Load the chat state for this browser, or a fresh one.
pub async fn load_chat_session(session: &Session) -> Result<ChatSession> {
    Ok(session
        .get::<ChatSession>(SESSION_KEY)
        .await?
        .unwrap_or_default())
}

/// Store the chat state and write it through to the session store.
pub async fn save_chat_session(session: &Session, chat: &ChatSession) -> Result<()> {
    session.insert(SESSION_KEY, chat).await?;
    session.save().await?;
    Ok(())
}

/// Take this browser's session lock, then load its chat state.
///
/// Keep the guard until the state has been saved. A session without an id
/// is written once first so there is a key to lock on.
pub async fn lock_chat_session(
    state: &AppState,
    session: &Session,
) -> Result<(SessionGuard, ChatSession)> {
    let id = match session.id() {
        Some(id) => id,
        None => {
            save_chat_session(session, &ChatSession::default()).await?;
            session
                .id()
                .ok_or_else(|| AppError::Internal("Session was not assigned an id".to_string()))?
        }
    };

    let guard = state.session_locks.acquire(&id.to_string()).await;
    let chat = load_chat_session(session).await?;
    Ok((guard, chat))
}

fn session_response(chat: &ChatSession, welcome: Option<String>) -> SessionResponse {
    SessionResponse {
        user_id: chat.user_id().map(str::to_string),
        persona: chat.persona().map(str::to_string),
        history: chat.history().to_vec(),
        welcome,
    }
}

/// Current session state. The configured welcome is included the first time only.
#[utoipa::path(
    get,
    path = "/api/session",
    responses(
        (status = 200, description = "Current session", body = SessionResponse)
    ),
    tag = "session"
)]
pub async fn get_session(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<SessionResponse>> {
    let (_guard, mut chat) = lock_chat_session(&state, &session).await?;

    let welcome = if chat.mark_welcome_shown() {
        let welcome = state.config_manager.config().session.welcome.clone();
        save_chat_session(&session, &chat).await?;
        welcome
    } else {
        None
    };

    Ok(Json(session_response(&chat, welcome)))
}

/// Connect under a display name, used as the memory partition key
#[utoipa::path(
    post,
    path = "/api/session/connect",
    request_body = ConnectRequest,
    responses(
        (status = 200, description = "Connected", body = SessionResponse),
        (status = 400, description = "Empty name")
    ),
    tag = "session"
)]
pub async fn connect(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<ConnectRequest>,
) -> Result<Json<SessionResponse>> {
    let (_guard, mut chat) = lock_chat_session(&state, &session).await?;
    let user_id = chat.connect(&payload.name)?.to_string();
    save_chat_session(&session, &chat).await?;

    tracing::info!(user_id = %user_id, "Session connected");
    Ok(Json(session_response(&chat, None)))
}

/// Forget the user, the persona and the conversation
#[utoipa::path(
    post,
    path = "/api/session/disconnect",
    responses(
        (status = 200, description = "Disconnected", body = SessionResponse)
    ),
    tag = "session"
)]
pub async fn disconnect(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<SessionResponse>> {
    let (_guard, mut chat) = lock_chat_session(&state, &session).await?;
    if let Some(user_id) = chat.user_id() {
        tracing::info!(user_id = %user_id, "Session disconnected");
    }
    chat.disconnect();
    save_chat_session(&session, &chat).await?;

    Ok(Json(session_response(&chat, None)))
}

/// List configured personas
#[utoipa::path(
    get,
    path = "/api/personas",
    responses(
        (status = 200, description = "Available personas", body = Vec<PersonaInfo>)
    ),
    tag = "session"
)]
pub async fn list_personas(State(state): State<AppState>) -> Json<Vec<PersonaInfo>> {
    let personas = state
        .personas()
        .list()
        .map(|p| PersonaInfo {
            key: p.key.clone(),
            name: p.name.clone(),
        })
        .collect();
    Json(personas)
}

/// Switch persona; `null` returns to memory-augmented chat
#[utoipa::path(
    put,
    path = "/api/session/persona",
    request_body = PersonaRequest,
    responses(
        (status = 200, description = "Persona switched", body = SessionResponse),
        (status = 404, description = "Unknown persona")
    ),
    tag = "session"
)]
pub async fn set_persona(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<PersonaRequest>,
) -> Result<Json<SessionResponse>> {
    let (_guard, mut chat) = lock_chat_session(&state, &session).await?;

    let welcome = match payload.persona.as_deref() {
        Some(key) => {
            let personas = state.personas();
            let persona = personas
                .get(key)
                .ok_or_else(|| AppError::NotFound(format!("Persona '{}' not found", key)))?;
            chat.set_persona(&persona.key, &persona.system_prompt);
            persona.welcome.clone()
        }
        None => {
            chat.clear_persona();
            None
        }
    };
    save_chat_session(&session, &chat).await?;

    Ok(Json(session_response(&chat, welcome)))
}

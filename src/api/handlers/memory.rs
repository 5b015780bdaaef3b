use super::session::load_chat_session;
use crate::{
    types::{AppError, MemoriesResponse, Result},
    AppState,
};
use axum::{extract::State, Json};
use tower_sessions::Session;

/// Everything broadly remembered about the current user
#[utoipa::path(
    get,
    path = "/api/memories",
    responses(
        (status = 200, description = "Remembered facts", body = MemoriesResponse),
        (status = 401, description = "No user connected")
    ),
    tag = "memory"
)]
pub async fn list_memories(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<MemoriesResponse>> {
    let chat = load_chat_session(&session).await?;
    let user_id = state
        .engine()
        .resolve_user(&chat)
        .ok_or_else(|| AppError::Session("Connect with a name first".to_string()))?;

    let memories = state.memory.list_facts(&user_id).await?;
    Ok(Json(MemoriesResponse { user_id, memories }))
}

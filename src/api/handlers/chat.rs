use super::session::{lock_chat_session, save_chat_session};
use crate::{
    chat::{ChatSession, TurnEngine, TurnOutcome},
    types::{AppError, ChatRequest, ChatResponse, Result},
    AppState,
};
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::mpsc;
use tower_sessions::Session;

fn to_response(outcome: TurnOutcome, engine: &TurnEngine, chat: &ChatSession) -> ChatResponse {
    match outcome {
        TurnOutcome::Ignored => ChatResponse {
            response: None,
            user_id: engine.resolve_user(chat).unwrap_or_default(),
            memories_used: None,
            stored: false,
            warnings: Vec::new(),
        },
        TurnOutcome::Completed(turn) => ChatResponse {
            response: Some(turn.reply),
            user_id: turn.user_id,
            memories_used: turn.memories_used,
            stored: turn.stored,
            warnings: turn.warnings,
        },
    }
}

/// Run one chat turn and return the full reply
#[utoipa::path(
    post,
    path = "/api/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Chat response", body = ChatResponse),
        (status = 401, description = "No user connected"),
        (status = 502, description = "Completion or memory service failed")
    ),
    tag = "chat"
)]
pub async fn chat(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>> {
    let (_guard, mut chat) = lock_chat_session(&state, &session).await?;
    let engine = state.engine();

    let outcome = engine.run_turn(&mut chat, &payload.message, None).await?;
    if matches!(outcome, TurnOutcome::Completed(_)) {
        save_chat_session(&session, &chat).await?;
    }

    Ok(Json(to_response(outcome, &engine, &chat)))
}

fn error_event(message: impl std::fmt::Display) -> Event {
    Event::default()
        .event("error")
        .data(serde_json::json!({ "error": message.to_string() }).to_string())
}

/// Run one chat turn, streaming the reply as server-sent events.
///
/// Emits `delta` events (`{"text": ...}`) while the reply arrives, then a
/// single `done` event carrying the [`ChatResponse`], or an `error` event.
/// The turn runs and is saved in its own task, so it still commits when the
/// client goes away mid-stream.
#[utoipa::path(
    post,
    path = "/api/chat/stream",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "SSE stream of delta, done and error events")
    ),
    tag = "chat"
)]
pub async fn chat_stream(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let (guard, mut chat) = lock_chat_session(&state, &session).await?;
    let engine = state.engine();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let turn = tokio::spawn(async move {
        let _guard = guard;
        let outcome = engine.run_turn(&mut chat, &payload.message, Some(&tx)).await?;
        drop(tx);

        if matches!(outcome, TurnOutcome::Completed(_)) {
            save_chat_session(&session, &chat).await?;
        }
        Ok::<_, AppError>(to_response(outcome, &engine, &chat))
    });

    let stream = async_stream::stream! {
        while let Some(delta) = rx.recv().await {
            let data = serde_json::json!({ "text": delta });
            yield Ok::<_, Infallible>(Event::default().event("delta").data(data.to_string()));
        }

        match turn.await {
            Ok(Ok(response)) => match serde_json::to_string(&response) {
                Ok(data) => yield Ok(Event::default().event("done").data(data)),
                Err(e) => yield Ok(error_event(AppError::Internal(e.to_string()))),
            },
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Streaming turn failed");
                yield Ok(error_event(e));
            }
            Err(e) => {
                tracing::error!(error = %e, "Streaming turn task panicked");
                yield Ok(error_event(AppError::Internal("Turn aborted".to_string())));
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}

//! Assistant chat endpoints.

use super::{lookup_session, resolve_session, AppError, AppState};
use crate::chat::{send_message, ChatError};
use crate::session::ChatMessage;
use axum::{
    extract::State,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Request body for POST /api/chat
#[derive(Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// Transcript (GET) or the messages appended by one turn (POST)
#[derive(Serialize)]
pub struct ChatResponse {
    pub messages: Vec<ChatMessage>,
}

pub(crate) fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/chat", get(get_transcript).post(post_message))
}

/// GET /api/chat
async fn get_transcript(State(state): State<Arc<AppState>>, jar: CookieJar) -> impl IntoResponse {
    let messages = match lookup_session(&state, &jar) {
        Some(session) => {
            let session = session.lock().await;
            session.chat_history().to_vec()
        }
        None => Vec::new(),
    };

    Json(ChatResponse { messages })
}

/// POST /api/chat
///
/// The session lock is held until the provider answers, so a second message
/// from the same session waits for this turn to finish.
async fn post_message(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(req): Json<ChatRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (jar, id, session) = resolve_session(&state, jar);
    let mut session = session.lock().await;

    debug!(session = %id, "Chat message received");

    let messages = send_message(&mut session, state.chat.as_ref(), &req.message)
        .await
        .map_err(|e| match e {
            ChatError::EmptyMessage => AppError::BadRequest(e.to_string()),
        })?;

    Ok((jar, Json(ChatResponse { messages })))
}

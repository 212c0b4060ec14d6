use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::CallSession;
use crate::services::conversation::{self, TurnInput};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct DevTurn {
    pub call_id: String,
    pub text: String,
    pub language: Option<String>,
    pub caller: Option<String>,
}

/// Runs one turn without a phone line and returns the whole turn result.
pub async fn send_turn(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<DevTurn>,
) -> Response {
    let call_id = payload.call_id.trim().to_string();
    if call_id.is_empty() {
        return AppError::BadRequest("call_id is required".to_string()).into_response();
    }

    let text = payload.text.trim().to_string();
    let reply = if text.is_empty() {
        conversation::prompt(&state, &call_id, payload.caller, payload.language).await
    } else {
        conversation::process_turn(
            &state,
            TurnInput {
                call_id,
                text,
                language_hint: payload.language,
                caller: payload.caller,
            },
        )
        .await
    };

    Json(reply).into_response()
}

/// Current state of a call, for inspecting a conversation while testing.
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(call_id): Path<String>,
) -> Result<Json<CallSession>, AppError> {
    let session = state
        .sessions
        .get(&call_id)
        .ok_or_else(|| AppError::NotFound(format!("call {call_id}")))?;
    let session = session.lock().await.clone();
    Ok(Json(session))
}

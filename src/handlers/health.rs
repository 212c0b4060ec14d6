use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::state::AppState;

pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "llm_provider": state.llm.name(),
        "booking_backend": state.booking.name(),
        "active_calls": state.sessions.len(),
    }))
}

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::AppState;

#[axum::debug_handler]
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let body = json!({
        "status": "ok",
        "activeSession": state.store.has_active_session().await,
        "archivedCandidates": state.store.candidates().await.len(),
    });
    (StatusCode::OK, Json(body))
}

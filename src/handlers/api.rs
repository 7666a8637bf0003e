use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{Value, json};

use crate::state::AppState;

/// Health check handler
/// Returns a simple JSON response indicating the server is running
pub async fn health_check(State(state): State<Arc<AppState>>) -> Result<Json<Value>, StatusCode> {
    Ok(Json(json!({
        "status": "OK",
        "active_sessions": state.sessions().len()
    })))
}

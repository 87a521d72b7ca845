use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::warn;

use crate::state::AppState;

/// Health check: 200 when the store answers, 503 otherwise.
pub async fn health_handler(State(state): State<AppState>) -> Response {
    match state.service.ping().await {
        Ok(()) => Json(serde_json::json!({
            "status": "ok",
            "database": "connected"
        }))
        .into_response(),
        Err(e) => {
            warn!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "status": "unavailable",
                    "database": "disconnected"
                })),
            )
                .into_response()
        }
    }
}

use crate::api::websocket::RelayAppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::error;

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Create status API router
pub fn create_status_router(state: Arc<RelayAppState>) -> Router {
    Router::new()
        .route("/api/status", get(get_status))
        .with_state(state)
}

/// GET /api/status - connection counts and current stats
async fn get_status(State(state): State<Arc<RelayAppState>>) -> Response {
    match state.hub.status().await {
        Ok(status) => Json(status).into_response(),
        Err(e) => {
            error!(error = %e, "Status request failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

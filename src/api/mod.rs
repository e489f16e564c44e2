// HTTP and WebSocket surface

pub mod status;
pub mod websocket;

pub use status::create_status_router;
pub use websocket::{create_ws_router, ws_handler, RelayAppState};

use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Full relay router: WebSocket endpoints plus the status API, CORS open for dashboards
pub fn create_router(state: Arc<RelayAppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    create_ws_router(Arc::clone(&state))
        .merge(create_status_router(state))
        .layer(cors)
}

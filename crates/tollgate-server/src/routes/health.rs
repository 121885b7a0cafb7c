//! Liveness endpoint.

use axum::{Json, Router, routing::get};

use crate::routes::auth::MessageResponse;
use crate::state::AppState;

/// GET /ping - Liveness probe, outside the base path.
pub async fn ping() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "pong".to_string(),
    })
}

/// Create health check routes.
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/ping", get(ping))
}

//! 헬스 체크 endpoint.

use axum::{http::StatusCode, response::IntoResponse, routing::get, Router};
use std::sync::Arc;

use crate::state::AppState;

/// 간단한 헬스 체크 (liveness probe용).
///
/// GET /health
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

pub fn health_router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(health_check))
}

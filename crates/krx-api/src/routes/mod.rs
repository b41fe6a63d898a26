//! API 라우트.
//!
//! # 라우트 구조
//!
//! - `/health` - 헬스 체크 (liveness)
//! - `/api/v1/stock` - 거래량 TOP10, 현재가 스냅샷, 기간별 시세

pub mod health;
pub mod stock;

pub use health::health_router;
pub use stock::{stock_router, HistoryQuery, DISPLAY_FIELDS};

use axum::Router;
use std::sync::Arc;

use crate::state::AppState;

/// 전체 API 라우터 생성.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/health", health_router())
        .nest("/api/v1/stock", stock_router())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use krx_data::MemoryCache;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health_check() {
        let app = create_api_router().with_state(Arc::new(AppState::new(Arc::new(MemoryCache::new()))));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"OK");
    }
}

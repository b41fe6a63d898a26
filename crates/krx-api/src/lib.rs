//! 수집된 시세를 조회하는 읽기 전용 REST API.
//!
//! Redis 캐시의 현재가/TOP10 스냅샷과 PostgreSQL의 기간별 시세를 제공합니다.

pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiErrorResponse, ApiResult};
pub use routes::create_api_router;
pub use state::AppState;

//! 시세 조회 API 서버.
//!
//! 수집기가 채운 Redis 캐시와 PostgreSQL 기간별 시세를 읽기 전용으로 제공합니다.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use krx_api::{create_api_router, AppState};
use krx_collector::config;
use krx_core::logging::{init_logging, LogConfig};
use krx_data::{PgChartPriceStore, RedisCache};

/// 서버 설정 구조체.
struct ServerConfig {
    /// 바인딩할 호스트 주소
    host: String,
    /// 바인딩할 포트
    port: u16,
}

impl ServerConfig {
    /// 환경 변수에서 설정 로드.
    fn from_env() -> Self {
        let host = std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = match std::env::var("API_PORT") {
            Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
                warn!(value = %raw, "API_PORT 파싱 실패, 기본값 8080 사용");
                8080
            }),
            Err(_) => 8080,
        };

        Self { host, port }
    }

    fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

/// 조회 전용이므로 GET만 허용합니다.
fn cors_layer() -> CorsLayer {
    let allow_origin = match std::env::var("CORS_ORIGINS") {
        Ok(origins) if !origins.is_empty() => {
            let origins: Vec<_> = origins
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();

            if origins.is_empty() {
                warn!("CORS_ORIGINS is set but contains no valid origins, allowing any");
                AllowOrigin::any()
            } else {
                info!("CORS configured with {} allowed origins", origins.len());
                AllowOrigin::list(origins)
            }
        }
        _ => AllowOrigin::any(),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([axum::http::Method::GET, axum::http::Method::OPTIONS])
        .allow_headers([axum::http::header::CONTENT_TYPE])
}

fn create_app(state: Arc<AppState>) -> Router {
    create_api_router()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(cors_layer())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("종료 신호 수신, 서버 종료 중...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    init_logging(LogConfig::from_env("info"))
        .map_err(|e| anyhow::anyhow!("로깅 초기화 실패: {}", e))?;

    let server = ServerConfig::from_env();

    let redis = RedisCache::connect(&config::redis_from_env()?).await?;
    let mut state = AppState::new(Arc::new(redis)).with_top10_key(config::top10_key_from_env());

    match config::postgres_from_env()? {
        Some(postgres) => {
            let pool = postgres.connect().await?;
            let store = PgChartPriceStore::new(pool, config::chart_table_from_env()?);
            info!(table = %store.table(), "기간별 시세 저장소 연결");
            state = state.with_history(Arc::new(store));
        }
        None => warn!("POSTGRES_HOST 미설정: 기간별 시세 조회 비활성화"),
    }

    let app = create_app(Arc::new(state));
    let addr = server.socket_addr()?;
    info!("API 서버 시작: http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("API 서버 종료");
    Ok(())
}

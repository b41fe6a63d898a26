//! 종목 시세 조회 endpoint.
//!
//! # 엔드포인트
//!
//! - `GET /api/v1/stock/top10` - 거래량 TOP10 스냅샷
//! - `GET /api/v1/stock/realtime/{code}` - 캐시된 현재가 (표시 필드만)
//! - `GET /api/v1/stock/history/{code}` - 기간별 시세 (최신순)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, error, warn};

use krx_core::InstrumentCode;
use krx_data::{CacheKind, ChartPriceRecord};
use krx_kis::collectors::PeriodDivCode;

use crate::error::{api_error, ApiResult};
use crate::state::AppState;

/// 현재가 화면에 노출하는 필드.
pub const DISPLAY_FIELDS: [&str; 16] = [
    "hts_kor_isnm",
    "stck_shrn_iscd",
    "rprs_mrkt_kor_name",
    "bstp_kor_isnm",
    "stck_prpr",
    "prdy_vrss_sign",
    "prdy_vrss",
    "prdy_ctrt",
    "stck_oprc",
    "stck_sdpr",
    "stck_hgpr",
    "stck_lwpr",
    "acml_vol",
    "acml_tr_pbmn",
    "w52_hgpr",
    "w52_lwpr",
];

const DEFAULT_HISTORY_LIMIT: i64 = 365;
const MAX_HISTORY_LIMIT: i64 = 3650;

// ==================== 요청/응답 타입 ====================

/// 기간별 시세 조회 쿼리.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// 기간 분류 코드 (D/W/M/Y, 기본 D)
    pub period: Option<String>,
    /// 최대 행 수 (기본 365)
    pub limit: Option<i64>,
}

// ==================== 핸들러 ====================

/// GET /api/v1/stock/top10
///
/// 스냅샷이 없으면 빈 목록을 반환합니다.
pub async fn get_top10(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let stored = state.cache.get_string(&state.top10_key).await.map_err(|e| {
        error!(key = %state.top10_key, error = %e, "TOP10 조회 실패");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "CACHE_ERROR", e.to_string())
    })?;

    let Some(raw) = stored else {
        return Ok(Json(json!({ "items": [] })));
    };

    let value = serde_json::from_str(&raw).map_err(|e| {
        error!(key = %state.top10_key, error = %e, "TOP10 스냅샷 파싱 실패");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "CACHE_CORRUPTED", e.to_string())
    })?;
    Ok(Json(value))
}

/// GET /api/v1/stock/realtime/{code}
pub async fn get_realtime(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> ApiResult<Json<Value>> {
    let code = parse_code(&code)?;
    let key = CacheKind::CurrentPrice.key(code.as_str());

    let stored = state.cache.get_string(&key).await.map_err(|e| {
        error!(key = %key, error = %e, "현재가 조회 실패");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "CACHE_ERROR", e.to_string())
    })?;

    let raw = stored.ok_or_else(|| {
        api_error(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("캐시된 시세가 없습니다: {}", code),
        )
    })?;

    let snapshot: Map<String, Value> = serde_json::from_str(&raw).map_err(|e| {
        error!(key = %key, error = %e, "현재가 스냅샷 파싱 실패");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "CACHE_CORRUPTED", e.to_string())
    })?;

    Ok(Json(Value::Object(display_fields(&snapshot))))
}

/// GET /api/v1/stock/history/{code}?period=D&limit=365
pub async fn get_history(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<Vec<ChartPriceRecord>>> {
    let code = parse_code(&code)?;

    let period: PeriodDivCode = query
        .period
        .as_deref()
        .unwrap_or("D")
        .parse()
        .map_err(|e: krx_kis::KisError| {
            api_error(StatusCode::BAD_REQUEST, "INVALID_PERIOD", e.to_string())
        })?;

    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    if !(1..=MAX_HISTORY_LIMIT).contains(&limit) {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "INVALID_LIMIT",
            format!("limit은 1..={} 범위여야 합니다: {}", MAX_HISTORY_LIMIT, limit),
        ));
    }

    let store = state.history.as_ref().ok_or_else(|| {
        warn!("기간별 시세 저장소 미설정");
        api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "DB_NOT_CONFIGURED",
            "기간별 시세 저장소가 설정되지 않았습니다",
        )
    })?;

    let rows = store
        .fetch_history(&code, period.as_str(), limit)
        .await
        .map_err(|e| {
            error!(code = %code, error = %e, "기간별 시세 조회 실패");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "DB_ERROR", e.to_string())
        })?;

    debug!(code = %code, period = period.as_str(), rows = rows.len(), "기간별 시세 조회");
    Ok(Json(rows))
}

// ==================== 헬퍼 ====================

fn parse_code(raw: &str) -> ApiResult<InstrumentCode> {
    InstrumentCode::new(raw)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, "INVALID_CODE", e.to_string()))
}

/// 스냅샷에서 표시 필드만 남깁니다. 없는 필드는 생략합니다.
pub fn display_fields(snapshot: &Map<String, Value>) -> Map<String, Value> {
    DISPLAY_FIELDS
        .iter()
        .filter_map(|field| snapshot.get(*field).map(|v| (field.to_string(), v.clone())))
        .collect()
}

pub fn stock_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/top10", get(get_top10))
        .route("/realtime/{code}", get(get_realtime))
        .route("/history/{code}", get(get_history))
}

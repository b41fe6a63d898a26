//! 엔드포인트별 시세 수집기.
//!
//! 각 수집기는 `(api, 종목코드, 파라미터) -> 행 목록` 형태의 함수이며,
//! 모든 행에 응답 상태(`rt_cd`, `msg_cd`, `msg1`), 분 단위 수집 시각,
//! 요청 파라미터를 메타데이터로 병합합니다.

mod daily_chart;
mod index;
mod inquire_price;
mod investor_trade;
mod time_conclusion;
mod volume_rank;

pub use daily_chart::{build_date_ranges, fetch_daily_chartprice, DailyChartRequest, PeriodDivCode};
pub use index::{fetch_index_price, fetch_index_tickprice};
pub use inquire_price::fetch_inquire_price;
pub use investor_trade::fetch_investor_trade_daily;
pub use time_conclusion::fetch_time_itemconclusion;
pub use volume_rank::{fetch_volume_rank, VolumeRank, VolumeRankRequest};

use krx_core::{InstrumentCode, RowMetadata};
use serde_json::{Map, Value};
use tracing::warn;

/// 주식 시장 분류 코드.
pub const MARKET_DIV_STOCK: &str = "J";
/// 업종 시장 분류 코드.
pub const MARKET_DIV_INDEX: &str = "U";
/// 고객 유형 (개인).
pub const CUSTTYPE_PERSONAL: &str = "P";

/// 시세 조회 공통 헤더.
fn quote_headers(tr_id: &'static str) -> [(&'static str, &'static str); 2] {
    [("tr_id", tr_id), ("custtype", CUSTTYPE_PERSONAL)]
}

/// 응답의 `key` 필드를 객체 목록으로 읽습니다.
///
/// 배열이면 객체 원소만, 단일 객체면 그 객체 하나를 반환합니다.
fn output_items<'a>(response: &'a Value, key: &str) -> Vec<&'a Map<String, Value>> {
    match response.get(key) {
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_object).collect(),
        Some(Value::Object(item)) => vec![item],
        _ => Vec::new(),
    }
}

/// 실패 응답 코드 경고 로그.
fn warn_on_status(meta: &RowMetadata, endpoint: &str, code: Option<&InstrumentCode>) {
    if !meta.is_success() {
        warn!(
            endpoint,
            code = code.map(|c| c.as_str()).unwrap_or("-"),
            rt_cd = meta.rt_cd.as_deref().unwrap_or("null"),
            msg_cd = meta.msg_cd.as_deref().unwrap_or(""),
            msg1 = meta.msg1.as_deref().unwrap_or(""),
            "KIS 응답 코드가 정상이 아닙니다"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_output_items_shapes() {
        let resp = json!({
            "arr": [{"a": 1}, 2, {"b": 3}],
            "obj": {"c": 4},
            "str": "x"
        });
        assert_eq!(output_items(&resp, "arr").len(), 2);
        assert_eq!(output_items(&resp, "obj").len(), 1);
        assert!(output_items(&resp, "str").is_empty());
        assert!(output_items(&resp, "missing").is_empty());
    }
}

//! 주식현재가 당일 시간대별 체결 수집기.

use super::{output_items, quote_headers, warn_on_status, MARKET_DIV_STOCK};
use crate::{paths, tr_id, KisApi, KisResult};
use krx_core::{clock, fields, CollectedRow, InstrumentCode, RowMetadata};
use reqwest::Method;

/// 시간대별 체결 조회.
///
/// `hour`(HHMMSS) 이전 체결 내역을 조회하여 `output2`의 각 항목을 행으로 반환합니다.
pub async fn fetch_time_itemconclusion(
    api: &dyn KisApi,
    code: &InstrumentCode,
    hour: &str,
) -> KisResult<Vec<CollectedRow>> {
    let params = [
        ("FID_COND_MRKT_DIV_CODE", MARKET_DIV_STOCK.to_string()),
        ("FID_INPUT_ISCD", code.to_string()),
        ("FID_INPUT_HOUR_1", hour.to_string()),
    ];

    let response = api
        .request(
            Method::GET,
            paths::INQUIRE_TIME_ITEMCONCLUSION,
            &params,
            &quote_headers(tr_id::INQUIRE_TIME_ITEMCONCLUSION),
        )
        .await?;

    let meta = RowMetadata::from_response(&response, clock::collected_at_now())
        .with_requested(fields::REQUESTED_CODE, code.as_str())
        .with_requested(fields::REQUESTED_HOUR, hour)
        .with_requested(fields::REQUESTED_MARKET_DIV, MARKET_DIV_STOCK);
    warn_on_status(&meta, "inquire-time-itemconclusion", Some(code));

    Ok(output_items(&response, "output2")
        .into_iter()
        .map(|item| meta.apply(Some(item)))
        .collect())
}

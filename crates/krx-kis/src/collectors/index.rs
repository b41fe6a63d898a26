//! 국내업종 지수 수집기.

use super::{output_items, quote_headers, warn_on_status, MARKET_DIV_INDEX};
use crate::{paths, tr_id, KisApi, KisResult};
use krx_core::{clock, fields, CollectedRow, InstrumentCode, RowMetadata};
use reqwest::Method;
use serde_json::Value;

/// 업종 현재지수 조회 (예: "0001" 코스피).
pub async fn fetch_index_price(
    api: &dyn KisApi,
    code: &InstrumentCode,
) -> KisResult<CollectedRow> {
    let params = [
        ("FID_COND_MRKT_DIV_CODE", MARKET_DIV_INDEX.to_string()),
        ("FID_INPUT_ISCD", code.to_string()),
    ];

    let response = api
        .request(
            Method::GET,
            paths::INQUIRE_INDEX_PRICE,
            &params,
            &quote_headers(tr_id::INQUIRE_INDEX_PRICE),
        )
        .await?;

    let meta = RowMetadata::from_response(&response, clock::collected_at_now())
        .with_requested(fields::REQUESTED_CODE, code.as_str());
    warn_on_status(&meta, "inquire-index-price", Some(code));

    Ok(meta.apply(response.get("output").and_then(Value::as_object)))
}

/// 업종 시간별 지수 (틱) 조회.
pub async fn fetch_index_tickprice(
    api: &dyn KisApi,
    code: &InstrumentCode,
) -> KisResult<Vec<CollectedRow>> {
    let params = [
        ("FID_INPUT_ISCD", code.to_string()),
        ("FID_COND_MRKT_DIV_CODE", MARKET_DIV_INDEX.to_string()),
    ];

    let response = api
        .request(
            Method::GET,
            paths::INQUIRE_INDEX_TICKPRICE,
            &params,
            &quote_headers(tr_id::INQUIRE_INDEX_TICKPRICE),
        )
        .await?;

    let meta = RowMetadata::from_response(&response, clock::collected_at_now())
        .with_requested(fields::REQUESTED_CODE, code.as_str())
        .with_requested(fields::REQUESTED_MARKET_DIV, MARKET_DIV_INDEX);
    warn_on_status(&meta, "inquire-index-tickprice", Some(code));

    Ok(output_items(&response, "output")
        .into_iter()
        .map(|item| meta.apply(Some(item)))
        .collect())
}

//! 종목별 투자자 매매동향 (일별) 수집기.

use super::{output_items, quote_headers, warn_on_status, MARKET_DIV_STOCK};
use crate::{paths, tr_id, KisApi, KisResult};
use krx_core::{clock, fields, CollectedRow, InstrumentCode, RowMetadata};
use reqwest::Method;
use tracing::warn;

/// 투자자 매매동향 조회.
///
/// `output2`의 첫 번째 항목(기준일)만 메타데이터와 병합하여 반환합니다.
/// `output2`가 비어 있으면 빈 목록을 반환합니다.
pub async fn fetch_investor_trade_daily(
    api: &dyn KisApi,
    code: &InstrumentCode,
    date: &str,
) -> KisResult<Vec<CollectedRow>> {
    let params = [
        ("FID_COND_MRKT_DIV_CODE", MARKET_DIV_STOCK.to_string()),
        ("FID_INPUT_ISCD", code.to_string()),
        ("FID_INPUT_DATE_1", date.to_string()),
        ("FID_ORG_ADJ_PRC", String::new()),
        ("FID_ETC_CLS_CODE", String::new()),
    ];

    let response = api
        .request(
            Method::GET,
            paths::INVESTOR_TRADE_BY_STOCK_DAILY,
            &params,
            &quote_headers(tr_id::INVESTOR_TRADE_BY_STOCK_DAILY),
        )
        .await?;

    let meta = RowMetadata::from_response(&response, clock::collected_at_now())
        .with_requested(fields::REQUESTED_CODE, code.as_str())
        .with_requested(fields::REQUESTED_DATE, date);
    warn_on_status(&meta, "investor-trade-by-stock-daily", Some(code));

    match output_items(&response, "output2").first().copied() {
        Some(first) => Ok(vec![meta.apply(Some(first))]),
        None => {
            warn!(code = %code, date, "투자자 매매동향 output2가 비어 있습니다");
            Ok(Vec::new())
        }
    }
}

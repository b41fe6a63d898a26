//! 주식현재가 시세 수집기.

use super::{quote_headers, warn_on_status, MARKET_DIV_STOCK};
use crate::{paths, tr_id, KisApi, KisResult};
use krx_core::{clock, fields, CollectedRow, InstrumentCode, RowMetadata};
use reqwest::Method;
use serde_json::Value;

/// 현재가 조회.
///
/// 응답의 `output` 객체에 메타데이터를 병합한 단일 행을 반환합니다.
/// `output`이 비어 있어도 메타데이터만 담은 행을 반환합니다.
pub async fn fetch_inquire_price(
    api: &dyn KisApi,
    code: &InstrumentCode,
) -> KisResult<CollectedRow> {
    let params = [
        ("FID_COND_MRKT_DIV_CODE", MARKET_DIV_STOCK.to_string()),
        ("FID_INPUT_ISCD", code.to_string()),
    ];

    let response = api
        .request(
            Method::GET,
            paths::INQUIRE_PRICE,
            &params,
            &quote_headers(tr_id::INQUIRE_PRICE),
        )
        .await?;

    let meta = RowMetadata::from_response(&response, clock::collected_at_now())
        .with_requested(fields::REQUESTED_CODE, code.as_str());
    warn_on_status(&meta, "inquire-price", Some(code));

    Ok(meta.apply(response.get("output").and_then(Value::as_object)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SimulatedKisApi;
    use serde_json::json;

    #[tokio::test]
    async fn test_fetch_inquire_price_merges_output() {
        let api = SimulatedKisApi::new().with_response(
            paths::INQUIRE_PRICE,
            Some("005930"),
            json!({
                "rt_cd": "0", "msg_cd": "MCA00000", "msg1": "정상처리 되었습니다.",
                "output": {"stck_prpr": "71000", "prdy_vrss": "500", "acml_vol": "1234567",
                           "stck_shrn_iscd": "005930"}
            }),
        );
        let code = InstrumentCode::new("005930").unwrap();

        let row = fetch_inquire_price(&api, &code).await.unwrap();

        assert_eq!(row.text("stck_prpr").as_deref(), Some("71000"));
        assert_eq!(row.text(fields::REQUESTED_CODE).as_deref(), Some("005930"));
        assert_eq!(row.text(fields::RT_CD).as_deref(), Some("0"));
        assert!(row.text(fields::COLLECTED_AT).is_some());

        let calls = api.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].path, paths::INQUIRE_PRICE);
        assert_eq!(calls[0].header("tr_id"), Some(tr_id::INQUIRE_PRICE));
        assert_eq!(calls[0].header("custtype"), Some("P"));
        assert_eq!(calls[0].param("FID_COND_MRKT_DIV_CODE"), Some("J"));
    }

    #[tokio::test]
    async fn test_empty_output_still_carries_metadata() {
        let api = SimulatedKisApi::new().with_response(
            paths::INQUIRE_PRICE,
            None,
            json!({"rt_cd": "1", "msg_cd": "EGW", "msg1": "조회 실패"}),
        );
        let code = InstrumentCode::new("000660").unwrap();

        let row = fetch_inquire_price(&api, &code).await.unwrap();

        assert_eq!(row.text(fields::REQUESTED_CODE).as_deref(), Some("000660"));
        assert_eq!(row.text(fields::RT_CD).as_deref(), Some("1"));
        assert!(row.text(fields::COLLECTED_AT).is_some());
    }
}

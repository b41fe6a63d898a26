//! 거래량 순위 수집기.

use super::{output_items, warn_on_status, MARKET_DIV_STOCK};
use crate::{paths, tr_id, KisApi, KisResult};
use krx_core::{clock, RowMetadata};
use reqwest::Method;
use serde_json::{Map, Value};

/// 거래량 순위 조회 조건.
#[derive(Debug, Clone)]
pub struct VolumeRankRequest {
    pub market_div_code: String,
    /// 화면 분류 코드
    pub screen_div_code: String,
    /// 0000: 전체, 0001: 거래소, 1001: 코스닥
    pub input_iscd: String,
    /// 0: 전체, 1: 보통주, 2: 우선주
    pub div_cls_code: String,
    /// 0: 평균거래량, 1: 거래증가율, 2: 평균거래회전율, 3: 거래금액순, 4: 평균거래금액회전율
    pub blng_cls_code: String,
    pub trgt_cls_code: String,
    pub trgt_exls_cls_code: String,
    pub input_price_1: String,
    pub input_price_2: String,
    pub vol_cnt: String,
    pub input_date_1: String,
}

impl Default for VolumeRankRequest {
    fn default() -> Self {
        Self {
            market_div_code: MARKET_DIV_STOCK.to_string(),
            screen_div_code: "20171".to_string(),
            input_iscd: "0000".to_string(),
            div_cls_code: "0".to_string(),
            blng_cls_code: "0".to_string(),
            trgt_cls_code: "11111111".to_string(),
            trgt_exls_cls_code: "0000000000".to_string(),
            input_price_1: String::new(),
            input_price_2: String::new(),
            vol_cnt: String::new(),
            input_date_1: String::new(),
        }
    }
}

impl VolumeRankRequest {
    fn params(&self) -> [(&'static str, String); 11] {
        [
            ("FID_COND_MRKT_DIV_CODE", self.market_div_code.clone()),
            ("FID_COND_SCR_DIV_CODE", self.screen_div_code.clone()),
            ("FID_INPUT_ISCD", self.input_iscd.clone()),
            ("FID_DIV_CLS_CODE", self.div_cls_code.clone()),
            ("FID_BLNG_CLS_CODE", self.blng_cls_code.clone()),
            ("FID_TRGT_CLS_CODE", self.trgt_cls_code.clone()),
            ("FID_TRGT_EXLS_CLS_CODE", self.trgt_exls_cls_code.clone()),
            ("FID_INPUT_PRICE_1", self.input_price_1.clone()),
            ("FID_INPUT_PRICE_2", self.input_price_2.clone()),
            ("FID_VOL_CNT", self.vol_cnt.clone()),
            ("FID_INPUT_DATE_1", self.input_date_1.clone()),
        ]
    }
}

/// 거래량 순위 결과 (상태 메타데이터 + 순위 행).
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeRank {
    pub meta: RowMetadata,
    pub rows: Vec<Map<String, Value>>,
}

impl VolumeRank {
    /// 스트림 발행용 페이로드 (`{rt_cd, msg_cd, msg1, collected_at, output: [...]}`).
    pub fn to_payload(&self) -> Value {
        let mut payload = self.meta.to_map();
        payload.insert(
            "output".to_string(),
            Value::Array(self.rows.iter().cloned().map(Value::Object).collect()),
        );
        Value::Object(payload)
    }
}

/// 거래량 순위 조회 (종목코드 불필요).
pub async fn fetch_volume_rank(
    api: &dyn KisApi,
    request: &VolumeRankRequest,
) -> KisResult<VolumeRank> {
    let response = api
        .request(
            Method::GET,
            paths::VOLUME_RANK,
            &request.params(),
            &[("tr_id", tr_id::VOLUME_RANK)],
        )
        .await?;

    let meta = RowMetadata::from_response(&response, clock::collected_at_now());
    warn_on_status(&meta, "volume-rank", None);

    let rows = output_items(&response, "output")
        .into_iter()
        .cloned()
        .collect();

    Ok(VolumeRank { meta, rows })
}

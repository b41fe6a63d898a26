//! 수집 행과 요청 메타데이터.
//!
//! KIS 응답은 엔드포인트마다 스키마가 다르므로 수집 결과는 평탄한
//! JSON 객체(`CollectedRow`)로 정규화합니다. 모든 행은 응답 상태와
//! 요청 파라미터를 담은 메타데이터 필드를 포함합니다.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 수집 행에서 사용하는 필드 이름.
pub mod fields {
    /// 응답 코드 (0 = 성공)
    pub const RT_CD: &str = "rt_cd";
    /// 메시지 코드
    pub const MSG_CD: &str = "msg_cd";
    /// 메시지 내용
    pub const MSG1: &str = "msg1";
    /// 수집 시각 (분 단위, KST)
    pub const COLLECTED_AT: &str = "collected_at";
    /// 요청 종목 코드
    pub const REQUESTED_CODE: &str = "requested_fid_input_iscd";
    /// 요청 입력 시각
    pub const REQUESTED_HOUR: &str = "requested_fid_input_hour_1";
    /// 요청 시장 분류 코드
    pub const REQUESTED_MARKET_DIV: &str = "requested_fid_cond_mrkt_div_code";
    /// 요청 입력 일자
    pub const REQUESTED_DATE: &str = "requested_fid_input_date";
    /// 요청 조회 시작일
    pub const REQUESTED_DATE_1: &str = "requested_fid_input_date_1";
    /// 요청 조회 종료일
    pub const REQUESTED_DATE_2: &str = "requested_fid_input_date_2";
    /// 요청 기간 분류 코드 (D/W/M/Y)
    pub const REQUESTED_PERIOD: &str = "requested_fid_period_div_code";
    /// 요청 수정주가 여부
    pub const REQUESTED_ORG_ADJ_PRC: &str = "requested_fid_org_adj_prc";

    /// 유가증권 단축 종목코드
    pub const SHORT_CODE: &str = "mksc_shrn_iscd";
    /// 주식 단축 종목코드
    pub const STOCK_SHORT_CODE: &str = "stck_shrn_iscd";

    /// 주식 영업 일자
    pub const BUSINESS_DATE: &str = "stck_bsop_date";
    /// 주식 종가
    pub const CLOSE_PRICE: &str = "stck_clpr";
    /// 주식 시가
    pub const OPEN_PRICE: &str = "stck_oprc";
    /// 누적 거래량
    pub const ACCUMULATED_VOLUME: &str = "acml_vol";
    /// 주식 현재가
    pub const CURRENT_PRICE: &str = "stck_prpr";
    /// 전일 대비
    pub const CHANGE_FROM_PREV: &str = "prdy_vrss";
}

/// 수집기가 생성하는 평탄한 행.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectedRow(Map<String, Value>);

impl CollectedRow {
    /// 빈 행 생성.
    pub fn new() -> Self {
        Self::default()
    }

    /// JSON 객체에서 행 생성.
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// 필드를 문자열로 읽습니다.
    ///
    /// 빈 문자열과 null은 값이 없는 것으로 취급하고, 숫자는 문자열로 변환합니다.
    pub fn text(&self, key: &str) -> Option<String> {
        value_text(self.0.get(key)?)
    }

    /// 후보 필드를 순서대로 확인하여 첫 번째 값을 반환합니다.
    pub fn first_text(&self, candidates: &[&str]) -> Option<String> {
        candidates.iter().find_map(|key| self.text(key))
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for CollectedRow {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// JSON 값을 비어 있지 않은 문자열로 변환.
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// 응답 상태와 요청 파라미터.
///
/// 업스트림 응답이 비어 있어도 모든 행은 이 필드를 포함합니다.
#[derive(Debug, Clone, PartialEq)]
pub struct RowMetadata {
    pub rt_cd: Option<String>,
    pub msg_cd: Option<String>,
    pub msg1: Option<String>,
    pub collected_at: String,
    requested: Vec<(String, Value)>,
}

impl RowMetadata {
    /// 응답 상태 없이 메타데이터 생성.
    pub fn new(collected_at: impl Into<String>) -> Self {
        Self {
            rt_cd: None,
            msg_cd: None,
            msg1: None,
            collected_at: collected_at.into(),
            requested: Vec::new(),
        }
    }

    /// 응답 본문의 상태 필드로 메타데이터 생성.
    pub fn from_response(response: &Value, collected_at: impl Into<String>) -> Self {
        let mut meta = Self::new(collected_at);
        meta.update_status(response);
        meta
    }

    /// 요청 파라미터 추가.
    pub fn with_requested(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.requested.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.requested.push((key, value)),
        }
        self
    }

    /// 응답 상태 갱신 (분할 조회 시 마지막 응답 기준).
    pub fn update_status(&mut self, response: &Value) {
        let read = |key: &str| response.get(key).and_then(|v| v.as_str()).map(str::to_string);
        self.rt_cd = read(fields::RT_CD);
        self.msg_cd = read(fields::MSG_CD);
        self.msg1 = read(fields::MSG1);
    }

    /// 응답 성공 여부.
    pub fn is_success(&self) -> bool {
        self.rt_cd.as_deref() == Some("0")
    }

    /// 메타데이터 필드만 담은 객체.
    pub fn to_map(&self) -> Map<String, Value> {
        let opt = |v: &Option<String>| v.clone().map(Value::String).unwrap_or(Value::Null);
        let mut map = Map::new();
        map.insert(fields::RT_CD.to_string(), opt(&self.rt_cd));
        map.insert(fields::MSG_CD.to_string(), opt(&self.msg_cd));
        map.insert(fields::MSG1.to_string(), opt(&self.msg1));
        map.insert(
            fields::COLLECTED_AT.to_string(),
            Value::String(self.collected_at.clone()),
        );
        for (key, value) in &self.requested {
            map.insert(key.clone(), value.clone());
        }
        map
    }

    /// 업스트림 항목에 메타데이터를 병합하여 행 생성.
    ///
    /// 메타데이터를 나중에 기록하므로 업스트림 필드가 메타데이터를 덮어쓰지 않습니다.
    pub fn apply(&self, payload: Option<&Map<String, Value>>) -> CollectedRow {
        let mut map = payload.cloned().unwrap_or_default();
        map.extend(self.to_map());
        CollectedRow(map)
    }
}

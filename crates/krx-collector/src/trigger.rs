//! 트리거 메시지 해석.
//!
//! 메시지 본문을 [`TriggerPayload`]로 분류한 뒤 행 목록과 종목코드 목록을
//! 뽑아냅니다. 잘못된 입력은 에러 없이 빈 결과가 됩니다.

use krx_core::{fields, InstrumentCode};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

/// 메시지당 최대 종목 수.
pub const MAX_CODES_PER_MESSAGE: usize = 30;

/// 종목코드 후보 필드 (앞쪽 우선).
pub const CODE_FIELDS: [&str; 2] = [fields::SHORT_CODE, fields::STOCK_SHORT_CODE];

/// 로그에 남길 본문 미리보기 길이.
const PREVIEW_CHARS: usize = 200;

/// 메시지 본문 형태.
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerPayload {
    /// 최상위 배열
    Array(Vec<Value>),
    /// `{"output": ...}`
    ObjectWithOutput(Value),
    /// `{"data": ...}`
    ObjectWithData(Value),
    /// `{"items": ...}`
    ObjectWithItems(Value),
    /// 알려진 키가 없는 단일 행 객체
    Object(Map<String, Value>),
    Unrecognized,
}

impl TriggerPayload {
    /// 본문을 분류합니다. JSON이 아니면 `Unrecognized`.
    pub fn decode(body: &str) -> Self {
        let parsed: Value = match serde_json::from_str(body) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, preview = %preview(body), "Invalid JSON payload");
                return TriggerPayload::Unrecognized;
            }
        };
        Self::classify(parsed)
    }

    pub fn classify(value: Value) -> Self {
        match value {
            Value::Array(items) => TriggerPayload::Array(items),
            Value::Object(mut map) => {
                if let Some(output) = map.remove("output") {
                    TriggerPayload::ObjectWithOutput(output)
                } else if let Some(data) = map.remove("data") {
                    TriggerPayload::ObjectWithData(data)
                } else if let Some(items) = map.remove("items") {
                    TriggerPayload::ObjectWithItems(items)
                } else {
                    TriggerPayload::Object(map)
                }
            }
            other => {
                info!(kind = value_kind(&other), "Unsupported payload type");
                TriggerPayload::Unrecognized
            }
        }
    }

    /// 행 객체 목록. 객체가 아닌 원소는 버립니다.
    pub fn rows(&self) -> Vec<&Map<String, Value>> {
        match self {
            TriggerPayload::Array(items) => objects(items),
            TriggerPayload::ObjectWithOutput(inner)
            | TriggerPayload::ObjectWithData(inner)
            | TriggerPayload::ObjectWithItems(inner) => match inner {
                Value::Array(items) => objects(items),
                Value::Object(map) => vec![map],
                _ => Vec::new(),
            },
            TriggerPayload::Object(map) => vec![map],
            TriggerPayload::Unrecognized => Vec::new(),
        }
    }
}

fn objects(items: &[Value]) -> Vec<&Map<String, Value>> {
    items.iter().filter_map(Value::as_object).collect()
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn preview(body: &str) -> String {
    body.chars().take(PREVIEW_CHARS).collect()
}

/// 후보 필드 중 처음으로 비어 있지 않은 값을 돌려줍니다.
pub fn first_candidate(row: &Map<String, Value>, candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .filter_map(|key| row.get(*key))
        .find_map(krx_core::row::value_text)
}

/// 메시지 본문에서 종목코드를 최대 30개까지 순서대로 추출합니다.
///
/// 형식이 맞지 않는 코드는 제외하며 중복은 유지합니다.
pub fn extract_codes(body: &str) -> Vec<InstrumentCode> {
    let payload = TriggerPayload::decode(body);
    let codes: Vec<InstrumentCode> = payload
        .rows()
        .into_iter()
        .filter_map(|row| first_candidate(row, &CODE_FIELDS))
        .filter_map(|raw| match InstrumentCode::new(&raw) {
            Ok(code) => Some(code),
            Err(e) => {
                debug!(error = %e, "Skipping invalid instrument code");
                None
            }
        })
        .take(MAX_CODES_PER_MESSAGE)
        .collect();

    codes
}

/// 행 목록을 담을 수 있는 키 (앞쪽 우선).
const ROW_LIST_KEYS: [&str; 3] = ["output", "data", "items"];

/// 메시지 본문에서 행 객체 목록을 추출합니다.
///
/// 최상위 배열이거나, `output`/`data`/`items` 중 처음으로 비어 있지 않은 값이
/// 배열일 때만 행을 돌려줍니다. 단일 객체나 배열이 아닌 값은 빈 목록입니다.
pub fn extract_rows(body: &str) -> Vec<Map<String, Value>> {
    let parsed: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, preview = %preview(body), "Invalid JSON payload");
            return Vec::new();
        }
    };

    let list = match parsed {
        Value::Array(items) => items,
        Value::Object(mut map) => {
            let chosen = ROW_LIST_KEYS
                .iter()
                .filter_map(|key| map.remove(*key))
                .find(is_truthy);
            match chosen {
                Some(Value::Array(items)) => items,
                Some(other) => {
                    info!(kind = value_kind(&other), "Row container is not a list");
                    Vec::new()
                }
                None => Vec::new(),
            }
        }
        other => {
            info!(kind = value_kind(&other), "Unsupported payload type");
            Vec::new()
        }
    };

    list.into_iter()
        .filter_map(|item| match item {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect()
}

/// null, false, 0, 빈 문자열/배열/객체는 비어 있는 값으로 봅니다.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn codes(body: &str) -> Vec<String> {
        extract_codes(body).into_iter().map(String::from).collect()
    }

    #[test]
    fn test_classify_variants() {
        assert!(matches!(
            TriggerPayload::decode("[1, {}]"),
            TriggerPayload::Array(items) if items.len() == 2
        ));
        assert!(matches!(
            TriggerPayload::decode(r#"{"output": []}"#),
            TriggerPayload::ObjectWithOutput(_)
        ));
        assert!(matches!(
            TriggerPayload::decode(r#"{"data": []}"#),
            TriggerPayload::ObjectWithData(_)
        ));
        assert!(matches!(
            TriggerPayload::decode(r#"{"items": []}"#),
            TriggerPayload::ObjectWithItems(_)
        ));
        assert!(matches!(
            TriggerPayload::decode(r#"{"mksc_shrn_iscd": "005930"}"#),
            TriggerPayload::Object(_)
        ));
        assert_eq!(TriggerPayload::decode("42"), TriggerPayload::Unrecognized);
        assert_eq!(TriggerPayload::decode("{not json"), TriggerPayload::Unrecognized);
    }

    #[test]
    fn test_extract_from_output_array() {
        assert_eq!(
            codes(r#"{"output":[{"mksc_shrn_iscd":"005930"}]}"#),
            vec!["005930"]
        );
    }

    #[test]
    fn test_extract_candidate_order() {
        let body = json!([
            {"mksc_shrn_iscd": "005930", "stck_shrn_iscd": "999999"},
            {"mksc_shrn_iscd": "", "stck_shrn_iscd": "000660"},
            {"stck_shrn_iscd": "035420"},
            {"hts_kor_isnm": "이름만"},
            "not an object"
        ])
        .to_string();
        assert_eq!(codes(&body), vec!["005930", "000660", "035420"]);
    }

    #[test]
    fn test_extract_single_objects() {
        assert_eq!(codes(r#"{"output":{"stck_shrn_iscd":"005930"}}"#), vec!["005930"]);
        assert_eq!(codes(r#"{"mksc_shrn_iscd":"000660"}"#), vec!["000660"]);
    }

    #[test]
    fn test_extract_keeps_duplicates_and_drops_invalid() {
        let body = json!({"data": [
            {"mksc_shrn_iscd": "005930"},
            {"mksc_shrn_iscd": "005 930"},
            {"mksc_shrn_iscd": "005930"}
        ]})
        .to_string();
        assert_eq!(codes(&body), vec!["005930", "005930"]);
    }

    #[test]
    fn test_malformed_input_yields_empty() {
        assert!(codes("{not json").is_empty());
        assert!(codes("").is_empty());
        assert!(codes("null").is_empty());
        assert!(codes(r#"{"output": "text"}"#).is_empty());
    }

    #[test]
    fn test_extract_rows_filters_objects() {
        let rows = extract_rows(r#"{"items":[{"data_rank":"1"}, 3, {"data_rank":"2"}]}"#);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["data_rank"], "2");

        assert_eq!(extract_rows(r#"[{"data_rank":"1"}]"#).len(), 1);
    }

    #[test]
    fn test_extract_rows_requires_list() {
        assert!(extract_rows(r#"{"rt_cd":"1","msg_cd":"EGW00201","msg1":"초당 거래건수 초과"}"#).is_empty());
        assert!(extract_rows(r#"{"output":{"data_rank":"1"}}"#).is_empty());
        assert!(extract_rows(r#"{"output":"text"}"#).is_empty());
        assert!(extract_rows("42").is_empty());
        assert!(extract_rows("{not json").is_empty());
    }

    #[test]
    fn test_extract_rows_skips_empty_containers() {
        let rows = extract_rows(r#"{"output":[],"data":null,"items":[{"data_rank":"7"}]}"#);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["data_rank"], "7");

        // 비어 있지 않은 첫 값이 배열이 아니면 뒤 키를 보지 않음
        assert!(extract_rows(r#"{"output":{"x":1},"data":[{"data_rank":"1"}]}"#).is_empty());
    }

    proptest! {
        #[test]
        fn prop_extraction_caps_at_thirty_in_order(n in 30usize..80) {
            let generated: Vec<String> = (0..n).map(|i| format!("{:06}", i)).collect();
            let body = json!({
                "output": generated
                    .iter()
                    .map(|c| json!({"mksc_shrn_iscd": c}))
                    .collect::<Vec<_>>()
            })
            .to_string();

            let extracted = codes(&body);
            prop_assert_eq!(extracted.len(), MAX_CODES_PER_MESSAGE);
            prop_assert_eq!(&extracted[..], &generated[..MAX_CODES_PER_MESSAGE]);
        }

        #[test]
        fn prop_arbitrary_text_never_panics(body in ".{0,64}") {
            let extracted = extract_codes(&body);
            prop_assert!(extracted.len() <= MAX_CODES_PER_MESSAGE);
        }
    }
}

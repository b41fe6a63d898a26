//! 종목별 캐시 기록.
//!
//! 수집 행을 종목코드별로 묶어 `stock:{code}:{kind}` 키에 덮어씁니다.
//! 키 하나의 실패는 기록만 하고 나머지 키 쓰기를 막지 않습니다.

use crate::error::Result;
use crate::traits::CacheStore;
use krx_core::{fields, CollectedRow};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// 종목 캐시 키 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKind {
    CurrentPrice,
    CurrentPriceFields,
    IntradayTicks,
    InvestorTradeDaily,
}

impl CacheKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheKind::CurrentPrice => "current_price",
            CacheKind::CurrentPriceFields => "current_price_fields",
            CacheKind::IntradayTicks => "intraday_ticks",
            CacheKind::InvestorTradeDaily => "investor_trade_daily",
        }
    }

    /// `stock:{code}:{kind}`
    pub fn key(&self, code: &str) -> String {
        format!("stock:{}:{}", code, self.as_str())
    }
}

/// 기록 방식.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheVariant {
    /// 마지막 행을 JSON 문자열로, 요약 필드를 해시로 저장
    CurrentPriceSnapshot,
    /// 종목별 행 전체를 JSON 배열로 저장
    Series(CacheKind),
}

impl CacheVariant {
    /// 종목코드 후보 필드 (앞쪽 우선).
    fn code_fields(&self) -> &'static [&'static str] {
        match self {
            CacheVariant::CurrentPriceSnapshot => &[
                fields::SHORT_CODE,
                fields::STOCK_SHORT_CODE,
                fields::REQUESTED_CODE,
            ],
            CacheVariant::Series(_) => &[
                fields::REQUESTED_CODE,
                fields::SHORT_CODE,
                fields::STOCK_SHORT_CODE,
            ],
        }
    }
}

/// 스냅샷 요약 해시에 들어가는 필드.
const SUMMARY_FIELDS: [&str; 4] = [
    fields::CURRENT_PRICE,
    fields::CHANGE_FROM_PREV,
    fields::ACCUMULATED_VOLUME,
    fields::COLLECTED_AT,
];

/// 거래량 순위 TOP10 메타 필드.
pub const VOLUME_RANK_FIELDS: [&str; 19] = [
    "hts_kor_isnm",
    "mksc_shrn_iscd",
    "data_rank",
    "stck_prpr",
    "prdy_vrss_sign",
    "prdy_vrss",
    "prdy_ctrt",
    "acml_vol",
    "prdy_vol",
    "lstn_stcn",
    "avrg_vol",
    "n_befr_clpr_vrss_prpr_rate",
    "vol_inrt",
    "vol_tnrt",
    "nday_vol_tnrt",
    "avrg_tr_pbmn",
    "tr_pbmn_tnrt",
    "nday_tr_pbmn_tnrt",
    "acml_tr_pbmn",
];

const TOP10_LIMIT: usize = 10;

/// 캐시 기록 결과.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheWriteReport {
    /// 성공한 키 쓰기 수
    pub written: usize,
    /// 실패한 키 쓰기 수
    pub failed: usize,
    /// 종목코드가 없어 버린 행 수
    pub dropped: usize,
    /// 스냅샷에서 같은 종목의 마지막 행에 덮어쓰인 행 수
    pub collapsed: usize,
}

/// 종목별 캐시 기록기.
#[derive(Clone)]
pub struct CacheWriter {
    cache: Arc<dyn CacheStore>,
}

impl CacheWriter {
    pub fn new(cache: Arc<dyn CacheStore>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<dyn CacheStore> {
        &self.cache
    }

    /// 수집 행을 종목별로 기록합니다.
    pub async fn write(&self, variant: CacheVariant, rows: &[CollectedRow]) -> CacheWriteReport {
        let mut report = CacheWriteReport::default();
        if rows.is_empty() {
            return report;
        }

        let (groups, dropped) = group_by_code(rows, variant.code_fields());
        report.dropped = dropped;
        if dropped > 0 {
            warn!(?variant, dropped, "Rows without instrument code dropped from cache write");
        }

        for (code, group) in &groups {
            let writes = match variant {
                CacheVariant::CurrentPriceSnapshot => {
                    if group.len() > 1 {
                        report.collapsed += group.len() - 1;
                        debug!(code = %code, rows = group.len(), "Snapshot keeps last row for code");
                    }
                    match group.last() {
                        Some(row) => self.write_snapshot(code, row).await,
                        None => Vec::new(),
                    }
                }
                CacheVariant::Series(kind) => vec![self.write_series(kind, code, group).await],
            };

            for (key, outcome) in writes {
                match outcome {
                    Ok(()) => {
                        report.written += 1;
                        debug!(key = %key, "Cached");
                    }
                    Err(e) => {
                        report.failed += 1;
                        error!(key = %key, error = %e, "Failed to write cache key");
                    }
                }
            }
        }

        info!(
            ?variant,
            codes = groups.len(),
            written = report.written,
            failed = report.failed,
            "Cache write finished"
        );
        report
    }

    async fn write_snapshot(&self, code: &str, row: &CollectedRow) -> Vec<(String, Result<()>)> {
        let snapshot_key = CacheKind::CurrentPrice.key(code);
        let snapshot = match serde_json::to_string(row) {
            Ok(json) => self.cache.set_string(&snapshot_key, &json).await,
            Err(e) => Err(e.into()),
        };

        let fields_key = CacheKind::CurrentPriceFields.key(code);
        let summary: Vec<(String, String)> = SUMMARY_FIELDS
            .iter()
            .map(|f| (f.to_string(), row.text(f).unwrap_or_default()))
            .collect();
        let hash = self.cache.set_hash(&fields_key, &summary).await;

        vec![(snapshot_key, snapshot), (fields_key, hash)]
    }

    async fn write_series(
        &self,
        kind: CacheKind,
        code: &str,
        group: &[&CollectedRow],
    ) -> (String, Result<()>) {
        let key = kind.key(code);
        let outcome = match serde_json::to_string(group) {
            Ok(json) => self.cache.set_string(&key, &json).await,
            Err(e) => Err(e.into()),
        };
        (key, outcome)
    }

    /// 거래량 순위 TOP10 메타를 고정 키에 기록합니다.
    pub async fn write_top10(&self, key: &str, rows: &[Map<String, Value>]) -> Result<usize> {
        let items = build_top10_meta(rows);
        if items.is_empty() {
            return Ok(0);
        }

        let count = items.len();
        let payload = json!({ "items": items }).to_string();
        self.cache.set_string(key, &payload).await?;

        info!(key, count, "Saved top10 meta");
        Ok(count)
    }
}

/// 종목코드별로 묶습니다 (최초 등장 순서 유지). 코드 없는 행 수도 함께 반환.
fn group_by_code<'a>(
    rows: &'a [CollectedRow],
    candidates: &[&str],
) -> (Vec<(String, Vec<&'a CollectedRow>)>, usize) {
    let mut groups: Vec<(String, Vec<&CollectedRow>)> = Vec::new();
    let mut dropped = 0;

    for row in rows {
        let Some(code) = row.first_text(candidates) else {
            dropped += 1;
            continue;
        };
        match groups.iter_mut().find(|(c, _)| *c == code) {
            Some((_, group)) => group.push(row),
            None => groups.push((code, vec![row])),
        }
    }

    (groups, dropped)
}

/// 순위 행 상위 10개를 고정 필드로 투영합니다.
///
/// 없는 필드는 null, `data_rank`는 가능하면 정수로 변환합니다.
pub fn build_top10_meta(rows: &[Map<String, Value>]) -> Vec<Value> {
    let items: Vec<Value> = rows
        .iter()
        .take(TOP10_LIMIT)
        .map(|row| {
            let mut meta = Map::new();
            for field in VOLUME_RANK_FIELDS {
                meta.insert(field.to_string(), row.get(field).cloned().unwrap_or(Value::Null));
            }
            if let Some(rank) = meta.get("data_rank").and_then(rank_as_int) {
                meta.insert("data_rank".to_string(), Value::from(rank));
            }
            Value::Object(meta)
        })
        .collect();

    debug!(
        count = items.len(),
        codes = ?items.iter().map(|m| m["mksc_shrn_iscd"].clone()).collect::<Vec<_>>(),
        "Built top10 meta"
    );
    items
}

fn rank_as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryCache;
    use serde_json::json;

    fn row(value: Value) -> CollectedRow {
        match value {
            Value::Object(map) => CollectedRow::from_map(map),
            _ => panic!("object expected"),
        }
    }

    fn writer() -> (Arc<MemoryCache>, CacheWriter) {
        let cache = Arc::new(MemoryCache::new());
        (cache.clone(), CacheWriter::new(cache))
    }

    #[test]
    fn test_cache_keys() {
        assert_eq!(CacheKind::CurrentPrice.key("005930"), "stock:005930:current_price");
        assert_eq!(
            CacheKind::CurrentPriceFields.key("005930"),
            "stock:005930:current_price_fields"
        );
        assert_eq!(CacheKind::IntradayTicks.key("000660"), "stock:000660:intraday_ticks");
        assert_eq!(
            CacheKind::InvestorTradeDaily.key("000660"),
            "stock:000660:investor_trade_daily"
        );
    }

    #[tokio::test]
    async fn test_snapshot_writes_json_and_summary_hash() {
        let (cache, writer) = writer();
        let rows = vec![row(json!({
            "stck_shrn_iscd": "005930",
            "requested_fid_input_iscd": "005930",
            "stck_prpr": "71000",
            "acml_vol": 1234,
            "collected_at": "2024-01-02 09:00:00+09:00"
        }))];

        let report = writer.write(CacheVariant::CurrentPriceSnapshot, &rows).await;
        assert_eq!(report.written, 2);

        let snapshot: Value =
            serde_json::from_str(&cache.string("stock:005930:current_price").unwrap()).unwrap();
        assert_eq!(snapshot["stck_prpr"], "71000");

        let hash = cache.hash("stock:005930:current_price_fields");
        assert_eq!(hash["stck_prpr"], "71000");
        assert_eq!(hash["prdy_vrss"], "");
        assert_eq!(hash["acml_vol"], "1234");
        assert_eq!(hash["collected_at"], "2024-01-02 09:00:00+09:00");
    }

    #[tokio::test]
    async fn test_snapshot_keeps_last_row_per_code() {
        let (cache, writer) = writer();
        let rows = vec![
            row(json!({"stck_shrn_iscd": "005930", "stck_prpr": "70900"})),
            row(json!({"stck_shrn_iscd": "000660", "stck_prpr": "130000"})),
            row(json!({"stck_shrn_iscd": "005930", "stck_prpr": "71000"})),
        ];

        let report = writer.write(CacheVariant::CurrentPriceSnapshot, &rows).await;
        assert_eq!(report.written, 4);
        assert_eq!(report.collapsed, 1);

        let snapshot: Value =
            serde_json::from_str(&cache.string("stock:005930:current_price").unwrap()).unwrap();
        assert_eq!(snapshot["stck_prpr"], "71000");
    }

    #[tokio::test]
    async fn test_series_groups_rows_per_code() {
        let (cache, writer) = writer();
        let rows = vec![
            row(json!({"requested_fid_input_iscd": "005930", "stck_cntg_hour": "0901"})),
            row(json!({"requested_fid_input_iscd": "000660", "stck_cntg_hour": "0901"})),
            row(json!({"requested_fid_input_iscd": "005930", "stck_cntg_hour": "0902"})),
        ];

        let report = writer
            .write(CacheVariant::Series(CacheKind::IntradayTicks), &rows)
            .await;
        assert_eq!(report.written, 2);

        let ticks: Vec<Value> =
            serde_json::from_str(&cache.string("stock:005930:intraday_ticks").unwrap()).unwrap();
        assert_eq!(ticks.len(), 2);
        assert_eq!(ticks[1]["stck_cntg_hour"], "0902");
    }

    #[tokio::test]
    async fn test_rows_without_code_are_dropped() {
        let (cache, writer) = writer();
        let rows = vec![
            row(json!({"stck_prpr": "1"})),
            row(json!({"requested_fid_input_iscd": "005930"})),
        ];

        let report = writer
            .write(CacheVariant::Series(CacheKind::InvestorTradeDaily), &rows)
            .await;
        assert_eq!(report.dropped, 1);
        assert_eq!(report.written, 1);
        assert_eq!(cache.keys(), vec!["stock:005930:investor_trade_daily".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_key_does_not_block_others() {
        let cache = Arc::new(MemoryCache::new().fail_on("stock:005930:intraday_ticks"));
        let writer = CacheWriter::new(cache.clone());
        let rows = vec![
            row(json!({"requested_fid_input_iscd": "005930"})),
            row(json!({"requested_fid_input_iscd": "000660"})),
        ];

        let report = writer
            .write(CacheVariant::Series(CacheKind::IntradayTicks), &rows)
            .await;
        assert_eq!(report.failed, 1);
        assert_eq!(report.written, 1);
        assert!(cache.string("stock:000660:intraday_ticks").is_some());
    }

    #[tokio::test]
    async fn test_empty_input_writes_nothing() {
        let (cache, writer) = writer();
        let report = writer.write(CacheVariant::CurrentPriceSnapshot, &[]).await;
        assert_eq!(report, CacheWriteReport::default());
        assert!(cache.keys().is_empty());
    }

    #[test]
    fn test_build_top10_meta_projects_fields() {
        let rows: Vec<Map<String, Value>> = (1..=12)
            .map(|rank| {
                let value = json!({
                    "data_rank": rank.to_string(),
                    "mksc_shrn_iscd": format!("{:06}", rank),
                    "extra": "dropped"
                });
                value.as_object().cloned().unwrap()
            })
            .collect();

        let items = build_top10_meta(&rows);
        assert_eq!(items.len(), 10);
        assert_eq!(items[0]["data_rank"], 1);
        assert_eq!(items[9]["mksc_shrn_iscd"], "000010");
        assert!(items[0].get("extra").is_none());
        assert!(items[0]["hts_kor_isnm"].is_null());
        assert_eq!(items[0].as_object().unwrap().len(), VOLUME_RANK_FIELDS.len());
    }

    #[test]
    fn test_build_top10_meta_keeps_unparseable_rank() {
        let rows = vec![json!({"data_rank": "N/A"}).as_object().cloned().unwrap()];
        let items = build_top10_meta(&rows);
        assert_eq!(items[0]["data_rank"], "N/A");
    }

    #[tokio::test]
    async fn test_write_top10_stores_items_object() {
        let (cache, writer) = writer();
        let rows = vec![json!({"data_rank": "1", "mksc_shrn_iscd": "005930"})
            .as_object()
            .cloned()
            .unwrap()];

        let count = writer.write_top10("volume_rank:top10", &rows).await.unwrap();
        assert_eq!(count, 1);

        let stored: Value =
            serde_json::from_str(&cache.string("volume_rank:top10").unwrap()).unwrap();
        assert_eq!(stored["items"][0]["mksc_shrn_iscd"], "005930");
        assert_eq!(stored["items"][0]["data_rank"], 1);
    }
}

//! 기간별 시세 검증 및 영속화.
//!
//! 수집 행에서 (종목, 기간구분, 영업일자, 종가, 시가, 거래량)을 추출하고,
//! 하나라도 빠진 행은 건너뛴 뒤 나머지를 한 번에 upsert합니다.

use crate::error::{DataError, Result};
use crate::traits::ChartPriceStore;
use chrono::NaiveDate;
use krx_core::{clock, fields, CollectedRow, CoreError, InstrumentCode};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info, warn};

/// 검증된 `{schema}.{table}` 이름.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName {
    schema: String,
    table: String,
}

impl TableName {
    pub fn new(schema: &str, table: &str) -> std::result::Result<Self, CoreError> {
        Ok(Self {
            schema: validate_identifier(schema)?,
            table: validate_identifier(table)?,
        })
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

impl Default for TableName {
    fn default() -> Self {
        Self {
            schema: "anticsignal".to_string(),
            table: "stock_history".to_string(),
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

fn validate_identifier(raw: &str) -> std::result::Result<String, CoreError> {
    let trimmed = raw.trim();
    let valid = !trimmed.is_empty()
        && trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(trimmed.to_string())
    } else {
        Err(CoreError::InvalidIdentifier(raw.to_string()))
    }
}

/// 저장 대상 기간별 시세 한 건.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartPriceRecord {
    #[serde(rename = "fid_input_iscd")]
    pub code: InstrumentCode,
    #[serde(rename = "fid_period_div_code")]
    pub period_code: String,
    #[serde(rename = "stck_bsop_date")]
    pub business_date: NaiveDate,
    #[serde(rename = "stck_clpr")]
    pub close: Decimal,
    #[serde(rename = "stck_oprc")]
    pub open: Decimal,
    #[serde(rename = "acml_vol")]
    pub volume: Decimal,
}

impl ChartPriceRecord {
    /// 수집 행에서 레코드를 추출합니다.
    ///
    /// 실패 시 비어 있거나 해석할 수 없는 필드 이름 목록을 돌려줍니다.
    pub fn from_row(row: &CollectedRow) -> std::result::Result<Self, Vec<&'static str>> {
        let mut missing = Vec::new();

        let code = row
            .first_text(&[
                fields::REQUESTED_CODE,
                fields::SHORT_CODE,
                fields::STOCK_SHORT_CODE,
            ])
            .and_then(|raw| InstrumentCode::new(raw).ok());
        if code.is_none() {
            missing.push(fields::REQUESTED_CODE);
        }

        let period_code = row.text(fields::REQUESTED_PERIOD);
        if period_code.is_none() {
            missing.push(fields::REQUESTED_PERIOD);
        }

        let business_date = row
            .text(fields::BUSINESS_DATE)
            .and_then(|raw| clock::parse_ymd(&raw).ok());
        if business_date.is_none() {
            missing.push(fields::BUSINESS_DATE);
        }

        let mut decimal = |key: &'static str| {
            let value = safe_decimal(row, key);
            if value.is_none() {
                missing.push(key);
            }
            value
        };
        let close = decimal(fields::CLOSE_PRICE);
        let open = decimal(fields::OPEN_PRICE);
        let volume = decimal(fields::ACCUMULATED_VOLUME);

        match (code, period_code, business_date, close, open, volume) {
            (Some(code), Some(period_code), Some(business_date), Some(close), Some(open), Some(volume)) => {
                Ok(Self {
                    code,
                    period_code,
                    business_date,
                    close,
                    open,
                    volume,
                })
            }
            _ => Err(missing),
        }
    }
}

/// 숫자 필드를 Decimal로 변환합니다. 비어 있거나 해석 불가하면 `None`.
fn safe_decimal(row: &CollectedRow, key: &str) -> Option<Decimal> {
    let raw = row.text(key)?;
    let trimmed = raw.trim();
    match Decimal::from_str(trimmed).or_else(|_| Decimal::from_scientific(trimmed)) {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(field = key, value = %raw, "Failed to convert value to Decimal");
            None
        }
    }
}

/// 영속화 결과 요약.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistReport {
    pub inserted: u64,
    pub skipped: usize,
    pub incoming: usize,
}

/// 기간별 시세 영속화 담당.
#[derive(Clone)]
pub struct DurableStoreWriter {
    store: Arc<dyn ChartPriceStore>,
    table: TableName,
}

impl DurableStoreWriter {
    pub fn new(store: Arc<dyn ChartPriceStore>, table: TableName) -> Self {
        Self { store, table }
    }

    pub fn table(&self) -> &TableName {
        &self.table
    }

    /// 유효한 행을 upsert합니다.
    ///
    /// 필드가 빠진 행은 건너뛰고 집계만 합니다. 데이터베이스 오류는 배치 전체를
    /// 중단시키며 호출자에게 전파됩니다.
    pub async fn persist(&self, rows: &[CollectedRow]) -> Result<PersistReport> {
        let mut report = PersistReport {
            incoming: rows.len(),
            ..Default::default()
        };
        if rows.is_empty() {
            return Ok(report);
        }

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            match ChartPriceRecord::from_row(row) {
                Ok(record) => records.push(record),
                Err(missing) => {
                    report.skipped += 1;
                    warn!(
                        code = ?row.first_text(&[fields::REQUESTED_CODE, fields::SHORT_CODE]),
                        date = ?row.text(fields::BUSINESS_DATE),
                        missing = ?missing,
                        "Skip chart price row due to missing fields"
                    );
                }
            }
        }

        if !records.is_empty() {
            report.inserted = self.store.upsert_all(&records).await.map_err(|e| {
                error!(table = %self.table, error = %e, "Failed to persist chart price rows");
                e
            })?;
        }

        info!(
            table = %self.table,
            inserted = report.inserted,
            skipped = report.skipped,
            incoming = report.incoming,
            "Persisted chart price rows"
        );

        Ok(report)
    }
}

/// 조회 결과 변환용.
pub(crate) fn record_from_columns(
    code: &str,
    period_code: String,
    business_date: NaiveDate,
    close: Decimal,
    open: Decimal,
    volume: Decimal,
) -> Result<ChartPriceRecord> {
    Ok(ChartPriceRecord {
        code: InstrumentCode::new(code).map_err(DataError::from)?,
        period_code,
        business_date,
        close,
        open,
        volume,
    })
}

//! 국내주식 기간별 시세 (일/주/월/년) 수집기.
//!
//! 한 번의 조회 응답 건수가 제한되므로 요청 기간을 최대 3개 구간으로 나누어
//! 순차 조회하고, 구간 사이에는 고정 지연을 둡니다 (클라이언트 throttle과 별개).

use super::{output_items, quote_headers, warn_on_status, MARKET_DIV_STOCK};
use crate::{paths, tr_id, KisApi, KisError, KisResult};
use chrono::{Duration as ChronoDuration, NaiveDate};
use krx_core::{clock, fields, CollectedRow, InstrumentCode, RowMetadata};
use reqwest::Method;
use std::time::Duration;
use tracing::debug;

/// 최대 분할 구간 수.
pub const MAX_CHUNKS: i64 = 3;
/// 기본 조회 기간 (일).
pub const DEFAULT_LOOKBACK_DAYS: i64 = 365;
/// 구간 사이 기본 지연.
pub const DEFAULT_CHUNK_DELAY: Duration = Duration::from_millis(500);

/// 기간 분류 코드.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PeriodDivCode {
    #[default]
    Day,
    Week,
    Month,
    Year,
}

impl PeriodDivCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodDivCode::Day => "D",
            PeriodDivCode::Week => "W",
            PeriodDivCode::Month => "M",
            PeriodDivCode::Year => "Y",
        }
    }
}

impl std::str::FromStr for PeriodDivCode {
    type Err = KisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "D" => Ok(PeriodDivCode::Day),
            "W" => Ok(PeriodDivCode::Week),
            "M" => Ok(PeriodDivCode::Month),
            "Y" => Ok(PeriodDivCode::Year),
            other => Err(KisError::ConfigError(format!("알 수 없는 기간 분류 코드: {}", other))),
        }
    }
}

/// 기간별 시세 조회 요청.
#[derive(Debug, Clone)]
pub struct DailyChartRequest {
    pub code: InstrumentCode,
    /// 조회 시작일 (기본: 종료일 365일 전)
    pub start_date: Option<NaiveDate>,
    /// 조회 종료일 (기본: 어제, KST)
    pub end_date: Option<NaiveDate>,
    pub period: PeriodDivCode,
    /// 수정주가 원주가 구분 ("0" 수정주가, "1" 원주가)
    pub org_adj_prc: String,
    pub chunk_delay: Duration,
}

impl DailyChartRequest {
    pub fn new(code: InstrumentCode) -> Self {
        Self {
            code,
            start_date: None,
            end_date: None,
            period: PeriodDivCode::Day,
            org_adj_prc: "1".to_string(),
            chunk_delay: DEFAULT_CHUNK_DELAY,
        }
    }

    pub fn with_range(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }

    pub fn with_period(mut self, period: PeriodDivCode) -> Self {
        self.period = period;
        self
    }

    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    /// 기본값을 채우고 역순 범위를 바로잡은 (시작, 종료)일.
    pub fn resolve_range(&self, yesterday: NaiveDate) -> (NaiveDate, NaiveDate) {
        let end = self.end_date.unwrap_or(yesterday);
        let start = self
            .start_date
            .unwrap_or(end - ChronoDuration::days(DEFAULT_LOOKBACK_DAYS));
        if start > end {
            (end, start)
        } else {
            (start, end)
        }
    }
}

/// 기간을 최대 3개의 연속 구간으로 분할합니다.
///
/// 각 구간 길이는 남은 일수를 남은 구간 수로 올림 나눗셈한 값입니다.
pub fn build_date_ranges(start: NaiveDate, end: NaiveDate) -> Vec<(NaiveDate, NaiveDate)> {
    let mut ranges = Vec::new();
    let mut remaining_chunks = MAX_CHUNKS;
    let mut current = start;

    while current <= end && remaining_chunks > 0 {
        let remaining_days = (end - current).num_days() + 1;
        let span = ((remaining_days + remaining_chunks - 1) / remaining_chunks).max(1);
        let chunk_end = (current + ChronoDuration::days(span - 1)).min(end);
        ranges.push((current, chunk_end));
        current = chunk_end + ChronoDuration::days(1);
        remaining_chunks -= 1;
    }

    ranges
}

/// 기간별 시세 조회.
///
/// 구간별 `output2` 항목을 순서대로 이어 붙입니다. 각 행의 응답 상태는
/// 해당 행을 받은 구간의 응답 기준입니다.
pub async fn fetch_daily_chartprice(
    api: &dyn KisApi,
    request: &DailyChartRequest,
) -> KisResult<Vec<CollectedRow>> {
    let (start, end) = request.resolve_range(clock::yesterday_kst());
    let code = &request.code;

    let mut meta = RowMetadata::new(clock::collected_at_now())
        .with_requested(fields::REQUESTED_CODE, code.as_str())
        .with_requested(fields::REQUESTED_DATE_1, clock::format_ymd(start))
        .with_requested(fields::REQUESTED_DATE_2, clock::format_ymd(end))
        .with_requested(fields::REQUESTED_PERIOD, request.period.as_str())
        .with_requested(fields::REQUESTED_ORG_ADJ_PRC, request.org_adj_prc.as_str());

    let chunks = build_date_ranges(start, end);
    let mut rows = Vec::new();

    for (idx, (chunk_start, chunk_end)) in chunks.iter().enumerate() {
        let params = [
            ("FID_COND_MRKT_DIV_CODE", MARKET_DIV_STOCK.to_string()),
            ("FID_INPUT_ISCD", code.to_string()),
            ("FID_INPUT_DATE_1", clock::format_ymd(*chunk_start)),
            ("FID_INPUT_DATE_2", clock::format_ymd(*chunk_end)),
            ("FID_PERIOD_DIV_CODE", request.period.as_str().to_string()),
            ("FID_ORG_ADJ_PRC", request.org_adj_prc.clone()),
        ];

        let response = api
            .request(
                Method::GET,
                paths::INQUIRE_DAILY_ITEMCHARTPRICE,
                &params,
                &quote_headers(tr_id::INQUIRE_DAILY_ITEMCHARTPRICE),
            )
            .await?;

        meta.update_status(&response);
        warn_on_status(&meta, "inquire-daily-itemchartprice", Some(code));

        let items = output_items(&response, "output2");
        debug!(
            code = %code,
            chunk = idx + 1,
            total_chunks = chunks.len(),
            rows = items.len(),
            "기간별 시세 구간 조회"
        );
        rows.extend(items.into_iter().map(|item| meta.apply(Some(item))));

        if idx + 1 < chunks.len() && !request.chunk_delay.is_zero() {
            tokio::time::sleep(request.chunk_delay).await;
        }
    }

    Ok(rows)
}

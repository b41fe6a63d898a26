//! 한국 시장 시각 헬퍼.
//!
//! KIS API는 모든 날짜/시각 파라미터를 한국 표준시(Asia/Seoul) 기준으로 받습니다.

use crate::error::CoreError;
use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};
use chrono_tz::{Asia::Seoul, Tz};

/// 현재 한국 시각.
pub fn now_kst() -> DateTime<Tz> {
    Utc::now().with_timezone(&Seoul)
}

/// 초/나노초를 0으로 절삭.
pub fn truncate_to_minute(dt: DateTime<Tz>) -> DateTime<Tz> {
    dt.with_second(0)
        .and_then(|d| d.with_nanosecond(0))
        .unwrap_or(dt)
}

/// `collected_at` 표기 ("YYYY-MM-DD HH:MM:SS+09:00").
pub fn format_collected_at(dt: DateTime<Tz>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S%:z").to_string()
}

/// 분 단위로 절삭한 현재 수집 시각.
pub fn collected_at_now() -> String {
    format_collected_at(truncate_to_minute(now_kst()))
}

/// 오늘 날짜 (KST).
pub fn today_kst() -> NaiveDate {
    now_kst().date_naive()
}

/// 어제 날짜 (KST).
pub fn yesterday_kst() -> NaiveDate {
    today_kst() - Duration::days(1)
}

/// `YYYYMMDD` 형식.
pub fn format_ymd(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// `HHMMSS` 형식.
pub fn format_hms(dt: DateTime<Tz>) -> String {
    dt.format("%H%M%S").to_string()
}

/// `YYYYMMDD` 또는 `YYYY-MM-DD` 파싱.
pub fn parse_ymd(s: &str) -> Result<NaiveDate, CoreError> {
    let trimmed = s.trim();
    NaiveDate::parse_from_str(trimmed, "%Y%m%d")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%Y-%m-%d"))
        .map_err(|_| CoreError::InvalidDate(s.to_string()))
}

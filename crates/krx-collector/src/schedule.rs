//! 거래량 순위 수집 주기.
//!
//! 초 단위 설정값을 6필드 cron 표현식(초 포함)으로 변환합니다. cron 표현식은
//! 로그와 운영 확인용이며, 실제 타이머는 같은 주기의 `tokio::time::interval`입니다.

use std::time::Duration;
use tracing::warn;

/// 기본 주기 (5분).
pub const DEFAULT_INTERVAL_SECS: u64 = 300;

const FALLBACK_CRON: &str = "0 */5 * * * *";

/// 변환된 수집 주기.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeRankSchedule {
    pub interval_secs: u64,
    pub cron: String,
}

impl Default for VolumeRankSchedule {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_INTERVAL_SECS,
            cron: FALLBACK_CRON.to_string(),
        }
    }
}

impl VolumeRankSchedule {
    /// 설정 문자열에서 주기를 결정합니다.
    ///
    /// 정수가 아니면 300초, 1 미만은 1초로 보정합니다.
    pub fn from_setting(raw: Option<&str>) -> Self {
        let raw = raw.unwrap_or("300");
        let seconds = match raw.trim().parse::<i64>() {
            Ok(value) => value.max(1) as u64,
            Err(_) => {
                warn!(value = raw, "VOLUME_RANK_PULLING_INTERVAL 값이 잘못되어 300초로 대체합니다");
                DEFAULT_INTERVAL_SECS
            }
        };
        Self::from_secs(seconds)
    }

    /// 초 단위 주기를 cron 표현식으로 변환합니다.
    ///
    /// 분/시 단위로 나누어떨어지지 않는 값은 5분 주기로 대체합니다.
    pub fn from_secs(seconds: u64) -> Self {
        let seconds = seconds.max(1);

        if seconds < 60 {
            return Self {
                interval_secs: seconds,
                cron: format!("*/{} * * * * *", seconds),
            };
        }

        let (minutes, rem_secs) = (seconds / 60, seconds % 60);
        if rem_secs == 0 && minutes < 60 {
            return Self {
                interval_secs: seconds,
                cron: format!("0 */{} * * * *", minutes),
            };
        }

        let (hours, rem_mins) = (minutes / 60, minutes % 60);
        if rem_secs == 0 && rem_mins == 0 && hours < 24 {
            return Self {
                interval_secs: seconds,
                cron: format!("0 0 */{} * * *", hours),
            };
        }

        warn!(interval = seconds, "지원하지 않는 주기이므로 5분 주기로 대체합니다");
        Self::default()
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

//! 요청 간 최소 간격 보장.

use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// 마지막 요청 시각 기준의 단순 throttle.
///
/// 마지막 요청 이후 `min_interval`이 지나지 않았다면 남은 시간만큼 대기합니다.
#[derive(Debug, Clone)]
pub struct Throttle {
    min_interval: Duration,
    last_request_at: Option<Instant>,
}

impl Throttle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request_at: None,
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn last_request_at(&self) -> Option<Instant> {
        self.last_request_at
    }

    /// `now` 기준 남은 대기 시간.
    pub fn remaining_at(&self, now: Instant) -> Duration {
        match self.last_request_at {
            Some(last) => self
                .min_interval
                .saturating_sub(now.saturating_duration_since(last)),
            None => Duration::ZERO,
        }
    }

    /// 필요한 만큼 대기.
    pub async fn wait(&self) {
        let remaining = self.remaining_at(Instant::now());
        if !remaining.is_zero() {
            debug!(wait_ms = remaining.as_millis() as u64, "throttle 대기");
            tokio::time::sleep(remaining).await;
        }
    }

    /// 요청 시각 기록.
    pub fn mark(&mut self, at: Instant) {
        self.last_request_at = Some(at);
    }
}

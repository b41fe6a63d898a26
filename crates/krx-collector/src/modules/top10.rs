//! 거래량 순위 TOP10 스냅샷.
//!
//! 기본 토픽의 거래량 순위 메시지에서 상위 10개 행을 추려 고정 키에 저장합니다.
//! 실패는 로그만 남기고 전파하지 않습니다.

use crate::trigger;
use krx_data::{CacheWriter, TriggerMessage};
use tracing::{error, info, warn};

#[derive(Clone)]
pub struct Top10Snapshot {
    cache: CacheWriter,
    key: String,
}

impl Top10Snapshot {
    pub fn new(cache: CacheWriter, key: impl Into<String>) -> Self {
        Self {
            cache,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// 배치를 처리하고 저장에 성공한 메시지 수를 반환합니다.
    pub async fn handle_batch(&self, messages: &[TriggerMessage]) -> usize {
        let mut saved = 0;

        for message in messages {
            let body = match std::str::from_utf8(&message.body) {
                Ok(body) => body,
                Err(e) => {
                    warn!(error = %e, "Failed to decode message body, skipping");
                    continue;
                }
            };

            let rows = trigger::extract_rows(body);
            if rows.is_empty() {
                info!("No rows extracted from payload");
                continue;
            }

            match self.cache.write_top10(&self.key, &rows).await {
                Ok(0) => info!("No top10 meta built from rows"),
                Ok(count) => {
                    saved += 1;
                    info!(key = %self.key, count, sequence = ?message.sequence, "Saved top10 snapshot");
                }
                Err(e) => error!(key = %self.key, error = %e, "Failed to save top10 snapshot"),
            }
        }

        saved
    }
}

//! 하류 토픽 발행.

use crate::error::Result;
use crate::traits::EventPublisher;
use krx_core::CollectedRow;
use std::sync::Arc;
use tracing::info;

/// 집계 결과를 JSON 배열로 직렬화해 한 번 발행합니다.
#[derive(Clone)]
pub struct DownstreamEmitter {
    publisher: Arc<dyn EventPublisher>,
    topic: String,
}

impl DownstreamEmitter {
    pub fn new(publisher: Arc<dyn EventPublisher>, topic: impl Into<String>) -> Self {
        Self {
            publisher,
            topic: topic.into(),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// 비어 있지 않을 때만 발행합니다. 발행 여부를 반환합니다.
    pub async fn emit(&self, rows: &[CollectedRow]) -> Result<bool> {
        if rows.is_empty() {
            return Ok(false);
        }

        let payload = serde_json::to_string(rows)?;
        self.publisher.publish(&self.topic, &payload).await?;

        info!(topic = %self.topic, rows = rows.len(), "Emitted aggregate downstream");
        Ok(true)
    }
}

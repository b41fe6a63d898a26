//! 거래량 순위 주기 수집 및 발행.

use crate::Result;
use krx_data::EventPublisher;
use krx_kis::collectors::{self, VolumeRankRequest};
use krx_kis::KisApi;
use std::sync::Arc;
use tracing::info;

/// 거래량 순위를 조회해 기본 토픽과 거래량 순위 토픽에 발행합니다.
#[derive(Clone)]
pub struct VolumeRankJob {
    api: Arc<dyn KisApi>,
    publisher: Arc<dyn EventPublisher>,
    topics: Vec<String>,
    request: VolumeRankRequest,
}

impl VolumeRankJob {
    /// `topics`의 중복은 제거합니다 (순서 유지).
    pub fn new(
        api: Arc<dyn KisApi>,
        publisher: Arc<dyn EventPublisher>,
        topics: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let mut unique: Vec<String> = Vec::new();
        for topic in topics {
            let topic = topic.into();
            if !unique.contains(&topic) {
                unique.push(topic);
            }
        }
        Self {
            api,
            publisher,
            topics: unique,
            request: VolumeRankRequest::default(),
        }
    }

    pub fn with_request(mut self, request: VolumeRankRequest) -> Self {
        self.request = request;
        self
    }

    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    /// 한 번 조회하고 발행합니다. 발행한 순위 행 수를 반환합니다.
    pub async fn run_once(&self) -> Result<usize> {
        let rank = collectors::fetch_volume_rank(self.api.as_ref(), &self.request).await?;
        let payload = rank.to_payload().to_string();

        for topic in &self.topics {
            self.publisher.publish(topic, &payload).await?;
        }

        info!(
            rows = rank.rows.len(),
            rt_cd = rank.meta.rt_cd.as_deref().unwrap_or("null"),
            topics = ?self.topics,
            "Published volume rank"
        );
        Ok(rank.rows.len())
    }
}

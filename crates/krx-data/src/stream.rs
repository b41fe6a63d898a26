//! Redis pub/sub 기반 이벤트 스트림.
//!
//! 토픽 이름을 그대로 채널 이름으로 사용합니다. 구독은 전용 pub/sub 연결을
//! 열고 백그라운드 태스크가 수신 메시지를 mpsc 채널로 전달합니다.

use crate::error::{DataError, Result};
use crate::traits::{EventPublisher, EventSubscriber};
use async_trait::async_trait;
use futures::StreamExt;
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// 구독 채널 버퍼 크기.
const SUBSCRIPTION_BUFFER: usize = 1024;

/// 스트림에서 수신한 트리거 메시지.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerMessage {
    pub topic: String,
    /// 원본 바이트 (UTF-8 검증 전)
    pub body: Vec<u8>,
    /// 구독 내 수신 순번
    pub sequence: Option<u64>,
}

impl TriggerMessage {
    pub fn new(topic: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            body: body.into(),
            sequence: None,
        }
    }

    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = Some(sequence);
        self
    }
}

/// Redis pub/sub 스트림.
#[derive(Clone)]
pub struct RedisStream {
    client: Client,
    connection: ConnectionManager,
}

impl RedisStream {
    pub fn new(client: Client, connection: ConnectionManager) -> Self {
        Self { client, connection }
    }
}

#[async_trait]
impl EventPublisher for RedisStream {
    async fn publish(&self, topic: &str, payload: &str) -> Result<()> {
        let mut conn = self.connection.clone();
        let receivers: i64 = conn
            .publish(topic, payload)
            .await
            .map_err(|e| DataError::StreamError(e.to_string()))?;

        debug!(topic, receivers, bytes = payload.len(), "Published event");
        Ok(())
    }
}

#[async_trait]
impl EventSubscriber for RedisStream {
    async fn subscribe(&self, topic: &str) -> Result<mpsc::Receiver<TriggerMessage>> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|e| DataError::StreamError(e.to_string()))?;
        pubsub
            .subscribe(topic)
            .await
            .map_err(|e| DataError::StreamError(e.to_string()))?;

        info!(topic, "Subscribed to topic");

        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let topic = topic.to_string();

        tokio::spawn(async move {
            let mut messages = pubsub.into_on_message();
            let mut sequence = 0u64;

            while let Some(msg) = messages.next().await {
                sequence += 1;
                let message = TriggerMessage::new(msg.get_channel_name(), msg.get_payload_bytes())
                    .with_sequence(sequence);

                if tx.send(message).await.is_err() {
                    debug!(topic = %topic, "Subscriber dropped, stopping relay");
                    return;
                }
            }

            warn!(topic = %topic, "Subscription stream ended");
        });

        Ok(rx)
    }
}

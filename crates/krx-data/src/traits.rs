//! 저장소/스트림 trait 정의.
//!
//! 파이프라인은 이 trait에만 의존하므로 Redis/PostgreSQL 구현과
//! 메모리 구현(`memory`)을 교체해서 사용할 수 있습니다.

use async_trait::async_trait;
use krx_core::InstrumentCode;
use std::collections::BTreeMap;
use tokio::sync::mpsc;

use crate::chart_store::ChartPriceRecord;
use crate::error::Result;
use crate::stream::TriggerMessage;

/// 키-값 캐시.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// 문자열 값 덮어쓰기 (TTL 없음).
    async fn set_string(&self, key: &str, value: &str) -> Result<()>;

    /// 해시 필드 덮어쓰기.
    async fn set_hash(&self, key: &str, fields: &[(String, String)]) -> Result<()>;

    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    async fn get_hash(&self, key: &str) -> Result<BTreeMap<String, String>>;
}

/// 기간별 시세 저장소.
#[async_trait]
pub trait ChartPriceStore: Send + Sync {
    /// 레코드 전체를 하나의 트랜잭션으로 upsert합니다.
    ///
    /// 하나라도 실패하면 전체가 롤백되고 에러를 반환합니다.
    async fn upsert_all(&self, records: &[ChartPriceRecord]) -> Result<u64>;

    /// 최근 레코드부터 최대 `limit`건 조회.
    async fn fetch_history(
        &self,
        code: &InstrumentCode,
        period_code: &str,
        limit: i64,
    ) -> Result<Vec<ChartPriceRecord>>;
}

/// 토픽 발행.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, topic: &str, payload: &str) -> Result<()>;
}

/// 토픽 구독.
#[async_trait]
pub trait EventSubscriber: Send + Sync {
    /// 구독을 시작하고 메시지 수신 채널을 반환합니다.
    async fn subscribe(&self, topic: &str) -> Result<mpsc::Receiver<TriggerMessage>>;
}

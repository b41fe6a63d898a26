//! 메모리 기반 저장소 구현.
//!
//! 테스트와 오프라인 실행에서 Redis/PostgreSQL 대신 사용합니다.

use crate::chart_store::ChartPriceRecord;
use crate::error::{DataError, Result};
use crate::stream::TriggerMessage;
use crate::traits::{CacheStore, ChartPriceStore, EventPublisher, EventSubscriber};
use async_trait::async_trait;
use chrono::NaiveDate;
use krx_core::InstrumentCode;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::mpsc;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// =============================================================================
// Cache
// =============================================================================

/// 메모리 캐시.
#[derive(Debug, Default)]
pub struct MemoryCache {
    strings: Mutex<BTreeMap<String, String>>,
    hashes: Mutex<BTreeMap<String, BTreeMap<String, String>>>,
    failing_keys: HashSet<String>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 지정한 키 쓰기를 항상 실패시킵니다.
    pub fn fail_on(mut self, key: impl Into<String>) -> Self {
        self.failing_keys.insert(key.into());
        self
    }

    pub fn string(&self, key: &str) -> Option<String> {
        lock(&self.strings).get(key).cloned()
    }

    pub fn hash(&self, key: &str) -> BTreeMap<String, String> {
        lock(&self.hashes).get(key).cloned().unwrap_or_default()
    }

    /// 저장된 모든 키 (정렬됨).
    pub fn keys(&self) -> Vec<String> {
        let mut keys: BTreeSet<String> = lock(&self.strings).keys().cloned().collect();
        keys.extend(lock(&self.hashes).keys().cloned());
        keys.into_iter().collect()
    }

    fn check(&self, key: &str) -> Result<()> {
        if self.failing_keys.contains(key) {
            return Err(DataError::CacheError(format!("simulated failure for {}", key)));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn set_string(&self, key: &str, value: &str) -> Result<()> {
        self.check(key)?;
        lock(&self.strings).insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn set_hash(&self, key: &str, fields: &[(String, String)]) -> Result<()> {
        self.check(key)?;
        let mut hashes = lock(&self.hashes);
        let entry = hashes.entry(key.to_string()).or_default();
        for (field, value) in fields {
            entry.insert(field.clone(), value.clone());
        }
        Ok(())
    }

    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        Ok(self.string(key))
    }

    async fn get_hash(&self, key: &str) -> Result<BTreeMap<String, String>> {
        Ok(self.hash(key))
    }
}

// =============================================================================
// Chart price store
// =============================================================================

type ChartKey = (InstrumentCode, String, NaiveDate);

/// 메모리 기간별 시세 저장소. (종목, 기간구분, 일자) 기준으로 덮어씁니다.
#[derive(Debug, Default)]
pub struct MemoryChartStore {
    records: Mutex<BTreeMap<ChartKey, ChartPriceRecord>>,
    fail: bool,
}

impl MemoryChartStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 모든 upsert가 실패하는 저장소.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.records).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 키 순서로 정렬된 전체 레코드.
    pub fn records(&self) -> Vec<ChartPriceRecord> {
        lock(&self.records).values().cloned().collect()
    }
}

#[async_trait]
impl ChartPriceStore for MemoryChartStore {
    async fn upsert_all(&self, records: &[ChartPriceRecord]) -> Result<u64> {
        if self.fail {
            return Err(DataError::QueryError("simulated database failure".to_string()));
        }
        let mut stored = lock(&self.records);
        for record in records {
            let key = (
                record.code.clone(),
                record.period_code.clone(),
                record.business_date,
            );
            stored.insert(key, record.clone());
        }
        Ok(records.len() as u64)
    }

    async fn fetch_history(
        &self,
        code: &InstrumentCode,
        period_code: &str,
        limit: i64,
    ) -> Result<Vec<ChartPriceRecord>> {
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(lock(&self.records)
            .values()
            .rev()
            .filter(|r| &r.code == code && r.period_code == period_code)
            .take(limit)
            .cloned()
            .collect())
    }
}

// =============================================================================
// Stream
// =============================================================================

/// 메모리 이벤트 버스. 발행 내역을 기록하고 구독자에게 전달합니다.
#[derive(Debug, Default)]
pub struct MemoryPublisher {
    published: Mutex<Vec<(String, String)>>,
    subscribers: Mutex<Vec<(String, mpsc::Sender<TriggerMessage>)>>,
    fail: bool,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// 모든 발행이 실패하는 버스.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// (topic, payload) 발행 내역.
    pub fn published(&self) -> Vec<(String, String)> {
        lock(&self.published).clone()
    }

    pub fn count(&self, topic: &str) -> usize {
        lock(&self.published).iter().filter(|(t, _)| t == topic).count()
    }
}

#[async_trait]
impl EventPublisher for MemoryPublisher {
    async fn publish(&self, topic: &str, payload: &str) -> Result<()> {
        if self.fail {
            return Err(DataError::StreamError(format!("simulated failure for {}", topic)));
        }
        lock(&self.published).push((topic.to_string(), payload.to_string()));

        let mut subscribers = lock(&self.subscribers);
        subscribers.retain(|(_, tx)| !tx.is_closed());
        for (subscribed, tx) in subscribers.iter() {
            if subscribed == topic {
                tx.try_send(TriggerMessage::new(topic, payload))
                    .map_err(|e| DataError::StreamError(e.to_string()))?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl EventSubscriber for MemoryPublisher {
    async fn subscribe(&self, topic: &str) -> Result<mpsc::Receiver<TriggerMessage>> {
        let (tx, rx) = mpsc::channel(64);
        lock(&self.subscribers).push((topic.to_string(), tx));
        Ok(rx)
    }
}

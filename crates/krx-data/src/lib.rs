//! 수집 결과 저장 및 전파.
//!
//! 이 crate는 다음을 제공합니다:
//! - Redis 캐시 (`storage::redis`) 와 종목별 캐시 기록 (`cache_writer`)
//! - PostgreSQL 기간별 시세 저장소 (`storage::postgres`) 와 검증 후 upsert (`chart_store`)
//! - Redis pub/sub 기반 이벤트 스트림 (`stream`) 과 하류 발행 (`emitter`)
//! - 테스트용 메모리 구현 (`memory`)

pub mod cache_writer;
pub mod chart_store;
pub mod emitter;
pub mod error;
pub mod memory;
pub mod storage;
pub mod stream;
pub mod traits;

pub use cache_writer::{build_top10_meta, CacheKind, CacheVariant, CacheWriteReport, CacheWriter};
pub use chart_store::{ChartPriceRecord, DurableStoreWriter, PersistReport, TableName};
pub use emitter::DownstreamEmitter;
pub use error::{DataError, Result};
pub use memory::{MemoryCache, MemoryChartStore, MemoryPublisher};
pub use storage::postgres::{PgChartPriceStore, PostgresConfig};
pub use storage::redis::{RedisCache, RedisConfig};
pub use stream::{RedisStream, TriggerMessage};
pub use traits::{CacheStore, ChartPriceStore, EventPublisher, EventSubscriber};

//! 핸들러 공유 상태.

use krx_data::{CacheStore, ChartPriceStore};
use std::sync::Arc;

/// 기본 TOP10 캐시 키.
pub const DEFAULT_TOP10_KEY: &str = "volume_rank:top10";

pub struct AppState {
    /// 시세 캐시 (Redis)
    pub cache: Arc<dyn CacheStore>,
    /// 기간별 시세 저장소 (PostgreSQL 미설정 시 `None`)
    pub history: Option<Arc<dyn ChartPriceStore>>,
    /// 거래량 TOP10 스냅샷 키
    pub top10_key: String,
}

impl AppState {
    pub fn new(cache: Arc<dyn CacheStore>) -> Self {
        Self {
            cache,
            history: None,
            top10_key: DEFAULT_TOP10_KEY.to_string(),
        }
    }

    pub fn with_history(mut self, history: Arc<dyn ChartPriceStore>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn with_top10_key(mut self, key: impl Into<String>) -> Self {
        self.top10_key = key.into();
        self
    }
}

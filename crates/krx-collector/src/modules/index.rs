//! 업종 지수 일회성 수집.

use krx_core::{CollectedRow, InstrumentCode};
use krx_kis::collectors;
use krx_kis::KisApi;
use std::fmt;
use std::str::FromStr;
use tracing::error;

use crate::error::CollectorError;

/// 지수 수집 대상.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexTarget {
    /// 업종 현재지수
    Price,
    /// 업종 시간별 지수 (틱)
    Tick,
}

impl IndexTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexTarget::Price => "index-price",
            IndexTarget::Tick => "index-tick",
        }
    }
}

impl fmt::Display for IndexTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndexTarget {
    type Err = CollectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "index-price" => Ok(IndexTarget::Price),
            "index-tick" => Ok(IndexTarget::Tick),
            other => Err(CollectorError::Config(format!("Unknown index target: {}", other))),
        }
    }
}

/// 업종 코드별로 조회한 행을 이어 붙입니다. 실패한 코드는 로그 후 건너뜁니다.
pub async fn collect_index(
    api: &dyn KisApi,
    target: IndexTarget,
    codes: &[InstrumentCode],
) -> Vec<CollectedRow> {
    let mut rows = Vec::new();

    for code in codes {
        let result = match target {
            IndexTarget::Price => collectors::fetch_index_price(api, code).await.map(|row| vec![row]),
            IndexTarget::Tick => collectors::fetch_index_tickprice(api, code).await,
        };
        match result {
            Ok(collected) => rows.extend(collected),
            Err(e) => error!(%target, code = %code, error = %e, "Index collection failed"),
        }
    }

    rows
}

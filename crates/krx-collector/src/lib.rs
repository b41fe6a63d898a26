//! KIS 국내 주식 시세 수집기.
//!
//! 이 crate는 다음을 제공합니다:
//! - 거래량 순위 주기 수집 및 스트림 발행
//! - 트리거 메시지 기반 종목별 수집 (현재가, 시간대별 체결, 투자자 매매동향, 기간별 시세)
//! - 거래량 TOP10 스냅샷 캐시
//! - 데몬/일회성 실행을 위한 CLI

pub mod config;
pub mod error;
pub mod modules;
pub mod schedule;
pub mod stats;
pub mod subscription;
pub mod trigger;

pub use config::{CollectorConfig, StreamConfig};
pub use error::{CollectorError, Result};
pub use modules::{Dispatcher, Pipeline, Top10Snapshot, VolumeRankJob};
pub use schedule::VolumeRankSchedule;
pub use stats::DispatchStats;

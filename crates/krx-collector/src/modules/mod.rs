//! 수집 작업 모듈.

pub mod dispatch;
pub mod index;
pub mod top10;
pub mod volume_rank;

pub use dispatch::{BatchContext, Dispatcher, Pipeline};
pub use index::{collect_index, IndexTarget};
pub use top10::Top10Snapshot;
pub use volume_rank::VolumeRankJob;

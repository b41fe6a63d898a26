//! KRX 시세 수집 파이프라인의 핵심 도메인 타입.
//!
//! 이 crate는 모든 하위 crate가 공유하는 타입을 제공합니다:
//! - 종목 코드 (`InstrumentCode`)
//! - 수집 행 및 메타데이터 (`CollectedRow`, `RowMetadata`)
//! - 한국 시장 시각 헬퍼 (`clock`)
//! - 로깅 초기화 (`logging`)

pub mod clock;
pub mod code;
pub mod error;
pub mod logging;
pub mod row;

pub use code::InstrumentCode;
pub use error::CoreError;
pub use row::{fields, CollectedRow, RowMetadata};

//! 외부 저장소 구현.

pub mod postgres;
pub mod redis;

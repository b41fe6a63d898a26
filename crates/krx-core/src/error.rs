//! 핵심 도메인 에러 타입.

use thiserror::Error;

/// 도메인 값 검증 에러.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// 유효하지 않은 종목 코드
    #[error("Invalid instrument code: {0:?}")]
    InvalidCode(String),

    /// 유효하지 않은 SQL 식별자 (스키마/테이블 이름)
    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    /// 날짜 형식 오류
    #[error("Invalid date: {0:?}")]
    InvalidDate(String),
}

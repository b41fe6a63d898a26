//! KIS 클라이언트 에러 타입.

use thiserror::Error;

/// KIS API 호출 에러.
#[derive(Debug, Error)]
pub enum KisError {
    /// 네트워크/연결 에러 (HTTP 응답을 받지 못함)
    #[error("Network error: {0}")]
    NetworkError(String),

    /// 요청 타임아웃
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// 인증 실패 (토큰 발급 거부)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// 2xx 이외의 HTTP 응답
    #[error("HTTP error {status}: {body}")]
    Http { status: u16, body: String },

    /// 응답 파싱 에러
    #[error("Parse error: {0}")]
    ParseError(String),

    /// 설정 에러
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl KisError {
    /// 재시도 가능한 에러인지 확인.
    pub fn is_retryable(&self) -> bool {
        match self {
            KisError::NetworkError(_) | KisError::Timeout(_) => true,
            KisError::Http { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// 인증 관련 에러인지 확인.
    pub fn is_auth_error(&self) -> bool {
        match self {
            KisError::Unauthorized(_) => true,
            KisError::Http { status, .. } => *status == 401 || *status == 403,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for KisError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            KisError::Timeout(err.to_string())
        } else {
            KisError::NetworkError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for KisError {
    fn from(err: serde_json::Error) -> Self {
        KisError::ParseError(err.to_string())
    }
}

//! 한국투자증권 (KIS) API 설정.
//!
//! 시세 조회에는 app_key와 app_secret만 필요합니다 (계좌번호 불필요).

use crate::error::KisError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// 기본 HTTP 타임아웃 (초).
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
/// 기본 요청 간 최소 간격 (밀리초).
pub const DEFAULT_REQUEST_INTERVAL_MS: u64 = 500;

/// KIS API 환경 유형.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum KisEnvironment {
    /// 실전투자
    #[default]
    Real,
    /// 모의투자
    Paper,
}

impl KisEnvironment {
    /// 이 환경의 REST API 기본 URL 반환.
    pub fn rest_base_url(&self) -> &'static str {
        match self {
            KisEnvironment::Real => "https://openapi.koreainvestment.com:9443",
            KisEnvironment::Paper => "https://openapivts.koreainvestment.com:29443",
        }
    }
}

impl std::str::FromStr for KisEnvironment {
    type Err = KisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "real" | "prod" | "production" => Ok(KisEnvironment::Real),
            "paper" | "mock" | "vts" => Ok(KisEnvironment::Paper),
            other => Err(KisError::ConfigError(format!(
                "알 수 없는 KIS_ENVIRONMENT 값: {}",
                other
            ))),
        }
    }
}

/// KIS API 설정.
#[derive(Clone, Serialize, Deserialize)]
pub struct KisConfig {
    /// 앱키
    pub app_key: String,
    /// 앱시크릿
    pub app_secret: String,
    pub environment: KisEnvironment,
    /// 기본 URL 직접 지정 (테스트/프록시용)
    pub base_url: Option<String>,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
    /// 요청 간 최소 간격 (밀리초)
    pub request_interval_ms: u64,
}

impl fmt::Debug for KisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KisConfig")
            .field("app_key", &mask(&self.app_key))
            .field("app_secret", &"***")
            .field("environment", &self.environment)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("request_interval_ms", &self.request_interval_ms)
            .finish()
    }
}

impl KisConfig {
    /// 새로운 KIS 설정 생성 (실전 환경, 기본 타임아웃/간격).
    pub fn new(app_key: impl Into<String>, app_secret: impl Into<String>) -> Self {
        Self {
            app_key: app_key.into(),
            app_secret: app_secret.into(),
            environment: KisEnvironment::Real,
            base_url: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            request_interval_ms: DEFAULT_REQUEST_INTERVAL_MS,
        }
    }

    pub fn with_environment(mut self, env: KisEnvironment) -> Self {
        self.environment = env;
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_request_interval(mut self, interval: Duration) -> Self {
        self.request_interval_ms = interval.as_millis() as u64;
        self
    }

    /// REST API 기본 URL (끝의 `/` 제거).
    pub fn rest_base_url(&self) -> &str {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/'),
            None => self.environment.rest_base_url(),
        }
    }

    pub fn request_interval(&self) -> Duration {
        Duration::from_millis(self.request_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// 자격 증명 검증.
    pub fn validate(&self) -> Result<(), KisError> {
        if self.app_key.trim().is_empty() {
            return Err(KisError::ConfigError(
                "KIS_APP_KEY 환경변수가 설정되지 않았습니다".to_string(),
            ));
        }
        if self.app_secret.trim().is_empty() {
            return Err(KisError::ConfigError(
                "KIS_APP_SECRET 환경변수가 설정되지 않았습니다".to_string(),
            ));
        }
        Ok(())
    }

    /// 환경변수에서 설정 로드.
    ///
    /// - `KIS_APP_KEY`, `KIS_APP_SECRET` (필수)
    /// - `KIS_ENVIRONMENT` (real/paper, 기본 real)
    /// - `KIS_BASE_URL` (선택)
    /// - `KIS_REQUEST_INTERVAL` (초, 소수 허용, 기본 0.5)
    /// - `KIS_TIMEOUT_SECS` (기본 10)
    pub fn from_env() -> Result<Self, KisError> {
        let app_key = std::env::var("KIS_APP_KEY").unwrap_or_default();
        let app_secret = std::env::var("KIS_APP_SECRET").unwrap_or_default();

        let mut config = Self::new(app_key, app_secret);

        if let Ok(env) = std::env::var("KIS_ENVIRONMENT") {
            config.environment = env.parse()?;
        }
        if let Ok(url) = std::env::var("KIS_BASE_URL") {
            if !url.trim().is_empty() {
                config.base_url = Some(url.trim().to_string());
            }
        }
        if let Ok(raw) = std::env::var("KIS_REQUEST_INTERVAL") {
            config.request_interval_ms = parse_interval_ms(&raw).ok_or_else(|| {
                KisError::ConfigError(format!("KIS_REQUEST_INTERVAL 값이 올바르지 않습니다: {}", raw))
            })?;
        }
        if let Ok(raw) = std::env::var("KIS_TIMEOUT_SECS") {
            config.timeout_secs = raw.trim().parse().map_err(|_| {
                KisError::ConfigError(format!("KIS_TIMEOUT_SECS 값이 올바르지 않습니다: {}", raw))
            })?;
        }

        config.validate()?;
        Ok(config)
    }
}

/// 초 단위 문자열 ("0.5")을 밀리초로 변환.
fn parse_interval_ms(raw: &str) -> Option<u64> {
    let secs: f64 = raw.trim().parse().ok()?;
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    Some((secs * 1000.0).round() as u64)
}

fn mask(value: &str) -> String {
    let prefix: String = value.chars().take(4).collect();
    format!("{}***", prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = KisConfig::new("key", "secret");
        assert_eq!(config.environment, KisEnvironment::Real);
        assert_eq!(
            config.rest_base_url(),
            "https://openapi.koreainvestment.com:9443"
        );
        assert_eq!(config.request_interval(), Duration::from_millis(500));
        assert_eq!(config.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_base_url_override() {
        let config = KisConfig::new("key", "secret").with_base_url("http://127.0.0.1:1234/");
        assert_eq!(config.rest_base_url(), "http://127.0.0.1:1234");

        let paper = KisConfig::new("key", "secret").with_environment(KisEnvironment::Paper);
        assert_eq!(
            paper.rest_base_url(),
            "https://openapivts.koreainvestment.com:29443"
        );
    }

    #[test]
    fn test_parse_interval() {
        assert_eq!(parse_interval_ms("0.5"), Some(500));
        assert_eq!(parse_interval_ms("2"), Some(2000));
        assert_eq!(parse_interval_ms("-1"), None);
        assert_eq!(parse_interval_ms("abc"), None);
    }

    #[test]
    fn test_validate_and_debug_masks_secret() {
        assert!(KisConfig::new("", "secret").validate().is_err());
        assert!(KisConfig::new("key", " ").validate().is_err());

        let config = KisConfig::new("PSabcdefgh", "very-secret");
        assert!(config.validate().is_ok());
        let debug = format!("{:?}", config);
        assert!(!debug.contains("very-secret"));
        assert!(debug.contains("PSab***"));
    }

    #[test]
    fn test_environment_from_str() {
        assert_eq!("paper".parse::<KisEnvironment>().unwrap(), KisEnvironment::Paper);
        assert_eq!("REAL".parse::<KisEnvironment>().unwrap(), KisEnvironment::Real);
        assert!("x".parse::<KisEnvironment>().is_err());
    }
}

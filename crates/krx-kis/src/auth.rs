//! KIS OAuth 접근 토큰.
//!
//! 토큰은 `POST /oauth2/tokenP`로 발급받으며, 만료 5분 전부터는
//! 만료된 것으로 간주하여 다음 요청에서 재발급합니다.

use crate::config::KisConfig;
use crate::error::KisError;
use crate::paths;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

/// 만료 전 조기 갱신 여유 (초).
pub const TOKEN_RENEWAL_MARGIN_SECS: i64 = 300;

/// KIS OAuth 토큰 응답.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// 토큰 유효 시간 (초)
    pub expires_in: i64,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// KIS OAuth 오류 응답.
#[derive(Debug, Clone, Deserialize)]
pub struct KisOAuthErrorResponse {
    /// 에러 코드 (예: "EGW00103")
    pub error_code: String,
    pub error_description: String,
}

/// 만료 시각이 포함된 토큰 상태.
#[derive(Debug, Clone)]
pub struct TokenState {
    pub access_token: String,
    pub token_type: String,
    /// 갱신 여유를 뺀 유효 기한
    pub expires_at: DateTime<Utc>,
}

impl TokenState {
    /// 토큰 응답과 발급 시각으로 상태 생성.
    pub fn from_response(resp: TokenResponse, issued_at: DateTime<Utc>) -> Self {
        Self {
            access_token: resp.access_token,
            token_type: resp.token_type,
            expires_at: issued_at + Duration::seconds(resp.expires_in - TOKEN_RENEWAL_MARGIN_SECS),
        }
    }

    /// 주어진 시각에 재사용 가능한지 확인.
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    pub fn is_usable(&self) -> bool {
        self.is_usable_at(Utc::now())
    }

    /// `authorization` 헤더 값.
    pub fn auth_header(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

/// 자격 증명으로 새 접근 토큰을 발급받습니다.
pub(crate) async fn issue_token(client: &Client, config: &KisConfig) -> Result<TokenState, KisError> {
    info!(
        "Requesting new KIS access token... (AppKey: {}...)",
        config.app_key.chars().take(8).collect::<String>()
    );

    let url = format!("{}{}", config.rest_base_url(), paths::TOKEN);

    #[derive(Serialize)]
    struct TokenRequest<'a> {
        grant_type: &'a str,
        appkey: &'a str,
        appsecret: &'a str,
    }

    let response = client
        .post(&url)
        .header("Content-Type", "application/json; charset=utf-8")
        .json(&TokenRequest {
            grant_type: "client_credentials",
            appkey: &config.app_key,
            appsecret: &config.app_secret,
        })
        .send()
        .await?;

    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        error!("Token request failed: {} - {}", status, body);

        if let Ok(oauth_error) = serde_json::from_str::<KisOAuthErrorResponse>(&body) {
            let message = match oauth_error.error_code.as_str() {
                "EGW00103" => "유효하지 않은 AppKey입니다. KIS_APP_KEY/KIS_APP_SECRET을 확인하세요.".to_string(),
                "EGW00133" => "접근토큰 발급 잠시 후 다시 시도하세요 (1분당 1회).".to_string(),
                _ => format!(
                    "{} ({})",
                    oauth_error.error_description, oauth_error.error_code
                ),
            };
            return Err(KisError::Unauthorized(message));
        }

        return Err(KisError::Http {
            status: status.as_u16(),
            body,
        });
    }

    let token_resp: TokenResponse = serde_json::from_str(&body)
        .map_err(|e| KisError::ParseError(format!("Failed to parse token response: {}", e)))?;

    let token = TokenState::from_response(token_resp, Utc::now());
    info!("KIS access token obtained, renew after: {}", token.expires_at);

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(expires_in: i64) -> TokenResponse {
        TokenResponse {
            access_token: "abc123".to_string(),
            token_type: "Bearer".to_string(),
            expires_in,
        }
    }

    #[test]
    fn test_expiry_includes_renewal_margin() {
        let issued = Utc::now();
        let token = TokenState::from_response(response(86_400), issued);

        assert_eq!(token.expires_at, issued + Duration::seconds(86_100));
        assert!(token.is_usable_at(issued + Duration::seconds(86_099)));
        assert!(!token.is_usable_at(issued + Duration::seconds(86_100)));
    }

    #[test]
    fn test_short_lived_token_is_never_reused() {
        let issued = Utc::now();
        let token = TokenState::from_response(response(200), issued);
        assert!(!token.is_usable_at(issued));
    }

    #[test]
    fn test_auth_header() {
        let token = TokenState::from_response(response(86_400), Utc::now());
        assert_eq!(token.auth_header(), "Bearer abc123");
    }

    #[test]
    fn test_token_type_defaults_to_bearer() {
        let resp: TokenResponse =
            serde_json::from_str(r#"{"access_token":"t","expires_in":86400}"#).unwrap();
        assert_eq!(resp.token_type, "Bearer");
    }
}

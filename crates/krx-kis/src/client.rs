//! 토큰 관리와 throttle이 적용된 KIS REST 클라이언트.

use crate::auth::{issue_token, TokenState};
use crate::config::KisConfig;
use crate::error::KisError;
use crate::throttle::Throttle;
use crate::traits::{KisApi, KisResult};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument};

/// 모든 요청에 포함되는 기본 헤더.
const DEFAULT_HEADERS: &[(&str, &str)] = &[
    ("Content-Type", "application/json"),
    ("Accept", "text/plain"),
    ("charset", "UTF-8"),
    (
        "User-Agent",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    ),
];

/// 토큰과 마지막 요청 시각.
struct ClientState {
    token: Option<TokenState>,
    throttle: Throttle,
}

/// KIS REST 클라이언트.
///
/// 접근 토큰과 throttle 시각은 하나의 `Mutex`로 보호됩니다. 잠금은 throttle 대기,
/// 토큰 갱신, HTTP 응답 수신까지 유지되므로 동시에 호출해도 요청 간격이 보장됩니다.
/// 여러 파이프라인에서 `Arc<KisClient>`로 공유합니다.
pub struct KisClient {
    config: KisConfig,
    http: Client,
    state: Mutex<ClientState>,
}

impl KisClient {
    /// 새 클라이언트 생성.
    ///
    /// # Errors
    /// 자격 증명이 비어 있거나 HTTP 클라이언트 생성에 실패하면 에러를 반환합니다.
    pub fn new(config: KisConfig) -> Result<Self, KisError> {
        config.validate()?;

        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| KisError::NetworkError(format!("HTTP client 생성 실패: {}", e)))?;

        let throttle = Throttle::new(config.request_interval());

        Ok(Self {
            config,
            http,
            state: Mutex::new(ClientState {
                token: None,
                throttle,
            }),
        })
    }

    pub fn config(&self) -> &KisConfig {
        &self.config
    }

    /// 캐시된 토큰을 폐기하여 다음 요청에서 재발급하게 합니다.
    pub async fn invalidate_token(&self) {
        let mut state = self.state.lock().await;
        state.token = None;
    }

    /// 현재 토큰의 갱신 예정 시각.
    pub async fn token_expires_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        let state = self.state.lock().await;
        state.token.as_ref().map(|t| t.expires_at)
    }

    async fn ensure_token(&self, state: &mut ClientState) -> KisResult<TokenState> {
        if let Some(token) = &state.token {
            if token.is_usable() {
                debug!("Using cached KIS token (renew after: {})", token.expires_at);
                return Ok(token.clone());
            }
            info!("KIS token expiring (renew after: {}), refreshing...", token.expires_at);
        }

        let token = issue_token(&self.http, &self.config).await?;
        state.token = Some(token.clone());
        Ok(token)
    }

    /// 기본 헤더 < 인증 헤더 < 호출별 헤더 순으로 병합합니다.
    fn build_headers(&self, token: &TokenState, overrides: &[(&str, &str)]) -> KisResult<HeaderMap> {
        let auth = token.auth_header();
        let auth_headers: [(&str, &str); 3] = [
            ("authorization", auth.as_str()),
            ("appkey", self.config.app_key.as_str()),
            ("appsecret", self.config.app_secret.as_str()),
        ];

        let mut pairs: Vec<(&str, &str)> = DEFAULT_HEADERS.to_vec();
        pairs.extend_from_slice(&auth_headers);
        pairs.extend_from_slice(overrides);

        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| KisError::ParseError(format!("유효하지 않은 헤더 이름: {}", name)))?;
            let header_value = HeaderValue::from_str(value).map_err(|_| {
                KisError::ParseError(format!("{} 헤더에 유효하지 않은 문자 포함", name))
            })?;
            headers.insert(header_name, header_value);
        }

        Ok(headers)
    }
}

#[async_trait]
impl KisApi for KisClient {
    #[instrument(skip(self, params, headers))]
    async fn request(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
        headers: &[(&str, &str)],
    ) -> KisResult<Value> {
        let url = format!("{}{}", self.config.rest_base_url(), path);

        let (status, body) = {
            let mut state = self.state.lock().await;
            state.throttle.wait().await;

            let token = self.ensure_token(&mut state).await?;
            let header_map = self.build_headers(&token, headers)?;

            let response = self
                .http
                .request(method, &url)
                .headers(header_map)
                .query(params)
                .send()
                .await?;

            // 응답을 받은 요청은 상태 코드와 관계없이 간격 계산에 포함
            state.throttle.mark(Instant::now());

            let status = response.status();
            (status, response.text().await?)
        };

        if !status.is_success() {
            error!("KIS request failed: {} {} - {}", status, path, body);
            return Err(KisError::Http {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body)
            .map_err(|e| KisError::ParseError(format!("Failed to parse {} response: {}", path, e)))
    }
}

//! Redis cache 구현.
//!
//! 종목별 시세 스냅샷과 시계열을 TTL 없이 덮어쓰는 cache 레이어입니다.

use crate::error::{DataError, Result};
use crate::traits::CacheStore;
use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use std::collections::BTreeMap;
use tracing::{info, instrument};

/// Redis 설정.
#[derive(Clone)]
pub struct RedisConfig {
    /// Redis URL (redis://:password@host:port/db)
    pub url: String,
}

impl std::fmt::Debug for RedisConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisConfig")
            .field("url", &mask_password(&self.url))
            .finish()
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379/0".to_string(),
        }
    }
}

impl RedisConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// 호스트/포트/비밀번호/DB 번호로 URL을 구성합니다.
    pub fn from_parts(host: &str, port: u16, password: Option<&str>, db: i64) -> Self {
        let auth = match password.filter(|p| !p.is_empty()) {
            Some(p) => format!(":{}@", encode_userinfo(p)),
            None => String::new(),
        };
        Self {
            url: format!("redis://{}{}:{}/{}", auth, host, port, db),
        }
    }
}

/// userinfo 영역에 들어갈 문자열을 퍼센트 인코딩합니다.
fn encode_userinfo(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

fn mask_password(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}***{}", &url[..scheme_end + 3], &url[at..])
        }
        _ => url.to_string(),
    }
}

/// Redis 연결 래퍼.
#[derive(Clone)]
pub struct RedisCache {
    client: Client,
    connection: ConnectionManager,
}

impl RedisCache {
    /// 새로운 Redis cache 연결을 생성합니다.
    pub async fn connect(config: &RedisConfig) -> Result<Self> {
        info!(url = %mask_password(&config.url), "Connecting to Redis...");

        let client =
            Client::open(config.url.as_str()).map_err(|e| DataError::ConfigError(e.to_string()))?;

        let connection = ConnectionManager::new(client.clone())
            .await
            .map_err(|e| DataError::ConnectionError(e.to_string()))?;

        info!("Redis connection established");

        Ok(Self { client, connection })
    }

    /// pub/sub 등 별도 연결이 필요한 곳에서 사용합니다.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// 다중화 연결 핸들 (복제 비용이 낮음).
    pub fn connection(&self) -> ConnectionManager {
        self.connection.clone()
    }

    /// Redis 상태를 확인합니다.
    pub async fn health_check(&self) -> Result<bool> {
        let mut conn = self.connection();
        let result: String = redis::cmd("PING").query_async(&mut conn).await?;

        Ok(result == "PONG")
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    #[instrument(skip(self, value), fields(bytes = value.len()))]
    async fn set_string(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.connection();
        let _: () = conn.set(key, value).await?;
        Ok(())
    }

    #[instrument(skip(self, fields), fields(count = fields.len()))]
    async fn set_hash(&self, key: &str, fields: &[(String, String)]) -> Result<()> {
        if fields.is_empty() {
            return Ok(());
        }
        let mut conn = self.connection();
        let _: () = conn.hset_multiple(key, fields).await?;
        Ok(())
    }

    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn get_hash(&self, key: &str) -> Result<BTreeMap<String, String>> {
        let mut conn = self.connection();
        let value: BTreeMap<String, String> = conn.hgetall(key).await?;
        Ok(value)
    }
}

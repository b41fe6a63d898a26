//! 환경변수 기반 설정 모듈.

use crate::error::CollectorError;
use crate::schedule::VolumeRankSchedule;
use crate::Result;
use krx_data::{PostgresConfig, RedisConfig, TableName};
use krx_kis::KisConfig;
use tracing::warn;

/// Collector 전체 설정
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// KIS API 설정
    pub kis: KisConfig,
    /// Redis 설정 (캐시 + 스트림)
    pub redis: RedisConfig,
    /// PostgreSQL 설정 (기간별 시세 파이프라인에 필요)
    pub postgres: Option<PostgresConfig>,
    /// 기간별 시세 테이블
    pub chart_table: TableName,
    /// 스트림 토픽 설정
    pub stream: StreamConfig,
    /// 거래량 순위 수집 주기
    pub schedule: VolumeRankSchedule,
    /// 거래량 TOP10 캐시 키
    pub top10_key: String,
}

/// 스트림 토픽 설정
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    /// 기본 토픽 (TOP10 스냅샷 구독)
    pub default_topic: String,
    /// 거래량 순위 토픽 (종목별 파이프라인 구독)
    pub volume_rank_topic: String,
    /// 기간별 시세 하류 토픽
    pub stock_history_topic: String,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            default_topic: "antic-signal".to_string(),
            volume_rank_topic: "antic-signal".to_string(),
            stock_history_topic: "stock-historical-data".to_string(),
        }
    }
}

impl StreamConfig {
    /// 거래량 순위를 발행할 토픽 목록 (이름이 같으면 한 번만).
    pub fn volume_rank_targets(&self) -> Vec<&str> {
        let mut topics = vec![self.default_topic.as_str()];
        if self.volume_rank_topic != self.default_topic {
            topics.push(self.volume_rank_topic.as_str());
        }
        topics
    }

    pub fn from_env() -> Self {
        let default_topic = env_var_or("STREAM_DEFAULT_TOPIC", "antic-signal");
        Self {
            volume_rank_topic: env_var_or("STREAM_VOLUME_RANK_TOPIC", &default_topic),
            stock_history_topic: env_var_or("STREAM_STOCK_HISTORY_TOPIC", "stock-historical-data"),
            default_topic,
        }
    }
}

impl CollectorConfig {
    /// 환경변수에서 설정 로드
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let kis = KisConfig::from_env()?;
        let redis = redis_from_env()?;
        let postgres = postgres_from_env()?;

        Ok(Self {
            kis,
            redis,
            postgres,
            chart_table: chart_table_from_env()?,
            stream: StreamConfig::from_env(),
            schedule: VolumeRankSchedule::from_setting(
                std::env::var("VOLUME_RANK_PULLING_INTERVAL").ok().as_deref(),
            ),
            top10_key: top10_key_from_env(),
        })
    }
}

/// `REDIS_URL` 또는 `REDIS_HOST`/`REDIS_PORT`/`REDIS_PASSWORD`/`REDIS_DB`
pub fn redis_from_env() -> Result<RedisConfig> {
    if let Some(url) = non_empty_var("REDIS_URL") {
        return Ok(RedisConfig::new(url));
    }

    let host = non_empty_var("REDIS_HOST").ok_or_else(|| {
        CollectorError::Config("REDIS_URL 또는 REDIS_HOST 환경변수가 필요합니다".to_string())
    })?;
    let password = non_empty_var("REDIS_PASSWORD");

    Ok(RedisConfig::from_parts(
        &host,
        env_var_int("REDIS_PORT", 6379),
        password.as_deref(),
        env_var_int("REDIS_DB", 0),
    ))
}

/// `POSTGRES_HOST`가 없으면 `None`, 있으면 나머지 접속 정보가 필수
pub fn postgres_from_env() -> Result<Option<PostgresConfig>> {
    let Some(host) = non_empty_var("POSTGRES_HOST") else {
        return Ok(None);
    };

    let required = |key: &str| {
        std::env::var(key)
            .map_err(|_| CollectorError::Config(format!("{} 환경변수가 설정되지 않았습니다", key)))
    };

    let mut config = PostgresConfig::new(
        host,
        required("POSTGRES_USER")?,
        required("POSTGRES_PASSWORD")?,
        required("POSTGRES_DB")?,
    );
    config.port = env_var_int("POSTGRES_PORT", 5432);
    config.min_connections = env_var_int("POSTGRES_MIN_CONN", 1);
    config.max_connections = env_var_int("POSTGRES_MAX_CONN", 5);
    config.validate()?;

    Ok(Some(config))
}

/// 거래량 TOP10 스냅샷 키.
pub fn top10_key_from_env() -> String {
    env_var_or("REDIS_TOP10_KEY", "volume_rank:top10")
}

/// `DAILY_PRICE_SCHEMA_NAME`.`DAILY_PRICE_TABLE_NAME`
pub fn chart_table_from_env() -> Result<TableName> {
    let schema = env_var_or("DAILY_PRICE_SCHEMA_NAME", "anticsignal");
    let table = env_var_or("DAILY_PRICE_TABLE_NAME", "stock_history");
    Ok(TableName::new(&schema, &table)?)
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_var_or(key: &str, default: &str) -> String {
    non_empty_var(key).unwrap_or_else(|| default.to_string())
}

/// 환경변수에서 정수 파싱 (실패 시 경고 후 기본값 사용)
fn env_var_int<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display + Copy,
{
    parse_int_or(key, std::env::var(key).ok().as_deref(), default)
}

fn parse_int_or<T>(key: &str, raw: Option<&str>, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display + Copy,
{
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => default,
        Some(value) => value.parse().unwrap_or_else(|_| {
            warn!(key, value, default = %default, "정수 환경변수를 해석할 수 없어 기본값을 사용합니다");
            default
        }),
    }
}

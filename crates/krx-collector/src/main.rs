//! KIS 시세 수집기 CLI.

use anyhow::Context;
use clap::{Parser, Subcommand};
use krx_collector::modules::{collect_index, IndexTarget};
use krx_collector::{
    config, subscription, CollectorConfig, Dispatcher, Pipeline, Top10Snapshot, VolumeRankJob,
};
use krx_core::logging::{init_logging, LogConfig};
use krx_core::InstrumentCode;
use krx_data::{
    CacheWriter, DownstreamEmitter, DurableStoreWriter, EventSubscriber,
    PgChartPriceStore, RedisCache, RedisStream, TriggerMessage,
};
use krx_kis::KisClient;
use serde_json::json;
use std::sync::Arc;
use tokio::task::JoinHandle;

#[derive(Parser)]
#[command(name = "krx-collector")]
#[command(about = "KIS 국내 주식 시세 수집기", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// 데몬 모드: 거래량 순위 주기 수집 + 종목별 파이프라인 + TOP10 스냅샷
    Run,

    /// 거래량 순위를 한 번 수집해 발행
    Tick,

    /// 지정 종목을 스트림 없이 한 번 수집
    Collect {
        /// current-price, time-conclusion, investor-trade, chart-price, index-price, index-tick
        #[arg(long)]
        pipeline: String,

        /// 종목(업종) 코드 (쉼표로 구분, 예: "005930,000660")
        #[arg(long)]
        codes: String,
    },

    /// 기간별 시세 스키마/테이블 생성
    InitDb,
}

/// 공유 연결 묶음.
struct Services {
    api: Arc<KisClient>,
    stream: Arc<RedisStream>,
    cache: CacheWriter,
}

impl Services {
    async fn connect(config: &CollectorConfig) -> anyhow::Result<Self> {
        let api = Arc::new(KisClient::new(config.kis.clone())?);
        let redis = RedisCache::connect(&config.redis).await?;
        let stream = Arc::new(RedisStream::new(redis.client().clone(), redis.connection()));
        let cache = CacheWriter::new(Arc::new(redis));

        Ok(Self { api, stream, cache })
    }

    /// PostgreSQL이 설정되어 있으면 기간별 시세 출력까지 연결합니다.
    async fn dispatcher(&self, config: &CollectorConfig) -> anyhow::Result<Dispatcher> {
        let dispatcher = Dispatcher::new(self.api.clone(), self.cache.clone());

        let Some(postgres) = &config.postgres else {
            tracing::warn!("POSTGRES_HOST 미설정: chart-price 파이프라인 비활성화");
            return Ok(dispatcher);
        };

        let pool = postgres.connect().await?;
        let store = PgChartPriceStore::new(pool, config.chart_table.clone());
        let durable = DurableStoreWriter::new(Arc::new(store), config.chart_table.clone());
        let emitter = DownstreamEmitter::new(self.stream.clone(), &config.stream.stock_history_topic);

        Ok(dispatcher.with_chart_sinks(emitter, durable))
    }

    fn volume_rank_job(&self, config: &CollectorConfig) -> VolumeRankJob {
        VolumeRankJob::new(
            self.api.clone(),
            self.stream.clone(),
            config.stream.volume_rank_targets(),
        )
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 로깅 초기화
    init_logging(LogConfig::from_env(&cli.log_level))
        .map_err(|e| anyhow::anyhow!("로깅 초기화 실패: {}", e))?;

    tracing::info!("KRX 시세 수집기 시작");

    match cli.command {
        Commands::Run => run_daemon().await?,
        Commands::Tick => {
            let config = CollectorConfig::from_env()?;
            let services = Services::connect(&config).await?;
            let rows = services.volume_rank_job(&config).run_once().await?;
            tracing::info!(rows, "거래량 순위 발행 완료");
        }
        Commands::Collect { pipeline, codes } => collect_once(&pipeline, &codes).await?,
        Commands::InitDb => {
            dotenvy::dotenv().ok();
            let postgres = config::postgres_from_env()?
                .context("POSTGRES_HOST 환경변수가 설정되지 않았습니다")?;
            let table = config::chart_table_from_env()?;

            let pool = postgres.connect().await?;
            let store = PgChartPriceStore::new(pool, table);
            store.ensure_table().await?;
            tracing::info!(table = %store.table(), "테이블 준비 완료");
            store.pool().close().await;
        }
    }

    tracing::info!("KRX 시세 수집기 종료");
    Ok(())
}

async fn collect_once(pipeline: &str, codes: &str) -> anyhow::Result<()> {
    let config = CollectorConfig::from_env()?;
    let codes = codes
        .split(',')
        .filter(|c| !c.trim().is_empty())
        .map(|c| InstrumentCode::new(c))
        .collect::<Result<Vec<_>, _>>()?;

    if let Ok(target) = pipeline.parse::<IndexTarget>() {
        let api = KisClient::new(config.kis.clone())?;
        let rows = collect_index(&api, target, &codes).await;
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    let pipeline: Pipeline = pipeline.parse()?;
    let services = Services::connect(&config).await?;
    let dispatcher = services.dispatcher(&config).await?;

    // 스트림 메시지와 같은 형태로 만들어 동일 경로로 처리
    let body = json!({
        "output": codes
            .iter()
            .map(|c| json!({ "mksc_shrn_iscd": c.as_str() }))
            .collect::<Vec<_>>()
    });
    let message = TriggerMessage::new("cli", body.to_string());

    let stats = dispatcher.handle_batch(pipeline, &[message]).await?;
    stats.log_summary(pipeline.as_str());
    Ok(())
}

async fn run_daemon() -> anyhow::Result<()> {
    let config = CollectorConfig::from_env()?;
    let services = Services::connect(&config).await?;
    let dispatcher = services.dispatcher(&config).await?;
    let job = services.volume_rank_job(&config);

    tracing::info!(
        "=== 데몬 모드 시작 (주기: {}초, cron: {}) ===",
        config.schedule.interval_secs,
        config.schedule.cron
    );

    let mut workers: Vec<JoinHandle<()>> = Vec::new();

    // 종목별 파이프라인
    for pipeline in Pipeline::ALL {
        if dispatcher.ensure_ready(pipeline).is_err() {
            continue;
        }
        let mut rx = services.stream.subscribe(&config.stream.volume_rank_topic).await?;
        let dispatcher = dispatcher.clone();

        workers.push(tokio::spawn(async move {
            while let Some(batch) = subscription::receive_batch(&mut rx).await {
                match dispatcher.handle_batch(pipeline, &batch).await {
                    Ok(stats) => stats.log_summary(pipeline.as_str()),
                    Err(e) => tracing::error!(%pipeline, "배치 처리 실패: {}", e),
                }
            }
        }));
    }

    // TOP10 스냅샷
    {
        let mut rx = services.stream.subscribe(&config.stream.default_topic).await?;
        let snapshot = Top10Snapshot::new(services.cache.clone(), &config.top10_key);

        workers.push(tokio::spawn(async move {
            while let Some(batch) = subscription::receive_batch(&mut rx).await {
                snapshot.handle_batch(&batch).await;
            }
        }));
    }

    // 첫 tick은 즉시 실행
    let mut interval = tokio::time::interval(config.schedule.interval());
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("종료 신호 수신, 데몬 종료 중...");
                break;
            }
            _ = interval.tick() => {
                match job.run_once().await {
                    Ok(rows) => tracing::info!(rows, "거래량 순위 발행 완료"),
                    Err(e) => tracing::error!("거래량 순위 수집 실패: {}", e),
                }
            }
        }
    }

    for worker in workers {
        worker.abort();
    }

    Ok(())
}

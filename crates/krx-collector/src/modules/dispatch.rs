//! 트리거 메시지 배치 처리.
//!
//! 메시지마다 종목코드를 추출해 파이프라인별 수집기를 실행하고, 모은 행을
//! 캐시/하류 토픽/저장소로 보냅니다. 종목 하나의 실패는 로그만 남기며
//! 저장소 오류만 배치를 중단시킵니다.

use crate::error::CollectorError;
use crate::stats::DispatchStats;
use crate::trigger;
use crate::Result;
use krx_core::{clock, CollectedRow, InstrumentCode};
use krx_data::{
    CacheKind, CacheVariant, CacheWriter, DownstreamEmitter, DurableStoreWriter, TriggerMessage,
};
use krx_kis::collectors::{self, DailyChartRequest, PeriodDivCode};
use krx_kis::{KisApi, KisResult};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// 종목별 수집 파이프라인.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pipeline {
    /// 현재가 → 스냅샷 캐시
    CurrentPrice,
    /// 시간대별 체결 → `intraday_ticks`
    TimeConclusion,
    /// 투자자 매매동향 → `investor_trade_daily`
    InvestorTrade,
    /// 기간별 시세 → 하류 발행 후 저장
    ChartPrice,
}

impl Pipeline {
    pub const ALL: [Pipeline; 4] = [
        Pipeline::CurrentPrice,
        Pipeline::TimeConclusion,
        Pipeline::InvestorTrade,
        Pipeline::ChartPrice,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Pipeline::CurrentPrice => "current-price",
            Pipeline::TimeConclusion => "time-conclusion",
            Pipeline::InvestorTrade => "investor-trade",
            Pipeline::ChartPrice => "chart-price",
        }
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Pipeline {
    type Err = CollectorError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Pipeline::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CollectorError::Config(format!("Unknown pipeline: {}", s)))
    }
}

/// 배치 단위로 한 번 정해지는 조회 기준값.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchContext {
    /// 시간대별 체결 기준 시각 (HHMMSS)
    pub hour: String,
    /// 투자자 매매동향 조회일 (YYYYMMDD)
    pub date: String,
}

impl BatchContext {
    pub fn now() -> Self {
        let now = clock::now_kst();
        Self {
            hour: clock::format_hms(now),
            date: clock::format_ymd(now.date_naive()),
        }
    }
}

/// 트리거 메시지 디스패처.
#[derive(Clone)]
pub struct Dispatcher {
    api: Arc<dyn KisApi>,
    cache: CacheWriter,
    emitter: Option<DownstreamEmitter>,
    durable: Option<DurableStoreWriter>,
    chart_period: PeriodDivCode,
    chart_chunk_delay: Option<Duration>,
}

impl Dispatcher {
    pub fn new(api: Arc<dyn KisApi>, cache: CacheWriter) -> Self {
        Self {
            api,
            cache,
            emitter: None,
            durable: None,
            chart_period: PeriodDivCode::Day,
            chart_chunk_delay: None,
        }
    }

    /// 기간별 시세 파이프라인 출력 설정.
    pub fn with_chart_sinks(mut self, emitter: DownstreamEmitter, durable: DurableStoreWriter) -> Self {
        self.emitter = Some(emitter);
        self.durable = Some(durable);
        self
    }

    pub fn with_chart_period(mut self, period: PeriodDivCode) -> Self {
        self.chart_period = period;
        self
    }

    /// 기간별 시세 구간 사이 대기 시간 (기본 500ms).
    pub fn with_chart_chunk_delay(mut self, delay: Duration) -> Self {
        self.chart_chunk_delay = Some(delay);
        self
    }

    /// 파이프라인 실행 가능 여부 확인.
    pub fn ensure_ready(&self, pipeline: Pipeline) -> Result<()> {
        if pipeline == Pipeline::ChartPrice && self.durable.is_none() {
            return Err(CollectorError::Config(
                "chart-price 파이프라인에는 PostgreSQL 설정이 필요합니다".to_string(),
            ));
        }
        Ok(())
    }

    /// 배치 하나를 처리합니다.
    ///
    /// 기준 시각/일자는 배치 시작 시 한 번만 정합니다.
    pub async fn handle_batch(
        &self,
        pipeline: Pipeline,
        messages: &[TriggerMessage],
    ) -> Result<DispatchStats> {
        self.ensure_ready(pipeline)?;

        let started = Instant::now();
        let context = BatchContext::now();
        let mut stats = DispatchStats::new();

        info!(%pipeline, messages = messages.len(), "Received trigger batch");

        for message in messages {
            stats.messages += 1;

            let body = match std::str::from_utf8(&message.body) {
                Ok(body) => body,
                Err(e) => {
                    stats.undecodable += 1;
                    warn!(
                        %pipeline,
                        topic = %message.topic,
                        sequence = ?message.sequence,
                        error = %e,
                        "Failed to decode message body, skipping"
                    );
                    continue;
                }
            };

            let codes = trigger::extract_codes(body);
            if codes.is_empty() {
                stats.without_codes += 1;
                info!(%pipeline, sequence = ?message.sequence, "No stock codes found in payload");
                continue;
            }

            let rows = self.collect(pipeline, &codes, &context, &mut stats).await;
            self.sink(pipeline, rows, &mut stats).await?;
        }

        stats.elapsed = started.elapsed();
        Ok(stats)
    }

    /// 종목별 수집 결과를 순서대로 이어 붙입니다.
    async fn collect(
        &self,
        pipeline: Pipeline,
        codes: &[InstrumentCode],
        context: &BatchContext,
        stats: &mut DispatchStats,
    ) -> Vec<CollectedRow> {
        let mut aggregated = Vec::new();

        for code in codes {
            stats.codes += 1;
            match self.collect_one(pipeline, code, context).await {
                Ok(rows) => {
                    stats.success += 1;
                    debug!(%pipeline, code = %code, rows = rows.len(), "Collected");
                    aggregated.extend(rows);
                }
                Err(e) => {
                    stats.errors += 1;
                    error!(%pipeline, code = %code, error = %e, "Collector failed for code");
                }
            }
        }

        stats.rows += aggregated.len();
        aggregated
    }

    async fn collect_one(
        &self,
        pipeline: Pipeline,
        code: &InstrumentCode,
        context: &BatchContext,
    ) -> KisResult<Vec<CollectedRow>> {
        let api = self.api.as_ref();
        match pipeline {
            Pipeline::CurrentPrice => Ok(vec![collectors::fetch_inquire_price(api, code).await?]),
            Pipeline::TimeConclusion => {
                collectors::fetch_time_itemconclusion(api, code, &context.hour).await
            }
            Pipeline::InvestorTrade => {
                collectors::fetch_investor_trade_daily(api, code, &context.date).await
            }
            Pipeline::ChartPrice => {
                let mut request = DailyChartRequest::new(code.clone()).with_period(self.chart_period);
                if let Some(delay) = self.chart_chunk_delay {
                    request = request.with_chunk_delay(delay);
                }
                collectors::fetch_daily_chartprice(api, &request).await
            }
        }
    }

    async fn sink(
        &self,
        pipeline: Pipeline,
        rows: Vec<CollectedRow>,
        stats: &mut DispatchStats,
    ) -> Result<()> {
        match pipeline {
            Pipeline::CurrentPrice => {
                let report = self.cache.write(CacheVariant::CurrentPriceSnapshot, &rows).await;
                stats.record_cache(report);
            }
            Pipeline::TimeConclusion => {
                let report = self
                    .cache
                    .write(CacheVariant::Series(CacheKind::IntradayTicks), &rows)
                    .await;
                stats.record_cache(report);
            }
            Pipeline::InvestorTrade => {
                if rows.is_empty() {
                    info!("No investor trade rows to cache");
                    return Ok(());
                }
                let report = self
                    .cache
                    .write(CacheVariant::Series(CacheKind::InvestorTradeDaily), &rows)
                    .await;
                stats.record_cache(report);
            }
            Pipeline::ChartPrice => {
                if rows.is_empty() {
                    info!("No chart price rows collected");
                    return Ok(());
                }

                // 발행 실패는 저장을 막지 않음
                if let Some(emitter) = &self.emitter {
                    match emitter.emit(&rows).await {
                        Ok(true) => stats.emitted += 1,
                        Ok(false) => {}
                        Err(e) => {
                            error!(topic = emitter.topic(), error = %e, "Failed to emit chart price rows")
                        }
                    }
                }

                if let Some(durable) = &self.durable {
                    let report = durable.persist(&rows).await?;
                    stats.record_persist(report);
                }
            }
        }
        Ok(())
    }
}

//! 배치 처리 통계 구조체.

use krx_data::{CacheWriteReport, PersistReport};
use std::time::Duration;

/// 배치 처리 통계
#[derive(Debug, Clone, Default)]
pub struct DispatchStats {
    /// 처리한 메시지 수
    pub messages: usize,
    /// UTF-8 디코딩 실패 메시지 수
    pub undecodable: usize,
    /// 종목코드가 없는 메시지 수
    pub without_codes: usize,
    /// 수집 시도 종목 수
    pub codes: usize,
    /// 수집 성공 종목 수
    pub success: usize,
    /// 수집 실패 종목 수
    pub errors: usize,
    /// 수집된 총 행 수
    pub rows: usize,
    /// 캐시 키 쓰기 성공
    pub cache_written: usize,
    /// 캐시 키 쓰기 실패
    pub cache_failed: usize,
    /// 종목코드가 없어 캐시에서 제외된 행
    pub cache_dropped: usize,
    /// 저장된 기간별 시세 행
    pub persisted: u64,
    /// 필드 누락으로 건너뛴 기간별 시세 행
    pub persist_skipped: usize,
    /// 하류 발행 횟수
    pub emitted: usize,
    /// 소요 시간
    pub elapsed: Duration,
}

impl DispatchStats {
    /// 새 통계 객체 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 성공률 계산 (%)
    pub fn success_rate(&self) -> f64 {
        if self.codes == 0 {
            0.0
        } else {
            (self.success as f64 / self.codes as f64) * 100.0
        }
    }

    pub fn record_cache(&mut self, report: CacheWriteReport) {
        self.cache_written += report.written;
        self.cache_failed += report.failed;
        self.cache_dropped += report.dropped;
    }

    pub fn record_persist(&mut self, report: PersistReport) {
        self.persisted += report.inserted;
        self.persist_skipped += report.skipped;
    }

    /// 통계 요약 로그 출력
    pub fn log_summary(&self, operation: &str) {
        tracing::info!(
            operation = operation,
            messages = self.messages,
            undecodable = self.undecodable,
            without_codes = self.without_codes,
            codes = self.codes,
            success = self.success,
            errors = self.errors,
            rows = self.rows,
            cache_written = self.cache_written,
            cache_failed = self.cache_failed,
            persisted = self.persisted,
            persist_skipped = self.persist_skipped,
            emitted = self.emitted,
            success_rate = format!("{:.1}%", self.success_rate()),
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "배치 처리 완료"
        );
    }
}

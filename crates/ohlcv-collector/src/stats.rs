//! 수집 통계 구조체.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use ohlcv_exchange::FetchOutcome;

/// 수집 작업 통계
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionStats {
    /// 총 시도 횟수 (심볼 × 간격)
    pub total: usize,
    /// 성공 횟수
    pub success: usize,
    /// 에러 횟수
    pub errors: usize,
    /// 빈 데이터 (조회 성공, 캔들 없음)
    pub empty: usize,
    /// 저장된 총 캔들 수 (정제 후)
    pub total_candles: usize,
    /// 보낸 HTTP 요청 수
    pub requests: u32,
    /// 요청 한도 초과 대기 횟수
    pub rate_limit_waits: u32,
    /// 일시적 에러 재시도 횟수
    pub retries: u32,
    /// 소요 시간
    #[serde(skip)]
    pub elapsed: Duration,
}

impl CollectionStats {
    /// 새 통계 객체 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 페이지네이션 결과 반영
    pub fn record_outcome(&mut self, outcome: &FetchOutcome) {
        self.requests += outcome.requests;
        self.rate_limit_waits += outcome.rate_limit_waits;
        self.retries += outcome.retries;
    }

    /// 성공률 계산 (%)
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.success as f64 / self.total as f64) * 100.0
        }
    }

    /// 통계 요약 로그 출력
    pub fn log_summary(&self, operation: &str) {
        tracing::info!(
            operation = operation,
            total = self.total,
            success = self.success,
            errors = self.errors,
            empty = self.empty,
            total_candles = self.total_candles,
            requests = self.requests,
            rate_limit_waits = self.rate_limit_waits,
            retries = self.retries,
            success_rate = format!("{:.1}%", self.success_rate()),
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "Collection finished"
        );
    }
}

//! 1분 단위 요청 한도 추적.
//!
//! 페이지네이터가 단독으로 소유하며 응답마다 갱신됩니다.
//! 동시 접근이 없으므로 잠금이 필요 없습니다.

use std::time::Duration;
use tokio::time::Instant;

use ohlcv_core::ExchangeConfig;

/// 가중치 기반 스로틀 파라미터.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottlePolicy {
    /// 롤링 윈도우 길이
    pub window: Duration,
    /// 사용 가중치를 확인하는 요청 주기
    pub check_every: u32,
    /// 사용 가중치 임계값
    pub weight_threshold: u32,
    /// 임계값 초과 시 대기
    pub heavy_delay: Duration,
    /// 임계값 이하일 때 대기
    pub light_delay: Duration,
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        Self::from(&ExchangeConfig::default())
    }
}

impl From<&ExchangeConfig> for ThrottlePolicy {
    fn from(config: &ExchangeConfig) -> Self {
        Self {
            window: config.rate_window(),
            check_every: config.weight_check_every.max(1),
            weight_threshold: config.used_weight_threshold,
            heavy_delay: config.heavy_throttle(),
            light_delay: config.light_throttle(),
        }
    }
}

/// 요청 한도 카운터.
#[derive(Debug, Clone)]
pub struct RateBudget {
    policy: ThrottlePolicy,
    requests_in_window: u32,
    window_start: Instant,
    used_weight: u32,
}

impl RateBudget {
    /// 현재 시각에서 시작하는 새 카운터.
    pub fn new(policy: ThrottlePolicy) -> Self {
        Self {
            policy,
            requests_in_window: 0,
            window_start: Instant::now(),
            used_weight: 0,
        }
    }

    /// 윈도우가 지났으면 요청 수를 초기화합니다.
    ///
    /// 초기화되었으면 `true`.
    pub fn roll_window(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.window_start) >= self.policy.window {
            self.requests_in_window = 0;
            self.window_start = now;
            true
        } else {
            false
        }
    }

    /// 제공자 응답 한 건을 기록합니다.
    ///
    /// 가중치 헤더가 없으면 0으로 간주합니다.
    pub fn record_response(&mut self, used_weight: Option<u32>) {
        self.requests_in_window += 1;
        self.used_weight = used_weight.unwrap_or(0);
    }

    /// 성공 응답 직후 호출하여 필요한 대기 시간을 반환합니다.
    ///
    /// `check_every` 번째 요청마다 사용 가중치를 확인하며,
    /// 그 외에는 대기하지 않습니다.
    pub fn throttle_delay(&self) -> Option<Duration> {
        if self.requests_in_window == 0 || self.requests_in_window % self.policy.check_every != 0 {
            return None;
        }

        if self.used_weight > self.policy.weight_threshold {
            Some(self.policy.heavy_delay)
        } else {
            Some(self.policy.light_delay)
        }
    }

    pub fn requests_in_window(&self) -> u32 {
        self.requests_in_window
    }

    pub fn used_weight(&self) -> u32 {
        self.used_weight
    }

    pub fn window_start(&self) -> Instant {
        self.window_start
    }
}

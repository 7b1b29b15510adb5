//! 페이지 요청 재시도 정책.

use std::time::Duration;

use ohlcv_core::{ExchangeConfig, RetryMode};

use crate::ExchangeError;

/// 백오프 상한.
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(16);

/// 연속 실패에 대한 재시도 정책.
///
/// 요청 한도 초과(429)는 실패로 세지 않으며 이 정책의 대상이 아닙니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 연속 실패 허용 횟수. `None`이면 무제한 재시도
    pub max_retries: Option<u32>,
    /// 첫 재시도 대기
    pub base_delay: Duration,
    /// 대기 상한
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&ExchangeConfig::default())
    }
}

impl RetryPolicy {
    pub fn new(max_retries: Option<u32>, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay: DEFAULT_MAX_BACKOFF.max(base_delay),
        }
    }

    /// 모든 일시적 에러를 대기 없이 무한 재시도하는 기존 동작.
    pub fn legacy() -> Self {
        Self {
            max_retries: None,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    pub fn from_config(config: &ExchangeConfig) -> Self {
        match config.retry_mode {
            RetryMode::Capped => Self::new(config.max_retries, config.retry_delay()),
            RetryMode::Legacy => Self::legacy(),
        }
    }

    /// 상한 설정.
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// `failures`번 연속 실패한 뒤 다시 시도해야 하는지 판단합니다.
    pub fn should_retry(&self, err: &ExchangeError, failures: u32) -> bool {
        if matches!(err, ExchangeError::Cancelled) {
            return false;
        }

        match self.max_retries {
            None => true,
            Some(max) => err.is_retryable() && failures <= max,
        }
    }

    /// `failures`번째 연속 실패 후 대기 시간 (2배씩 증가, 상한 적용).
    pub fn delay_for(&self, failures: u32) -> Duration {
        if failures == 0 {
            return Duration::ZERO;
        }
        let shift = (failures - 1).min(16);
        self.base_delay
            .saturating_mul(1u32 << shift)
            .min(self.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::new(Some(5), Duration::from_secs(1));

        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for(3), Duration::from_secs(4));
        assert_eq!(policy.delay_for(5), Duration::from_secs(16));
        assert_eq!(policy.delay_for(30), Duration::from_secs(16));
    }

    #[test]
    fn test_capped_policy_stops_after_max() {
        let policy = RetryPolicy::new(Some(2), Duration::from_millis(10));
        let err = ExchangeError::NetworkError("reset".into());

        assert!(policy.should_retry(&err, 1));
        assert!(policy.should_retry(&err, 2));
        assert!(!policy.should_retry(&err, 3));
    }

    #[test]
    fn test_capped_policy_rejects_client_errors() {
        let policy = RetryPolicy::new(Some(5), Duration::from_millis(10));
        let err = ExchangeError::ApiError {
            status: 400,
            code: Some(-1121),
            message: "Invalid symbol.".into(),
        };
        assert!(!policy.should_retry(&err, 1));
    }

    #[test]
    fn test_legacy_policy_retries_everything_but_cancel() {
        let policy = RetryPolicy::legacy();
        let err = ExchangeError::ApiError {
            status: 400,
            code: None,
            message: "bad".into(),
        };

        assert!(policy.should_retry(&err, 1_000));
        assert!(!policy.should_retry(&ExchangeError::Cancelled, 1));
        assert_eq!(policy.delay_for(7), Duration::ZERO);
    }

    #[test]
    fn test_from_config_follows_retry_mode() {
        let mut config = ExchangeConfig::default();
        assert_eq!(
            RetryPolicy::from_config(&config),
            RetryPolicy::new(Some(5), Duration::from_secs(1))
        );

        config.retry_mode = RetryMode::Legacy;
        assert_eq!(RetryPolicy::from_config(&config), RetryPolicy::legacy());
    }
}

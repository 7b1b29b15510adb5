//! 요청 한도를 지키는 캔들 페이지네이션.
//!
//! 한 번에 하나의 요청만 보내며, 응답마다 [`RateBudget`]을 갱신합니다.
//!
//! - 429/418: `Retry-After`(없으면 설정 기본값)만큼 대기 후 같은 커서로 재요청.
//!   실패로 세지 않습니다.
//! - 그 외 에러: [`RetryPolicy`]에 따라 같은 커서로 재시도하거나 중단.
//! - 빈 페이지 또는 커서가 종료 시각에 도달하면 종료.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use ohlcv_core::{Candle, ExchangeConfig, Interval, Series};

use crate::rate_budget::{RateBudget, ThrottlePolicy};
use crate::retry::RetryPolicy;

/// 제공자가 허용하는 페이지당 최대 캔들 수.
pub const MAX_PAGE_LIMIT: u32 = 1000;
use crate::source::{KlinePage, KlineQuery, KlineSource};
use crate::{ExchangeError, ExchangeResult};

/// 한 (심볼, 간격) 구간의 수집 요청.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub symbol: String,
    pub interval: Interval,
    /// 시작 시각 (밀리초, 포함)
    pub start_ms: i64,
    /// 종료 시각 (밀리초, 미포함)
    pub end_ms: i64,
    /// 페이지당 최대 캔들 수 (`1..=MAX_PAGE_LIMIT`)
    pub page_limit: u32,
}

impl FetchRequest {
    pub fn new(
        symbol: impl Into<String>,
        interval: Interval,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        page_limit: u32,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            interval,
            start_ms: start.timestamp_millis(),
            end_ms: end.timestamp_millis(),
            page_limit: page_limit.clamp(1, MAX_PAGE_LIMIT),
        }
    }

    /// `now - lookback_days`부터 `now`까지의 요청 생성.
    pub fn from_lookback(
        symbol: impl Into<String>,
        interval: Interval,
        now: DateTime<Utc>,
        page_limit: u32,
    ) -> Self {
        let start = now - ChronoDuration::days(interval.lookback_days());
        Self::new(symbol, interval, start, now, page_limit)
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.start_ms)
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.end_ms)
    }
}

/// 페이지네이션 결과.
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    /// 수신 순서 그대로의 원시 시계열
    pub series: Series,
    /// 보낸 요청 수
    pub requests: u32,
    /// 성공한 페이지 수 (빈 페이지 포함)
    pub pages: u32,
    /// 요청 한도 초과로 대기한 횟수
    pub rate_limit_waits: u32,
    /// 일시적 에러로 재시도한 횟수
    pub retries: u32,
}

/// 요청 한도를 지키며 구간 전체를 페이지 단위로 수집합니다.
pub struct KlinePaginator<S> {
    source: S,
    budget: RateBudget,
    retry: RetryPolicy,
    default_retry_after: Duration,
    cancel: Option<CancellationToken>,
}

impl<S: KlineSource> KlinePaginator<S> {
    pub fn new(source: S, config: &ExchangeConfig) -> Self {
        Self {
            source,
            budget: RateBudget::new(ThrottlePolicy::from(config)),
            retry: RetryPolicy::from_config(config),
            default_retry_after: config.default_retry_after(),
            cancel: None,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_throttle(mut self, policy: ThrottlePolicy) -> Self {
        self.budget = RateBudget::new(policy);
        self
    }

    /// 취소 토큰 설정.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn budget(&self) -> &RateBudget {
        &self.budget
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// 요청 구간 전체를 수집합니다.
    ///
    /// # Errors
    /// - 취소되면 `ExchangeError::Cancelled`
    /// - 재시도 한도를 넘으면 `ExchangeError::RetriesExhausted`
    /// - 재시도 불가 에러(4xx 등)는 그대로 반환
    pub async fn fetch(&mut self, request: &FetchRequest) -> ExchangeResult<FetchOutcome> {
        let mut outcome = FetchOutcome::default();
        let mut candles: Vec<Candle> = Vec::new();
        let mut cursor = request.start_ms;
        let mut failures: u32 = 0;

        info!(
            source = self.source.name(),
            symbol = %request.symbol,
            interval = %request.interval,
            start_ms = request.start_ms,
            end_ms = request.end_ms,
            "Starting paginated fetch"
        );

        while cursor < request.end_ms {
            self.ensure_not_cancelled()?;
            if self.budget.roll_window(Instant::now()) {
                debug!("Rate window reset");
            }

            let query = KlineQuery {
                symbol: request.symbol.clone(),
                interval: request.interval,
                start_time_ms: cursor,
                limit: request.page_limit,
            };

            outcome.requests += 1;
            match self.request(&query).await {
                Ok(page) => {
                    self.budget.record_response(page.used_weight);
                    failures = 0;
                    outcome.pages += 1;

                    let Some(last_open) = page.rows.last().map(|row| row.open_time_ms) else {
                        debug!(cursor, "Empty page, stopping");
                        break;
                    };

                    let received = page.rows.len();
                    for row in page.rows {
                        match row.to_candle() {
                            Some(candle) => candles.push(candle),
                            None => warn!(open_time_ms = row.open_time_ms, "Open time out of range, row skipped"),
                        }
                    }

                    // 제공자가 커서를 앞당기지 않아도 무한 루프에 빠지지 않도록
                    cursor = last_open.saturating_add(1).max(cursor + 1);
                    debug!(
                        received,
                        total = candles.len(),
                        next_cursor = cursor,
                        used_weight = self.budget.used_weight(),
                        "Page received"
                    );

                    if let Some(delay) = self.budget.throttle_delay() {
                        debug!(
                            delay_ms = delay.as_millis() as u64,
                            used_weight = self.budget.used_weight(),
                            "Throttling"
                        );
                        self.sleep(delay).await?;
                    }
                }
                Err(ExchangeError::RateLimited { retry_after }) => {
                    self.budget.record_response(None);
                    outcome.rate_limit_waits += 1;
                    let wait = retry_after.unwrap_or(self.default_retry_after);
                    warn!(
                        cursor,
                        wait_secs = wait.as_secs_f64(),
                        "Rate limit hit, waiting before retrying the same page"
                    );
                    self.sleep(wait).await?;
                }
                Err(err) => {
                    if err.has_response() {
                        self.budget.record_response(None);
                    }
                    failures += 1;

                    if !self.retry.should_retry(&err, failures) {
                        if !err.is_retryable() {
                            error!(cursor, error = %err, "Non-retryable provider error");
                            return Err(err);
                        }
                        error!(cursor, failures, error = %err, "Giving up after repeated failures");
                        return Err(ExchangeError::RetriesExhausted {
                            attempts: failures,
                            last_error: err.to_string(),
                        });
                    }

                    outcome.retries += 1;
                    let delay = self.retry.delay_for(failures);
                    warn!(
                        cursor,
                        failures,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Request failed, retrying same page"
                    );
                    if !delay.is_zero() {
                        self.sleep(delay).await?;
                    }
                }
            }
        }

        info!(
            symbol = %request.symbol,
            interval = %request.interval,
            rows = candles.len(),
            requests = outcome.requests,
            rate_limit_waits = outcome.rate_limit_waits,
            retries = outcome.retries,
            "Paginated fetch complete"
        );

        outcome.series = Series::from_candles(candles);
        Ok(outcome)
    }

    fn ensure_not_cancelled(&self) -> ExchangeResult<()> {
        match &self.cancel {
            Some(token) if token.is_cancelled() => Err(ExchangeError::Cancelled),
            _ => Ok(()),
        }
    }

    async fn request(&self, query: &KlineQuery) -> ExchangeResult<KlinePage> {
        match &self.cancel {
            Some(token) => tokio::select! {
                _ = token.cancelled() => Err(ExchangeError::Cancelled),
                result = self.source.fetch_page(query) => result,
            },
            None => self.source.fetch_page(query).await,
        }
    }

    async fn sleep(&self, duration: Duration) -> ExchangeResult<()> {
        match &self.cancel {
            Some(token) => tokio::select! {
                _ = token.cancelled() => Err(ExchangeError::Cancelled),
                _ = tokio::time::sleep(duration) => Ok(()),
            },
            None => {
                tokio::time::sleep(duration).await;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_request_from_lookback() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();

        let short = FetchRequest::from_lookback("ALGOUSDT", Interval::M15, now, 100);
        assert_eq!(short.end_ms - short.start_ms, 60 * 86_400_000);
        assert_eq!(short.end_time(), Some(now));

        let daily = FetchRequest::from_lookback("ALGOUSDT", Interval::D1, now, 100);
        assert_eq!(daily.end_ms - daily.start_ms, 365 * 86_400_000);
    }

    #[test]
    fn test_page_limit_is_clamped_to_provider_range() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();

        let request = FetchRequest::new("BTCUSDT", Interval::H1, now, now, 0);
        assert_eq!(request.page_limit, 1);

        let request = FetchRequest::new("BTCUSDT", Interval::H1, now, now, 5_000);
        assert_eq!(request.page_limit, MAX_PAGE_LIMIT);

        let request = FetchRequest::from_lookback("BTCUSDT", Interval::H1, now, 1000);
        assert_eq!(request.page_limit, 1000);
    }
}

//! 페이지네이션 루프 테스트.
//!
//! 스크립트된 제공자와 tokio 일시정지 시간을 사용하여
//! 429 대기, 스로틀, 재시도 정책을 결정적으로 검증합니다.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use ohlcv_core::{ExchangeConfig, Interval};
use ohlcv_exchange::{
    ExchangeError, ExchangeResult, FetchRequest, KlinePage, KlinePaginator, KlineQuery,
    KlineSource, RawKline, RetryPolicy, ThrottlePolicy,
};

const HOUR_MS: i64 = 3_600_000;

/// 미리 정한 응답을 순서대로 돌려주는 제공자.
/// 스크립트가 끝나면 빈 페이지를 돌려줍니다.
struct ScriptedSource {
    responses: Mutex<VecDeque<ExchangeResult<KlinePage>>>,
    calls: Mutex<Vec<(i64, Instant)>>,
}

impl ScriptedSource {
    fn new(responses: Vec<ExchangeResult<KlinePage>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<(i64, Instant)> {
        self.calls.lock().unwrap().clone()
    }

    fn cursors(&self) -> Vec<i64> {
        self.calls().into_iter().map(|(cursor, _)| cursor).collect()
    }
}

#[async_trait]
impl KlineSource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn fetch_page(&self, query: &KlineQuery) -> ExchangeResult<KlinePage> {
        self.calls
            .lock()
            .unwrap()
            .push((query.start_time_ms, Instant::now()));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(KlinePage::default()))
    }
}

fn kline(open_time_ms: i64) -> RawKline {
    RawKline {
        open_time_ms,
        open: 1.0,
        high: 1.2,
        low: 0.9,
        close: 1.1,
        volume: 100.0,
    }
}

/// `start_hour`부터 `count`개의 시간봉 페이지.
fn page(start_hour: i64, count: i64, used_weight: Option<u32>) -> ExchangeResult<KlinePage> {
    Ok(KlinePage {
        rows: (start_hour..start_hour + count)
            .map(|h| kline(h * HOUR_MS))
            .collect(),
        used_weight,
    })
}

fn request(hours: i64) -> FetchRequest {
    FetchRequest {
        symbol: "ALGOUSDT".to_string(),
        interval: Interval::H1,
        start_ms: 0,
        end_ms: hours * HOUR_MS,
        page_limit: 3,
    }
}

fn paginator(source: ScriptedSource) -> KlinePaginator<ScriptedSource> {
    KlinePaginator::new(source, &ExchangeConfig::default())
}

#[tokio::test(start_paused = true)]
async fn test_rate_limited_page_is_retried_at_same_cursor() {
    let source = ScriptedSource::new(vec![
        Err(ExchangeError::RateLimited {
            retry_after: Some(Duration::from_secs(5)),
        }),
        page(0, 3, Some(10)),
        Ok(KlinePage::default()),
    ]);
    let mut paginator = paginator(source);

    let started = Instant::now();
    let outcome = paginator.fetch(&request(100)).await.unwrap();

    assert!(started.elapsed() >= Duration::from_secs(5));
    assert_eq!(outcome.rate_limit_waits, 1);
    assert_eq!(outcome.retries, 0);

    let calls = paginator.source().calls();
    assert_eq!(calls.len(), 3);
    // 같은 커서로 재요청
    assert_eq!(calls[0].0, 0);
    assert_eq!(calls[1].0, 0);
    assert!(calls[1].1 - calls[0].1 >= Duration::from_secs(5));
    assert_eq!(calls[2].0, 2 * HOUR_MS + 1);

    // 재요청한 페이지는 정확히 한 번만 포함
    let timestamps: Vec<i64> = outcome
        .series
        .iter()
        .map(|c| c.timestamp.timestamp_millis())
        .collect();
    assert_eq!(timestamps, vec![0, HOUR_MS, 2 * HOUR_MS]);
}

#[tokio::test(start_paused = true)]
async fn test_missing_retry_after_uses_configured_default() {
    let source = ScriptedSource::new(vec![
        Err(ExchangeError::RateLimited { retry_after: None }),
        page(0, 1, None),
    ]);
    let mut paginator = paginator(source);

    let started = Instant::now();
    paginator.fetch(&request(10)).await.unwrap();

    assert!(started.elapsed() >= Duration::from_secs(60));
}

#[tokio::test(start_paused = true)]
async fn test_empty_page_stops_early() {
    let source = ScriptedSource::new(vec![page(0, 3, None), Ok(KlinePage::default())]);
    let mut paginator = paginator(source);

    let outcome = paginator.fetch(&request(1_000)).await.unwrap();

    assert_eq!(outcome.series.len(), 3);
    assert_eq!(outcome.pages, 2);
    assert_eq!(paginator.source().cursors(), vec![0, 2 * HOUR_MS + 1]);
}

#[tokio::test(start_paused = true)]
async fn test_stops_when_cursor_reaches_end() {
    // 5시간 구간: 두 번째 페이지 뒤 커서가 5h+1이 되어 종료
    let source = ScriptedSource::new(vec![page(0, 3, None), page(3, 3, None), page(6, 3, None)]);
    let mut paginator = paginator(source);

    let outcome = paginator.fetch(&request(5)).await.unwrap();

    assert_eq!(outcome.series.len(), 6);
    assert_eq!(outcome.requests, 2);
}

#[tokio::test(start_paused = true)]
async fn test_zero_candles_yields_empty_series() {
    let mut paginator = paginator(ScriptedSource::new(vec![]));

    let outcome = paginator.fetch(&request(24)).await.unwrap();

    assert!(outcome.series.is_empty());
    assert_eq!(outcome.requests, 1);
}

#[tokio::test(start_paused = true)]
async fn test_throttle_on_every_tenth_request() {
    let mut responses: Vec<_> = (0..9).map(|i| page(i, 1, Some(100))).collect();
    responses.push(page(9, 1, Some(900)));
    responses.push(page(10, 1, Some(100)));
    let mut paginator = paginator(ScriptedSource::new(responses));

    paginator.fetch(&request(1_000)).await.unwrap();

    let calls = paginator.source().calls();
    assert_eq!(calls.len(), 12);
    // 처음 10개 요청 사이에는 대기가 없음
    assert_eq!(calls[9].1, calls[0].1);
    // 10번째 응답의 사용 가중치가 임계값(800)을 넘으므로 1초 대기
    assert!(calls[10].1 - calls[9].1 >= Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn test_light_throttle_under_threshold() {
    let responses: Vec<_> = (0..10).map(|i| page(i, 1, Some(100))).collect();
    let mut paginator = paginator(ScriptedSource::new(responses)).with_throttle(ThrottlePolicy {
        window: Duration::from_secs(60),
        check_every: 10,
        weight_threshold: 800,
        heavy_delay: Duration::from_secs(1),
        light_delay: Duration::from_millis(100),
    });

    paginator.fetch(&request(1_000)).await.unwrap();

    let calls = paginator.source().calls();
    let gap = calls[10].1 - calls[9].1;
    assert!(gap >= Duration::from_millis(100));
    assert!(gap < Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn test_transient_error_retries_same_cursor() {
    let source = ScriptedSource::new(vec![
        Err(ExchangeError::NetworkError("connection reset".into())),
        page(0, 2, None),
    ]);
    let mut paginator = paginator(source);

    let outcome = paginator.fetch(&request(48)).await.unwrap();

    assert_eq!(outcome.retries, 1);
    assert_eq!(outcome.series.len(), 2);
    let cursors = paginator.source().cursors();
    assert_eq!(cursors[0], cursors[1]);
}

#[tokio::test(start_paused = true)]
async fn test_capped_retries_are_exhausted() {
    let source = ScriptedSource::new(vec![
        Err(ExchangeError::Timeout("30s".into())),
        Err(ExchangeError::Timeout("30s".into())),
        Err(ExchangeError::Timeout("30s".into())),
        page(0, 1, None),
    ]);
    let mut paginator = paginator(source)
        .with_retry_policy(RetryPolicy::new(Some(2), Duration::from_secs(1)));

    let started = Instant::now();
    let err = paginator.fetch(&request(48)).await.unwrap_err();

    match err {
        ExchangeError::RetriesExhausted { attempts, .. } => assert_eq!(attempts, 3),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(paginator.source().calls().len(), 3);
    // 1초 + 2초 백오프
    assert!(started.elapsed() >= Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn test_client_error_fails_immediately() {
    let source = ScriptedSource::new(vec![Err(ExchangeError::ApiError {
        status: 400,
        code: Some(-1121),
        message: "Invalid symbol.".into(),
    })]);
    let mut paginator = paginator(source);

    let err = paginator.fetch(&request(48)).await.unwrap_err();

    assert!(matches!(err, ExchangeError::ApiError { status: 400, .. }));
    assert_eq!(paginator.source().calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_legacy_policy_retries_without_limit() {
    let mut responses: Vec<_> = (0..25)
        .map(|_| {
            Err(ExchangeError::ApiError {
                status: 400,
                code: None,
                message: "bad request".into(),
            })
        })
        .collect();
    responses.push(page(0, 2, None));
    let mut paginator = paginator(ScriptedSource::new(responses))
        .with_retry_policy(RetryPolicy::legacy());

    let outcome = paginator.fetch(&request(48)).await.unwrap();

    assert_eq!(outcome.retries, 25);
    assert_eq!(outcome.series.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_before_start() {
    let token = CancellationToken::new();
    token.cancel();
    let mut paginator = paginator(ScriptedSource::new(vec![page(0, 1, None)]))
        .with_cancellation(token);

    let err = paginator.fetch(&request(48)).await.unwrap_err();

    assert!(matches!(err, ExchangeError::Cancelled));
    assert!(paginator.source().calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_interrupts_rate_limit_wait() {
    let token = CancellationToken::new();
    let source = ScriptedSource::new(vec![Err(ExchangeError::RateLimited {
        retry_after: Some(Duration::from_secs(60)),
    })]);
    let mut paginator = paginator(source).with_cancellation(token.clone());

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(10)).await;
        token.cancel();
    });

    let started = Instant::now();
    let err = paginator.fetch(&request(48)).await.unwrap_err();
    canceller.await.unwrap();

    assert!(matches!(err, ExchangeError::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(60));
}

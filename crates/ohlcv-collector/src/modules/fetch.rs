//! 캔들 수집 → 정제 → 검증 → 저장 파이프라인.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Instrument};

use ohlcv_core::{series_span, AppConfig, FillPolicy, Interval, Series};
use ohlcv_data::{OhlcvCleaner, OhlcvValidator, SeriesStore, ValidationReport};
use ohlcv_exchange::{BinanceKlineClient, FetchRequest, KlinePaginator, KlineSource, RetryPolicy};

use crate::{CollectionStats, CollectorConfig, CollectorError, Result};

/// 한 간격의 수집 결과.
#[derive(Debug, Clone)]
pub struct FetchedSeries {
    /// 정제된 시계열
    pub series: Series,
    /// 정제 후 검증 리포트
    pub report: ValidationReport,
    /// 저장된 CSV 경로 (빈 시계열은 저장하지 않으므로 `None`)
    pub path: Option<PathBuf>,
}

/// 요청 한도를 지키는 수집기.
///
/// 하나의 인스턴스가 요청 한도 카운터를 소유하므로,
/// 여러 간격을 연속으로 수집해도 한도가 공유됩니다.
pub struct RateLimitedFetcher<S> {
    paginator: KlinePaginator<S>,
    cleaner: OhlcvCleaner,
    validator: OhlcvValidator,
    store: SeriesStore,
    fill_policy: FillPolicy,
    page_limit: u32,
    stats: CollectionStats,
}

impl RateLimitedFetcher<BinanceKlineClient> {
    /// Binance 클라이언트로 수집기 생성
    pub fn binance(config: &CollectorConfig) -> Result<Self> {
        let client = BinanceKlineClient::new(&config.app.exchange)?;
        Ok(Self::new(client, &config.app))
    }
}

impl<S: KlineSource> RateLimitedFetcher<S> {
    pub fn new(source: S, config: &AppConfig) -> Self {
        Self {
            paginator: KlinePaginator::new(source, &config.exchange),
            cleaner: OhlcvCleaner::from_config(&config.cleaning),
            validator: OhlcvValidator::new(),
            store: SeriesStore::new(&config.storage.data_path),
            fill_policy: config.cleaning.fill_policy,
            page_limit: config.exchange.page_limit,
            stats: CollectionStats::new(),
        }
    }

    /// 취소 토큰 설정
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.paginator = self.paginator.with_cancellation(token);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.paginator = self.paginator.with_retry_policy(retry);
        self
    }

    pub fn stats(&self) -> &CollectionStats {
        &self.stats
    }

    pub fn store(&self) -> &SeriesStore {
        &self.store
    }

    pub fn source(&self) -> &S {
        self.paginator.source()
    }

    /// 기본 조회 기간(`now - lookback_days` ~ `now`)의 정제된 시계열 수집
    pub async fn fetch(&mut self, symbol: &str, interval: Interval) -> Result<Series> {
        let fetched = self.fetch_at(symbol, interval, Utc::now()).await?;
        Ok(fetched.series)
    }

    /// `now` 기준 기본 조회 기간 수집
    pub async fn fetch_at(
        &mut self,
        symbol: &str,
        interval: Interval,
        now: DateTime<Utc>,
    ) -> Result<FetchedSeries> {
        let request = FetchRequest::from_lookback(symbol, interval, now, self.page_limit);
        self.fetch_request(&request).await
    }

    /// 요청 구간 수집 후 정제, 검증, 저장
    pub async fn fetch_request(&mut self, request: &FetchRequest) -> Result<FetchedSeries> {
        let span = series_span!("fetch", request.symbol, request.interval);
        self.run_request(request).instrument(span).await
    }

    async fn run_request(&mut self, request: &FetchRequest) -> Result<FetchedSeries> {
        let started = Instant::now();
        self.stats.total += 1;

        let outcome = match self.paginator.fetch(request).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.stats.errors += 1;
                self.stats.elapsed += started.elapsed();
                return Err(e.into());
            }
        };
        self.stats.record_outcome(&outcome);

        let series = self.cleaner.clean(&outcome.series, self.fill_policy);
        let report = self.validator.validate(&series);
        log_report(&report);

        // 빈 결과를 저장하면 더 최근 파일명으로 기존 데이터를 가리게 됩니다.
        let path = if series.is_empty() {
            self.stats.empty += 1;
            warn!("Provider returned no candles, nothing saved");
            None
        } else {
            let (start, end) = request_range(request);
            match self
                .store
                .save(&request.symbol, request.interval, start, end, &series, &report)
            {
                Ok(path) => {
                    self.stats.success += 1;
                    Some(path)
                }
                Err(e) => {
                    self.stats.errors += 1;
                    self.stats.elapsed += started.elapsed();
                    return Err(e.into());
                }
            }
        };
        self.stats.total_candles += series.len();
        self.stats.elapsed += started.elapsed();

        if let Some(path) = &path {
            info!(
                raw_rows = outcome.series.len(),
                rows = series.len(),
                path = %path.display(),
                "Interval collected"
            );
        }

        Ok(FetchedSeries {
            series,
            report,
            path,
        })
    }

    /// 지원 간격 전체(또는 `filter` 하나)를 수집합니다.
    ///
    /// 지원하지 않는 `filter`는 요청 전에 `InvalidInterval`로 실패합니다.
    /// 취소되면 즉시 중단하며, 그 외 간격별 실패는 기록 후 다음 간격으로 넘어갑니다.
    /// 모든 간격이 실패하면 마지막 에러를 반환합니다.
    pub async fn fetch_multi_timeframe(
        &mut self,
        symbol: &str,
        filter: Option<&str>,
    ) -> Result<BTreeMap<Interval, Series>> {
        self.fetch_multi_timeframe_at(symbol, filter, Utc::now())
            .await
            .map(|fetched| {
                fetched
                    .into_iter()
                    .map(|(interval, f)| (interval, f.series))
                    .collect()
            })
    }

    /// `now` 기준 일괄 수집
    pub async fn fetch_multi_timeframe_at(
        &mut self,
        symbol: &str,
        filter: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<BTreeMap<Interval, FetchedSeries>> {
        let intervals = select_intervals(filter)?;
        let mut results = BTreeMap::new();
        let mut last_error = None;

        info!(symbol, intervals = intervals.len(), "Multi-timeframe fetch started");

        for interval in intervals {
            match self.fetch_at(symbol, interval, now).await {
                Ok(fetched) => {
                    results.insert(interval, fetched);
                }
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => {
                    tracing::error!(symbol, interval = %interval, error = %e, "Interval fetch failed");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if results.is_empty() => Err(e),
            _ => Ok(results),
        }
    }
}

/// 간격 필터 해석 (없으면 지원 간격 전체)
pub fn select_intervals(filter: Option<&str>) -> Result<Vec<Interval>> {
    match filter {
        Some(raw) => Ok(vec![raw.trim().parse::<Interval>().map_err(CollectorError::from)?]),
        None => Ok(Interval::ALL.to_vec()),
    }
}

fn request_range(request: &FetchRequest) -> (DateTime<Utc>, DateTime<Utc>) {
    let end = request.end_time().unwrap_or_else(Utc::now);
    let start = request.start_time().unwrap_or(end);
    (start, end)
}

fn log_report(report: &ValidationReport) {
    if report.is_clean() {
        info!(
            rows = report.rows,
            gaps = %report.timestamp_gaps.description(),
            "Validation passed"
        );
    } else {
        warn!(
            rows = report.rows,
            has_missing_values = report.has_missing_values,
            has_duplicates = report.has_duplicates,
            gaps = %report.timestamp_gaps.description(),
            ohlc = report.ohlc_description(),
            negatives = report.negative_description(),
            "Validation found issues"
        );
    }
}

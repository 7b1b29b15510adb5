//! OHLCV 시계열 정제.
//!
//! 단계는 항상 다음 순서로 실행되며, 각 단계의 출력이 다음 단계의 입력이 됩니다.
//!
//! 1. 결측값 채우기 ([`FillPolicy`])
//! 2. 완전히 동일한 행 제거
//! 3. 가격 이상치 억제 (롤링 평균 ± k·표준편차 밖의 값을 시간 보간으로 대체)
//! 4. OHLC 보정 (`high = max(o,h,l,c)`, `low = min(o,h,l,c)`)
//! 5. 반올림 (가격/거래량 소수 자릿수)
//! 6. 타임스탬프 오름차순 정렬
//!
//! 모든 단계는 입력을 변경하지 않고 새 시계열을 반환합니다.
//! 빈 시계열, 한 행짜리 시계열, 전부 결측인 컬럼도 에러 없이 처리합니다.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{debug, warn};

use ohlcv_core::{Candle, CandleField, CleaningConfig, FillPolicy, Series};

use crate::DataResult;

/// 기본 가격 소수 자릿수.
pub const DEFAULT_PRICE_DECIMALS: u32 = 8;
/// 기본 거래량 소수 자릿수.
pub const DEFAULT_VOLUME_DECIMALS: u32 = 2;
/// 이상치 탐지 롤링 윈도우 크기 (행).
pub const DEFAULT_ANOMALY_WINDOW: usize = 48;
/// 이상치 판정 표준편차 배수.
pub const DEFAULT_ANOMALY_SIGMA: f64 = 4.0;
/// 필드별 이상치 탐지 반복 상한.
pub const MAX_ANOMALY_PASSES: usize = 16;

/// OHLCV 정제기.
#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvCleaner {
    price_decimals: u32,
    volume_decimals: u32,
    anomaly_window: usize,
    anomaly_sigma: f64,
}

impl Default for OhlcvCleaner {
    fn default() -> Self {
        Self::new(DEFAULT_PRICE_DECIMALS, DEFAULT_VOLUME_DECIMALS)
    }
}

impl OhlcvCleaner {
    pub fn new(price_decimals: u32, volume_decimals: u32) -> Self {
        Self {
            price_decimals,
            volume_decimals,
            anomaly_window: DEFAULT_ANOMALY_WINDOW,
            anomaly_sigma: DEFAULT_ANOMALY_SIGMA,
        }
    }

    /// 이상치 탐지 파라미터 변경.
    pub fn with_anomaly(mut self, window: usize, sigma: f64) -> Self {
        self.anomaly_window = window.max(1);
        self.anomaly_sigma = sigma;
        self
    }

    pub fn from_config(config: &CleaningConfig) -> Self {
        Self::new(config.price_decimals, config.volume_decimals)
            .with_anomaly(config.anomaly_window, config.anomaly_sigma)
    }

    pub fn price_decimals(&self) -> u32 {
        self.price_decimals
    }

    pub fn volume_decimals(&self) -> u32 {
        self.volume_decimals
    }

    /// 전체 정제 파이프라인 실행.
    pub fn clean(&self, series: &Series, policy: FillPolicy) -> Series {
        let filled = fill_missing(series, policy);
        let deduped = drop_duplicates(&filled);
        let smoothed =
            suppress_price_anomalies(&deduped, self.anomaly_window, self.anomaly_sigma);
        let repaired = repair_ohlc(&smoothed);
        let rounded = round_values(&repaired, self.price_decimals, self.volume_decimals);
        let sorted = sort_by_timestamp(&rounded);

        debug!(
            input_rows = series.len(),
            output_rows = sorted.len(),
            policy = %policy,
            "Series cleaned"
        );

        sorted
    }

    /// 이름으로 지정한 채우기 정책으로 정제합니다.
    ///
    /// # Errors
    /// 지원하지 않는 정책 이름이면 `CoreError::UnsupportedFillPolicy`.
    pub fn clean_named(&self, series: &Series, policy: &str) -> DataResult<Series> {
        let policy: FillPolicy = policy.parse()?;
        Ok(self.clean(series, policy))
    }
}

// ==================== 단계별 변환 ====================

/// 1단계: 모든 숫자 컬럼의 결측값 채우기.
pub fn fill_missing(series: &Series, policy: FillPolicy) -> Series {
    let mut candles = series.candles().to_vec();
    let times = time_axis(&candles);
    let mut filled = 0usize;

    for field in CandleField::ALL {
        let mut values: Vec<f64> = candles.iter().map(|c| field.get(c)).collect();
        let missing = values.iter().filter(|v| v.is_nan()).count();
        if missing == 0 {
            continue;
        }

        match policy {
            FillPolicy::Forward => {
                forward_fill(&mut values);
                backward_fill(&mut values);
            }
            FillPolicy::Backward => {
                backward_fill(&mut values);
                forward_fill(&mut values);
            }
            FillPolicy::Mean => mean_fill(&mut values),
            FillPolicy::Interpolate => {
                interpolate_time(&mut values, &times);
                forward_fill(&mut values);
                backward_fill(&mut values);
            }
        }

        filled += missing - values.iter().filter(|v| v.is_nan()).count();
        write_column(&mut candles, field, &values);
    }

    if filled > 0 {
        debug!(filled, policy = %policy, "Missing values filled");
    }
    Series::from_candles(candles)
}

/// 2단계: 타임스탬프와 모든 값이 동일한 행 제거 (첫 행 유지).
///
/// 타임스탬프만 같고 값이 다른 행은 유지합니다.
pub fn drop_duplicates(series: &Series) -> Series {
    let mut seen: HashMap<DateTime<Utc>, Vec<Candle>> = HashMap::new();
    let mut kept = Vec::with_capacity(series.len());
    let mut collisions = 0usize;

    for candle in series.iter() {
        let same_time = seen.entry(candle.timestamp).or_default();
        if same_time.iter().any(|c| c.is_identical(candle)) {
            continue;
        }
        if !same_time.is_empty() {
            collisions += 1;
        }
        same_time.push(*candle);
        kept.push(*candle);
    }

    let dropped = series.len() - kept.len();
    if dropped > 0 {
        debug!(dropped, "Duplicate rows removed");
    }
    if collisions > 0 {
        warn!(collisions, "Rows share a timestamp but differ in values");
    }
    Series::from_candles(kept)
}

/// 3단계: 가격 필드별 롤링 이상치 억제.
///
/// 현재 행을 포함한 직전 `window`개 행의 평균/표본표준편차를 기준으로
/// `mean ± sigma·std` 밖의 값을 결측으로 바꾼 뒤 시간 보간합니다.
/// 표준편차를 계산할 수 없는 위치(관측치 2개 미만)는 판정하지 않습니다.
///
/// 큰 급등값이 표준편차를 부풀려 주변의 작은 이상치를 가릴 수 있으므로,
/// 보정된 컬럼에서 새 이상치가 나오지 않을 때까지 (최대 `MAX_ANOMALY_PASSES`회)
/// 탐지를 반복합니다.
pub fn suppress_price_anomalies(series: &Series, window: usize, sigma: f64) -> Series {
    let mut candles = series.candles().to_vec();
    let times = time_axis(&candles);

    for field in CandleField::PRICES {
        let mut values: Vec<f64> = candles.iter().map(|c| field.get(c)).collect();
        let mut replaced = 0;

        for pass in 1..=MAX_ANOMALY_PASSES {
            let outliers = find_outliers(&values, window, sigma);
            if outliers.is_empty() {
                break;
            }
            if pass == MAX_ANOMALY_PASSES {
                warn!(field = field.name(), remaining = outliers.len(), "Anomaly passes exhausted");
            }

            replaced += outliers.len();
            for idx in outliers {
                values[idx] = f64::NAN;
            }
            interpolate_time(&mut values, &times);
            forward_fill(&mut values);
            backward_fill(&mut values);
        }

        if replaced > 0 {
            debug!(field = field.name(), count = replaced, "Price anomalies replaced");
            write_column(&mut candles, field, &values);
        }
    }

    Series::from_candles(candles)
}

fn find_outliers(values: &[f64], window: usize, sigma: f64) -> Vec<usize> {
    values
        .iter()
        .zip(rolling_mean_std(values, window))
        .enumerate()
        .filter_map(|(idx, (&value, (mean, std)))| {
            let band = sigma * std;
            (value > mean + band || value < mean - band).then_some(idx)
        })
        .collect()
}

/// 4단계: 행 단위로 high/low를 재계산.
pub fn repair_ohlc(series: &Series) -> Series {
    series
        .iter()
        .map(|c| {
            let prices = [c.open, c.high, c.low, c.close];
            // f64::max/min은 NaN을 무시
            let high = prices.iter().copied().fold(f64::NAN, f64::max);
            let low = prices.iter().copied().fold(f64::NAN, f64::min);
            Candle { high, low, ..*c }
        })
        .collect()
}

/// 5단계: 가격/거래량 반올림 (0.5는 0에서 먼 쪽으로).
pub fn round_values(series: &Series, price_decimals: u32, volume_decimals: u32) -> Series {
    series
        .iter()
        .map(|c| {
            let mut candle = *c;
            for field in CandleField::ALL {
                let dp = if field.is_price() {
                    price_decimals
                } else {
                    volume_decimals
                };
                field.set(&mut candle, round_to(field.get(c), dp));
            }
            candle
        })
        .collect()
}

/// 6단계: 타임스탬프 오름차순 안정 정렬.
pub fn sort_by_timestamp(series: &Series) -> Series {
    let mut candles = series.candles().to_vec();
    candles.sort_by_key(|c| c.timestamp);
    Series::from_candles(candles)
}

// ==================== 컬럼 연산 ====================

/// 소수 `dp` 자리로 반올림. NaN, 무한대, Decimal 범위를 벗어난 값은 그대로 둡니다.
pub fn round_to(value: f64, dp: u32) -> f64 {
    Decimal::from_f64(value)
        .map(|d| d.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|d| d.to_f64())
        .unwrap_or(value)
}

/// 직전 유효값으로 채우기.
pub fn forward_fill(values: &mut [f64]) {
    let mut last = f64::NAN;
    for value in values.iter_mut() {
        if value.is_nan() {
            *value = last;
        } else {
            last = *value;
        }
    }
}

/// 다음 유효값으로 채우기.
pub fn backward_fill(values: &mut [f64]) {
    let mut next = f64::NAN;
    for value in values.iter_mut().rev() {
        if value.is_nan() {
            *value = next;
        } else {
            next = *value;
        }
    }
}

/// 컬럼 전체 산술평균으로 채우기. 유효값이 없으면 그대로 둡니다.
pub fn mean_fill(values: &mut [f64]) {
    let valid: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if valid.is_empty() {
        return;
    }
    let mean = valid.iter().sum::<f64>() / valid.len() as f64;
    for value in values.iter_mut().filter(|v| v.is_nan()) {
        *value = mean;
    }
}

/// 경과 시간 가중 선형 보간.
///
/// 앞뒤로 유효값이 모두 있는 내부 결측값만 채우며, 양 끝은 그대로 둡니다.
/// 두 유효값의 시각이 같거나 역전된 경우 행 위치로 가중합니다.
pub fn interpolate_time(values: &mut [f64], times: &[i64]) {
    debug_assert_eq!(values.len(), times.len());

    let valid: Vec<usize> = (0..values.len()).filter(|&i| !values[i].is_nan()).collect();

    for pair in valid.windows(2) {
        let (prev, next) = (pair[0], pair[1]);
        if next - prev < 2 {
            continue;
        }

        let (v0, v1) = (values[prev], values[next]);
        let span = (times[next] - times[prev]) as f64;

        for idx in prev + 1..next {
            let frac = if span > 0.0 {
                ((times[idx] - times[prev]) as f64 / span).clamp(0.0, 1.0)
            } else {
                (idx - prev) as f64 / (next - prev) as f64
            };
            values[idx] = v0 + frac * (v1 - v0);
        }
    }
}

/// 현재 위치를 포함한 직전 `window`개 값의 평균과 표본표준편차.
///
/// NaN은 무시합니다. 유효값이 없으면 평균이, 2개 미만이면 표준편차가 NaN입니다.
pub fn rolling_mean_std(values: &[f64], window: usize) -> Vec<(f64, f64)> {
    let window = window.max(1);

    (0..values.len())
        .map(|idx| {
            let start = (idx + 1).saturating_sub(window);
            let slice: Vec<f64> = values[start..=idx]
                .iter()
                .copied()
                .filter(|v| !v.is_nan())
                .collect();

            let n = slice.len();
            if n == 0 {
                return (f64::NAN, f64::NAN);
            }
            // 첫 값 기준 편차로 계산하여 상수 구간의 평균이 정확히 그 값이 되도록 함
            let pivot = slice[0];
            let offset = slice.iter().map(|v| v - pivot).sum::<f64>() / n as f64;
            let mean = pivot + offset;
            if n < 2 {
                return (mean, f64::NAN);
            }
            let var = slice
                .iter()
                .map(|v| (v - pivot - offset).powi(2))
                .sum::<f64>()
                / (n - 1) as f64;
            (mean, var.sqrt())
        })
        .collect()
}

fn time_axis(candles: &[Candle]) -> Vec<i64> {
    candles.iter().map(|c| c.timestamp.timestamp_millis()).collect()
}

fn write_column(candles: &mut [Candle], field: CandleField, values: &[f64]) {
    for (candle, value) in candles.iter_mut().zip(values) {
        field.set(candle, *value);
    }
}

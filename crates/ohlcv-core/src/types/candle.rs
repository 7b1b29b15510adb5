//! OHLCV 캔들과 시계열.
//!
//! 가격과 거래량은 `f64`로 표현하며, `NaN`은 결측값을 의미합니다.
//! 원본(정제 전) 시계열은 타임스탬프 중복, 정렬 위반, OHLC 관계 위반을
//! 포함할 수 있습니다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OHLCV 캔들 한 개.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// 캔들 시작 시각
    pub timestamp: DateTime<Utc>,
    /// 시가
    pub open: f64,
    /// 고가
    pub high: f64,
    /// 저가
    pub low: f64,
    /// 종가
    pub close: f64,
    /// 거래량
    pub volume: f64,
}

impl Candle {
    /// 새 캔들을 생성합니다.
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// 결측값(NaN)이 하나라도 있는지 확인합니다.
    pub fn has_missing(&self) -> bool {
        CandleField::ALL.iter().any(|f| f.get(self).is_nan())
    }

    /// 음수 가격 또는 거래량이 있는지 확인합니다.
    pub fn has_negative(&self) -> bool {
        CandleField::ALL.iter().any(|f| f.get(self) < 0.0)
    }

    /// OHLC 관계(`low <= open, close <= high`, `low <= high`) 위반 여부.
    ///
    /// NaN과의 비교는 항상 거짓이므로 결측값은 위반으로 세지 않습니다.
    pub fn violates_ohlc(&self) -> bool {
        self.high < self.low
            || self.high < self.open
            || self.high < self.close
            || self.low > self.open
            || self.low > self.close
    }

    /// 타임스탬프를 포함한 모든 필드가 동일한지 확인합니다.
    ///
    /// NaN끼리도 동일하게 취급합니다.
    pub fn is_identical(&self, other: &Candle) -> bool {
        self.timestamp == other.timestamp
            && CandleField::ALL.iter().all(|f| {
                let (a, b) = (f.get(self), f.get(other));
                a == b || (a.is_nan() && b.is_nan())
            })
    }
}

/// 캔들의 숫자 필드.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CandleField {
    Open,
    High,
    Low,
    Close,
    Volume,
}

impl CandleField {
    /// 가격 필드 (open, high, low, close).
    pub const PRICES: [CandleField; 4] = [
        CandleField::Open,
        CandleField::High,
        CandleField::Low,
        CandleField::Close,
    ];

    /// 모든 숫자 필드.
    pub const ALL: [CandleField; 5] = [
        CandleField::Open,
        CandleField::High,
        CandleField::Low,
        CandleField::Close,
        CandleField::Volume,
    ];

    /// CSV 헤더에 사용하는 컬럼 이름.
    pub fn name(&self) -> &'static str {
        match self {
            CandleField::Open => "open",
            CandleField::High => "high",
            CandleField::Low => "low",
            CandleField::Close => "close",
            CandleField::Volume => "volume",
        }
    }

    /// 캔들에서 이 필드 값을 읽습니다.
    pub fn get(&self, candle: &Candle) -> f64 {
        match self {
            CandleField::Open => candle.open,
            CandleField::High => candle.high,
            CandleField::Low => candle.low,
            CandleField::Close => candle.close,
            CandleField::Volume => candle.volume,
        }
    }

    /// 캔들의 이 필드 값을 설정합니다.
    pub fn set(&self, candle: &mut Candle, value: f64) {
        match self {
            CandleField::Open => candle.open = value,
            CandleField::High => candle.high = value,
            CandleField::Low => candle.low = value,
            CandleField::Close => candle.close = value,
            CandleField::Volume => candle.volume = value,
        }
    }

    /// 가격 필드인지 확인합니다.
    pub fn is_price(&self) -> bool {
        !matches!(self, CandleField::Volume)
    }
}

/// 한 (심볼, 간격) 쌍의 캔들 시계열.
///
/// 행 순서를 그대로 보존합니다. 정렬과 중복 제거는 정제 단계의 책임입니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Series {
    candles: Vec<Candle>,
}

impl Series {
    /// 빈 시계열을 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 캔들 목록에서 시계열을 생성합니다.
    pub fn from_candles(candles: Vec<Candle>) -> Self {
        Self { candles }
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn into_candles(self) -> Vec<Candle> {
        self.candles
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Candle> {
        self.candles.iter()
    }

    /// 캔들을 뒤에 추가합니다.
    pub fn push(&mut self, candle: Candle) {
        self.candles.push(candle);
    }

    /// 필드 하나의 값을 행 순서대로 추출합니다.
    pub fn column(&self, field: CandleField) -> Vec<f64> {
        self.candles.iter().map(|c| field.get(c)).collect()
    }

    /// 타임스탬프를 행 순서대로 추출합니다.
    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.candles.iter().map(|c| c.timestamp).collect()
    }

    /// 가장 이른 시각과 가장 늦은 시각.
    pub fn time_range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let min = self.candles.iter().map(|c| c.timestamp).min()?;
        let max = self.candles.iter().map(|c| c.timestamp).max()?;
        Some((min, max))
    }
}

impl From<Vec<Candle>> for Series {
    fn from(candles: Vec<Candle>) -> Self {
        Self::from_candles(candles)
    }
}

impl FromIterator<Candle> for Series {
    fn from_iter<I: IntoIterator<Item = Candle>>(iter: I) -> Self {
        Self::from_candles(iter.into_iter().collect())
    }
}

impl IntoIterator for Series {
    type Item = Candle;
    type IntoIter = std::vec::IntoIter<Candle>;

    fn into_iter(self) -> Self::IntoIter {
        self.candles.into_iter()
    }
}

impl<'a> IntoIterator for &'a Series {
    type Item = &'a Candle;
    type IntoIter = std::slice::Iter<'a, Candle>;

    fn into_iter(self) -> Self::IntoIter {
        self.candles.iter()
    }
}

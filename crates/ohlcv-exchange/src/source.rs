//! 캔들 제공자 trait 정의.

use async_trait::async_trait;
use chrono::DateTime;
use ohlcv_core::{Candle, Interval};
use serde_json::Value;

use crate::ExchangeResult;

/// 캔들 페이지 요청 한 건.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KlineQuery {
    /// 거래쌍 심볼 (예: "ALGOUSDT")
    pub symbol: String,
    /// 캔들 간격
    pub interval: Interval,
    /// 조회 시작 시각 (밀리초)
    pub start_time_ms: i64,
    /// 최대 캔들 수
    pub limit: u32,
}

/// 제공자가 돌려준 원시 캔들 한 행.
///
/// 숫자로 해석할 수 없는 값은 결측값(NaN)으로 남깁니다.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawKline {
    /// 캔들 시작 시각 (밀리초)
    pub open_time_ms: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl RawKline {
    /// `[openTime, open, high, low, close, volume, ...]` 형식의 JSON 행을 파싱합니다.
    ///
    /// 시작 시각이 없거나 정수가 아니면 `None`을 반환합니다.
    pub fn from_json_row(row: &[Value]) -> Option<Self> {
        let open_time_ms = row.first()?.as_i64()?;
        let field = |idx: usize| row.get(idx).map(parse_number).unwrap_or(f64::NAN);

        Some(Self {
            open_time_ms,
            open: field(1),
            high: field(2),
            low: field(3),
            close: field(4),
            volume: field(5),
        })
    }

    /// 타입이 지정된 캔들로 변환합니다.
    pub fn to_candle(&self) -> Option<Candle> {
        let timestamp = DateTime::from_timestamp_millis(self.open_time_ms)?;
        Some(Candle::new(
            timestamp,
            self.open,
            self.high,
            self.low,
            self.close,
            self.volume,
        ))
    }
}

/// 바이낸스는 가격을 문자열로, 일부 호환 API는 숫자로 보냅니다.
fn parse_number(value: &Value) -> f64 {
    match value {
        Value::String(s) => s.trim().parse().unwrap_or(f64::NAN),
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

/// 성공한 페이지 응답.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KlinePage {
    /// 시작 시각 오름차순의 캔들 행
    pub rows: Vec<RawKline>,
    /// 제공자가 보고한 1분 사용 가중치
    pub used_weight: Option<u32>,
}

/// 페이지 단위 캔들 제공자.
///
/// HTTP 429는 `ExchangeError::RateLimited`로 돌려주며,
/// 대기 및 재시도는 호출자(페이지네이터)의 책임입니다.
#[async_trait]
pub trait KlineSource: Send + Sync {
    /// 제공자 이름 반환.
    fn name(&self) -> &str;

    /// 캔들 한 페이지 조회.
    async fn fetch_page(&self, query: &KlineQuery) -> ExchangeResult<KlinePage>;
}

//! 캔들 수집 간격(타임프레임) 정의.
//!
//! 파이프라인이 지원하는 간격은 네 가지이며, 각 간격은 고정된
//! 기본 조회 기간(lookback)을 가집니다.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::CoreError;

/// 지원되는 캔들 간격.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Interval {
    /// 15분봉
    #[serde(rename = "15m")]
    M15,
    /// 1시간봉
    #[serde(rename = "1h")]
    H1,
    /// 4시간봉
    #[serde(rename = "4h")]
    H4,
    /// 일봉
    #[serde(rename = "1d")]
    D1,
}

impl Interval {
    /// 지원되는 모든 간격 (짧은 순).
    pub const ALL: [Interval; 4] = [Interval::M15, Interval::H1, Interval::H4, Interval::D1];

    /// 바이낸스 간격 문자열로 변환합니다.
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::M15 => "15m",
            Interval::H1 => "1h",
            Interval::H4 => "4h",
            Interval::D1 => "1d",
        }
    }

    /// 캔들 한 개의 기간을 반환합니다.
    pub fn duration(&self) -> Duration {
        match self {
            Interval::M15 => Duration::from_secs(15 * 60),
            Interval::H1 => Duration::from_secs(60 * 60),
            Interval::H4 => Duration::from_secs(4 * 60 * 60),
            Interval::D1 => Duration::from_secs(24 * 60 * 60),
        }
    }

    /// 캔들 한 개의 기간(밀리초).
    pub fn as_millis(&self) -> i64 {
        self.duration().as_millis() as i64
    }

    /// 기본 조회 기간(일).
    ///
    /// 15분봉은 약 2개월, 나머지는 1년입니다.
    pub fn lookback_days(&self) -> i64 {
        match self {
            Interval::M15 => 60,
            Interval::H1 | Interval::H4 | Interval::D1 => 365,
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Interval {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "15m" => Ok(Interval::M15),
            "1h" => Ok(Interval::H1),
            "4h" => Ok(Interval::H4),
            "1d" => Ok(Interval::D1),
            other => Err(CoreError::InvalidInterval(other.to_string())),
        }
    }
}

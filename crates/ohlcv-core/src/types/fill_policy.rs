//! 결측값 채우기 정책.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::CoreError;

/// 결측값(NaN) 채우기 정책.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillPolicy {
    /// 앞 값으로 채운 뒤, 남은 선행 결측값은 뒤 값으로 채움
    #[serde(alias = "ffill")]
    Forward,
    /// 뒤 값으로 채운 뒤, 남은 후행 결측값은 앞 값으로 채움
    #[serde(alias = "bfill")]
    Backward,
    /// 컬럼 전체의 산술 평균으로 채움
    Mean,
    /// 시간 가중 선형 보간 후 양 끝은 앞/뒤 값으로 채움
    Interpolate,
}

impl Default for FillPolicy {
    fn default() -> Self {
        Self::Forward
    }
}

impl FillPolicy {
    /// 설정/CLI용 문자열.
    pub fn as_str(&self) -> &'static str {
        match self {
            FillPolicy::Forward => "forward",
            FillPolicy::Backward => "backward",
            FillPolicy::Mean => "mean",
            FillPolicy::Interpolate => "interpolate",
        }
    }
}

impl fmt::Display for FillPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FillPolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "forward" | "ffill" => Ok(Self::Forward),
            "backward" | "bfill" => Ok(Self::Backward),
            "mean" => Ok(Self::Mean),
            "interpolate" => Ok(Self::Interpolate),
            _ => Err(CoreError::UnsupportedFillPolicy(s.to_string())),
        }
    }
}

//! Collector 설정 모듈.
//!
//! 공통 설정([`AppConfig`])에 수집기 전용 값을 더합니다.

use std::path::Path;

use ohlcv_core::AppConfig;

use crate::Result;

/// 심볼을 지정하지 않았을 때 수집할 거래쌍.
pub const DEFAULT_SYMBOL: &str = "ALGOUSDT";

/// Collector 전체 설정
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// 저장 경로, 제공자, 정제, 로깅 설정
    pub app: AppConfig,
    /// 기본 수집 심볼
    pub default_symbol: String,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self::from_app(AppConfig::default())
    }
}

impl CollectorConfig {
    /// 설정 파일과 환경변수에서 로드
    ///
    /// `COLLECTOR_SYMBOL`로 기본 심볼을 바꿀 수 있습니다.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let app = match path {
            Some(path) => AppConfig::load(Some(path))?,
            None => AppConfig::load_default()?,
        };

        Ok(Self {
            default_symbol: env_var_parse("COLLECTOR_SYMBOL", DEFAULT_SYMBOL.to_string()),
            app,
        })
    }

    pub fn from_app(app: AppConfig) -> Self {
        Self {
            app,
            default_symbol: DEFAULT_SYMBOL.to_string(),
        }
    }

    /// 지정한 심볼 또는 기본 심볼 (대문자)
    pub fn symbol_or_default(&self, symbol: Option<&str>) -> String {
        symbol
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.default_symbol)
            .to_uppercase()
    }
}

/// 환경변수에서 값을 파싱 (실패 시 기본값 사용)
fn env_var_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

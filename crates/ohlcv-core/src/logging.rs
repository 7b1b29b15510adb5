//! 수집기 로깅 초기화.
//!
//! 출력 형식은 pretty(터미널), json(배치 실행 로그 수집), compact 중 하나입니다.
//! 단순 레벨을 지정하면 워크스페이스 크레이트에만 적용되고
//! HTTP 스택 같은 의존성 로그는 warn 이상만 남습니다.

use std::fmt as std_fmt;

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

use crate::config::LoggingConfig;

/// 단순 레벨이 적용되는 로그 대상.
const WORKSPACE_TARGETS: [&str; 4] = [
    "ohlcv_core",
    "ohlcv_exchange",
    "ohlcv_data",
    "ohlcv_collector",
];

const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
            LogFormat::Compact => "compact",
        }
    }
}

impl std_fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std_fmt::Formatter<'_>) -> std_fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            "compact" => Ok(Self::Compact),
            _ => Err(format!("Unknown log format: {} (supported: pretty, json, compact)", s)),
        }
    }
}

/// 로깅 초기화 옵션.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// 단순 레벨("debug") 또는 EnvFilter 지시문("ohlcv_exchange=trace,info")
    pub level: String,
    pub format: LogFormat,
    /// span 진입/종료 이벤트 출력 여부
    pub span_events: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::new("info")
    }
}

impl LogConfig {
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            format: LogFormat::Pretty,
            span_events: false,
        }
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    /// `RUST_LOG`, `LOG_FORMAT` 환경 변수에서 생성 (없거나 잘못되면 기본값)
    pub fn from_env() -> Self {
        let level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let format = std::env::var("LOG_FORMAT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default();

        Self::new(level).with_format(format)
    }

    /// EnvFilter 지시문.
    ///
    /// 단순 레벨이면 워크스페이스 크레이트별 지시문으로 펼치고,
    /// 그 외 값은 그대로 사용합니다.
    pub fn filter_directive(&self) -> String {
        let level = self.level.trim().to_lowercase();
        if !LEVELS.contains(&level.as_str()) {
            return self.level.trim().to_string();
        }

        let fallback = if level == "error" { "error" } else { "warn" };
        std::iter::once(fallback.to_string())
            .chain(
                WORKSPACE_TARGETS
                    .iter()
                    .map(|target| format!("{}={}", target, level)),
            )
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl From<&LoggingConfig> for LogConfig {
    /// 알 수 없는 형식 문자열은 pretty로 대체합니다.
    fn from(config: &LoggingConfig) -> Self {
        Self::new(config.level.clone()).with_format(config.format.parse().unwrap_or_default())
    }
}

/// 전역 subscriber를 설치합니다.
///
/// `RUST_LOG`가 설정되어 있으면 `config.level`보다 우선합니다.
/// 이미 설치된 subscriber가 있으면 에러입니다.
///
/// ```no_run
/// use ohlcv_core::logging::{init_logging, LogConfig, LogFormat};
///
/// init_logging(LogConfig::new("debug").with_format(LogFormat::Json)).unwrap();
/// ```
pub fn init_logging(config: LogConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(config.filter_directive())?,
    };

    let span_events = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let layer: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        LogFormat::Pretty => fmt::layer().pretty().with_span_events(span_events).boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_events(span_events)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(false)
            .with_span_events(span_events)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .try_init()?;

    tracing::debug!(format = %config.format, filter = %config.filter_directive(), "Logging initialized");
    Ok(())
}

/// `RUST_LOG`/`LOG_FORMAT`으로 초기화.
pub fn init_logging_from_env() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_logging(LogConfig::from_env())
}

/// symbol(, interval) 필드를 가진 info span.
#[macro_export]
macro_rules! series_span {
    ($name:expr, $symbol:expr) => {
        tracing::info_span!($name, symbol = %$symbol)
    };
    ($name:expr, $symbol:expr, $interval:expr) => {
        tracing::info_span!($name, symbol = %$symbol, interval = %$interval)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse_and_display() {
        assert_eq!(" JSON ".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("compact".parse::<LogFormat>().unwrap().to_string(), "compact");
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_simple_level_is_scoped_to_workspace() {
        let directive = LogConfig::new("Debug").filter_directive();

        assert!(directive.starts_with("warn,"));
        assert!(directive.contains("ohlcv_exchange=debug"));
        assert!(directive.contains("ohlcv_collector=debug"));

        assert!(LogConfig::new("error").filter_directive().starts_with("error,"));
    }

    #[test]
    fn test_from_env_reads_rust_log_and_format() {
        std::env::set_var("RUST_LOG", "ohlcv_exchange=trace");
        std::env::set_var("LOG_FORMAT", "json");
        let config = LogConfig::from_env();
        std::env::remove_var("RUST_LOG");
        std::env::remove_var("LOG_FORMAT");

        assert_eq!(config.level, "ohlcv_exchange=trace");
        assert_eq!(config.format, LogFormat::Json);
    }

    #[test]
    fn test_custom_directive_is_kept() {
        let config = LogConfig::new("ohlcv_exchange=trace,info");
        assert_eq!(config.filter_directive(), "ohlcv_exchange=trace,info");
    }

    #[test]
    fn test_log_config_from_logging_section() {
        let section = LoggingConfig {
            level: "debug".to_string(),
            format: "json".to_string(),
        };
        let config = LogConfig::from(&section);
        assert_eq!(config.level, "debug");
        assert_eq!(config.format, LogFormat::Json);

        let section = LoggingConfig {
            level: "warn".to_string(),
            format: "fancy".to_string(),
        };
        assert_eq!(LogConfig::from(&section).format, LogFormat::Pretty);
    }
}

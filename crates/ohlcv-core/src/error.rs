//! 핵심 에러 타입.
//!
//! 입력 검증 단계에서 즉시 실패해야 하는 에러를 정의합니다.
//! 이 에러들은 어떤 작업도 수행하기 전에 반환됩니다.

use thiserror::Error;

/// 핵심 파이프라인 에러.
#[derive(Debug, Error)]
pub enum CoreError {
    /// 지원하지 않는 타임프레임
    #[error("Invalid interval: {0} (supported: 15m, 1h, 4h, 1d)")]
    InvalidInterval(String),

    /// 지원하지 않는 결측값 채우기 정책
    #[error("Unsupported fill policy: {0} (supported: forward, backward, mean, interpolate)")]
    UnsupportedFillPolicy(String),

    /// 설정 에러
    #[error("Configuration error: {0}")]
    Config(String),
}

/// 핵심 작업을 위한 Result 타입.
pub type CoreResult<T> = Result<T, CoreError>;

impl From<config::ConfigError> for CoreError {
    fn from(err: config::ConfigError) -> Self {
        CoreError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InvalidInterval("2h".to_string());
        assert!(err.to_string().contains("2h"));

        let err = CoreError::UnsupportedFillPolicy("median".to_string());
        assert!(err.to_string().contains("median"));
    }
}

//! 캔들 제공자 에러 타입.

use std::time::Duration;
use thiserror::Error;

/// 캔들 제공자 관련 에러.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// 네트워크/연결 에러
    #[error("Network error: {0}")]
    NetworkError(String),

    /// 타임아웃
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// 요청 한도 초과 (HTTP 429/418)
    #[error("Rate limit exceeded (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    /// HTTP 에러 응답
    #[error("API error {status} (code {code:?}): {message}")]
    ApiError {
        status: u16,
        code: Option<i32>,
        message: String,
    },

    /// 파싱/역직렬화 에러
    #[error("Parse error: {0}")]
    ParseError(String),

    /// 재시도 한도 소진
    #[error("Gave up after {attempts} consecutive failures: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    /// 취소됨
    #[error("Fetch cancelled")]
    Cancelled,
}

impl ExchangeError {
    /// 재시도 가능한 에러인지 확인.
    ///
    /// 4xx 응답(잘못된 심볼, 잘못된 파라미터)은 같은 요청을 반복해도
    /// 결과가 같으므로 재시도하지 않습니다.
    pub fn is_retryable(&self) -> bool {
        match self {
            ExchangeError::NetworkError(_)
            | ExchangeError::Timeout(_)
            | ExchangeError::RateLimited { .. }
            | ExchangeError::ParseError(_) => true,
            ExchangeError::ApiError { status, .. } => *status >= 500,
            ExchangeError::RetriesExhausted { .. } | ExchangeError::Cancelled => false,
        }
    }

    /// 제공자가 지정한 재시도 대기 시간.
    pub fn retry_delay(&self) -> Option<Duration> {
        match self {
            ExchangeError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// 제공자가 HTTP 응답을 돌려준 에러인지 확인 (요청 한도 집계용).
    pub fn has_response(&self) -> bool {
        matches!(
            self,
            ExchangeError::RateLimited { .. }
                | ExchangeError::ApiError { .. }
                | ExchangeError::ParseError(_)
        )
    }
}

impl From<reqwest::Error> for ExchangeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ExchangeError::Timeout(err.to_string())
        } else if err.is_decode() {
            ExchangeError::ParseError(err.to_string())
        } else {
            ExchangeError::NetworkError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ExchangeError {
    fn from(err: serde_json::Error) -> Self {
        ExchangeError::ParseError(err.to_string())
    }
}

/// 거래소 작업을 위한 Result 타입.
pub type ExchangeResult<T> = Result<T, ExchangeError>;

//! 데이터 모듈 오류 타입.

use ohlcv_core::CoreError;
use thiserror::Error;

/// 데이터 정제/저장 관련 오류.
#[derive(Debug, Error)]
pub enum DataError {
    /// 파일 입출력 오류
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// 파싱 오류
    #[error("Parse error: {0}")]
    ParseError(String),

    /// 잘못된 데이터 형식
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// 파일을 찾을 수 없음
    #[error("Not found: {0}")]
    NotFound(String),

    /// 직렬화/역직렬화 오류
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// 도메인 타입 오류 (간격, 채우기 정책)
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl From<serde_json::Error> for DataError {
    fn from(err: serde_json::Error) -> Self {
        DataError::SerializationError(err.to_string())
    }
}

pub type DataResult<T> = std::result::Result<T, DataError>;

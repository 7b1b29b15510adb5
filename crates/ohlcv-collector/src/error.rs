//! 에러 타입 정의.

use ohlcv_core::CoreError;
use ohlcv_data::DataError;
use ohlcv_exchange::ExchangeError;
use thiserror::Error;

/// Collector 에러 타입
#[derive(Debug, Error)]
pub enum CollectorError {
    /// 입력/설정 검증 에러
    #[error(transparent)]
    Core(#[from] CoreError),

    /// 캔들 제공자 에러
    #[error("Exchange error: {0}")]
    Exchange(#[from] ExchangeError),

    /// 정제/저장 에러
    #[error("Data error: {0}")]
    Data(#[from] DataError),
}

impl CollectorError {
    /// 사용자 취소로 인한 에러인지 확인
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CollectorError::Exchange(ExchangeError::Cancelled))
    }
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, CollectorError>;

//! OHLCV 데이터 정제, 검증, 저장.
//!
//! 이 crate는 다음을 제공합니다:
//! - 결측값 채우기, 중복 제거, 이상치 억제, OHLC 보정, 반올림을 수행하는 정제기
//! - 시계열 품질 검증 리포트
//! - CSV 파일 기반 시계열 저장소

pub mod cleaner;
pub mod error;
pub mod storage;
pub mod validator;

pub use cleaner::OhlcvCleaner;
pub use error::{DataError, DataResult};
pub use storage::csv::SeriesStore;
pub use validator::{GapCheck, OhlcvValidator, ValidationReport};

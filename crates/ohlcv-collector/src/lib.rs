//! OHLCV 수집기.
//!
//! 이 crate는 다음을 제공합니다:
//! - 요청 한도를 지키는 캔들 수집 → 정제 → 검증 → 저장 파이프라인
//! - 지원 타임프레임 전체에 대한 일괄 수집
//! - 저장된 최신 시계열 일괄 로드
//! - `ohlcv-collector` CLI 바이너리

pub mod config;
pub mod error;
pub mod modules;
pub mod stats;

pub use config::CollectorConfig;
pub use error::{CollectorError, Result};
pub use stats::CollectionStats;

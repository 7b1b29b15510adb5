//! # OHLCV Core
//!
//! OHLCV 수집 파이프라인의 핵심 도메인 타입을 제공합니다.
//!
//! 이 크레이트는 파이프라인 전반에서 사용되는 기본 타입을 제공합니다:
//! - 캔들 및 시계열 데이터 구조체
//! - 지원 타임프레임(간격) 정의
//! - 결측값 채우기 정책
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use config::*;
pub use error::*;
pub use logging::*;
pub use types::*;

//! 파이프라인 전반에서 사용되는 공통 타입.

mod candle;
mod fill_policy;
mod interval;

pub use candle::*;
pub use fill_policy::*;
pub use interval::*;

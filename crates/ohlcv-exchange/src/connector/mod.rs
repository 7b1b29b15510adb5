//! 캔들 제공자 커넥터.

pub mod binance;

pub use binance::{BinanceKlineClient, USED_WEIGHT_HEADER};

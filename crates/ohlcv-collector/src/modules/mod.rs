//! 수집 모듈.

pub mod fetch;
pub mod load;

pub use fetch::{select_intervals, FetchedSeries, RateLimitedFetcher};
pub use load::load_multi_timeframe;

//! # OHLCV Exchange
//!
//! 캔들 제공자 연동 크레이트.
//!
//! - [`KlineSource`]: 페이지 단위 캔들 제공자 trait
//! - [`BinanceKlineClient`]: Binance klines REST 구현
//! - [`KlinePaginator`]: 요청 한도와 재시도 정책을 지키는 페이지네이션 루프

pub mod connector;
pub mod error;
pub mod paginator;
pub mod rate_budget;
pub mod retry;
pub mod source;

pub use connector::{BinanceKlineClient, USED_WEIGHT_HEADER};
pub use error::{ExchangeError, ExchangeResult};
pub use paginator::{FetchOutcome, FetchRequest, KlinePaginator, MAX_PAGE_LIMIT};
pub use rate_budget::{RateBudget, ThrottlePolicy};
pub use retry::RetryPolicy;
pub use source::{KlinePage, KlineQuery, KlineSource, RawKline};

/// 자주 쓰는 타입 re-export.
pub mod prelude {
    pub use crate::{
        BinanceKlineClient, ExchangeError, ExchangeResult, FetchOutcome, FetchRequest,
        KlinePage, KlinePaginator, KlineQuery, KlineSource, RetryPolicy,
    };
}

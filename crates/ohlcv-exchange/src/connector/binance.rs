//! Binance 캔들(klines) REST 커넥터.
//!
//! 공개 엔드포인트만 사용하므로 API 키가 필요 없습니다.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, warn};

use ohlcv_core::ExchangeConfig;

use crate::source::{KlinePage, KlineQuery, KlineSource, RawKline};
use crate::{ExchangeError, ExchangeResult};

/// 1분 사용 가중치 응답 헤더.
pub const USED_WEIGHT_HEADER: &str = "x-mbx-used-weight-1m";

#[derive(Debug, Deserialize)]
struct BinanceError {
    code: i32,
    msg: String,
}

/// Binance 캔들 클라이언트.
#[derive(Debug, Clone)]
pub struct BinanceKlineClient {
    client: Client,
    klines_url: String,
}

impl BinanceKlineClient {
    /// 새 클라이언트 생성.
    ///
    /// # Errors
    /// HTTP 클라이언트 생성에 실패하면 `ExchangeError::NetworkError`를 반환합니다.
    pub fn new(config: &ExchangeConfig) -> ExchangeResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ExchangeError::NetworkError(format!("HTTP client build failed: {}", e)))?;

        Ok(Self {
            client,
            klines_url: config.klines_url(),
        })
    }

    /// 캔들 엔드포인트 URL.
    pub fn klines_url(&self) -> &str {
        &self.klines_url
    }

    /// `Retry-After` 헤더(초 단위 정수)를 읽습니다.
    fn retry_after(headers: &HeaderMap) -> Option<Duration> {
        headers
            .get(RETRY_AFTER)?
            .to_str()
            .ok()?
            .trim()
            .parse::<u64>()
            .ok()
            .map(Duration::from_secs)
    }

    /// 사용 가중치 헤더를 읽습니다.
    fn used_weight(headers: &HeaderMap) -> Option<u32> {
        headers
            .get(USED_WEIGHT_HEADER)?
            .to_str()
            .ok()?
            .trim()
            .parse()
            .ok()
    }

    /// 에러 응답 본문을 ExchangeError로 매핑.
    fn map_error(status: StatusCode, body: String) -> ExchangeError {
        match serde_json::from_str::<BinanceError>(&body) {
            Ok(err) => ExchangeError::ApiError {
                status: status.as_u16(),
                code: Some(err.code),
                message: err.msg,
            },
            Err(_) => ExchangeError::ApiError {
                status: status.as_u16(),
                code: None,
                message: body,
            },
        }
    }
}

#[async_trait]
impl KlineSource for BinanceKlineClient {
    fn name(&self) -> &str {
        "binance"
    }

    async fn fetch_page(&self, query: &KlineQuery) -> ExchangeResult<KlinePage> {
        let params = [
            ("symbol", query.symbol.clone()),
            ("interval", query.interval.as_str().to_string()),
            ("startTime", query.start_time_ms.to_string()),
            ("limit", query.limit.to_string()),
        ];

        debug!(
            symbol = %query.symbol,
            interval = %query.interval,
            start_time = query.start_time_ms,
            "GET {}",
            self.klines_url
        );

        let response = self
            .client
            .get(&self.klines_url)
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        let headers = response.headers().clone();

        // 418은 429를 무시하고 계속 요청했을 때의 IP 차단 응답
        if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::IM_A_TEAPOT {
            let retry_after = Self::retry_after(&headers);
            warn!(status = status.as_u16(), ?retry_after, "Rate limited by provider");
            return Err(ExchangeError::RateLimited { retry_after });
        }

        let body = response.text().await?;

        if !status.is_success() {
            return Err(Self::map_error(status, body));
        }

        let rows: Vec<Vec<Value>> = serde_json::from_str(&body).map_err(|e| {
            error!("Failed to parse klines response: {} - Body: {}", e, body);
            ExchangeError::ParseError(e.to_string())
        })?;

        let mut klines = Vec::with_capacity(rows.len());
        for row in &rows {
            match RawKline::from_json_row(row) {
                Some(kline) => klines.push(kline),
                None => warn!(?row, "Skipping kline row without a valid open time"),
            }
        }

        Ok(KlinePage {
            rows: klines,
            used_weight: Self::used_weight(&headers),
        })
    }
}

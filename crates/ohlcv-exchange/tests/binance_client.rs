//! Binance 캔들 클라이언트 HTTP 매핑 테스트.
//!
//! mockito 서버로 상태 코드, `Retry-After`, 사용 가중치 헤더 처리를 검증합니다.

use mockito::{Matcher, Server};
use std::time::Duration;

use ohlcv_core::{ExchangeConfig, Interval};
use ohlcv_exchange::{BinanceKlineClient, ExchangeError, KlineQuery, KlineSource};

fn client_for(server: &Server) -> BinanceKlineClient {
    let config = ExchangeConfig {
        base_url: server.url(),
        timeout_secs: 5,
        ..ExchangeConfig::default()
    };
    BinanceKlineClient::new(&config).unwrap()
}

fn query() -> KlineQuery {
    KlineQuery {
        symbol: "ALGOUSDT".to_string(),
        interval: Interval::H1,
        start_time_ms: 1_700_000_000_000,
        limit: 100,
    }
}

#[tokio::test]
async fn test_successful_page() {
    let mut server = Server::new_async().await;
    let body = r#"[
        [1700000000000, "0.1000", "0.1100", "0.0900", "0.1050", "1234.5", 1700003599999, "0", 10, "0", "0", "0"],
        [1700003600000, "0.1050", "0.1200", "0.1000", "0.1150", "987.25", 1700007199999, "0", 12, "0", "0", "0"]
    ]"#;

    let mock = server
        .mock("GET", "/api/v3/klines")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("symbol".into(), "ALGOUSDT".into()),
            Matcher::UrlEncoded("interval".into(), "1h".into()),
            Matcher::UrlEncoded("startTime".into(), "1700000000000".into()),
            Matcher::UrlEncoded("limit".into(), "100".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_header("x-mbx-used-weight-1m", "42")
        .with_body(body)
        .create_async()
        .await;

    let page = client_for(&server).fetch_page(&query()).await.unwrap();

    mock.assert_async().await;
    assert_eq!(page.rows.len(), 2);
    assert_eq!(page.used_weight, Some(42));
    assert_eq!(page.rows[0].open_time_ms, 1_700_000_000_000);
    assert_eq!(page.rows[1].close, 0.115);
    assert_eq!(page.rows[1].volume, 987.25);
}

#[tokio::test]
async fn test_rate_limited_with_retry_after() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/v3/klines")
        .match_query(Matcher::Any)
        .with_status(429)
        .with_header("retry-after", "5")
        .with_body(r#"{"code":-1003,"msg":"Too many requests."}"#)
        .create_async()
        .await;

    let err = client_for(&server).fetch_page(&query()).await.unwrap_err();

    match err {
        ExchangeError::RateLimited { retry_after } => {
            assert_eq!(retry_after, Some(Duration::from_secs(5)));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_rate_limited_without_retry_after() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/v3/klines")
        .match_query(Matcher::Any)
        .with_status(418)
        .create_async()
        .await;

    let err = client_for(&server).fetch_page(&query()).await.unwrap_err();
    assert!(matches!(err, ExchangeError::RateLimited { retry_after: None }));
}

#[tokio::test]
async fn test_client_error_is_not_retryable() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/v3/klines")
        .match_query(Matcher::Any)
        .with_status(400)
        .with_body(r#"{"code":-1121,"msg":"Invalid symbol."}"#)
        .create_async()
        .await;

    let err = client_for(&server).fetch_page(&query()).await.unwrap_err();

    assert!(!err.is_retryable());
    match err {
        ExchangeError::ApiError {
            status,
            code,
            message,
        } => {
            assert_eq!(status, 400);
            assert_eq!(code, Some(-1121));
            assert_eq!(message, "Invalid symbol.");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_server_error_is_retryable() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/v3/klines")
        .match_query(Matcher::Any)
        .with_status(502)
        .with_body("Bad Gateway")
        .create_async()
        .await;

    let err = client_for(&server).fetch_page(&query()).await.unwrap_err();

    assert!(err.is_retryable());
    assert!(matches!(
        err,
        ExchangeError::ApiError {
            status: 502,
            code: None,
            ..
        }
    ));
}

#[tokio::test]
async fn test_malformed_body_is_parse_error() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/v3/klines")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("<html>maintenance</html>")
        .create_async()
        .await;

    let err = client_for(&server).fetch_page(&query()).await.unwrap_err();
    assert!(matches!(err, ExchangeError::ParseError(_)));
}

#[tokio::test]
async fn test_empty_page_without_weight_header() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/v3/klines")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;

    let page = client_for(&server).fetch_page(&query()).await.unwrap();
    assert!(page.rows.is_empty());
    assert_eq!(page.used_weight, None);
}

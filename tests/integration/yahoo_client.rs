//! YahooClient against a mocked Yahoo Finance host

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use rust_screener::api::{MarketDataProvider, YahooClient};
use serde_json::json;
use wiremock::matchers::{header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::api_mock::{cookie_url, mount_chart, mount_quote, mount_session, TEST_CRUMB};
use crate::common::fixtures::{chart_json, quote_summary_json, spark_json};
use crate::common::logging::{init_test_logging, log_test_step};

async fn client(server: &MockServer) -> YahooClient {
    YahooClient::with_urls(&server.uri(), &cookie_url(server), 0).unwrap()
}

#[tokio::test]
async fn test_daily_closes_batch_request() {
    init_test_logging();
    log_test_step("Fetching indicator closes in one spark request");

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v7/finance/spark"))
        .and(query_param("symbols", "SPY,^VIX,BRK-B"))
        .and(query_param("range", "5d"))
        .and(query_param("interval", "1d"))
        .respond_with(ResponseTemplate::new(200).set_body_json(spark_json(&[
            ("SPY", &[500.0, 502.6]),
            ("^VIX", &[15.0, 14.0]),
            ("BRK-B", &[410.0, 412.0]),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let symbols = vec!["SPY".to_string(), "^VIX".to_string(), "BRK.B".to_string()];
    let closes = client(&server).await.get_daily_closes(&symbols, 5).await.unwrap();

    assert_eq!(closes.len(), 3);
    assert_eq!(closes["SPY"], vec![500.0, 502.6]);
    assert_eq!(closes["^VIX"], vec![15.0, 14.0]);
    assert_eq!(closes["BRK.B"], vec![410.0, 412.0]);
}

#[tokio::test]
async fn test_daily_closes_omit_symbols_without_data() {
    init_test_logging();

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v7/finance/spark"))
        .respond_with(ResponseTemplate::new(200).set_body_json(spark_json(&[("SPY", &[500.0, 502.6])])))
        .mount(&server)
        .await;

    let symbols = vec!["SPY".to_string(), "^TNX".to_string()];
    let closes = client(&server).await.get_daily_closes(&symbols, 5).await.unwrap();

    assert!(closes.contains_key("SPY"));
    assert!(!closes.contains_key("^TNX"));
}

#[tokio::test]
async fn test_quote_reads_price_and_profile() {
    init_test_logging();

    let server = MockServer::start().await;
    mount_session(&server).await;
    Mock::given(method("GET"))
        .and(path("/v10/finance/quoteSummary/NVDA"))
        .and(query_param("modules", "price,summaryProfile"))
        .and(query_param("crumb", TEST_CRUMB))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(quote_summary_json(120.5, 115.0, 2.9e12, Some("Technology"))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let quote = client(&server).await.get_quote("NVDA").await.unwrap();

    assert_eq!(quote.symbol, "NVDA");
    assert_eq!(quote.last_price, Some(120.5));
    assert_eq!(quote.previous_close, Some(115.0));
    assert_eq!(quote.market_cap, Some(2.9e12));
    assert_eq!(quote.sector.as_deref(), Some("Technology"));
    assert_eq!(quote.industry.as_deref(), Some("Semiconductors"));
}

#[tokio::test]
async fn test_quote_without_profile_has_no_sector() {
    init_test_logging();

    let server = MockServer::start().await;
    mount_session(&server).await;
    mount_quote(&server, "SPAC", quote_summary_json(10.0, 9.9, 4e8, None)).await;

    let quote = client(&server).await.get_quote("SPAC").await.unwrap();

    assert_eq!(quote.sector, None);
    assert_eq!(quote.industry, None);
}

#[tokio::test]
async fn test_price_history_requests_range() {
    init_test_logging();

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/AMD"))
        .and(query_param("range", "15d"))
        .and(query_param("interval", "1d"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chart_json(11, 105.0, 100.0)))
        .expect(1)
        .mount(&server)
        .await;

    let bars = client(&server).await.get_price_history("AMD", 15).await.unwrap();

    assert_eq!(bars.len(), 11);
    assert!(bars.iter().all(|b| b.high == 105.0 && b.low == 100.0));
    assert!(bars.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
}

#[tokio::test]
async fn test_price_history_drops_null_bars() {
    init_test_logging();

    let server = MockServer::start().await;
    mount_chart(
        &server,
        "GM",
        json!({
            "chart": {
                "result": [{
                    "timestamp": [1, 2, 3],
                    "indicators": {"quote": [{
                        "open": [1.0, null, 1.0],
                        "high": [2.0, null, 2.0],
                        "low": [0.5, null, 0.5],
                        "close": [1.5, null, 1.5]
                    }]}
                }],
                "error": null
            }
        }),
    )
    .await;

    let bars = client(&server).await.get_price_history("GM", 15).await.unwrap();

    assert_eq!(bars.iter().map(|b| b.timestamp).collect::<Vec<_>>(), vec![1, 3]);
}

#[tokio::test]
async fn test_unknown_symbol_is_an_error() {
    init_test_logging();

    let server = MockServer::start().await;
    mount_session(&server).await;
    Mock::given(method("GET"))
        .and(path("/v10/finance/quoteSummary/ZZZZ"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "quoteSummary": {"result": null, "error": {"code": "Not Found", "description": "Quote not found for ticker symbol: ZZZZ"}}
        })))
        .mount(&server)
        .await;

    let result = client(&server).await.get_quote("ZZZZ").await;

    assert_matches!(result, Err(e) if e.to_string().contains("404"));
}

#[tokio::test]
async fn test_provider_error_envelope_is_an_error() {
    init_test_logging();

    let server = MockServer::start().await;
    mount_chart(
        &server,
        "DELISTED",
        json!({"chart": {"result": null, "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}}}),
    )
    .await;

    let result = client(&server).await.get_price_history("DELISTED", 15).await;

    assert_matches!(result, Err(e) if e.to_string().contains("delisted"));
}

/// Quote summary answers 401 unless the session crumb is attached
async fn mount_crumb_guarded_quote(server: &MockServer, symbol: &str, expected_hits: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/v10/finance/quoteSummary/{}", symbol)))
        .and(query_param("crumb", TEST_CRUMB))
        .respond_with(ResponseTemplate::new(200).set_body_json(quote_summary_json(30.0, 29.0, 5e9, Some("Energy"))))
        .expect(expected_hits)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/v10/finance/quoteSummary/{}", symbol)))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "finance": {"result": null, "error": {"code": "Unauthorized", "description": "Invalid Crumb"}}
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_quote_sends_session_cookie_and_crumb() {
    init_test_logging();
    log_test_step("Crumb fetched once with the session cookie, then reused");

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/consent"))
        .respond_with(ResponseTemplate::new(404).insert_header("set-cookie", "A3=d=session; Path=/"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/test/getcrumb"))
        .and(header_exists("cookie"))
        .respond_with(ResponseTemplate::new(200).set_body_string(TEST_CRUMB))
        .expect(1)
        .mount(&server)
        .await;
    mount_crumb_guarded_quote(&server, "XOM", 2).await;

    let client = client(&server).await;
    let first = client.get_quote("XOM").await.unwrap();
    let second = client.get_quote("XOM").await.unwrap();

    assert_eq!(first.last_price, Some(30.0));
    assert_eq!(second.previous_close, Some(29.0));
}

#[tokio::test]
async fn test_quote_refreshes_rejected_crumb() {
    init_test_logging();

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/consent"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/test/getcrumb"))
        .respond_with(ResponseTemplate::new(200).set_body_string("expired"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/test/getcrumb"))
        .respond_with(ResponseTemplate::new(200).set_body_string(TEST_CRUMB))
        .expect(1)
        .mount(&server)
        .await;
    mount_crumb_guarded_quote(&server, "CVX", 1).await;

    let quote = client(&server).await.get_quote("CVX").await.unwrap();

    assert_eq!(quote.sector.as_deref(), Some("Energy"));
}

#[tokio::test]
async fn test_quote_fails_when_crumb_unavailable() {
    init_test_logging();

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/test/getcrumb"))
        .respond_with(ResponseTemplate::new(429).set_body_string("Too Many Requests"))
        .mount(&server)
        .await;
    mount_crumb_guarded_quote(&server, "OXY", 0).await;

    let result = client(&server).await.get_quote("OXY").await;

    assert_matches!(result, Err(e) if e.to_string().contains("crumb"));
}

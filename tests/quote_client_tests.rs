use std::collections::HashMap;
use std::time::Duration;

use axum::extract::Query;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use tokio::net::TcpListener;

use market_pulse::error::FetchError;
use market_pulse::finnhub::types::RawQuote;
use market_pulse::finnhub::{normalize_symbol, FinnhubRestClient};
use market_pulse::model::quote::{QuoteStatus, UNKNOWN_VOLUME};
use market_pulse::scheduler::QuoteSource;

const TOKEN: &str = "test-token";

async fn quote_handler(Query(params): Query<HashMap<String, String>>) -> Response {
    if params.get("token").map(String::as_str) != Some(TOKEN) {
        return (StatusCode::UNAUTHORIZED, r#"{"error":"Invalid API key"}"#).into_response();
    }
    let symbol = params.get("symbol").cloned().unwrap_or_default();
    match symbol.as_str() {
        "AAPL" => r#"{"c":150,"pc":145,"h":151.5,"l":144.25,"o":146}"#.into_response(),
        "MSFT" => r#"{"c":100,"pc":102,"dp":-1.5,"v":1234567}"#.into_response(),
        "ODD" => r#"{"c":"150","pc":100,"dp":null,"v":"lots"}"#.into_response(),
        "BROKEN" => "<html>gateway</html>".into_response(),
        "LIST" => "[1,2,3]".into_response(),
        "DOWN" => (StatusCode::SERVICE_UNAVAILABLE, "maintenance").into_response(),
        "SLOW" => {
            tokio::time::sleep(Duration::from_secs(2)).await;
            r#"{"c":1,"pc":1}"#.into_response()
        }
        _ => r#"{"c":0,"d":null,"dp":null,"h":0,"l":0,"o":0,"pc":0,"t":0}"#.into_response(),
    }
}

async fn spawn_upstream() -> String {
    let app = Router::new().route("/api/v1/quote", get(quote_handler));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/api/v1/quote", addr)
}

fn client(base_url: &str) -> FinnhubRestClient {
    FinnhubRestClient::new(base_url, TOKEN, Duration::from_secs(5)).unwrap()
}

#[test]
fn normalize_symbol_trims_and_uppercases() {
    assert_eq!(normalize_symbol("  aapl ").unwrap(), "AAPL");
    assert_eq!(normalize_symbol("brk2").unwrap(), "BRK2");
    assert!(matches!(
        normalize_symbol("   "),
        Err(FetchError::InvalidSymbol(_))
    ));
    assert!(matches!(
        normalize_symbol("BRK.B"),
        Err(FetchError::InvalidSymbol(_))
    ));
    assert!(matches!(
        normalize_symbol("A B"),
        Err(FetchError::InvalidSymbol(_))
    ));
}

#[test]
fn raw_quote_treats_non_numeric_fields_as_absent() {
    let raw = RawQuote::parse(r#"{"c":"12","pc":10,"h":null,"l":9.5,"dp":true}"#).unwrap();
    assert_eq!(raw.current, None);
    assert_eq!(raw.previous_close, Some(10.0));
    assert_eq!(raw.high, None);
    assert_eq!(raw.low, Some(9.5));
    assert_eq!(raw.change_percent, None);
    assert_eq!(raw.volume, None);

    assert!(RawQuote::parse("{").is_err());
    assert!(RawQuote::parse("42").is_err());
    assert_eq!(RawQuote::parse("{}").unwrap(), RawQuote::default());
}

#[test]
fn raw_quote_derives_change_when_missing() {
    let quote = RawQuote::parse(r#"{"c":150,"pc":145}"#)
        .unwrap()
        .into_quote("AAPL", Utc::now());
    assert!((quote.change_percent() - 3.448_275_862).abs() < 1e-6);
    assert_eq!(quote.status(), QuoteStatus::StrongBuy);
    assert_eq!(quote.volume(), UNKNOWN_VOLUME);
    assert_eq!(quote.reported_volume(), None);

    let no_prev = RawQuote::parse(r#"{"c":150}"#)
        .unwrap()
        .into_quote("AAPL", Utc::now());
    assert_eq!(no_prev.change_percent(), 0.0);
    assert_eq!(no_prev.status(), QuoteStatus::Neutral);
}

#[tokio::test]
async fn fetch_normalizes_and_derives_change() {
    let base = spawn_upstream().await;
    let quote = client(&base).fetch(" aapl").await.unwrap();
    assert_eq!(quote.symbol(), "AAPL");
    assert!((quote.current_price() - 150.0).abs() < f64::EPSILON);
    assert!((quote.previous_close() - 145.0).abs() < f64::EPSILON);
    assert!((quote.day_high() - 151.5).abs() < f64::EPSILON);
    assert!((quote.day_low() - 144.25).abs() < f64::EPSILON);
    assert!((quote.change_percent() - 3.4483).abs() < 1e-4);
    assert_eq!(quote.status(), QuoteStatus::StrongBuy);
}

#[tokio::test]
async fn fetch_prefers_upstream_change_and_volume() {
    let base = spawn_upstream().await;
    let quote = client(&base).fetch("MSFT").await.unwrap();
    assert!((quote.change_percent() + 1.5).abs() < f64::EPSILON);
    assert_eq!(quote.status(), QuoteStatus::Bearish);
    assert_eq!(quote.reported_volume(), Some(1_234_567.0));
}

#[tokio::test]
async fn fetch_treats_wrongly_typed_fields_as_absent() {
    let base = spawn_upstream().await;
    let quote = client(&base).fetch("ODD").await.unwrap();
    assert_eq!(quote.current_price(), 0.0);
    assert!(!quote.is_valid());
    assert_eq!(quote.status(), QuoteStatus::Invalid);
    assert_eq!(quote.reported_volume(), None);
}

#[tokio::test]
async fn unknown_symbol_yields_invalid_quote_not_error() {
    let base = spawn_upstream().await;
    let quote = client(&base).fetch("ZZZZ").await.unwrap();
    assert_eq!(quote.status(), QuoteStatus::Invalid);
}

#[tokio::test]
async fn malformed_body_is_parse_error() {
    let base = spawn_upstream().await;
    let c = client(&base);
    let err = c.fetch("BROKEN").await.unwrap_err();
    assert!(matches!(err, FetchError::Parse { ref symbol, .. } if symbol == "BROKEN"));
    let err = c.fetch("LIST").await.unwrap_err();
    assert_eq!(err.kind(), "parse");
}

#[tokio::test]
async fn error_status_is_transport_error_without_token() {
    let base = spawn_upstream().await;
    let err = client(&base).fetch("DOWN").await.unwrap_err();
    assert!(matches!(err, FetchError::Transport { .. }));
    assert!(err.to_string().contains("503"));

    let bad_token = FinnhubRestClient::new(&base, "wrong", Duration::from_secs(5)).unwrap();
    let err = bad_token.fetch("AAPL").await.unwrap_err();
    assert_eq!(err.kind(), "transport");
    assert!(!err.to_string().contains("wrong"));
}

#[tokio::test]
async fn slow_upstream_hits_timeout() {
    let base = spawn_upstream().await;
    let c = FinnhubRestClient::new(&base, TOKEN, Duration::from_millis(200)).unwrap();
    let err = c.fetch("SLOW").await.unwrap_err();
    assert!(matches!(err, FetchError::Transport { .. }));
    assert!(!err.to_string().contains(TOKEN));
}

#[tokio::test]
async fn unreachable_upstream_is_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let c = client(&format!("http://{}/quote", addr));
    let err = c.fetch("AAPL").await.unwrap_err();
    assert_eq!(err.kind(), "transport");
}

#[tokio::test]
async fn invalid_symbol_never_hits_the_network() {
    let c = client("http://127.0.0.1:9/quote");
    let err = c.fetch("BRK.B").await.unwrap_err();
    assert!(matches!(err, FetchError::InvalidSymbol(_)));
}

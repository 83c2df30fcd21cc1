//! Gateway behaviour against a local stub of the market-data provider.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::Router;
use tickertalk_models::{Envelope, ErrorKind, GatewayConfig};
use tickertalk_tools::catalog::dispatch_collector;
use tickertalk_tools::{MarketDataGateway, ToolCall};

#[derive(Clone, Default)]
struct Stub {
    hits: Arc<AtomicUsize>,
}

async fn trending(State(stub): State<Stub>, headers: HeaderMap) -> (StatusCode, String) {
    stub.hits.fetch_add(1, Ordering::SeqCst);
    if headers.get("x-api-key").map(|v| v.as_bytes()) != Some(b"test-key") {
        return (StatusCode::UNAUTHORIZED, "bad key".to_string());
    }
    if headers.get("accept").map(|v| v.as_bytes()) != Some(b"application/json") {
        return (StatusCode::NOT_ACCEPTABLE, "json only".to_string());
    }
    (
        StatusCode::OK,
        r#"{"trending_stocks": {"top_gainers": [{"ticker_id": "TCS"}]}}"#.to_string(),
    )
}

async fn stock(
    State(stub): State<Stub>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, String) {
    stub.hits.fetch_add(1, Ordering::SeqCst);
    match params.get("name").map(String::as_str) {
        Some("Reliance") => (StatusCode::OK, r#"{"companyName": "Reliance Industries"}"#.to_string()),
        _ => (StatusCode::NOT_FOUND, "no such stock".to_string()),
    }
}

async fn serve(stub: Stub) -> MarketDataGateway {
    let app = Router::new()
        .route("/trending", get(trending))
        .route("/stock", get(stock))
        .route("/news", get(|| async { (StatusCode::OK, String::new()) }))
        .route("/ipo", get(|| async { (StatusCode::OK, "{}".to_string()) }))
        .route("/commodities", get(|| async { (StatusCode::OK, "<html>oops</html>".to_string()) }))
        .route("/mutual_funds", get(|| async { (StatusCode::OK, "[]".to_string()) }))
        .with_state(stub);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let config = GatewayConfig {
        base_url: format!("http://{addr}"),
        ..GatewayConfig::default()
    };
    MarketDataGateway::new(&config, Some("test-key".to_string())).unwrap()
}

#[tokio::test]
async fn success_sends_credential_and_accept_headers() {
    let stub = Stub::default();
    let gateway = serve(stub.clone()).await;

    let env = gateway.trending_stocks().await;
    assert_eq!(
        env,
        Envelope::success(serde_json::json!({
            "trending_stocks": {"top_gainers": [{"ticker_id": "TCS"}]}
        }))
    );
    assert_eq!(stub.hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn query_parameters_are_forwarded() {
    let gateway = serve(Stub::default()).await;

    let env = gateway.stock_by_name("Reliance").await;
    assert!(env.is_success());
}

#[tokio::test]
async fn not_found_is_api_error_with_status_and_body() {
    let gateway = serve(Stub::default()).await;

    let env = gateway.stock_by_name("Nope").await;
    assert_eq!(
        env,
        Envelope::error(ErrorKind::ApiError, "API returned 404: no such stock")
    );
}

#[tokio::test]
async fn empty_bodies_are_value_errors() {
    let gateway = serve(Stub::default()).await;

    for env in [
        gateway.market_news().await,
        gateway.ipo_data().await,
        gateway.mutual_funds().await,
    ] {
        assert_eq!(
            env,
            Envelope::error(ErrorKind::ValueError, "Empty response received from API")
        );
    }
}

#[tokio::test]
async fn non_json_body_is_api_error() {
    let gateway = serve(Stub::default()).await;

    let env = gateway.commodities().await;
    assert_eq!(env.error_kind(), Some(ErrorKind::ApiError));
}

#[tokio::test]
async fn missing_credential_never_reaches_the_network() {
    let stub = Stub::default();
    let with_key = serve(stub.clone()).await;

    let config = GatewayConfig {
        base_url: with_key.base_url().to_string(),
        ..GatewayConfig::default()
    };
    let gateway = MarketDataGateway::new(&config, None).unwrap();

    let env = gateway.trending_stocks().await;
    assert_eq!(env.error_kind(), Some(ErrorKind::ValueError));
    assert_eq!(stub.hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn catalog_dispatch_reaches_gateway() {
    let gateway = serve(Stub::default()).await;

    let call = ToolCall::new("get_stock_by_name").arg("name", "Reliance");
    let env = dispatch_collector(&gateway, &call).await;
    assert_eq!(
        env,
        Envelope::success(serde_json::json!({"companyName": "Reliance Industries"}))
    );
}

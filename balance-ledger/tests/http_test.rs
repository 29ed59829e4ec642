//! HTTP surface tests, driving the router in-process.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use balance_ledger::services::init_metrics;
use balance_ledger::startup::router;
use common::{app_state, spawn_ledger};
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn post_json(app: axum::Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    read_response(response).await
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    read_response(response).await
}

async fn read_response(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn deposit_endpoint_returns_event() {
    let test = spawn_ledger(&[("alice", dec!(50), dec!(0))]);
    let app = router(app_state(&test));

    let (status, body) = post_json(
        app,
        "/v1/deposit",
        json!({ "to": "alice", "amount": "100" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "deposit");
    assert_eq!(body["deposit_amount"], "100");
    assert_eq!(body["to_address"]["available_balance"], "150");
}

#[tokio::test]
async fn withdraw_endpoint_maps_insufficient_funds_to_conflict() {
    let test = spawn_ledger(&[("alice", dec!(50), dec!(0))]);
    let app = router(app_state(&test));

    let (status, body) = post_json(
        app,
        "/v1/withdraw",
        json!({ "from": "alice", "amount": "60" }),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("Insufficient funds"));
    assert!(test.sink.is_empty());
}

#[tokio::test]
async fn transitions_endpoint_routes_tagged_requests() {
    let test = spawn_ledger(&[("alice", dec!(10), dec!(30))]);
    let app = router(app_state(&test));

    let (status, body) = post_json(
        app,
        "/v1/transitions",
        json!({ "type": "unlock", "address": "alice", "amount": "50" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "unlock");
    assert_eq!(body["unlock_amount"], "30");
}

#[tokio::test]
async fn empty_address_fails_validation() {
    let test = spawn_ledger(&[]);
    let app = router(app_state(&test));

    let (status, _) = post_json(app, "/v1/lock", json!({ "address": "", "amount": "1" })).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn invalid_amount_is_bad_request() {
    let test = spawn_ledger(&[("a", dec!(10), dec!(0)), ("b", dec!(0), dec!(0))]);
    let app = router(app_state(&test));

    let (status, _) = post_json(
        app,
        "/v1/transfer",
        json!({ "from": "a", "to": "b", "send_amount": "0", "receive_amount": "0" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn get_address_returns_balances_or_not_found() {
    let test = spawn_ledger(&[("alice", dec!(12.5), dec!(3))]);

    let (status, body) = get(router(app_state(&test)), "/v1/addresses/alice").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["available_balance"], "12.5");
    assert_eq!(body["lock_balance"], "3");

    let (status, _) = get(router(app_state(&test)), "/v1/addresses/ghost").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_reports_ok_and_echoes_request_id() {
    let test = spawn_ledger(&[]);
    let app = router(app_state(&test));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "req-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "req-123");
}

#[tokio::test]
async fn transitions_endpoint_validates_addresses_like_direct_routes() {
    let test = spawn_ledger(&[]);
    let long = "x".repeat(300);

    for address in ["", long.as_str()] {
        let (status, _) = post_json(
            router(app_state(&test)),
            "/v1/transitions",
            json!({ "type": "lock", "address": address, "amount": "1" }),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = post_json(
            router(app_state(&test)),
            "/v1/lock",
            json!({ "address": address, "amount": "1" }),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}

#[tokio::test]
async fn deposit_overflow_is_conflict() {
    let test = spawn_ledger(&[("alice", Decimal::MAX, dec!(0))]);

    let (status, body) = post_json(
        router(app_state(&test)),
        "/v1/deposit",
        json!({ "to": "alice", "amount": "1" }),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("Balance overflow"));
    assert!(test.sink.is_empty());
}

#[tokio::test]
async fn metrics_endpoint_includes_http_request_metrics() {
    init_metrics();
    let test = spawn_ledger(&[("alice", dec!(5), dec!(0))]);

    let (status, _) = get(router(app_state(&test)), "/v1/addresses/alice").await;
    assert_eq!(status, StatusCode::OK);

    let response = router(app_state(&test))
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();

    assert!(text.contains("http_requests_total"));
}

//! End-to-end tests against the demo router on a real socket.
//!
//! Each test binds the router to an ephemeral port and talks to it with
//! `reqwest`, the way a push subscription would.
//!
//! Run with: `cargo test --test integration_tests`
#![allow(clippy::unwrap_used, clippy::expect_used)]

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use pubsub_unwrap::{Config, build_router};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use tokio::net::TcpListener;

/// Start the demo app with `config` and return its base URL.
async fn spawn_app(config: Config) -> String {
    let app = build_router(&config).expect("Failed to build router");
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    format!("http://{addr}")
}

fn envelope(payload: &str, attributes: Value) -> Value {
    json!({
        "message": {
            "data": STANDARD.encode(payload),
            "attributes": attributes,
            "messageId": "2070443601311540",
            "publishTime": "2021-02-26T19:13:55.749Z"
        },
        "subscription": "projects/demo/subscriptions/greetings"
    })
}

#[tokio::test]
async fn test_health_passes_through() {
    let base_url = spawn_app(Config::default()).await;

    let response = Client::new()
        .get(format!("{base_url}/health"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_greeting_receives_unwrapped_payload() {
    let base_url = spawn_app(Config::default()).await;

    let response = Client::new()
        .post(format!("{base_url}/greeting"))
        .json(&envelope(r#"{"hello":"world"}"#, json!({})))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"hello": "world"}));
}

#[tokio::test]
async fn test_echo_reports_rewritten_request() {
    let base_url = spawn_app(Config::default()).await;

    let response = Client::new()
        .post(format!("{base_url}/echo?original=1"))
        .json(&envelope("payload", json!({"origin": "billing"})))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["body"], "payload");
    assert_eq!(body["content_type"], "application/json");
    assert_eq!(body["content_length"], 7);
    assert_eq!(body["query"], "original=1");
    assert_eq!(body["push"]["message_id"], "2070443601311540");
    assert_eq!(
        body["push"]["subscription"],
        "projects/demo/subscriptions/greetings"
    );
    assert_eq!(body["push"]["attributes"]["origin"], "billing");
}

#[tokio::test]
async fn test_attributes_to_query() {
    let config = Config {
        attributes_to_query: true,
        content_type: "text/plain".to_string(),
        ..Config::default()
    };
    let base_url = spawn_app(config).await;

    let response = Client::new()
        .post(format!("{base_url}/echo?dropped=yes"))
        .json(&envelope("hi", json!({"a": "1 2", "b": "x/y"})))
        .send()
        .await
        .unwrap();

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["query"], "a=1+2&b=x%2Fy");
    assert_eq!(body["content_type"], "text/plain");
}

#[tokio::test]
async fn test_disallowed_attributes_rejected() {
    let config = Config {
        allow_attributes: false,
        ..Config::default()
    };
    let base_url = spawn_app(config).await;

    let response = Client::new()
        .post(format!("{base_url}/greeting"))
        .json(&envelope("{}", json!({"origin": "billing"})))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.headers()["content-type"], "application/json");
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body,
        json!({
            "status": 400,
            "type": "about:blank",
            "title": "Pub/Sub message attributes are not allowed",
            "detail": r#""origin"="billing""#
        })
    );
}

#[tokio::test]
async fn test_malformed_envelope_rejected() {
    let base_url = spawn_app(Config::default()).await;

    let response = Client::new()
        .post(format!("{base_url}/greeting"))
        .header("content-type", "application/json")
        .body(r#"{"message": {"data": 42}}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["title"], "Malformed Pub/Sub envelope");
}

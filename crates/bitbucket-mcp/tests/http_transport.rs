//! HTTP transport: POST dispatch, health check and the event stream.

#![cfg(feature = "http")]

mod common;

use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use futures::StreamExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use bitbucket_mcp::protocol::ProtocolHandler;
use bitbucket_mcp::transport::HttpTransport;
use common::*;

const ENDPOINT: &str = "/mcp";

fn transport(handler: ProtocolHandler) -> HttpTransport {
    HttpTransport::new(handler, ENDPOINT, Duration::from_secs(30))
}

fn post(body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(ENDPOINT)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_post_request_returns_reply() {
    let app = transport(open_handler(&fake())).router();

    let response = app
        .oneshot(post(request(json!(1), "tools/list", json!({})).to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["id"], 1);
    assert_eq!(body["result"]["tools"].as_array().unwrap().len(), 16);
}

#[tokio::test]
async fn test_post_notification_is_no_content() {
    let app = transport(open_handler(&fake())).router();

    let notification = json!({ "jsonrpc": "2.0", "method": "notifications/initialized" });
    let response = app.oneshot(post(notification.to_string())).await.unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(bytes.is_empty());
}

#[tokio::test]
async fn test_post_malformed_body_is_parse_error() {
    let app = transport(open_handler(&fake())).router();

    let response = app.oneshot(post("{\"jsonrpc\": ")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], -32700);
    assert_eq!(body["id"], Value::Null);
}

#[tokio::test]
async fn test_api_key_header_reaches_auth() {
    let api = fake();
    let app = transport(guarded_handler(&api, "s3cret")).router();
    let call = tool_call(1, "bitbucket_list_workspaces", json!({})).to_string();

    let response = app.clone().oneshot(post(call.clone())).await.unwrap();
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], -32603);

    let mut request = post(call);
    request
        .headers_mut()
        .insert("x-api-key", "s3cret".parse().unwrap());
    let response = app.oneshot(request).await.unwrap();
    let body = json_body(response).await;
    assert!(body.get("result").is_some(), "{body}");
    assert_eq!(api.calls(), vec!["list_workspaces"]);
}

#[tokio::test]
async fn test_health() {
    let app = transport(open_handler(&fake())).router();

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_cors_preflight() {
    let app = transport(open_handler(&fake())).router();

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri(ENDPOINT)
                .header(header::ORIGIN, "http://localhost:5173")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}

#[tokio::test]
async fn test_stream_opens_with_connected_comment_and_receives_pushes() {
    let transport = transport(open_handler(&fake()));
    let app = transport.router();

    let response = app
        .oneshot(Request::get(ENDPOINT).body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
    assert!(content_type.starts_with("text/event-stream"), "{content_type}");

    let mut body = response.into_body().into_data_stream();
    let first = body.next().await.unwrap().unwrap();
    let first = String::from_utf8(first.to_vec()).unwrap();
    assert!(first.starts_with(':'), "{first}");
    assert!(first.contains("connected"), "{first}");

    assert_eq!(transport.streams().len(), 1);
    assert_eq!(transport.send(&json!({ "result": { "hello": "world" } })), 1);

    let pushed = body.next().await.unwrap().unwrap();
    let pushed = String::from_utf8(pushed.to_vec()).unwrap();
    assert!(pushed.contains("event: message"), "{pushed}");
    assert!(pushed.contains("\"hello\":\"world\""), "{pushed}");

    drop(body);
    assert!(transport.streams().is_empty());
}

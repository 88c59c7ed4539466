// ABOUTME: Integration tests for the capstan-weather server over the HTTP transport
// ABOUTME: Exercises the /mcp endpoint with JSON and SSE responses via tower oneshot

// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use capstan::protocol::ServerInfo;
use capstan::{build_router, McpServer};
use capstan_weather::{build_registry, build_services};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

/// Build the weather router exactly as the binary does
fn test_app() -> axum::Router {
    let registry = build_registry().expect("registry builds");
    let server = Arc::new(McpServer::new(
        registry,
        build_services(),
        ServerInfo::new("capstan-weather", "0.3.1"),
    ));
    build_router(server)
}

/// Build a POST /mcp request from a JSON-RPC message
fn post_mcp(message: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/mcp")
        .header("content-type", "application/json")
        .body(Body::from(message.to_string()))
        .expect("build request")
}

/// Send a request and parse the response body as JSON
async fn send_and_parse(app: axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.expect("send request");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("collect")
        .to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

// ============================================================================
// JSON Responses
// ============================================================================

#[tokio::test]
async fn post_tools_list_returns_json_result() {
    let (status, body) = send_and_parse(
        test_app(),
        post_mcp(&json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["jsonrpc"], "2.0");
    assert_eq!(body["result"]["tools"][0]["name"], "get_weather_for_city");
}

#[tokio::test]
async fn post_tool_call_returns_conditions() {
    let (status, body) = send_and_parse(
        test_app(),
        post_mcp(&json!({
            "jsonrpc": "2.0",
            "id": 2,
            "method": "tools/call",
            "params": {
                "name": "get_weather_for_city",
                "arguments": {
                    "cityName": "Tokyo",
                    "currentDateTimeInUtc": "2026-02-11T10:30:00Z"
                }
            }
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["content"][0]["text"], "50 and sunny");
}

#[tokio::test]
async fn post_resources_read_returns_mascot_blob() {
    let (status, body) = send_and_parse(
        test_app(),
        post_mcp(&json!({
            "jsonrpc": "2.0",
            "id": 3,
            "method": "resources/read",
            "params": {"uri": "weather://mascot"}
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["contents"][0]["mimeType"], "image/png");
    let blob = body["result"]["contents"][0]["blob"]
        .as_str()
        .expect("blob string");
    assert!(blob.starts_with("iVBORw0KGgo"), "not a PNG: {blob}");
}

// ============================================================================
// SSE Responses
// ============================================================================

#[tokio::test]
async fn sse_accept_returns_single_event_with_response() {
    let app = test_app();
    let request = Request::builder()
        .method("POST")
        .uri("/mcp")
        .header("content-type", "application/json")
        .header("accept", "text/event-stream")
        .body(Body::from(
            json!({
                "jsonrpc": "2.0",
                "id": 4,
                "method": "initialize",
                "params": {
                    "protocolVersion": "2024-11-05",
                    "capabilities": {},
                    "clientInfo": {"name": "http-itest"}
                }
            })
            .to_string(),
        ))
        .expect("build request");

    let response = app.oneshot(request).await.expect("send request");
    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned();
    assert!(
        content_type.starts_with("text/event-stream"),
        "unexpected content type: {content_type}"
    );

    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("collect")
        .to_bytes();
    let raw = String::from_utf8(bytes.to_vec()).expect("utf8 body");
    let data = raw
        .lines()
        .find_map(|line| line.strip_prefix("data: "))
        .expect("data line");
    let payload: Value = serde_json::from_str(data).expect("event payload");
    assert_eq!(payload["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(payload["result"]["serverInfo"]["name"], "capstan-weather");
}

// ============================================================================
// Edge Cases
// ============================================================================

#[tokio::test]
async fn notification_returns_no_content() {
    let (status, body) = send_and_parse(
        test_app(),
        post_mcp(&json!({"jsonrpc": "2.0", "method": "notifications/initialized"})),
    )
    .await;

    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);
}

#[tokio::test]
async fn malformed_body_is_parse_error() {
    let request = Request::builder()
        .method("POST")
        .uri("/mcp")
        .header("content-type", "application/json")
        .body(Body::from("{this is not json"))
        .expect("build request");

    let (status, body) = send_and_parse(test_app(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"]["code"], -32700);
    assert_eq!(body["id"], Value::Null);
}

#[tokio::test]
async fn unknown_tool_is_resource_not_found() {
    let (_, body) = send_and_parse(
        test_app(),
        post_mcp(&json!({
            "jsonrpc": "2.0",
            "id": 5,
            "method": "tools/call",
            "params": {"name": "get_stock_price", "arguments": {}}
        })),
    )
    .await;

    assert_eq!(body["error"]["code"], -32002);
}

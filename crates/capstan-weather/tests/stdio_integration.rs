// ABOUTME: Integration tests for the capstan-weather server over the stdio wire protocol
// ABOUTME: Drives newline-delimited JSON-RPC through in-memory pipes and the spawned binary

// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::sync::Arc;

use capstan::protocol::ServerInfo;
use capstan::transport::serve_connection;
use capstan::{Client, ClientOptions, McpServer};
use capstan_weather::{build_registry, build_services};
use serde_json::{json, Value};
use tokio::io::{
    AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines, ReadHalf, WriteHalf,
};

/// Build the weather server exactly as the binary does
fn weather_server() -> Arc<McpServer> {
    let registry = build_registry().expect("registry builds");
    Arc::new(McpServer::new(
        registry,
        build_services(),
        ServerInfo::new("capstan-weather", "0.3.1"),
    ))
}

/// Serve a weather server over an in-memory pipe, returning the client end
fn start_connection() -> (
    WriteHalf<DuplexStream>,
    Lines<BufReader<ReadHalf<DuplexStream>>>,
) {
    let (client_io, server_io) = tokio::io::duplex(64 * 1024);
    let (server_read, server_write) = tokio::io::split(server_io);
    tokio::spawn(async move {
        let _ = serve_connection(BufReader::new(server_read), server_write, weather_server()).await;
    });
    let (client_read, client_write) = tokio::io::split(client_io);
    (client_write, BufReader::new(client_read).lines())
}

/// Send one JSON-RPC message as a single line
async fn send(writer: &mut WriteHalf<DuplexStream>, message: &Value) {
    let mut line = message.to_string();
    line.push('\n');
    writer.write_all(line.as_bytes()).await.expect("write line");
}

/// Read and parse the next JSON-RPC line
async fn recv(lines: &mut Lines<BufReader<ReadHalf<DuplexStream>>>) -> Value {
    let line = lines
        .next_line()
        .await
        .expect("read line")
        .expect("connection open");
    serde_json::from_str(&line).expect("valid json")
}

// ============================================================================
// Initialize
// ============================================================================

#[tokio::test]
async fn initialize_reports_identity_and_all_capability_classes() {
    let (mut writer, mut lines) = start_connection();

    send(
        &mut writer,
        &json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": {"name": "stdio-itest", "version": "0.0.1"}
            }
        }),
    )
    .await;

    let resp = recv(&mut lines).await;
    assert_eq!(resp["id"], 1);
    assert_eq!(resp["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(resp["result"]["serverInfo"]["name"], "capstan-weather");
    assert!(resp["result"]["capabilities"].get("tools").is_some());
    assert!(resp["result"]["capabilities"].get("prompts").is_some());
    assert!(resp["result"]["capabilities"].get("resources").is_some());
}

// ============================================================================
// Tools
// ============================================================================

#[tokio::test]
async fn tools_list_exposes_weather_tool_schema() {
    let (mut writer, mut lines) = start_connection();

    send(
        &mut writer,
        &json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}),
    )
    .await;

    let resp = recv(&mut lines).await;
    let tools = resp["result"]["tools"].as_array().expect("tools array");
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0]["name"], "get_weather_for_city");
    assert_eq!(tools[0]["inputSchema"]["type"], "object");
    let required = tools[0]["inputSchema"]["required"]
        .as_array()
        .expect("required array");
    assert!(required.contains(&json!("cityName")));
    assert!(required.contains(&json!("currentDateTimeInUtc")));
}

#[tokio::test]
async fn tools_call_returns_city_conditions() {
    let (mut writer, mut lines) = start_connection();

    send(
        &mut writer,
        &json!({
            "jsonrpc": "2.0",
            "id": 3,
            "method": "tools/call",
            "params": {
                "name": "get_weather_for_city",
                "arguments": {
                    "cityName": "London",
                    "currentDateTimeInUtc": "2026-02-11T10:30:00Z"
                }
            }
        }),
    )
    .await;

    let resp = recv(&mut lines).await;
    assert_eq!(resp["result"]["content"][0]["type"], "text");
    assert_eq!(resp["result"]["content"][0]["text"], "55 and cloudy");
    assert!(resp["result"].get("isError").is_none());
}

#[tokio::test]
async fn tools_call_with_missing_argument_is_invalid_params() {
    let (mut writer, mut lines) = start_connection();

    send(
        &mut writer,
        &json!({
            "jsonrpc": "2.0",
            "id": 4,
            "method": "tools/call",
            "params": {
                "name": "get_weather_for_city",
                "arguments": {"cityName": "London"}
            }
        }),
    )
    .await;

    let resp = recv(&mut lines).await;
    assert_eq!(resp["error"]["code"], -32602);
    assert!(resp["error"]["message"]
        .as_str()
        .expect("message")
        .contains("currentDateTimeInUtc"));
}

// ============================================================================
// Prompts
// ============================================================================

#[tokio::test]
async fn prompts_get_renders_assistant_question() {
    let (mut writer, mut lines) = start_connection();

    send(
        &mut writer,
        &json!({
            "jsonrpc": "2.0",
            "id": 5,
            "method": "prompts/get",
            "params": {
                "name": "get_current_weather_for_city",
                "arguments": {"city": "Paris"}
            }
        }),
    )
    .await;

    let resp = recv(&mut lines).await;
    let messages = resp["result"]["messages"].as_array().expect("messages");
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["role"], "assistant");
    assert_eq!(
        messages[0]["content"]["text"],
        "What is the current weather in Paris?"
    );
}

// ============================================================================
// Resources
// ============================================================================

#[tokio::test]
async fn resources_read_resolves_forecast_template() {
    let (mut writer, mut lines) = start_connection();

    send(
        &mut writer,
        &json!({
            "jsonrpc": "2.0",
            "id": 6,
            "method": "resources/read",
            "params": {"uri": "weather://forecast/Boston"}
        }),
    )
    .await;

    let resp = recv(&mut lines).await;
    assert_eq!(resp["result"]["contents"][0]["uri"], "weather://forecast/Boston");
    assert_eq!(
        resp["result"]["contents"][0]["text"],
        "The weather in Boston is 61 and rainy."
    );
}

#[tokio::test]
async fn resources_read_unknown_uri_is_resource_not_found() {
    let (mut writer, mut lines) = start_connection();

    send(
        &mut writer,
        &json!({
            "jsonrpc": "2.0",
            "id": 7,
            "method": "resources/read",
            "params": {"uri": "weather://forecast/Oslo/tomorrow"}
        }),
    )
    .await;

    let resp = recv(&mut lines).await;
    assert_eq!(resp["error"]["code"], -32002);
}

// ============================================================================
// Framing
// ============================================================================

#[tokio::test]
async fn unknown_method_is_method_not_found() {
    let (mut writer, mut lines) = start_connection();

    send(
        &mut writer,
        &json!({"jsonrpc": "2.0", "id": 8, "method": "weather/purge"}),
    )
    .await;

    let resp = recv(&mut lines).await;
    assert_eq!(resp["error"]["code"], -32601);
}

#[tokio::test]
async fn malformed_line_gets_parse_error_and_connection_survives() {
    let (mut writer, mut lines) = start_connection();

    writer
        .write_all(b"{this is not json\n")
        .await
        .expect("write line");

    let resp = recv(&mut lines).await;
    assert_eq!(resp["error"]["code"], -32700);
    assert_eq!(resp["id"], Value::Null);

    // The connection keeps serving after a parse failure
    send(
        &mut writer,
        &json!({"jsonrpc": "2.0", "id": 9, "method": "ping"}),
    )
    .await;
    let resp = recv(&mut lines).await;
    assert_eq!(resp["id"], 9);
    assert_eq!(resp["result"], json!({}));
}

// ============================================================================
// Spawned Binary
// ============================================================================

#[tokio::test]
async fn spawned_binary_serves_weather_over_stdio() {
    let client = Client::spawn(
        env!("CARGO_BIN_EXE_capstan-weather"),
        &[],
        ClientOptions::new("weather-itest").with_version("0.0.1"),
    )
    .await
    .expect("spawn server binary");

    client.ping().await.expect("ping");

    let mut arguments = serde_json::Map::new();
    arguments.insert("cityName".to_owned(), json!("Miami"));
    arguments.insert(
        "currentDateTimeInUtc".to_owned(),
        json!("2026-02-11T10:30:00Z"),
    );
    let result = client
        .call_tool("get_weather_for_city", Some(arguments))
        .await
        .expect("call tool");
    assert_eq!(result.content[0].text, "80 and sunny");
}

// ABOUTME: Stdio transport reading newline-delimited JSON-RPC and dispatching each request on its own task
// ABOUTME: Correlates notifications/cancelled with in-flight requests and drops responses of cancelled calls

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, warn};

use crate::context::CancellationToken;
use crate::error::McpError;
use crate::protocol::{CancelledParams, JsonRpcRequest, JsonRpcResponse, PARSE_ERROR};
use crate::server::McpServer;
use crate::transport::McpTransport;

/// Outbound line buffer depth before request tasks back-pressure
const WRITE_QUEUE_DEPTH: usize = 64;

/// Cancellation tokens of requests currently being handled, keyed by id
type InFlightMap = Arc<Mutex<HashMap<String, CancellationToken>>>;

/// MCP transport over stdin/stdout using newline-delimited JSON-RPC
///
/// Each line on stdin is expected to be a complete JSON-RPC message.
/// Responses are written as single lines to stdout. Logs go to stderr
/// to avoid polluting the protocol channel.
pub struct StdioTransport;

#[async_trait]
impl McpTransport for StdioTransport {
    async fn serve(self, server: Arc<McpServer>) -> Result<(), McpError> {
        let stdin = BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        serve_connection(stdin, stdout, server).await
    }
}

/// Serve newline-delimited JSON-RPC over an arbitrary reader/writer pair
///
/// This is the stdio transport's connection loop, exposed separately so a
/// connection can be driven over in-memory pipes. Every request runs on its
/// own task with its own cancellation token; `notifications/cancelled` fires
/// the token of the matching in-flight request, and a cancelled request's
/// response is dropped instead of written. Responses are serialized through
/// a single writer task, so concurrent requests never interleave lines.
///
/// Returns when the reader reaches end of stream, after in-flight responses
/// have drained.
///
/// # Errors
///
/// Returns a `Transport` error when the writer fails.
pub async fn serve_connection<R, W>(
    reader: R,
    writer: W,
    server: Arc<McpServer>,
) -> Result<(), McpError>
where
    R: AsyncBufRead + Send + Unpin,
    W: AsyncWrite + Send + Unpin + 'static,
{
    let (write_tx, write_rx) = mpsc::channel::<String>(WRITE_QUEUE_DEPTH);
    let writer_task = tokio::spawn(write_lines(writer, write_rx));
    let in_flight: InFlightMap = Arc::new(Mutex::new(HashMap::new()));

    debug!("Stdio transport ready, waiting for JSON-RPC messages");

    let mut lines = reader.lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }

        let request: JsonRpcRequest = match serde_json::from_str(&line) {
            Ok(req) => req,
            Err(e) => {
                error!(error = %e, "Failed to parse JSON-RPC request");
                let resp = JsonRpcResponse::error(None, PARSE_ERROR, format!("Parse error: {e}"));
                send_response(&write_tx, &resp).await;
                continue;
            }
        };

        if request.method == "notifications/cancelled" {
            cancel_in_flight(&in_flight, request.params).await;
            continue;
        }

        debug!(method = %request.method, "Handling MCP request");

        let token = CancellationToken::new();
        let id_key = request.id.as_ref().map(Value::to_string);
        if let Some(key) = &id_key {
            in_flight.lock().await.insert(key.clone(), token.clone());
        }

        let server = Arc::clone(&server);
        let write_tx = write_tx.clone();
        let in_flight = Arc::clone(&in_flight);
        tokio::spawn(async move {
            let response = server.handle_request(request, token.clone()).await;
            if let Some(key) = &id_key {
                in_flight.lock().await.remove(key);
            }
            if token.is_cancelled() {
                debug!(id = ?id_key, "Request cancelled, dropping response");
                return;
            }
            if let Some(response) = response {
                send_response(&write_tx, &response).await;
            }
        });
    }

    debug!("Input closed, shutting down stdio transport");

    // Dropping our write handle lets the writer task finish once the last
    // in-flight request task releases its clone.
    drop(write_tx);
    writer_task
        .await
        .map_err(|e| McpError::transport(format!("Writer task panicked: {e}")))?
}

/// Fire the token of the in-flight request named by a cancellation notice
async fn cancel_in_flight(in_flight: &InFlightMap, params: Option<Value>) {
    let parsed: Option<CancelledParams> = params.and_then(|p| serde_json::from_value(p).ok());
    let Some(cancelled) = parsed else {
        warn!("Malformed notifications/cancelled params, ignoring");
        return;
    };

    let key = cancelled.request_id.to_string();
    if let Some(token) = in_flight.lock().await.get(&key) {
        debug!(id = %key, reason = ?cancelled.reason, "Cancelling in-flight request");
        token.cancel();
    } else {
        debug!(id = %key, "Cancellation for unknown or completed request");
    }
}

/// Serialize a response and queue it for the writer task
pub(crate) async fn send_response(write_tx: &mpsc::Sender<String>, response: &JsonRpcResponse) {
    match serde_json::to_string(response) {
        Ok(json) => {
            if write_tx.send(json).await.is_err() {
                warn!("Writer closed, dropping response");
            }
        }
        Err(e) => error!(error = %e, "Failed to serialize response"),
    }
}

/// Write queued lines until every sender is gone
pub(crate) async fn write_lines<W>(
    mut writer: W,
    mut rx: mpsc::Receiver<String>,
) -> Result<(), McpError>
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = rx.recv().await {
        write_line(&mut writer, &line).await?;
    }
    Ok(())
}

/// Write one JSON line followed by a newline, flushing immediately
async fn write_line<W>(writer: &mut W, line: &str) -> Result<(), McpError>
where
    W: AsyncWrite + Unpin,
{
    writer
        .write_all(line.as_bytes())
        .await
        .map_err(|e| McpError::transport(format!("Write failed: {e}")))?;
    writer
        .write_all(b"\n")
        .await
        .map_err(|e| McpError::transport(format!("Newline write failed: {e}")))?;
    writer
        .flush()
        .await
        .map_err(|e| McpError::transport(format!("Flush failed: {e}")))?;
    Ok(())
}

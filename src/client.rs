// ABOUTME: MCP client over newline-delimited JSON-RPC with a client-side sampling bridge
// ABOUTME: Handles the initialize handshake, typed capability calls, and server-initiated requests

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::process::Stdio;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::context::CancellationToken;
use crate::error::McpError;
use crate::protocol::{
    CallToolParams, CallToolResult, CancelledParams, ClientCapabilities, ClientInfo,
    CreateMessageParams, CreateMessageResult, GetPromptParams, GetPromptResult, InitializeParams,
    InitializeResult, JsonRpcEnvelope, JsonRpcRequest, JsonRpcResponse, ProgressParams,
    PromptsListResult, ReadResourceParams, ReadResourceResult, ResourceTemplatesListResult,
    ResourcesListResult, SamplingCapability, ServerCapabilities, ServerInfo, ToolsListResult,
    INVALID_PARAMS, METHOD_NOT_FOUND, PROTOCOL_VERSION,
};
use crate::registry::HandlerFuture;
use crate::transport::stdio::{send_response, write_lines};

/// How long a request waits for its response before giving up
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Outbound message queue depth before senders are backpressured
const WRITE_QUEUE_DEPTH: usize = 64;

// ============================================================================
// Server Capability Flags
// ============================================================================

bitflags::bitflags! {
    /// Capability classes a server advertised during initialization
    ///
    /// A class absent from these flags must not be invoked: the server never
    /// registered an entry of that kind and will reject the call.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ServerCapabilityFlags: u8 {
        /// Server exposes tools (`tools/list`, `tools/call`)
        const TOOLS = 0b0000_0001;
        /// Server exposes prompts (`prompts/list`, `prompts/get`)
        const PROMPTS = 0b0000_0010;
        /// Server exposes resources (`resources/*`)
        const RESOURCES = 0b0000_0100;
    }
}

fn capability_flags(capabilities: &ServerCapabilities) -> ServerCapabilityFlags {
    let mut flags = ServerCapabilityFlags::empty();
    if capabilities.tools.is_some() {
        flags |= ServerCapabilityFlags::TOOLS;
    }
    if capabilities.prompts.is_some() {
        flags |= ServerCapabilityFlags::PROMPTS;
    }
    if capabilities.resources.is_some() {
        flags |= ServerCapabilityFlags::RESOURCES;
    }
    flags
}

// ============================================================================
// Sampling Bridge
// ============================================================================

/// Boxed sampling policy installed on a client
type SamplingPolicy =
    Arc<dyn Fn(CreateMessageParams, ProgressSink, CancellationToken) -> SamplingFuture + Send + Sync>;

type SamplingFuture = HandlerFuture<CreateMessageResult>;

/// Client-side completion policy invoked for `sampling/createMessage`
///
/// The policy is wrapped exactly once, at installation. Every inbound
/// sampling request runs the same adapted callable; no per-request wrapping
/// or reflection happens on the hot path. The policy receives the sampling
/// parameters, a progress sink tied to the request's `progressToken` (a
/// no-op when the server sent none), and a cancellation token fired if the
/// server cancels the request.
pub struct SamplingHandler {
    policy: SamplingPolicy,
}

impl SamplingHandler {
    /// Wrap a completion policy
    pub fn new<F, Fut>(policy: F) -> Self
    where
        F: Fn(CreateMessageParams, ProgressSink, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<CreateMessageResult, McpError>> + Send + 'static,
    {
        Self {
            policy: Arc::new(move |params, sink, token| Box::pin(policy(params, sink, token))),
        }
    }

    async fn invoke(
        &self,
        params: CreateMessageParams,
        sink: ProgressSink,
        token: CancellationToken,
    ) -> Result<CreateMessageResult, McpError> {
        (self.policy)(params, sink, token).await
    }
}

impl fmt::Debug for SamplingHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SamplingHandler").finish_non_exhaustive()
    }
}

/// Forwards `notifications/progress` for a server-initiated request
///
/// Bound to the `progressToken` the server put in the request's `_meta`.
/// When the server sent no token, reports are silently dropped.
#[derive(Debug, Clone)]
pub struct ProgressSink {
    progress_token: Option<Value>,
    out_tx: mpsc::Sender<String>,
}

impl ProgressSink {
    /// Whether the peer asked for progress on this request
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.progress_token.is_some()
    }

    /// Report progress toward an optional known total
    pub async fn report(&self, progress: f64, total: Option<f64>) {
        let Some(token) = &self.progress_token else {
            return;
        };
        let params = ProgressParams {
            progress_token: token.clone(),
            progress,
            total,
        };
        let Ok(params) = serde_json::to_value(&params) else {
            return;
        };
        let note = JsonRpcRequest::notification("notifications/progress", Some(params));
        let Ok(json) = serde_json::to_string(&note) else {
            return;
        };
        if self.out_tx.send(json).await.is_err() {
            debug!("Connection closed, dropping progress notification");
        }
    }
}

// ============================================================================
// Client Options
// ============================================================================

/// Connection options for [`Client::connect`] and [`Client::spawn`]
#[derive(Debug)]
pub struct ClientOptions {
    name: String,
    version: Option<String>,
    request_timeout: Duration,
    sampling: Option<SamplingHandler>,
}

impl ClientOptions {
    /// Options identifying the client by name, with no sampling support
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            sampling: None,
        }
    }

    /// Set the client version reported during initialization
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Set the per-request response timeout
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Install a sampling policy
    ///
    /// Installing a policy is what advertises the `sampling` capability
    /// during initialization; without one, inbound `sampling/createMessage`
    /// requests are refused with method-not-found.
    #[must_use]
    pub fn with_sampling(mut self, handler: SamplingHandler) -> Self {
        self.sampling = Some(handler);
        self
    }
}

// ============================================================================
// Client
// ============================================================================

/// MCP client speaking newline-delimited JSON-RPC over a byte stream
///
/// Owns the connection plumbing: a writer task draining the outbound queue,
/// a reader task routing responses to waiting callers and dispatching
/// server-initiated requests (ping, sampling). Dropping the client tears
/// both tasks down and kills a spawned server subprocess, if any.
pub struct Client {
    conn: Connection,
    server_info: ServerInfo,
    capabilities: ServerCapabilityFlags,
    reader_task: JoinHandle<()>,
    writer_task: JoinHandle<Result<(), McpError>>,
    child: Option<Child>,
}

impl Client {
    /// Connect over an existing byte stream and perform the MCP handshake
    ///
    /// Sends `initialize`, verifies the server answers with a protocol
    /// version this library speaks, then confirms with
    /// `notifications/initialized`.
    ///
    /// # Errors
    ///
    /// Returns `Transport` when the stream fails or the handshake times out,
    /// and `Protocol` when the server answers with an unsupported protocol
    /// version or a malformed initialize result.
    pub async fn connect<R, W>(
        reader: R,
        writer: W,
        mut options: ClientOptions,
    ) -> Result<Self, McpError>
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let sampling = options.sampling.take().map(Arc::new);
        let has_sampling = sampling.is_some();

        let (out_tx, out_rx) = mpsc::channel::<String>(WRITE_QUEUE_DEPTH);
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));

        let writer_task = tokio::spawn(write_lines(writer, out_rx));
        let table = RouteTable {
            pending: Arc::clone(&pending),
            out_tx: out_tx.clone(),
            sampling,
            sampling_in_flight: Arc::new(Mutex::new(HashMap::new())),
        };
        let reader_task = tokio::spawn(read_loop(reader, table));

        let conn = Connection {
            out_tx,
            pending,
            next_id: AtomicI64::new(1),
            request_timeout: options.request_timeout,
        };

        match handshake(&conn, &options, has_sampling).await {
            Ok((server_info, capabilities)) => Ok(Self {
                conn,
                server_info,
                capabilities,
                reader_task,
                writer_task,
                child: None,
            }),
            Err(e) => {
                reader_task.abort();
                writer_task.abort();
                Err(e)
            }
        }
    }

    /// Spawn a server subprocess and connect over its stdio
    ///
    /// The child's stdout/stdin carry the protocol; its stderr is inherited
    /// so server logs land on the client's stderr. The child is killed when
    /// the client is dropped.
    ///
    /// # Errors
    ///
    /// Returns `Transport` when the subprocess cannot be spawned or its
    /// stdio cannot be captured, plus any [`Client::connect`] error.
    pub async fn spawn(
        program: &str,
        args: &[&str],
        options: ClientOptions,
    ) -> Result<Self, McpError> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| McpError::transport(format!("Failed to spawn '{program}': {e}")))?;

        let child_stdout = child
            .stdout
            .take()
            .ok_or_else(|| McpError::transport("Failed to capture server stdout"))?;
        let child_stdin = child
            .stdin
            .take()
            .ok_or_else(|| McpError::transport("Failed to capture server stdin"))?;
        debug!(program, "Spawned MCP server subprocess");

        match Self::connect(child_stdout, child_stdin, options).await {
            Ok(mut client) => {
                client.child = Some(child);
                Ok(client)
            }
            Err(e) => {
                let _ = child.start_kill();
                Err(e)
            }
        }
    }

    /// Identity the server reported during initialization
    #[must_use]
    pub fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    /// Capability classes the server advertised during initialization
    #[must_use]
    pub fn server_capabilities(&self) -> ServerCapabilityFlags {
        self.capabilities
    }

    /// List the server's tools
    ///
    /// # Errors
    ///
    /// Returns the dispatch error reported by the server, or `Transport`
    /// when the connection fails.
    pub async fn list_tools(&self) -> Result<ToolsListResult, McpError> {
        self.call("tools/list", None::<&()>).await
    }

    /// Invoke a tool by name
    ///
    /// A handler failure arrives as a successful result with `is_error`
    /// set, not as an `Err`; protocol-level failures (unknown tool, bad
    /// arguments) arrive as errors.
    ///
    /// # Errors
    ///
    /// Returns the dispatch error reported by the server, or `Transport`
    /// when the connection fails.
    pub async fn call_tool(
        &self,
        name: impl Into<String>,
        arguments: Option<Map<String, Value>>,
    ) -> Result<CallToolResult, McpError> {
        let params = CallToolParams {
            name: name.into(),
            arguments,
        };
        self.call("tools/call", Some(&params)).await
    }

    /// List the server's prompts
    ///
    /// # Errors
    ///
    /// Returns the dispatch error reported by the server, or `Transport`
    /// when the connection fails.
    pub async fn list_prompts(&self) -> Result<PromptsListResult, McpError> {
        self.call("prompts/list", None::<&()>).await
    }

    /// Render a prompt by name
    ///
    /// # Errors
    ///
    /// Returns the dispatch error reported by the server, or `Transport`
    /// when the connection fails.
    pub async fn get_prompt(
        &self,
        name: impl Into<String>,
        arguments: Option<Map<String, Value>>,
    ) -> Result<GetPromptResult, McpError> {
        let params = GetPromptParams {
            name: name.into(),
            arguments,
        };
        self.call("prompts/get", Some(&params)).await
    }

    /// List the server's static resources
    ///
    /// # Errors
    ///
    /// Returns the dispatch error reported by the server, or `Transport`
    /// when the connection fails.
    pub async fn list_resources(&self) -> Result<ResourcesListResult, McpError> {
        self.call("resources/list", None::<&()>).await
    }

    /// List the server's resource templates
    ///
    /// # Errors
    ///
    /// Returns the dispatch error reported by the server, or `Transport`
    /// when the connection fails.
    pub async fn list_resource_templates(&self) -> Result<ResourceTemplatesListResult, McpError> {
        self.call("resources/templates/list", None::<&()>).await
    }

    /// Read a resource by concrete URI
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when no static resource or template matches, or
    /// `Transport` when the connection fails.
    pub async fn read_resource(&self, uri: impl Into<String>) -> Result<ReadResourceResult, McpError> {
        let params = ReadResourceParams { uri: uri.into() };
        self.call("resources/read", Some(&params)).await
    }

    /// Liveness check
    ///
    /// # Errors
    ///
    /// Returns `Transport` when the connection fails or the server does not
    /// answer within the request timeout.
    pub async fn ping(&self) -> Result<(), McpError> {
        self.conn.request("ping", None).await.map(|_| ())
    }

    /// Issue a raw request and return the raw result value
    ///
    /// Escape hatch for methods without a typed wrapper.
    ///
    /// # Errors
    ///
    /// Returns the error reported by the server, or `Transport` when the
    /// connection fails.
    pub async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, McpError> {
        self.conn.request(method, params).await
    }

    async fn call<P, T>(&self, method: &str, params: Option<&P>) -> Result<T, McpError>
    where
        P: Serialize + Sync,
        T: DeserializeOwned,
    {
        let params = match params {
            Some(p) => Some(serde_json::to_value(p).map_err(|e| {
                McpError::protocol(format!("Failed to serialize '{method}' params: {e}"))
            })?),
            None => None,
        };
        let raw = self.conn.request(method, params).await?;
        serde_json::from_value(raw)
            .map_err(|e| McpError::protocol(format!("Invalid '{method}' result: {e}")))
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("server_info", &self.server_info)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.reader_task.abort();
        self.writer_task.abort();
        if let Some(mut child) = self.child.take() {
            // Reap happens in the runtime's background; start_kill is enough here.
            let _ = child.start_kill();
        }
    }
}

/// Run the initialize handshake and translate the advertised capabilities
async fn handshake(
    conn: &Connection,
    options: &ClientOptions,
    has_sampling: bool,
) -> Result<(ServerInfo, ServerCapabilityFlags), McpError> {
    let params = InitializeParams {
        protocol_version: PROTOCOL_VERSION.to_owned(),
        capabilities: ClientCapabilities {
            sampling: has_sampling.then(SamplingCapability::default),
        },
        client_info: ClientInfo {
            name: options.name.clone(),
            version: options.version.clone(),
        },
    };
    let params = serde_json::to_value(&params)
        .map_err(|e| McpError::protocol(format!("Failed to serialize initialize params: {e}")))?;

    let raw = conn.request("initialize", Some(params)).await?;
    let init: InitializeResult = serde_json::from_value(raw)
        .map_err(|e| McpError::protocol(format!("Invalid initialize result: {e}")))?;

    if init.protocol_version != PROTOCOL_VERSION {
        return Err(McpError::protocol(format!(
            "Unsupported protocol version: {} (expected {PROTOCOL_VERSION})",
            init.protocol_version
        )));
    }

    conn.notify("notifications/initialized", None).await?;

    let flags = capability_flags(&init.capabilities);
    info!(
        server = %init.server_info.name,
        version = %init.server_info.version,
        capabilities = ?flags,
        "Connected to MCP server"
    );
    Ok((init.server_info, flags))
}

// ============================================================================
// Connection Plumbing
// ============================================================================

/// Callers waiting on responses, keyed by serialized request id
type PendingMap = Arc<Mutex<HashMap<String, oneshot::Sender<Result<Value, McpError>>>>>;

/// Outbound half of a connection: id allocation and response pairing
struct Connection {
    out_tx: mpsc::Sender<String>,
    pending: PendingMap,
    next_id: AtomicI64,
    request_timeout: Duration,
}

impl Connection {
    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, McpError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let key = id.to_string();
        let (resp_tx, resp_rx) = oneshot::channel();
        self.pending.lock().await.insert(key.clone(), resp_tx);

        let request = JsonRpcRequest::new(Value::from(id), method, params);
        if let Err(e) = self.send(&request).await {
            self.pending.lock().await.remove(&key);
            return Err(e);
        }

        match tokio::time::timeout(self.request_timeout, resp_rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(McpError::transport("Connection closed before response")),
            Err(_) => {
                self.pending.lock().await.remove(&key);
                Err(McpError::transport(format!(
                    "Request '{method}' timed out after {:?}",
                    self.request_timeout
                )))
            }
        }
    }

    async fn notify(&self, method: &str, params: Option<Value>) -> Result<(), McpError> {
        self.send(&JsonRpcRequest::notification(method, params)).await
    }

    async fn send(&self, message: &JsonRpcRequest) -> Result<(), McpError> {
        let json = serde_json::to_string(message)
            .map_err(|e| McpError::protocol(format!("Failed to serialize request: {e}")))?;
        self.out_tx
            .send(json)
            .await
            .map_err(|_| McpError::transport("Connection closed"))
    }
}

// ============================================================================
// Inbound Routing
// ============================================================================

/// Sampling requests still running, keyed by serialized request id
type SamplingInFlight = Arc<Mutex<HashMap<String, CancellationToken>>>;

/// Shared state the reader task routes inbound messages against
struct RouteTable {
    pending: PendingMap,
    out_tx: mpsc::Sender<String>,
    sampling: Option<Arc<SamplingHandler>>,
    sampling_in_flight: SamplingInFlight,
}

/// Read newline-delimited messages until EOF, routing each as it arrives
async fn read_loop<R>(reader: R, table: RouteTable)
where
    R: AsyncRead + Send + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<JsonRpcEnvelope>(&line) {
            Ok(envelope) => route_message(&table, envelope).await,
            Err(e) => warn!(error = %e, "Ignoring unparseable message from server"),
        }
    }

    debug!("Server connection closed");
    let mut pending = table.pending.lock().await;
    for (_, waiter) in pending.drain() {
        let _ = waiter.send(Err(McpError::transport("Connection closed before response")));
    }
}

/// Classify one inbound message and hand it to the right path
async fn route_message(table: &RouteTable, envelope: JsonRpcEnvelope) {
    if envelope.is_response() {
        resolve_response(table, envelope).await;
        return;
    }

    let Some(method) = envelope.method.clone() else {
        warn!("Unclassifiable message from server, ignoring");
        return;
    };

    if envelope.is_notification() {
        match method.as_str() {
            "notifications/cancelled" => cancel_sampling(table, envelope.params).await,
            other => debug!(method = other, "Ignoring server notification"),
        }
        return;
    }

    debug!(method = %method, "Server-initiated request");
    match method.as_str() {
        "ping" => {
            let response =
                JsonRpcResponse::success(envelope.id, Value::Object(Map::new()));
            send_response(&table.out_tx, &response).await;
        }
        "sampling/createMessage" => handle_sampling(table, envelope.id, envelope.params).await,
        other => {
            let response = JsonRpcResponse::error(
                envelope.id,
                METHOD_NOT_FOUND,
                format!("Method not found: {other}"),
            );
            send_response(&table.out_tx, &response).await;
        }
    }
}

/// Pair a response with the caller waiting on its id
async fn resolve_response(table: &RouteTable, envelope: JsonRpcEnvelope) {
    let Some(id) = &envelope.id else {
        warn!("Response without id, ignoring");
        return;
    };
    let key = id.to_string();
    let waiter = table.pending.lock().await.remove(&key);
    let Some(waiter) = waiter else {
        warn!(id = %key, "Response for unknown request, ignoring");
        return;
    };
    let outcome = envelope.error.map_or_else(
        || Ok(envelope.result.unwrap_or(Value::Null)),
        |err| Err(McpError::from_jsonrpc(err.code, err.message)),
    );
    let _ = waiter.send(outcome);
}

/// Run an inbound `sampling/createMessage` through the installed policy
///
/// The policy runs on its own task so a slow completion never blocks the
/// read loop. If the server cancels the request before the policy finishes,
/// the response is dropped rather than sent.
async fn handle_sampling(table: &RouteTable, id: Option<Value>, params: Option<Value>) {
    let Some(handler) = table.sampling.clone() else {
        debug!("Sampling requested but no policy is installed, refusing");
        let response = JsonRpcResponse::error(
            id,
            METHOD_NOT_FOUND,
            "Sampling is not supported by this client".to_owned(),
        );
        send_response(&table.out_tx, &response).await;
        return;
    };

    let params: CreateMessageParams = match serde_json::from_value(params.unwrap_or(Value::Null)) {
        Ok(p) => p,
        Err(e) => {
            let response = JsonRpcResponse::error(
                id,
                INVALID_PARAMS,
                format!("Invalid sampling/createMessage params: {e}"),
            );
            send_response(&table.out_tx, &response).await;
            return;
        }
    };

    let progress_token = params
        .meta
        .as_ref()
        .and_then(|meta| meta.get("progressToken"))
        .cloned();
    let sink = ProgressSink {
        progress_token,
        out_tx: table.out_tx.clone(),
    };

    let token = CancellationToken::new();
    let key = id.as_ref().map(ToString::to_string);
    if let Some(key) = &key {
        table
            .sampling_in_flight
            .lock()
            .await
            .insert(key.clone(), token.clone());
    }

    let out_tx = table.out_tx.clone();
    let in_flight = Arc::clone(&table.sampling_in_flight);
    tokio::spawn(async move {
        let result = handler.invoke(params, sink, token.clone()).await;
        if let Some(key) = &key {
            in_flight.lock().await.remove(key);
        }
        if token.is_cancelled() {
            debug!("Sampling request was cancelled, dropping response");
            return;
        }
        let response = match result.and_then(|completion| {
            serde_json::to_value(&completion).map_err(|e| {
                McpError::protocol(format!("Failed to serialize sampling result: {e}"))
            })
        }) {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => JsonRpcResponse::error(id, e.jsonrpc_code(), e.message),
        };
        send_response(&out_tx, &response).await;
    });
}

/// Fire the cancellation token of an in-flight sampling request
async fn cancel_sampling(table: &RouteTable, params: Option<Value>) {
    let Some(params) = params else {
        warn!("notifications/cancelled without params, ignoring");
        return;
    };
    let cancelled: CancelledParams = match serde_json::from_value(params) {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "Malformed notifications/cancelled, ignoring");
            return;
        }
    };
    let key = cancelled.request_id.to_string();
    let in_flight = table.sampling_in_flight.lock().await;
    if let Some(token) = in_flight.get(&key) {
        debug!(
            id = %key,
            reason = cancelled.reason.as_deref().unwrap_or("unspecified"),
            "Cancelling in-flight sampling request"
        );
        token.cancel();
    } else {
        debug!(id = %key, "Cancellation for unknown or finished request, ignoring");
    }
}

// ABOUTME: MCP JSON-RPC wire types for both server and client directions
// ABOUTME: Defines initialize, tools, prompts, resources, sampling, and notification shapes

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// MCP protocol revision spoken by this library
pub const PROTOCOL_VERSION: &str = "2024-11-05";

// ============================================================================
// JSON-RPC Error Codes
// ============================================================================

/// JSON-RPC parse error: invalid JSON received
pub const PARSE_ERROR: i32 = -32_700;

/// JSON-RPC invalid request (e.g. wrong protocol version)
pub const INVALID_REQUEST: i32 = -32_600;

/// JSON-RPC method not found
pub const METHOD_NOT_FOUND: i32 = -32_601;

/// JSON-RPC invalid parameters
pub const INVALID_PARAMS: i32 = -32_602;

/// JSON-RPC internal error
pub const INTERNAL_ERROR: i32 = -32_603;

/// MCP: no capability matches the requested name or URI
pub const RESOURCE_NOT_FOUND: i32 = -32_002;

// ============================================================================
// JSON-RPC Messages
// ============================================================================

/// A JSON-RPC request or notification (no `id` means notification)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol version marker (always "2.0", validated by JSON-RPC peers)
    pub jsonrpc: String,
    /// Request identifier (None for notifications)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    /// Method name
    pub method: String,
    /// Method parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Build a request carrying an identifier
    pub fn new(id: Value, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_owned(),
            id: Some(id),
            method: method.into(),
            params,
        }
    }

    /// Build a notification (no identifier, no response expected)
    pub fn notification(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_owned(),
            id: None,
            method: method.into(),
            params,
        }
    }
}

/// A JSON-RPC response carrying either a result or an error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Always "2.0"
    pub jsonrpc: String,
    /// Matching request identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    /// Success payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC error object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Numeric error code
    pub code: i32,
    /// Human-readable error message
    pub message: String,
    /// Additional error data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    /// Build a success response with the given result
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_owned(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Build an error response with the given code and message
    pub fn error(id: Option<Value>, code: i32, message: String) -> Self {
        Self {
            jsonrpc: "2.0".to_owned(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message,
                data: None,
            }),
        }
    }
}

/// Loosely-parsed inbound message, classified before full deserialization
///
/// A bidirectional connection sees three shapes on the same stream:
/// peer requests (`method` + `id`), peer notifications (`method`, no `id`),
/// and responses to our own requests (`result` or `error`).
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcEnvelope {
    /// Protocol version marker
    pub jsonrpc: String,
    /// Message identifier, if any
    #[serde(default)]
    pub id: Option<Value>,
    /// Method name (present on requests and notifications)
    #[serde(default)]
    pub method: Option<String>,
    /// Request parameters
    #[serde(default)]
    pub params: Option<Value>,
    /// Response result
    #[serde(default)]
    pub result: Option<Value>,
    /// Response error
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcEnvelope {
    /// Whether this message is a peer-initiated request expecting a response
    #[must_use]
    pub fn is_request(&self) -> bool {
        self.method.is_some() && self.id.is_some()
    }

    /// Whether this message is a notification (no response expected)
    #[must_use]
    pub fn is_notification(&self) -> bool {
        self.method.is_some() && self.id.is_none()
    }

    /// Whether this message answers one of our own requests
    #[must_use]
    pub fn is_response(&self) -> bool {
        self.method.is_none() && (self.result.is_some() || self.error.is_some())
    }
}

// ============================================================================
// MCP Initialize
// ============================================================================

/// Parameters for the `initialize` request
#[derive(Debug, Serialize, Deserialize)]
pub struct InitializeParams {
    /// Protocol version requested by the client
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    /// Client capability declarations
    #[serde(default)]
    pub capabilities: ClientCapabilities,
    /// Client identification
    #[serde(rename = "clientInfo")]
    pub client_info: ClientInfo,
}

/// Client identification sent during initialization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    /// Client name
    pub name: String,
    /// Client version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Result of a successful `initialize` response
#[derive(Debug, Serialize, Deserialize)]
pub struct InitializeResult {
    /// Protocol version the server supports
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    /// Server capability declarations
    pub capabilities: ServerCapabilities,
    /// Server identification
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
}

/// Server identification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Server name
    pub name: String,
    /// Server version
    pub version: String,
}

impl ServerInfo {
    /// Build a server identity from a name and version
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// Server capability declarations
///
/// A capability class is advertised only when the server actually holds at
/// least one registered entry of that kind. A class that is absent here must
/// never be invoked by the peer.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ServerCapabilities {
    /// Tool support (presence signals tools are available)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolsCapability>,
    /// Prompt support
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompts: Option<PromptsCapability>,
    /// Resource support (static and templated)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourcesCapability>,
}

/// Marker type indicating the server exposes tools
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ToolsCapability {}

/// Marker type indicating the server exposes prompts
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PromptsCapability {}

/// Marker type indicating the server exposes resources
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ResourcesCapability {}

/// Client capability declarations
///
/// `sampling` is present only when a sampling policy was installed on the
/// client; a server must not issue `sampling/createMessage` otherwise.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ClientCapabilities {
    /// Sampling-callback support
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sampling: Option<SamplingCapability>,
}

/// Marker type indicating the client accepts sampling callbacks
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SamplingCapability {}

// ============================================================================
// MCP Tools
// ============================================================================

/// Tool definition exposed via `tools/list`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool name
    pub name: String,
    /// Human-readable tool description
    pub description: String,
    /// JSON Schema describing the tool's input
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Result of a `tools/list` call
#[derive(Debug, Serialize, Deserialize)]
pub struct ToolsListResult {
    /// Available tool definitions
    pub tools: Vec<ToolDefinition>,
}

/// Parameters for a `tools/call` request
#[derive(Debug, Serialize, Deserialize)]
pub struct CallToolParams {
    /// Name of the tool to invoke
    pub name: String,
    /// Tool arguments, keyed by parameter name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Map<String, Value>>,
}

/// Result of a `tools/call` invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolResult {
    /// Response content parts
    pub content: Vec<ContentPart>,
    /// Whether this result represents an in-band tool failure
    #[serde(
        default,
        rename = "isError",
        skip_serializing_if = "Option::is_none"
    )]
    pub is_error: Option<bool>,
}

/// A content part within a tool result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentPart {
    /// Content type (always "text" for now)
    #[serde(rename = "type")]
    pub content_type: String,
    /// Text content
    pub text: String,
}

impl CallToolResult {
    /// Build a successful text result
    pub fn text(content: String) -> Self {
        Self {
            content: vec![ContentPart {
                content_type: "text".to_owned(),
                text: content,
            }],
            is_error: None,
        }
    }

    /// Build an error result with the given message
    pub fn error(message: String) -> Self {
        Self {
            content: vec![ContentPart {
                content_type: "text".to_owned(),
                text: message,
            }],
            is_error: Some(true),
        }
    }
}

// ============================================================================
// MCP Prompts
// ============================================================================

/// Prompt definition exposed via `prompts/list`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prompt {
    /// Unique prompt name
    pub name: String,
    /// Human-readable prompt description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Advertised argument schema
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<PromptArgument>,
}

/// A named argument a prompt accepts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptArgument {
    /// Argument name
    pub name: String,
    /// Human-readable argument description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the argument must be supplied
    #[serde(default)]
    pub required: bool,
}

/// Result of a `prompts/list` call
#[derive(Debug, Serialize, Deserialize)]
pub struct PromptsListResult {
    /// Available prompt definitions
    pub prompts: Vec<Prompt>,
}

/// Parameters for a `prompts/get` request
#[derive(Debug, Serialize, Deserialize)]
pub struct GetPromptParams {
    /// Name of the prompt to render
    pub name: String,
    /// Render arguments, keyed by input-variable name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Map<String, Value>>,
}

/// Result of a `prompts/get` invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetPromptResult {
    /// Prompt description, if declared
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Rendered messages in order
    pub messages: Vec<PromptMessage>,
}

/// A role-tagged message within a rendered prompt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptMessage {
    /// Message author role
    pub role: Role,
    /// Message content
    pub content: MessageContent,
}

impl PromptMessage {
    /// Build an assistant-authored text message
    pub fn assistant_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::text(text),
        }
    }

    /// Build a user-authored text message
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::text(text),
        }
    }
}

/// Message author role used by prompts and sampling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Content authored by the user side
    User,
    /// Content authored by the model side
    Assistant,
}

/// Typed message content: inline text or base64 image data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageContent {
    /// Content type ("text" or "image")
    #[serde(rename = "type")]
    pub content_type: String,
    /// Text body (present when type is "text")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Base64-encoded binary body (present when type is "image")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    /// MIME type of the binary body
    #[serde(
        default,
        rename = "mimeType",
        skip_serializing_if = "Option::is_none"
    )]
    pub mime_type: Option<String>,
}

impl MessageContent {
    /// Build text content
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content_type: "text".to_owned(),
            text: Some(text.into()),
            data: None,
            mime_type: None,
        }
    }

    /// Build image content from raw bytes (base64-encoded on the wire)
    pub fn image(bytes: &[u8], mime_type: impl Into<String>) -> Self {
        Self {
            content_type: "image".to_owned(),
            text: None,
            data: Some(BASE64.encode(bytes)),
            mime_type: Some(mime_type.into()),
        }
    }
}

// ============================================================================
// MCP Resources
// ============================================================================

/// Static resource descriptor exposed via `resources/list`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    /// Exact resource URI
    pub uri: String,
    /// Human-readable resource name
    pub name: String,
    /// Resource description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Declared MIME type of the content
    #[serde(
        default,
        rename = "mimeType",
        skip_serializing_if = "Option::is_none"
    )]
    pub mime_type: Option<String>,
}

/// Templated resource descriptor exposed via `resources/templates/list`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceTemplateDescriptor {
    /// URI template with `{name}` placeholders
    #[serde(rename = "uriTemplate")]
    pub uri_template: String,
    /// Human-readable resource name
    pub name: String,
    /// Resource description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Declared MIME type of the content
    #[serde(
        default,
        rename = "mimeType",
        skip_serializing_if = "Option::is_none"
    )]
    pub mime_type: Option<String>,
}

/// Result of a `resources/list` call
#[derive(Debug, Serialize, Deserialize)]
pub struct ResourcesListResult {
    /// Available static resources
    pub resources: Vec<ResourceDescriptor>,
}

/// Result of a `resources/templates/list` call
#[derive(Debug, Serialize, Deserialize)]
pub struct ResourceTemplatesListResult {
    /// Available resource templates
    #[serde(rename = "resourceTemplates")]
    pub resource_templates: Vec<ResourceTemplateDescriptor>,
}

/// Parameters for a `resources/read` request
#[derive(Debug, Serialize, Deserialize)]
pub struct ReadResourceParams {
    /// Concrete URI to read (matched exactly, then against templates)
    pub uri: String,
}

/// Result of a `resources/read` invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadResourceResult {
    /// Content blocks for the requested URI
    pub contents: Vec<ResourceContents>,
}

/// One resource content block: inline text or base64 binary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceContents {
    /// The URI the content answers (the requested URI, not the template)
    pub uri: String,
    /// Declared MIME type of the content
    #[serde(
        default,
        rename = "mimeType",
        skip_serializing_if = "Option::is_none"
    )]
    pub mime_type: Option<String>,
    /// Inline text body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Base64-encoded binary body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob: Option<String>,
}

impl ResourceContents {
    /// Build an inline-text content block
    pub fn text(
        uri: impl Into<String>,
        mime_type: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            uri: uri.into(),
            mime_type: Some(mime_type.into()),
            text: Some(body.into()),
            blob: None,
        }
    }

    /// Build a binary content block (base64-encoded on the wire)
    pub fn blob(uri: impl Into<String>, mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            uri: uri.into(),
            mime_type: Some(mime_type.into()),
            text: None,
            blob: Some(BASE64.encode(bytes)),
        }
    }
}

// ============================================================================
// MCP Sampling (server -> client)
// ============================================================================

/// Parameters of a `sampling/createMessage` request issued by a server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMessageParams {
    /// Conversation messages to complete
    pub messages: Vec<SamplingMessage>,
    /// System prompt the completion should honor
    #[serde(
        default,
        rename = "systemPrompt",
        skip_serializing_if = "Option::is_none"
    )]
    pub system_prompt: Option<String>,
    /// Upper bound on generated tokens
    #[serde(
        default,
        rename = "maxTokens",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_tokens: Option<u32>,
    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Sequences that stop generation
    #[serde(
        default,
        rename = "stopSequences",
        skip_serializing_if = "Option::is_none"
    )]
    pub stop_sequences: Option<Vec<String>>,
    /// Model selection hints, passed through opaquely
    #[serde(
        default,
        rename = "modelPreferences",
        skip_serializing_if = "Option::is_none"
    )]
    pub model_preferences: Option<Value>,
    /// Request metadata (carries `progressToken` when progress is wanted)
    #[serde(default, rename = "_meta", skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

/// A role-tagged message within a sampling request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingMessage {
    /// Message author role
    pub role: Role,
    /// Message content
    pub content: MessageContent,
}

/// Result of a `sampling/createMessage` invocation, produced by the policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMessageResult {
    /// Author role of the completion (conventionally `assistant`)
    pub role: Role,
    /// Completion content
    pub content: MessageContent,
    /// Name of the model that produced the completion
    pub model: String,
    /// Why generation stopped
    #[serde(
        default,
        rename = "stopReason",
        skip_serializing_if = "Option::is_none"
    )]
    pub stop_reason: Option<String>,
}

impl CreateMessageResult {
    /// Build an assistant-authored text completion
    pub fn assistant_text(text: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::text(text),
            model: model.into(),
            stop_reason: Some("endTurn".to_owned()),
        }
    }
}

// ============================================================================
// MCP Notifications
// ============================================================================

/// Parameters of a `notifications/progress` notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressParams {
    /// Token correlating progress with the originating request
    #[serde(rename = "progressToken")]
    pub progress_token: Value,
    /// Work completed so far
    pub progress: f64,
    /// Total work expected, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
}

/// Parameters of a `notifications/cancelled` notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelledParams {
    /// Identifier of the request being cancelled
    #[serde(rename = "requestId")]
    pub request_id: Value,
    /// Optional reason string for logging
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

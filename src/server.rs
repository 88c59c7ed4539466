// ABOUTME: MCP server core that routes JSON-RPC requests to registry dispatch
// ABOUTME: Implements initialize, ping, and the tools/prompts/resources method families

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::context::{CancellationToken, ServiceMap};
use crate::protocol::{
    CallToolParams, GetPromptParams, InitializeParams, InitializeResult, JsonRpcRequest,
    JsonRpcResponse, PromptsCapability, PromptsListResult, ReadResourceParams,
    ResourceTemplatesListResult, ResourcesCapability, ResourcesListResult, ServerCapabilities,
    ServerInfo, ToolsCapability, ToolsListResult, INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST,
    METHOD_NOT_FOUND, PROTOCOL_VERSION,
};
use crate::registry::CapabilityRegistry;

/// MCP server that dispatches JSON-RPC requests against a capability registry
///
/// Owns the registry, the shared service map injected into every request
/// context, and the server identity advertised during initialization.
/// Transport layers feed parsed requests into [`handle_request`] and send
/// the returned responses; the registry is read-only after construction, so
/// concurrent requests dispatch without locking.
///
/// [`handle_request`]: McpServer::handle_request
pub struct McpServer {
    registry: CapabilityRegistry,
    services: Arc<ServiceMap>,
    info: ServerInfo,
}

impl McpServer {
    /// Create a server from a populated registry, shared services, and identity
    #[must_use]
    pub fn new(registry: CapabilityRegistry, services: ServiceMap, info: ServerInfo) -> Self {
        Self {
            registry,
            services: Arc::new(services),
            info,
        }
    }

    /// The capability registry this server dispatches against
    #[must_use]
    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// Route a JSON-RPC request to the appropriate MCP handler
    ///
    /// Returns `None` for notifications (requests without an id). The
    /// cancellation token is propagated into the dispatched handler; firing
    /// it after dispatch has begun requests cooperative cancellation.
    pub async fn handle_request(
        &self,
        request: JsonRpcRequest,
        cancellation: CancellationToken,
    ) -> Option<JsonRpcResponse> {
        // Validate JSON-RPC protocol version
        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::error(
                request.id,
                INVALID_REQUEST,
                format!("Unsupported JSON-RPC version: {}", request.jsonrpc),
            ));
        }

        // Notifications have no id and expect no response
        if request.id.is_none() {
            debug!(method = %request.method, "Received notification, no response");
            return None;
        }

        let JsonRpcRequest {
            id, method, params, ..
        } = request;

        let response = match method.as_str() {
            "initialize" => self.handle_initialize(id, params),
            "ping" => JsonRpcResponse::success(id, Value::Object(serde_json::Map::new())),
            "tools/list" => serialize_result(
                id,
                &ToolsListResult {
                    tools: self.registry.list_tools(),
                },
            ),
            "tools/call" => self.handle_tools_call(id, params, cancellation).await,
            "prompts/list" => serialize_result(
                id,
                &PromptsListResult {
                    prompts: self.registry.list_prompts(),
                },
            ),
            "prompts/get" => self.handle_prompts_get(id, params, cancellation).await,
            "resources/list" => serialize_result(
                id,
                &ResourcesListResult {
                    resources: self.registry.list_resources(),
                },
            ),
            "resources/templates/list" => serialize_result(
                id,
                &ResourceTemplatesListResult {
                    resource_templates: self.registry.list_resource_templates(),
                },
            ),
            "resources/read" => self.handle_resources_read(id, params, cancellation).await,
            method => {
                debug!(method, "Unknown MCP method");
                JsonRpcResponse::error(
                    id,
                    METHOD_NOT_FOUND,
                    format!("Method not found: {method}"),
                )
            }
        };

        Some(response)
    }

    /// Handle `initialize`: log client info and advertise capability classes
    ///
    /// A capability class is advertised only when the registry actually
    /// holds at least one entry of that kind. The server always answers
    /// with its own protocol revision.
    fn handle_initialize(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        if let Some(params) = params {
            if let Ok(init) = serde_json::from_value::<InitializeParams>(params) {
                debug!(
                    client = %init.client_info.name,
                    version = ?init.client_info.version,
                    protocol = %init.protocol_version,
                    sampling = init.capabilities.sampling.is_some(),
                    "MCP client connected"
                );
            }
        }

        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_owned(),
            capabilities: ServerCapabilities {
                tools: self.registry.has_tools().then(ToolsCapability::default),
                prompts: self.registry.has_prompts().then(PromptsCapability::default),
                resources: self
                    .registry
                    .has_resources()
                    .then(ResourcesCapability::default),
            },
            server_info: self.info.clone(),
        };

        serialize_result(id, &result)
    }

    /// Handle `tools/call`: dispatch to the named tool through the registry
    async fn handle_tools_call(
        &self,
        id: Option<Value>,
        params: Option<Value>,
        cancellation: CancellationToken,
    ) -> JsonRpcResponse {
        let call: CallToolParams = match parse_params(id.clone(), params, "tools/call") {
            Ok(p) => p,
            Err(response) => return response,
        };

        match self
            .registry
            .call_tool(&self.services, cancellation, &call.name, call.arguments)
            .await
        {
            Ok(result) => serialize_result(id, &result),
            Err(e) => JsonRpcResponse::error(id, e.jsonrpc_code(), e.message),
        }
    }

    /// Handle `prompts/get`: render the named prompt through the registry
    async fn handle_prompts_get(
        &self,
        id: Option<Value>,
        params: Option<Value>,
        cancellation: CancellationToken,
    ) -> JsonRpcResponse {
        let get: GetPromptParams = match parse_params(id.clone(), params, "prompts/get") {
            Ok(p) => p,
            Err(response) => return response,
        };

        match self
            .registry
            .get_prompt(&self.services, cancellation, &get.name, get.arguments)
            .await
        {
            Ok(result) => serialize_result(id, &result),
            Err(e) => JsonRpcResponse::error(id, e.jsonrpc_code(), e.message),
        }
    }

    /// Handle `resources/read`: resolve the URI through the registry
    async fn handle_resources_read(
        &self,
        id: Option<Value>,
        params: Option<Value>,
        cancellation: CancellationToken,
    ) -> JsonRpcResponse {
        let read: ReadResourceParams = match parse_params(id.clone(), params, "resources/read") {
            Ok(p) => p,
            Err(response) => return response,
        };

        match self
            .registry
            .read_resource(&self.services, cancellation, &read.uri)
            .await
        {
            Ok(result) => serialize_result(id, &result),
            Err(e) => JsonRpcResponse::error(id, e.jsonrpc_code(), e.message),
        }
    }
}

/// Deserialize method params, or build the invalid-params error response
fn parse_params<T: DeserializeOwned>(
    id: Option<Value>,
    params: Option<Value>,
    method: &str,
) -> Result<T, JsonRpcResponse> {
    match params {
        Some(p) => serde_json::from_value(p).map_err(|e| {
            JsonRpcResponse::error(id, INVALID_PARAMS, format!("Invalid params: {e}"))
        }),
        None => Err(JsonRpcResponse::error(
            id,
            INVALID_PARAMS,
            format!("Missing params for {method}"),
        )),
    }
}

/// Serialize a result payload into a success response, with error fallback
fn serialize_result<T: Serialize>(id: Option<Value>, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(val) => JsonRpcResponse::success(id, val),
        Err(e) => JsonRpcResponse::error(id, INTERNAL_ERROR, format!("Serialization error: {e}")),
    }
}

// ABOUTME: Capability registry and dispatcher for tools, prompts, and resources
// ABOUTME: Validates registrations eagerly and routes requests to bound handlers with envelope wrapping

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::binding::{ArgumentAdapter, BoundArguments, ParamSpec};
use crate::context::{CancellationToken, RequestContext, ServiceMap};
use crate::error::McpError;
use crate::protocol::{
    CallToolResult, GetPromptResult, Prompt, PromptMessage, ReadResourceResult,
    ResourceContents, ResourceDescriptor, ResourceTemplateDescriptor, ToolDefinition,
};
use crate::template::UriTemplate;

// ============================================================================
// Handler Shapes
// ============================================================================

/// Boxed future returned by capability handlers
pub type HandlerFuture<T> = Pin<Box<dyn Future<Output = Result<T, McpError>> + Send>>;

/// A registered tool handler
pub type ToolHandler =
    Arc<dyn Fn(RequestContext, BoundArguments) -> HandlerFuture<ToolOutput> + Send + Sync>;

/// A registered prompt handler
pub type PromptHandler =
    Arc<dyn Fn(RequestContext, BoundArguments) -> HandlerFuture<RenderedPrompt> + Send + Sync>;

/// A registered resource handler (static or templated)
pub type ResourceHandler =
    Arc<dyn Fn(RequestContext, BoundArguments) -> HandlerFuture<ResourceBody> + Send + Sync>;

/// Value produced by a tool handler, before envelope wrapping
#[derive(Debug, Clone)]
pub enum ToolOutput {
    /// Plain text payload
    Text(String),
    /// Structured payload, serialized to JSON text in the envelope
    Json(Value),
}

impl From<String> for ToolOutput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for ToolOutput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl ToolOutput {
    /// Wrap this output into the tool-call result envelope
    fn into_call_result(self) -> CallToolResult {
        match self {
            Self::Text(text) => CallToolResult::text(text),
            Self::Json(value) => CallToolResult::text(value.to_string()),
        }
    }
}

/// Value produced by a prompt handler, before envelope wrapping
#[derive(Debug, Clone)]
pub struct RenderedPrompt {
    /// Prompt description surfaced alongside the messages
    pub description: Option<String>,
    /// Rendered role-tagged messages, in order
    pub messages: Vec<PromptMessage>,
}

/// Value produced by a resource handler, before envelope wrapping
#[derive(Debug, Clone)]
pub enum ResourceBody {
    /// Inline text content
    Text(String),
    /// Binary content, base64-encoded in the envelope
    Blob(Vec<u8>),
}

impl ResourceBody {
    /// Wrap this body into a content block for the requested URI
    fn into_contents(self, uri: &str, mime_type: Option<&String>) -> ResourceContents {
        match self {
            Self::Text(text) => ResourceContents {
                uri: uri.to_owned(),
                mime_type: mime_type.cloned(),
                text: Some(text),
                blob: None,
            },
            Self::Blob(bytes) => ResourceContents {
                uri: uri.to_owned(),
                mime_type: mime_type.cloned(),
                text: None,
                blob: Some(BASE64.encode(bytes)),
            },
        }
    }
}

// ============================================================================
// Registration Specs
// ============================================================================

/// Declarative tool registration: identity, parameter schema, handler
pub struct ToolSpec {
    name: String,
    description: String,
    params: Vec<ParamSpec>,
    handler: Option<ToolHandler>,
}

impl ToolSpec {
    /// Start a tool registration
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            params: Vec::new(),
            handler: None,
        }
    }

    /// Declare a parameter
    #[must_use]
    pub fn with_param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    /// Attach the handler invoked after argument binding
    #[must_use]
    pub fn with_handler<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(RequestContext, BoundArguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ToolOutput, McpError>> + Send + 'static,
    {
        self.handler = Some(Arc::new(move |ctx, args| Box::pin(handler(ctx, args))));
        self
    }
}

/// Declarative prompt registration: identity, argument schema, handler
pub struct PromptSpec {
    name: String,
    description: Option<String>,
    params: Vec<ParamSpec>,
    handler: Option<PromptHandler>,
}

impl PromptSpec {
    /// Start a prompt registration
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            params: Vec::new(),
            handler: None,
        }
    }

    /// Set the advertised description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Declare an input variable
    #[must_use]
    pub fn with_param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    /// Attach the handler invoked after argument binding
    #[must_use]
    pub fn with_handler<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(RequestContext, BoundArguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<RenderedPrompt, McpError>> + Send + 'static,
    {
        self.handler = Some(Arc::new(move |ctx, args| Box::pin(handler(ctx, args))));
        self
    }
}

/// Declarative static-resource registration: exact URI, metadata, handler
pub struct ResourceSpec {
    uri: String,
    name: String,
    description: Option<String>,
    mime_type: Option<String>,
    handler: Option<ResourceHandler>,
}

impl ResourceSpec {
    /// Start a static-resource registration
    pub fn new(uri: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            name: name.into(),
            description: None,
            mime_type: None,
            handler: None,
        }
    }

    /// Register fixed text content for the URI
    pub fn static_text(
        uri: impl Into<String>,
        name: impl Into<String>,
        mime_type: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        let body = body.into();
        Self::new(uri, name)
            .with_mime_type(mime_type)
            .with_handler(move |_ctx, _args| {
                let body = body.clone();
                async move { Ok(ResourceBody::Text(body)) }
            })
    }

    /// Register fixed binary content for the URI
    pub fn static_blob(
        uri: impl Into<String>,
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self::new(uri, name)
            .with_mime_type(mime_type)
            .with_handler(move |_ctx, _args| {
                let bytes = bytes.clone();
                async move { Ok(ResourceBody::Blob(bytes)) }
            })
    }

    /// Set the advertised description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the declared MIME type
    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Attach the handler producing the content
    #[must_use]
    pub fn with_handler<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(RequestContext, BoundArguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ResourceBody, McpError>> + Send + 'static,
    {
        self.handler = Some(Arc::new(move |ctx, args| Box::pin(handler(ctx, args))));
        self
    }
}

/// Declarative templated-resource registration: URI template, metadata, handler
///
/// Template captures arrive in the handler's bound arguments, one required
/// text parameter per placeholder.
pub struct ResourceTemplateSpec {
    template: String,
    name: String,
    description: Option<String>,
    mime_type: Option<String>,
    handler: Option<ResourceHandler>,
}

impl ResourceTemplateSpec {
    /// Start a templated-resource registration
    pub fn new(template: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            name: name.into(),
            description: None,
            mime_type: None,
            handler: None,
        }
    }

    /// Set the advertised description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the declared MIME type
    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Attach the handler producing the content
    #[must_use]
    pub fn with_handler<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(RequestContext, BoundArguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ResourceBody, McpError>> + Send + 'static,
    {
        self.handler = Some(Arc::new(move |ctx, args| Box::pin(handler(ctx, args))));
        self
    }
}

// ============================================================================
// Registry
// ============================================================================

struct ToolEntry {
    definition: ToolDefinition,
    adapter: ArgumentAdapter,
    handler: ToolHandler,
}

struct PromptEntry {
    definition: Prompt,
    adapter: ArgumentAdapter,
    handler: PromptHandler,
}

struct ResourceEntry {
    descriptor: ResourceDescriptor,
    handler: ResourceHandler,
}

struct TemplateEntry {
    descriptor: ResourceTemplateDescriptor,
    template: UriTemplate,
    adapter: ArgumentAdapter,
    handler: ResourceHandler,
}

/// Registry of all capabilities a server exposes
///
/// Registration happens once at startup and validates eagerly: duplicate
/// keys, malformed templates, and missing handlers are Configuration errors
/// that never reach dispatch. Matchers and adapters are derived at
/// registration, so dispatch is read-only and takes `&self`; concurrent
/// requests need no locking on the registry.
#[derive(Default)]
pub struct CapabilityRegistry {
    tools: HashMap<String, ToolEntry>,
    prompts: HashMap<String, PromptEntry>,
    static_resources: HashMap<String, ResourceEntry>,
    resource_templates: Vec<TemplateEntry>,
}

impl CapabilityRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error on a duplicate name, duplicate
    /// parameter names, or a spec with no handler.
    pub fn register_tool(&mut self, spec: ToolSpec) -> Result<(), McpError> {
        let ToolSpec {
            name,
            description,
            params,
            handler,
        } = spec;
        let handler = handler
            .ok_or_else(|| McpError::configuration(format!("Tool '{name}' has no handler")))?;
        if self.tools.contains_key(&name) {
            return Err(McpError::configuration(format!(
                "Duplicate tool name: {name}"
            )));
        }
        let adapter = ArgumentAdapter::new(params)?;
        let definition = ToolDefinition {
            name: name.clone(),
            description,
            input_schema: adapter.input_schema(),
        };
        debug!(tool = %name, "Registered tool");
        self.tools.insert(
            name,
            ToolEntry {
                definition,
                adapter,
                handler,
            },
        );
        Ok(())
    }

    /// Register a prompt
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error on a duplicate name, duplicate input
    /// variables, or a spec with no handler.
    pub fn register_prompt(&mut self, spec: PromptSpec) -> Result<(), McpError> {
        let PromptSpec {
            name,
            description,
            params,
            handler,
        } = spec;
        let handler = handler
            .ok_or_else(|| McpError::configuration(format!("Prompt '{name}' has no handler")))?;
        if self.prompts.contains_key(&name) {
            return Err(McpError::configuration(format!(
                "Duplicate prompt name: {name}"
            )));
        }
        let adapter = ArgumentAdapter::new(params)?;
        let definition = Prompt {
            name: name.clone(),
            description,
            arguments: adapter.prompt_arguments(),
        };
        debug!(prompt = %name, "Registered prompt");
        self.prompts.insert(
            name,
            PromptEntry {
                definition,
                adapter,
                handler,
            },
        );
        Ok(())
    }

    /// Register a static resource with an exact URI
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error on a duplicate URI or a spec with no
    /// handler.
    pub fn register_resource(&mut self, spec: ResourceSpec) -> Result<(), McpError> {
        let ResourceSpec {
            uri,
            name,
            description,
            mime_type,
            handler,
        } = spec;
        let handler = handler
            .ok_or_else(|| McpError::configuration(format!("Resource '{uri}' has no handler")))?;
        if self.static_resources.contains_key(&uri) {
            return Err(McpError::configuration(format!(
                "Duplicate resource URI: {uri}"
            )));
        }
        let descriptor = ResourceDescriptor {
            uri: uri.clone(),
            name,
            description,
            mime_type,
        };
        debug!(uri = %uri, "Registered static resource");
        self.static_resources
            .insert(uri, ResourceEntry { descriptor, handler });
        Ok(())
    }

    /// Register a templated resource
    ///
    /// The template is compiled here; malformed templates never enter the
    /// dispatch path. Later reads scan templates in registration order, so
    /// when two templates could match the same URI the one registered first
    /// wins.
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error on a duplicate template, a malformed
    /// template, or a spec with no handler.
    pub fn register_resource_template(
        &mut self,
        spec: ResourceTemplateSpec,
    ) -> Result<(), McpError> {
        let ResourceTemplateSpec {
            template,
            name,
            description,
            mime_type,
            handler,
        } = spec;
        let handler = handler.ok_or_else(|| {
            McpError::configuration(format!("Resource template '{template}' has no handler"))
        })?;
        if self
            .resource_templates
            .iter()
            .any(|e| e.template.as_str() == template)
        {
            return Err(McpError::configuration(format!(
                "Duplicate resource template: {template}"
            )));
        }
        let compiled = UriTemplate::compile(&template)?;
        let params = compiled
            .variables()
            .iter()
            .map(|v| ParamSpec::required(v.clone(), format!("Value captured for '{{{v}}}'")))
            .collect();
        let adapter = ArgumentAdapter::new(params)?;
        let descriptor = ResourceTemplateDescriptor {
            uri_template: template.clone(),
            name,
            description,
            mime_type,
        };
        debug!(template = %template, "Registered resource template");
        self.resource_templates.push(TemplateEntry {
            descriptor,
            template: compiled,
            adapter,
            handler,
        });
        Ok(())
    }

    /// Whether any tools are registered
    #[must_use]
    pub fn has_tools(&self) -> bool {
        !self.tools.is_empty()
    }

    /// Whether any prompts are registered
    #[must_use]
    pub fn has_prompts(&self) -> bool {
        !self.prompts.is_empty()
    }

    /// Whether any resources (static or templated) are registered
    #[must_use]
    pub fn has_resources(&self) -> bool {
        !self.static_resources.is_empty() || !self.resource_templates.is_empty()
    }

    /// Tool definitions, sorted by name for stable listings
    #[must_use]
    pub fn list_tools(&self) -> Vec<ToolDefinition> {
        let mut tools: Vec<ToolDefinition> = self
            .tools
            .values()
            .map(|entry| entry.definition.clone())
            .collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    /// Prompt definitions, sorted by name for stable listings
    #[must_use]
    pub fn list_prompts(&self) -> Vec<Prompt> {
        let mut prompts: Vec<Prompt> = self
            .prompts
            .values()
            .map(|entry| entry.definition.clone())
            .collect();
        prompts.sort_by(|a, b| a.name.cmp(&b.name));
        prompts
    }

    /// Static resource descriptors, sorted by URI for stable listings
    #[must_use]
    pub fn list_resources(&self) -> Vec<ResourceDescriptor> {
        let mut resources: Vec<ResourceDescriptor> = self
            .static_resources
            .values()
            .map(|entry| entry.descriptor.clone())
            .collect();
        resources.sort_by(|a, b| a.uri.cmp(&b.uri));
        resources
    }

    /// Resource template descriptors, in registration (dispatch) order
    #[must_use]
    pub fn list_resource_templates(&self) -> Vec<ResourceTemplateDescriptor> {
        self.resource_templates
            .iter()
            .map(|entry| entry.descriptor.clone())
            .collect()
    }

    /// Dispatch a tool call: bind arguments, invoke, wrap the envelope
    ///
    /// Handler failures surface as the protocol's in-band `isError` result;
    /// unknown names and binding failures are protocol-level errors.
    ///
    /// # Errors
    ///
    /// `NotFound` when no tool has the name; `Binding` when required
    /// arguments are missing or uncoercible.
    pub async fn call_tool(
        &self,
        services: &Arc<ServiceMap>,
        cancellation: CancellationToken,
        name: &str,
        arguments: Option<Map<String, Value>>,
    ) -> Result<CallToolResult, McpError> {
        let entry = self
            .tools
            .get(name)
            .ok_or_else(|| McpError::not_found(format!("Unknown tool: {name}")))?;
        let supplied = arguments.unwrap_or_default();
        let bound = entry.adapter.bind(name, &supplied)?;
        let ctx = RequestContext::new(
            Arc::clone(services),
            cancellation,
            "tools/call",
            name,
            supplied,
        );
        debug!(tool = name, argument_count = bound.len(), "Dispatching tool call");
        match (entry.handler)(ctx, bound).await {
            Ok(output) => Ok(output.into_call_result()),
            Err(e) => {
                warn!(tool = name, error = %e, "Tool handler failed");
                Ok(CallToolResult::error(format!(
                    "Tool '{name}' failed: {}",
                    e.message
                )))
            }
        }
    }

    /// Dispatch a prompt render: bind arguments, invoke, wrap the envelope
    ///
    /// # Errors
    ///
    /// `NotFound` when no prompt has the name; `Binding` when required
    /// input variables are missing; handler failures propagate as-is.
    pub async fn get_prompt(
        &self,
        services: &Arc<ServiceMap>,
        cancellation: CancellationToken,
        name: &str,
        arguments: Option<Map<String, Value>>,
    ) -> Result<GetPromptResult, McpError> {
        let entry = self
            .prompts
            .get(name)
            .ok_or_else(|| McpError::not_found(format!("Unknown prompt: {name}")))?;
        let supplied = arguments.unwrap_or_default();
        let bound = entry.adapter.bind(name, &supplied)?;
        let ctx = RequestContext::new(
            Arc::clone(services),
            cancellation,
            "prompts/get",
            name,
            supplied,
        );
        debug!(prompt = name, "Dispatching prompt render");
        let rendered = (entry.handler)(ctx, bound).await?;
        Ok(GetPromptResult {
            description: rendered.description,
            messages: rendered.messages,
        })
    }

    /// Dispatch a resource read for a concrete URI
    ///
    /// Static resources are matched first by exact URI; templated resources
    /// are then scanned in registration order and the first match wins, its
    /// captures merged into the argument mapping before binding.
    ///
    /// # Errors
    ///
    /// `NotFound` when nothing matches the URI; handler failures propagate
    /// as-is.
    pub async fn read_resource(
        &self,
        services: &Arc<ServiceMap>,
        cancellation: CancellationToken,
        uri: &str,
    ) -> Result<ReadResourceResult, McpError> {
        if let Some(entry) = self.static_resources.get(uri) {
            debug!(uri, "Dispatching static resource read");
            let ctx = RequestContext::new(
                Arc::clone(services),
                cancellation,
                "resources/read",
                uri,
                Map::new(),
            );
            let body = (entry.handler)(ctx, BoundArguments::none(uri)).await?;
            return Ok(ReadResourceResult {
                contents: vec![body.into_contents(uri, entry.descriptor.mime_type.as_ref())],
            });
        }

        for entry in &self.resource_templates {
            let Some(captures) = entry.template.match_uri(uri) else {
                continue;
            };
            let mut supplied = Map::new();
            for (name, value) in captures {
                supplied.insert(name, Value::String(value));
            }
            debug!(
                uri,
                template = entry.template.as_str(),
                "Dispatching templated resource read"
            );
            let bound = entry.adapter.bind(entry.template.as_str(), &supplied)?;
            let ctx = RequestContext::new(
                Arc::clone(services),
                cancellation,
                "resources/read",
                uri,
                supplied,
            );
            let body = (entry.handler)(ctx, bound).await?;
            return Ok(ReadResourceResult {
                contents: vec![body.into_contents(uri, entry.descriptor.mime_type.as_ref())],
            });
        }

        Err(McpError::not_found(format!(
            "No resource matches URI: {uri}"
        )))
    }
}

// ABOUTME: MCP capability-dispatch library serving tools, prompts, and resources over JSON-RPC
// ABOUTME: Re-exports the registry, binding, transport, and client-side sampling building blocks
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

//! # Capstan - MCP Capability Dispatch
//!
//! Library for building Model Context Protocol servers and clients. A
//! [`CapabilityRegistry`] holds explicitly registered tools, prompts, and
//! resources; an [`McpServer`] dispatches JSON-RPC requests against it over
//! a stdio or HTTP transport. The [`Client`] side speaks the same protocol
//! and can bridge server-initiated `sampling/createMessage` requests to an
//! installed completion policy.
//!
//! Registration is eager: parameter lists, URI templates, and prompt
//! templates are validated and compiled when registered, so dispatch is
//! read-only and lock-free.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use capstan::protocol::ServerInfo;
//! use capstan::{
//!     CapabilityRegistry, McpServer, McpTransport, ParamSpec, ServiceMap, StdioTransport,
//!     ToolOutput, ToolSpec,
//! };
//!
//! # async fn example() -> Result<(), capstan::McpError> {
//! let mut registry = CapabilityRegistry::new();
//! registry.register_tool(
//!     ToolSpec::new("get_weather_for_city", "Current weather conditions for a city")
//!         .with_param(ParamSpec::required("cityName", "The name of the city"))
//!         .with_handler(|_ctx, args| async move {
//!             let city = args.require_text("cityName")?.to_owned();
//!             Ok(ToolOutput::Text(format!("60 and rainy in {city}")))
//!         }),
//! )?;
//!
//! let server = Arc::new(McpServer::new(
//!     registry,
//!     ServiceMap::new(),
//!     ServerInfo::new("weather-server", "0.3.1"),
//! ));
//! StdioTransport.serve(server).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`protocol`] - JSON-RPC and MCP wire types, error codes
//! - [`error`] - Error categories and their JSON-RPC code mapping
//! - [`template`] - URI templates with `{name}` placeholders
//! - [`binding`] - Declared parameter lists and argument coercion
//! - [`context`] - Per-request context, service injection, cancellation
//! - [`registry`] - Capability registration and dispatch
//! - [`prompt`] - Handlebars-style prompt template configurations
//! - [`server`] - Protocol front-end mapping methods onto the registry
//! - [`transport`] - Stdio and HTTP server transports
//! - [`client`] - MCP client with the sampling bridge

/// JSON-RPC and MCP wire types shared by the server and client sides
pub mod protocol;

/// Argument binding between wire maps and declared parameter lists
pub mod binding;
/// MCP client connection, typed calls, and the sampling bridge
pub mod client;
/// Request context, type-keyed service map, and cancellation tokens
pub mod context;
/// Error categories for registration, dispatch, and transport failures
pub mod error;
/// Prompt template configurations rendered through Tera
pub mod prompt;
/// Capability registry and dispatcher
pub mod registry;
/// MCP server front-end over a capability registry
pub mod server;
/// URI template compilation and matching
pub mod template;
/// Server transports: stdio and HTTP
pub mod transport;

// Re-export the main building blocks for ergonomic access
pub use binding::{ArgumentAdapter, BoundArguments, ParamKind, ParamSpec};
pub use client::{Client, ClientOptions, ProgressSink, SamplingHandler, ServerCapabilityFlags};
pub use context::{CancellationToken, RequestContext, ServiceMap};
pub use error::{ErrorKind, McpError};
pub use prompt::PromptTemplate;
pub use registry::{
    CapabilityRegistry, PromptSpec, RenderedPrompt, ResourceBody, ResourceSpec,
    ResourceTemplateSpec, ToolOutput, ToolSpec,
};
pub use server::McpServer;
pub use template::UriTemplate;
pub use transport::{build_router, HttpTransport, McpTransport, StdioTransport};

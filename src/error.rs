// ABOUTME: Error type for capability registration, dispatch, and transport operations
// ABOUTME: Categorizes failures and maps dispatch errors onto JSON-RPC error codes

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::fmt;

use crate::protocol;

/// Error type for capability-dispatch operations
#[derive(Debug, Clone)]
pub struct McpError {
    /// Error category
    pub kind: ErrorKind,
    /// Human-readable error message
    pub message: String,
}

/// Categories of errors produced by the dispatch engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid registration: duplicate key, malformed template, bad prompt config
    Configuration,
    /// No capability matches the requested name or URI
    NotFound,
    /// Argument binding failure: missing required argument or uncoercible value
    Binding,
    /// The invoked handler itself failed
    Handler,
    /// Malformed or unexpected protocol traffic
    Protocol,
    /// Connection-level I/O failure
    Transport,
}

impl McpError {
    /// Create a configuration error (registration-time, never reaches dispatch)
    pub fn configuration(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Configuration,
            message: message.into(),
        }
    }

    /// Create a not-found error for an unknown capability key
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::NotFound,
            message: message.into(),
        }
    }

    /// Create a binding error identifying the offending capability
    pub fn binding(capability: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Binding,
            message: format!("{}: {}", capability.into(), message.into()),
        }
    }

    /// Create a handler failure error
    pub fn handler(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Handler,
            message: message.into(),
        }
    }

    /// Create a protocol error (malformed envelope, version mismatch)
    pub fn protocol(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Protocol,
            message: message.into(),
        }
    }

    /// Create a transport error (connection-level I/O failure)
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Transport,
            message: message.into(),
        }
    }

    /// Map this error onto the JSON-RPC error code a dispatch response carries
    #[must_use]
    pub fn jsonrpc_code(&self) -> i32 {
        match self.kind {
            ErrorKind::NotFound => protocol::RESOURCE_NOT_FOUND,
            ErrorKind::Binding => protocol::INVALID_PARAMS,
            ErrorKind::Protocol => protocol::INVALID_REQUEST,
            ErrorKind::Configuration | ErrorKind::Handler | ErrorKind::Transport => {
                protocol::INTERNAL_ERROR
            }
        }
    }

    /// Rebuild an error from a JSON-RPC error object received off the wire
    #[must_use]
    pub fn from_jsonrpc(code: i32, message: impl Into<String>) -> Self {
        let kind = match code {
            protocol::RESOURCE_NOT_FOUND | protocol::METHOD_NOT_FOUND => ErrorKind::NotFound,
            protocol::INVALID_PARAMS => ErrorKind::Binding,
            protocol::INVALID_REQUEST | protocol::PARSE_ERROR => ErrorKind::Protocol,
            _ => ErrorKind::Handler,
        };
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for McpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for McpError {}

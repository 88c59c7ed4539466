// ABOUTME: Per-request dispatch context with injected services and cooperative cancellation
// ABOUTME: Provides a type-keyed read-only service map and a watch-based cancellation token

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::watch;

use crate::error::McpError;

/// Type-keyed map of shared process dependencies
///
/// Built once at startup and injected read-only into every request context.
/// Handlers resolve dependencies by type, never by ambient lookup, and no
/// handler can mutate the map.
#[derive(Default)]
pub struct ServiceMap {
    entries: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl ServiceMap {
    /// Create an empty service map
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a service, consuming and returning the map (builder style)
    #[must_use]
    pub fn with<T: Send + Sync + 'static>(mut self, service: T) -> Self {
        self.insert(service);
        self
    }

    /// Add a service, replacing any previous entry of the same type
    pub fn insert<T: Send + Sync + 'static>(&mut self, service: T) {
        self.entries.insert(TypeId::of::<T>(), Arc::new(service));
    }

    /// Resolve a service by type
    #[must_use]
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.entries
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|entry| entry.downcast::<T>().ok())
    }

    /// Number of registered services
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no services are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for ServiceMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceMap")
            .field("len", &self.entries.len())
            .finish()
    }
}

/// Cooperative cancellation signal shared between a request and its handler
///
/// Cloning shares the same signal. Long-running handlers observe it via
/// `is_cancelled` or by awaiting `cancelled`.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    shared: Arc<watch::Sender<bool>>,
}

impl CancellationToken {
    /// Create a token in the non-cancelled state
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            shared: Arc::new(tx),
        }
    }

    /// Fire the cancellation signal
    ///
    /// Idempotent: later calls have no further effect.
    pub fn cancel(&self) {
        self.shared.send_replace(true);
    }

    /// Whether cancellation has been requested
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.shared.borrow()
    }

    /// Wait until cancellation is requested
    pub async fn cancelled(&self) {
        let mut rx = self.shared.subscribe();
        // The sender lives inside self, so wait_for cannot observe a closed
        // channel while this future is polled.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-request dispatch context handed to every handler
///
/// Created when a request is resolved against the registry and dropped when
/// its response is produced. Carries the raw request parameters, the shared
/// service map, and the request's cancellation signal.
#[derive(Debug, Clone)]
pub struct RequestContext {
    services: Arc<ServiceMap>,
    cancellation: CancellationToken,
    method: String,
    capability: String,
    raw_arguments: Map<String, Value>,
}

impl RequestContext {
    /// Build a request context
    #[must_use]
    pub fn new(
        services: Arc<ServiceMap>,
        cancellation: CancellationToken,
        method: impl Into<String>,
        capability: impl Into<String>,
        raw_arguments: Map<String, Value>,
    ) -> Self {
        Self {
            services,
            cancellation,
            method: method.into(),
            capability: capability.into(),
            raw_arguments,
        }
    }

    /// Resolve a shared service by type
    #[must_use]
    pub fn service<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.services.get::<T>()
    }

    /// Resolve a shared service that the handler cannot run without
    ///
    /// # Errors
    ///
    /// Returns a `Handler` error naming the missing service type.
    pub fn require_service<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, McpError> {
        self.services.get::<T>().ok_or_else(|| {
            McpError::handler(format!("Service not available: {}", type_name::<T>()))
        })
    }

    /// The cancellation signal for this request
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Whether this request has been cancelled
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// The protocol method being dispatched (e.g. `tools/call`)
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The capability key being dispatched (tool/prompt name or URI)
    #[must_use]
    pub fn capability(&self) -> &str {
        &self.capability
    }

    /// The raw wire argument map, before binding
    ///
    /// Bound handlers normally use their `BoundArguments`; the raw map is
    /// available for handlers that inspect undeclared extras.
    #[must_use]
    pub fn raw_arguments(&self) -> &Map<String, Value> {
        &self.raw_arguments
    }
}

//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use axum::extract::ws::WebSocket;

use crate::config::RelayConfig;
use crate::domain::WorkerRegistry;

/// Registry of workers connected over WebSockets.
pub type SharedRegistry = Arc<WorkerRegistry<WebSocket>>;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Registered workers and their availability.
    pub registry: SharedRegistry,
    /// Broker configuration.
    pub config: Arc<RelayConfig>,
}

impl AppState {
    /// Builds state with an empty registry using the configured policy.
    #[must_use]
    pub fn new(config: RelayConfig) -> Self {
        Self {
            registry: Arc::new(WorkerRegistry::new(config.selection_policy)),
            config: Arc::new(config),
        }
    }
}

//! Worker registration endpoint.

use std::sync::Arc;

use axum::Router;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;

use crate::app_state::AppState;
use crate::auth::token_matches;
use crate::error::BrokerError;

/// Longest worker name accepted, in bytes.
pub const MAX_WORKER_NAME_LEN: usize = 64;

/// `GET /registerCompute/{name}/{token}` — Admit a compute worker.
///
/// The token is checked before anything else, including the upgrade
/// headers, so a bad token is always answered with `401`. On success the
/// upgraded socket is handed to the registry and the worker becomes
/// available to clients.
///
/// # Errors
///
/// Returns [`BrokerError::Unauthorized`] on a token mismatch and
/// [`BrokerError::InvalidRequest`] on a blank or oversized name.
pub async fn register_worker(
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    Path((name, token)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<Response, BrokerError> {
    tracing::debug!(name = %name, "worker registration attempt");

    if !token_matches(&token, &state.config.worker_token) {
        tracing::warn!(name = %name, "worker registration rejected: bad token");
        return Err(BrokerError::Unauthorized);
    }
    validate_name(&name)?;
    tracing::debug!(name = %name, "worker authenticated");

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => {
            tracing::warn!(name = %name, %rejection, "worker registration is not a websocket upgrade");
            return Ok(rejection.into_response());
        }
    };

    let registry = Arc::clone(&state.registry);
    Ok(ws
        .on_failed_upgrade({
            let name = name.clone();
            move |err| tracing::warn!(name = %name, %err, "worker handshake failed")
        })
        .on_upgrade(move |socket| async move {
            registry.register(&name, socket);
        }))
}

fn validate_name(name: &str) -> Result<(), BrokerError> {
    if name.trim().is_empty() {
        return Err(BrokerError::InvalidRequest(
            "worker name must not be blank".to_string(),
        ));
    }
    if name.len() > MAX_WORKER_NAME_LEN {
        return Err(BrokerError::InvalidRequest(format!(
            "worker name exceeds {MAX_WORKER_NAME_LEN} bytes"
        )));
    }
    Ok(())
}

/// Worker registration routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/registerCompute/{name}/{token}", get(register_worker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_name() {
        assert!(validate_name("gpu-node-1").is_ok());
    }

    #[test]
    fn rejects_blank_name() {
        assert!(matches!(
            validate_name("   "),
            Err(BrokerError::InvalidRequest(_))
        ));
    }

    #[test]
    fn rejects_oversized_name() {
        let name = "w".repeat(MAX_WORKER_NAME_LEN + 1);
        assert!(validate_name(&name).is_err());
        assert!(validate_name(&"w".repeat(MAX_WORKER_NAME_LEN)).is_ok());
    }
}

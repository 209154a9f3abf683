//! Axum WebSocket upgrade handler for client work channels.

use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::response::Response;

use super::session::{RelaySession, SessionSettings, SessionState};
use crate::app_state::AppState;
use crate::domain::WorkerLease;
use crate::error::BrokerError;

/// `GET /inputStream` — Upgrade a client connection into a relay session.
///
/// A worker is leased before the handshake completes so that a client can
/// be refused with `503 Service Unavailable` when none is free. If the
/// handshake then fails, dropping the unused lease releases the worker.
///
/// # Errors
///
/// Returns [`BrokerError::NoCapacity`] when no worker is free.
pub async fn input_stream_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> Result<Response, BrokerError> {
    let session_id = uuid::Uuid::new_v4();
    tracing::debug!(%session_id, state = %SessionState::Acquiring, "client connecting");

    let Some(lease) = WorkerLease::acquire(&state.registry) else {
        tracing::warn!(%session_id, "rejecting client; no workers available");
        return Err(BrokerError::NoCapacity);
    };
    tracing::info!(%session_id, worker_id = %lease.id(), name = %lease.entry().name, "worker assigned");

    let settings = SessionSettings::from(state.config.as_ref());
    Ok(ws
        .on_failed_upgrade(move |err| {
            tracing::warn!(%session_id, %err, "client handshake failed");
        })
        .on_upgrade(move |socket| RelaySession::new(session_id, socket, lease, settings).run()))
}

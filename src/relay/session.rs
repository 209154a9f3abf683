//! Relay session state machine.
//!
//! One [`RelaySession`] runs per client connection. It holds a
//! [`WorkerLease`] for its whole lifetime and alternates strictly between
//! reading one client frame and relaying one worker reply: the reply to
//! request *n* is written back before request *n + 1* is read.
//!
//! ```text
//! Acquiring ─► Connecting ─► Streaming ─┬─► Closing ─► Terminated
//!     │                                 │
//!     └─ no worker: 503                 └─ client closed / idle / I/O error
//! ```
//!
//! `Acquiring` happens in the upgrade handler, before the handshake is
//! completed, so a client can be refused with a plain HTTP status.

use std::fmt;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket, close_code};
use futures_util::{SinkExt, StreamExt};
use tokio::time::{Instant, timeout, timeout_at};
use uuid::Uuid;

use super::error::RelayError;
use crate::config::RelayConfig;
use crate::domain::WorkerLease;

/// Text payload sent to a worker when a session ends, telling it to drop
/// any per-client state.
pub const RESET_SIGNAL: &str = "reset";

/// Upper bound on delivering [`RESET_SIGNAL`].
const RESET_TIMEOUT: Duration = Duration::from_secs(1);

/// Lifecycle phase of a relay session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Looking for a free worker.
    Acquiring,
    /// Completing the client WebSocket handshake.
    Connecting,
    /// Relaying frames between client and worker.
    Streaming,
    /// Resetting the worker and settling the lease.
    Closing,
    /// Session finished.
    Terminated,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Acquiring => "acquiring",
            Self::Connecting => "connecting",
            Self::Streaming => "streaming",
            Self::Closing => "closing",
            Self::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Timeouts applied by a session.
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    /// Longest wait for the next client frame.
    pub idle_timeout: Duration,
    /// Longest wait for a worker reply; `None` waits indefinitely.
    pub worker_reply_timeout: Option<Duration>,
}

impl From<&RelayConfig> for SessionSettings {
    fn from(config: &RelayConfig) -> Self {
        Self {
            idle_timeout: config.client_idle_timeout,
            worker_reply_timeout: config.worker_reply_timeout,
        }
    }
}

/// Per-client relay between one client socket and one leased worker.
#[derive(Debug)]
pub struct RelaySession {
    id: Uuid,
    client: WebSocket,
    lease: WorkerLease<WebSocket>,
    settings: SessionSettings,
    state: SessionState,
    round_trips: u64,
}

impl RelaySession {
    /// Creates a session for an upgraded client socket and an acquired
    /// worker lease.
    #[must_use]
    pub fn new(
        id: Uuid,
        client: WebSocket,
        lease: WorkerLease<WebSocket>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            id,
            client,
            lease,
            settings,
            state: SessionState::Connecting,
            round_trips: 0,
        }
    }

    /// Runs the session to completion.
    ///
    /// Every exit path goes through `Closing`: the worker receives
    /// [`RESET_SIGNAL`], then is released or evicted, then the client
    /// socket is closed.
    pub async fn run(mut self) {
        self.transition(SessionState::Streaming);
        let exit = self.stream().await;

        self.transition(SessionState::Closing);
        let disposition = exit.disposition();
        if exit.is_worker_fault() {
            tracing::warn!(
                session_id = %self.id,
                worker_id = %self.lease.id(),
                error = %exit,
                "worker failed; evicting"
            );
        } else {
            tracing::info!(
                session_id = %self.id,
                worker_id = %self.lease.id(),
                reason = %exit,
                "client session ending"
            );
        }

        self.reset_worker().await;

        let Self {
            id,
            mut client,
            lease,
            round_trips,
            ..
        } = self;
        let worker_id = lease.id().clone();
        lease.settle(disposition);
        let _ = SinkExt::close(&mut client).await;

        tracing::info!(
            session_id = %id,
            %worker_id,
            round_trips,
            ?disposition,
            state = %SessionState::Terminated,
            "session terminated"
        );
    }

    fn transition(&mut self, next: SessionState) {
        tracing::debug!(
            session_id = %self.id,
            from = %self.state,
            to = %next,
            "session state change"
        );
        self.state = next;
    }

    /// Relays request/reply pairs until something ends the session.
    async fn stream(&mut self) -> RelayError {
        let entry = std::sync::Arc::clone(self.lease.entry());
        let mut worker = entry.connection.lock().await;

        loop {
            let started = Instant::now();
            let deadline = idle_deadline(started, self.settings.idle_timeout);
            let request = match self.next_client_text(deadline).await {
                Ok(text) => text,
                Err(exit) => return exit,
            };
            let client_read = started.elapsed();

            let worker_write_started = Instant::now();
            self.lease.set_in_flight(true);
            let payload = Bytes::copy_from_slice(request.as_str().as_bytes());
            if let Err(err) = worker.send(Message::Binary(payload)).await {
                return RelayError::WorkerWrite(err);
            }
            let worker_write = worker_write_started.elapsed();

            let compute_started = Instant::now();
            let reply = match read_worker_reply(&mut worker, self.settings.worker_reply_timeout)
                .await
            {
                Ok(reply) => reply,
                Err(exit) => return exit,
            };
            self.lease.set_in_flight(false);
            let compute = compute_started.elapsed();

            let client_write_started = Instant::now();
            if let Err(err) = self.client.send(Message::Text(reply.into())).await {
                return RelayError::ClientWrite(err);
            }
            let client_write = client_write_started.elapsed();

            self.round_trips = self.round_trips.saturating_add(1);
            tracing::debug!(
                session_id = %self.id,
                worker_id = %self.lease.id(),
                total = ?started.elapsed(),
                ?client_read,
                ?worker_write,
                ?compute,
                ?client_write,
                "round trip relayed"
            );
        }
    }

    /// Waits for the next client text frame, skipping ping/pong.
    ///
    /// Control frames do not extend `deadline`. When it passes, the client
    /// is sent a close frame. `None` waits indefinitely.
    async fn next_client_text(
        &mut self,
        deadline: Option<Instant>,
    ) -> Result<Utf8Bytes, RelayError> {
        loop {
            let next = match deadline {
                Some(deadline) => timeout_at(deadline, self.client.next()).await,
                None => Ok(self.client.next().await),
            };
            let Ok(frame) = next else {
                tracing::info!(session_id = %self.id, "closing client connection due to idle timeout");
                let close = CloseFrame {
                    code: close_code::NORMAL,
                    reason: Utf8Bytes::from_static("idle timeout"),
                };
                let _ = self.client.send(Message::Close(Some(close))).await;
                return Err(RelayError::IdleTimeout(self.settings.idle_timeout));
            };

            match frame {
                Some(Ok(Message::Text(text))) => return Ok(text),
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                Some(Ok(Message::Binary(_))) => return Err(RelayError::InvalidFrame("binary")),
                Some(Ok(Message::Close(_))) | None => return Err(RelayError::ClientClosed),
                Some(Err(err)) => return Err(RelayError::ClientIo(err)),
            }
        }
    }

    async fn reset_worker(&mut self) {
        let mut worker = self.lease.entry().connection.lock().await;
        match timeout(RESET_TIMEOUT, worker.send(Message::text(RESET_SIGNAL))).await {
            Ok(Ok(())) => {
                tracing::debug!(worker_id = %self.lease.id(), "reset signal sent");
            }
            Ok(Err(err)) => {
                tracing::debug!(worker_id = %self.lease.id(), %err, "reset signal not delivered");
            }
            Err(_) => {
                tracing::debug!(worker_id = %self.lease.id(), "reset signal timed out");
            }
        }
    }
}

/// Returns when a wait for the next client frame started at `started` runs
/// out, or `None` if that instant is not representable.
fn idle_deadline(started: Instant, idle_timeout: Duration) -> Option<Instant> {
    started.checked_add(idle_timeout)
}

/// Reads one reply from the worker, honouring the optional reply timeout.
async fn read_worker_reply(
    worker: &mut WebSocket,
    reply_timeout: Option<Duration>,
) -> Result<String, RelayError> {
    match reply_timeout {
        Some(limit) => timeout(limit, next_worker_payload(worker))
            .await
            .map_err(|_| RelayError::WorkerTimeout(limit))?,
        None => next_worker_payload(worker).await,
    }
}

/// Returns the next data frame's payload as text.
///
/// Worker replies are relayed to the client as text frames, so binary
/// payloads that are not valid UTF-8 are converted lossily.
async fn next_worker_payload(worker: &mut WebSocket) -> Result<String, RelayError> {
    loop {
        match worker.next().await {
            Some(Ok(Message::Binary(bytes))) => {
                return Ok(String::from_utf8_lossy(&bytes).into_owned());
            }
            Some(Ok(Message::Text(text))) => return Ok(text.as_str().to_owned()),
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
            Some(Ok(Message::Close(_))) | None => return Err(RelayError::WorkerClosed),
            Some(Err(err)) => return Err(RelayError::WorkerIo(err)),
        }
    }
}

//! Client relay layer: upgrade handling and the per-client session.
//!
//! The WebSocket endpoint at `/inputStream` leases one worker per client
//! and relays the client's text frames to it one request at a time.

pub mod error;
pub mod handler;
pub mod session;

pub use error::RelayError;
pub use session::{RESET_SIGNAL, RelaySession, SessionSettings, SessionState};

//! Reasons a relay session ends.

use std::time::Duration;

use crate::domain::Disposition;

/// Why a relay session left its streaming loop.
///
/// Client-side endings release the worker, which is presumed healthy.
/// Worker-side endings evict it.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Client sent a close frame or the stream ended.
    #[error("client closed the connection")]
    ClientClosed,

    /// Reading from the client failed.
    #[error("client read failed: {0}")]
    ClientIo(axum::Error),

    /// Client sent a frame of a kind the relay does not accept.
    #[error("unexpected {0} frame from client")]
    InvalidFrame(&'static str),

    /// Client sent nothing within the idle timeout.
    #[error("client idle for longer than {0:?}")]
    IdleTimeout(Duration),

    /// Writing a reply to the client failed.
    #[error("client write failed: {0}")]
    ClientWrite(axum::Error),

    /// Forwarding a request to the worker failed.
    #[error("worker write failed: {0}")]
    WorkerWrite(axum::Error),

    /// Reading the worker's reply failed.
    #[error("worker read failed: {0}")]
    WorkerIo(axum::Error),

    /// Worker closed its connection instead of replying.
    #[error("worker closed the connection")]
    WorkerClosed,

    /// Worker did not reply within the configured reply timeout.
    #[error("worker did not reply within {0:?}")]
    WorkerTimeout(Duration),
}

impl RelayError {
    /// Returns `true` if the worker connection is to blame.
    #[must_use]
    pub const fn is_worker_fault(&self) -> bool {
        matches!(
            self,
            Self::WorkerWrite(_) | Self::WorkerIo(_) | Self::WorkerClosed | Self::WorkerTimeout(_)
        )
    }

    /// Returns what to do with the leased worker after this ending.
    #[must_use]
    pub const fn disposition(&self) -> Disposition {
        if self.is_worker_fault() {
            Disposition::Evict
        } else {
            Disposition::Release
        }
    }
}

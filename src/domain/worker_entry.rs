//! Worker entry combining the worker connection with registry metadata.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use utoipa::ToSchema;

use super::WorkerId;

/// A registered compute worker.
///
/// The `connection` is only ever locked by the session currently holding a
/// [`super::WorkerLease`] for this worker, so the mutex is uncontended; it
/// exists to hand out exclusive access through a shared `Arc`.
pub struct WorkerEntry<C> {
    /// Unique worker identifier (immutable after creation).
    pub id: WorkerId,

    /// Logical name supplied by the worker at registration.
    pub name: String,

    /// Registration timestamp.
    pub registered_at: DateTime<Utc>,

    /// Duplex connection to the worker.
    pub connection: Mutex<C>,
}

impl<C> WorkerEntry<C> {
    /// Creates a new `WorkerEntry` registered now.
    #[must_use]
    pub fn new(id: WorkerId, name: String, connection: C) -> Self {
        Self {
            id,
            name,
            registered_at: Utc::now(),
            connection: Mutex::new(connection),
        }
    }
}

impl<C> fmt::Debug for WorkerEntry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerEntry")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("registered_at", &self.registered_at)
            .finish_non_exhaustive()
    }
}

/// Lifecycle tag of a registered worker.
///
/// An evicted worker has no state: it is simply absent from the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    /// Free and present in the availability pool.
    Available,
    /// Held by a relay session.
    Leased,
}

/// Lightweight summary of a worker for the listing endpoint.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WorkerSummary {
    /// Worker identifier.
    #[schema(value_type = String)]
    pub id: WorkerId,
    /// Logical worker name.
    pub name: String,
    /// Registration timestamp.
    pub registered_at: DateTime<Utc>,
    /// Current lifecycle state.
    pub state: WorkerState,
}

impl WorkerSummary {
    /// Builds a summary from an entry and its current state.
    #[must_use]
    pub fn new<C>(entry: &WorkerEntry<C>, state: WorkerState) -> Self {
        Self {
            id: entry.id.clone(),
            name: entry.name.clone(),
            registered_at: entry.registered_at,
            state,
        }
    }
}

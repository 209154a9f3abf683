//! Scoped hold on one selected worker.
//!
//! A [`WorkerLease`] is obtained from [`WorkerLease::acquire`] and must end
//! in exactly one of release or eviction. [`WorkerLease::settle`] does this
//! explicitly; if the lease is dropped unsettled (failed upgrade, cancelled
//! task) the `Drop` impl settles it instead.

use std::fmt;
use std::sync::Arc;

use super::worker_entry::WorkerEntry;
use super::{WorkerId, WorkerRegistry};

/// What happens to a worker when its lease ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Worker is healthy; return it to the pool.
    Release,
    /// Worker connection is faulty; remove it from the registry.
    Evict,
}

/// Exclusive hold on a leased worker.
pub struct WorkerLease<C> {
    registry: Arc<WorkerRegistry<C>>,
    id: WorkerId,
    entry: Arc<WorkerEntry<C>>,
    in_flight: bool,
    settled: bool,
}

impl<C> WorkerLease<C> {
    /// Selects a free worker from `registry`.
    ///
    /// Returns `None` when no worker is free.
    #[must_use]
    pub fn acquire(registry: &Arc<WorkerRegistry<C>>) -> Option<Self> {
        let (id, entry) = registry.select()?;
        Some(Self {
            registry: Arc::clone(registry),
            id,
            entry,
            in_flight: false,
            settled: false,
        })
    }

    /// Returns the leased worker's id.
    #[must_use]
    pub fn id(&self) -> &WorkerId {
        &self.id
    }

    /// Returns the leased worker's entry.
    #[must_use]
    pub fn entry(&self) -> &Arc<WorkerEntry<C>> {
        &self.entry
    }

    /// Records whether a request has been sent to the worker without its
    /// reply having been read yet.
    ///
    /// An unsettled lease dropped while a request is in flight evicts the
    /// worker, since a late reply would otherwise reach the next session.
    pub fn set_in_flight(&mut self, in_flight: bool) {
        self.in_flight = in_flight;
    }

    /// Ends the lease, releasing or evicting the worker.
    pub fn settle(mut self, disposition: Disposition) {
        self.apply(disposition);
    }

    fn apply(&mut self, disposition: Disposition) {
        if self.settled {
            return;
        }
        self.settled = true;
        match disposition {
            Disposition::Release => self.registry.release(&self.id),
            Disposition::Evict => {
                self.registry.evict(&self.id);
            }
        }
    }
}

impl<C> Drop for WorkerLease<C> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let disposition = if self.in_flight {
            Disposition::Evict
        } else {
            Disposition::Release
        };
        tracing::debug!(worker_id = %self.id, ?disposition, "settling dropped lease");
        self.apply(disposition);
    }
}

impl<C> fmt::Debug for WorkerLease<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerLease")
            .field("id", &self.id)
            .field("in_flight", &self.in_flight)
            .field("settled", &self.settled)
            .finish_non_exhaustive()
    }
}

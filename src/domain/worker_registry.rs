//! Authoritative store of registered workers and their availability.
//!
//! [`WorkerRegistry`] keeps the worker map and the [`AvailabilityPool`]
//! behind a single [`parking_lot::Mutex`]. Every operation holds the lock
//! only for the map/pool mutation and never across an `.await`, so a
//! blocking mutex is the right tool here.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use super::availability_pool::{AvailabilityPool, SelectionPolicy};
use super::worker_entry::{WorkerEntry, WorkerState, WorkerSummary};
use super::WorkerId;

struct WorkerSlot<C> {
    entry: Arc<WorkerEntry<C>>,
    state: WorkerState,
}

struct RegistryInner<C> {
    workers: HashMap<WorkerId, WorkerSlot<C>>,
    pool: AvailabilityPool,
    next_seq: u64,
}

/// Central store for all registered compute workers.
///
/// # Invariants
///
/// - Every id in the pool is a key of the worker map, in state
///   [`WorkerState::Available`].
/// - A worker in state [`WorkerState::Leased`] is absent from the pool and
///   held by exactly one caller of [`WorkerRegistry::select`].
/// - An evicted worker is absent from both structures and never returns.
pub struct WorkerRegistry<C> {
    inner: Mutex<RegistryInner<C>>,
}

impl<C> WorkerRegistry<C> {
    /// Creates an empty registry with the given selection policy.
    #[must_use]
    pub fn new(policy: SelectionPolicy) -> Self {
        Self {
            inner: Mutex::new(RegistryInner {
                workers: HashMap::new(),
                pool: AvailabilityPool::new(policy),
                next_seq: 0,
            }),
        }
    }

    /// Admits a worker and marks it free. Always succeeds.
    pub fn register(&self, name: &str, connection: C) -> WorkerId {
        let mut inner = self.inner.lock();
        let seq = inner.next_seq;
        inner.next_seq = inner.next_seq.wrapping_add(1);

        let id = WorkerId::generate(name, seq);
        let entry = Arc::new(WorkerEntry::new(id.clone(), name.to_string(), connection));
        inner.workers.insert(
            id.clone(),
            WorkerSlot {
                entry,
                state: WorkerState::Available,
            },
        );
        inner.pool.put(id.clone());

        tracing::info!(worker_id = %id, name, "worker registered");
        id
    }

    /// Takes one free worker out of the pool and marks it leased.
    ///
    /// Returns `None` when no worker is free; callers must surface that as
    /// "no capacity" rather than retry.
    pub fn select(&self) -> Option<(WorkerId, Arc<WorkerEntry<C>>)> {
        let mut inner = self.inner.lock();
        loop {
            let Some(id) = inner.pool.take() else {
                tracing::debug!("no free worker in pool");
                return None;
            };

            // Eviction also drains the pool, so a stale id is not expected
            // here; skip it anyway rather than hand out a dead worker.
            let Some(slot) = inner.workers.get_mut(&id) else {
                tracing::warn!(worker_id = %id, "skipping stale pool entry");
                continue;
            };
            slot.state = WorkerState::Leased;
            let entry = Arc::clone(&slot.entry);

            tracing::debug!(worker_id = %id, "worker acquired");
            return Some((id, entry));
        }
    }

    /// Returns a leased worker to the pool.
    ///
    /// No-op if the worker was evicted meanwhile or is already free.
    pub fn release(&self, id: &WorkerId) {
        let mut inner = self.inner.lock();
        let RegistryInner { workers, pool, .. } = &mut *inner;
        let Some(slot) = workers.get_mut(id) else {
            tracing::debug!(worker_id = %id, "release of unregistered worker ignored");
            return;
        };
        slot.state = WorkerState::Available;
        if pool.put(id.clone()) {
            tracing::debug!(worker_id = %id, "worker marked free");
        }
    }

    /// Removes a worker permanently. Idempotent.
    ///
    /// Returns the removed entry, or `None` if it was not registered.
    pub fn evict(&self, id: &WorkerId) -> Option<Arc<WorkerEntry<C>>> {
        let mut inner = self.inner.lock();
        inner.pool.remove(id);
        let slot = inner.workers.remove(id)?;
        tracing::info!(worker_id = %id, name = %slot.entry.name, "worker evicted");
        Some(slot.entry)
    }

    /// Returns `true` if the worker is registered (free or leased).
    #[must_use]
    pub fn contains(&self, id: &WorkerId) -> bool {
        self.inner.lock().workers.contains_key(id)
    }

    /// Returns the current state of a worker, or `None` if not registered.
    #[must_use]
    pub fn state(&self, id: &WorkerId) -> Option<WorkerState> {
        self.inner.lock().workers.get(id).map(|slot| slot.state)
    }

    /// Returns the number of registered workers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().workers.len()
    }

    /// Returns `true` if no worker is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().workers.is_empty()
    }

    /// Returns the number of free workers.
    #[must_use]
    pub fn available(&self) -> usize {
        self.inner.lock().pool.len()
    }

    /// Returns summaries of all registered workers, sorted by id.
    #[must_use]
    pub fn workers(&self) -> Vec<WorkerSummary> {
        let inner = self.inner.lock();
        let mut summaries: Vec<WorkerSummary> = inner
            .workers
            .values()
            .map(|slot| WorkerSummary::new(&slot.entry, slot.state))
            .collect();
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        summaries
    }

    /// Checks that every pooled id is registered and available, and that
    /// every available worker is pooled.
    #[cfg(test)]
    pub(crate) fn is_consistent(&self) -> bool {
        let inner = self.inner.lock();
        let pooled_ok = inner.pool.iter().all(|id| {
            inner
                .workers
                .get(id)
                .is_some_and(|slot| slot.state == WorkerState::Available)
        });
        let available_ok = inner
            .workers
            .iter()
            .filter(|(_, slot)| slot.state == WorkerState::Available)
            .all(|(id, _)| inner.pool.contains(id));
        pooled_ok && available_ok
    }
}

impl<C> Default for WorkerRegistry<C> {
    fn default() -> Self {
        Self::new(SelectionPolicy::default())
    }
}

impl<C> fmt::Debug for WorkerRegistry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("WorkerRegistry")
            .field("registered", &inner.workers.len())
            .field("available", &inner.pool.len())
            .finish()
    }
}

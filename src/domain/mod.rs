//! Domain layer: worker identity, availability pool, registry and leases.
//!
//! This module contains the broker's shared state: the registry of
//! connected compute workers, the pool of workers currently free for
//! assignment, and the scoped lease a relay session holds on one worker.

pub mod availability_pool;
pub mod worker_entry;
pub mod worker_id;
pub mod worker_lease;
pub mod worker_registry;

pub use availability_pool::{AvailabilityPool, SelectionPolicy};
pub use worker_entry::{WorkerEntry, WorkerState, WorkerSummary};
pub use worker_id::WorkerId;
pub use worker_lease::{Disposition, WorkerLease};
pub use worker_registry::WorkerRegistry;

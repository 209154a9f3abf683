//! # compute-relay
//!
//! WebSocket broker that matches client work requests with a pool of
//! remote compute workers.
//!
//! Workers hold a persistent WebSocket to the broker. Each client
//! connection leases one free worker for its lifetime; every client text
//! frame is forwarded to that worker as a binary frame and the worker's
//! single reply is relayed back as a text frame. When the client leaves,
//! idles out, or the worker fails, the worker is reset and either returned
//! to the pool or evicted.
//!
//! ## Architecture
//!
//! ```text
//! Workers (WebSocket)        Clients (WebSocket)
//!     │                          │
//!     ├── Registration (api/)    ├── Relay handler (relay/)
//!     │                          ├── RelaySession (relay/)
//!     │                          │
//!     └──────────┬───────────────┘
//!                │
//!                ├── WorkerLease (domain/)
//!                ├── WorkerRegistry (domain/)
//!                └── AvailabilityPool (domain/)
//! ```

pub mod api;
pub mod app_state;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod relay;

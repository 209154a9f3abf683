//! Data Transfer Objects for the HTTP endpoints.
//!
//! DTOs are the serialization boundary between the JSON wire format and
//! the internal domain types.

pub mod system_dto;

pub use system_dto::{HealthResponse, WorkerListResponse};

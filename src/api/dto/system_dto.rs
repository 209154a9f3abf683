//! Response bodies for the system endpoints.

use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::WorkerSummary;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Always `"healthy"` while the process serves requests.
    pub status: String,
    /// RFC 3339 timestamp of the check.
    pub timestamp: String,
    /// Crate version.
    pub version: String,
    /// Number of registered workers.
    pub workers_registered: usize,
    /// Number of workers free for a new client.
    pub workers_available: usize,
}

/// Registered worker listing.
#[derive(Debug, Serialize, ToSchema)]
pub struct WorkerListResponse {
    /// Registered workers, sorted by id.
    pub workers: Vec<WorkerSummary>,
    /// Number of registered workers.
    pub total: usize,
    /// Number of workers free for a new client.
    pub available: usize,
}

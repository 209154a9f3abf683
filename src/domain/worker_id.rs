//! Type-safe worker identifier.
//!
//! [`WorkerId`] is a newtype wrapper around the string the registry hands
//! out on registration, so that worker identifiers cannot be confused with
//! worker names or session ids.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for a registered compute worker.
///
/// Built from the worker's logical name, a nanosecond timestamp and a
/// registry-local sequence number. Generated once at registration time and
/// immutable thereafter. Used as the key in [`super::WorkerRegistry`] and
/// as the unit of exchange in the [`super::AvailabilityPool`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerId(String);

impl WorkerId {
    /// Generates an id for a worker named `name`.
    ///
    /// `seq` must be distinct per call within one registry; the timestamp
    /// keeps ids distinct across registry instances.
    #[must_use]
    pub fn generate(name: &str, seq: u64) -> Self {
        let nanos = chrono::Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or_default();
        Self(format!("{name}-{nanos}-{seq}"))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for WorkerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for WorkerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

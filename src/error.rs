//! Broker error types with HTTP status code mapping.
//!
//! [`BrokerError`] covers failures surfaced on the HTTP side of an upgrade
//! request. Each variant maps to a specific HTTP status code and structured
//! JSON error response. Failures inside an established relay session are
//! [`crate::relay::RelayError`] instead.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2001,
///     "message": "no workers available"
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see code ranges on [`BrokerError`]).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category   | HTTP Status                 |
/// |-----------|------------|-----------------------------|
/// | 1000–1999 | Request    | 400 Bad Request / 401       |
/// | 2000–2999 | Capacity   | 503 Service Unavailable     |
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// Worker registration token did not match the configured secret.
    #[error("not authorized")]
    Unauthorized,

    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No registered worker is currently free.
    #[error("no workers available")]
    NoCapacity,
}

impl BrokerError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::Unauthorized => 1001,
            Self::InvalidRequest(_) => 1002,
            Self::NoCapacity => 2001,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::NoCapacity => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for BrokerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_and_capacity_have_distinct_statuses() {
        assert_eq!(
            BrokerError::Unauthorized.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            BrokerError::NoCapacity.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn into_response_sets_status() {
        let response = BrokerError::NoCapacity.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn error_body_carries_code_and_message() {
        let body = ErrorResponse {
            error: ErrorBody {
                code: BrokerError::NoCapacity.error_code(),
                message: BrokerError::NoCapacity.to_string(),
            },
        };
        let json = serde_json::to_value(&body).unwrap_or_default();
        assert_eq!(json["error"]["code"], 2001);
        assert_eq!(json["error"]["message"], "no workers available");
        assert_eq!(json["error"].as_object().map(|o| o.len()), Some(2));
    }
}

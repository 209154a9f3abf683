//! HTTP endpoint handlers organized by resource.

pub mod register;
pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Composes the worker-facing and system routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(register::routes())
        .merge(system::routes())
}

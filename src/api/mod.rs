//! HTTP layer: route handlers, DTOs, and router composition.

pub mod dto;
pub mod handlers;

use axum::Router;
use axum::routing::get;

use crate::app_state::AppState;
use crate::relay::handler::input_stream_handler;

/// Builds the complete router: worker registration, the client relay
/// channel, and the system endpoints.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .merge(handlers::routes())
        .route("/inputStream", get(input_stream_handler))
}

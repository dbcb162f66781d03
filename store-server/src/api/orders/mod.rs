//! Order API Module
//!
//! Read access to orders plus the shipping retry operation. All state
//! transitions go through the OrderManager.

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

/// Order router
pub fn router() -> Router<ServerState> {
    Router::new()
        // axum's nest does not match the bare trailing-slash form, so
        // `/api/orders/` needs its own route
        .route("/api/orders/", get(handler::list))
        .nest("/api/orders", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        // Orders for one buyer
        .route("/", get(handler::list))
        // Order detail
        .route("/{id}", get(handler::get_by_id))
        // Re-attempt label creation on a paid, shipping-failed order
        .route("/{id}/shipping/retry", post(handler::retry_shipping))
        // Live carrier tracking
        .route("/{id}/tracking", get(handler::tracking))
}

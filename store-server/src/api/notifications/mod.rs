//! Notifications API Module
//!
//! Read-only feed of the customer notifications the orchestrator
//! emitted for an order.

mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

/// Notifications router
pub fn router() -> Router<ServerState> {
    Router::new().route("/api/notifications", get(handler::list))
}

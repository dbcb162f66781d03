//! Checkout API Module
//!
//! Order creation. A declined charge is still a successful checkout
//! call: the response carries the failed order instead of an error.

mod handler;

use axum::{Router, routing::post};

use crate::core::ServerState;

/// Checkout router
pub fn router() -> Router<ServerState> {
    Router::new().route("/api/checkout", post(handler::checkout))
}

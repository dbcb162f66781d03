//! Rates API Module
//!
//! Standalone shipping quotes, used by the cart page before checkout.

mod handler;

use axum::{Router, routing::post};

use crate::core::ServerState;

/// Rates router
pub fn router() -> Router<ServerState> {
    Router::new().route("/api/rates/quote", post(handler::quote))
}

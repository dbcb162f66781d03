//! Webhook API Module
//!
//! Provider callbacks. Both endpoints acknowledge with 200 whenever
//! the payload was understood, including events dropped as duplicates
//! or regressions - a non-2xx would only trigger provider redelivery
//! of an event we already decided to ignore.

mod handler;

use axum::{Router, routing::post};

use crate::core::ServerState;

/// Webhook router - public, providers cannot authenticate
pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/webhooks/payment", post(handler::payment))
        .route("/api/webhooks/shipping", post(handler::shipping))
}

//! API routing module
//!
//! # Structure
//!
//! - [`health`] - liveness and build info
//! - [`checkout`] - order creation
//! - [`orders`] - order queries, shipping retry, tracking
//! - [`rates`] - shipping quote endpoint
//! - [`notifications`] - customer notification feed
//! - [`webhooks`] - payment and shipping provider callbacks

pub mod checkout;
pub mod health;
pub mod notifications;
pub mod orders;
pub mod rates;
pub mod webhooks;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::core::ServerState;
use crate::orders::OrderError;
use crate::utils::AppError;

// Re-export common types for handlers
pub use crate::utils::{AppResponse, AppResult};

/// Assemble the full application router
pub fn router(state: ServerState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(checkout::router())
        .merge(orders::router())
        .merge(rates::router())
        .merge(notifications::router())
        .merge(webhooks::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

impl From<OrderError> for AppError {
    fn from(e: OrderError) -> Self {
        match e {
            OrderError::Validation(msg) => AppError::Validation(msg),
            OrderError::NotFound(id) => AppError::not_found(format!("Order {} not found", id)),
            OrderError::StateConflict { .. } => AppError::conflict(e.to_string()),
            OrderError::Payment(e) => AppError::Provider(e.to_string()),
            OrderError::Shipping(e) => AppError::Provider(e.to_string()),
        }
    }
}

//! Shared types for the storefront fulfillment service
//!
//! Domain models used across the workspace: orders and their status
//! axes, shipping rate quotes, customer notifications, webhook payload
//! shapes, and precise money arithmetic helpers.

pub mod models;
pub mod money;
pub mod webhook;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use models::notification::Notification;
pub use models::order::{
    Buyer, LineItem, Order, OrderStatus, PaymentMethod, PaymentStatus, ShippingAddress,
    ShippingLabel, ShippingQuote, ShippingStatus,
};
pub use models::rate::{DeliveryWindow, RateQuote};

//! Order orchestration module
//!
//! - `manager`: the orchestrator owning the order lifecycle
//! - `store`: persistence interface and in-memory implementation
//!
//! # Lifecycle
//!
//! ```text
//! Checkout → create_order → pending_payment
//!     payment webhook → apply_payment_event
//!         approved → payment_approved → create label → shipping_created
//!         rejected/cancelled → payment_failed / payment_cancelled
//!     shipping webhook → apply_shipping_event
//!         dispatched → shipped (+ notification)
//!         delivered → delivered (+ notification)
//!         cancelled → shipping_cancelled (+ notification)
//! ```
//!
//! Webhook delivery is at-least-once and unordered; every transition
//! is applied under a per-order lock and guarded against regression.

pub mod manager;
pub mod store;

use chrono::{DateTime, Utc};
use shared::webhook::ShippingWebhookData;

use crate::payment::PaymentError;
use crate::shipping::ShippingError;

pub use manager::{CheckoutInput, CheckoutOutcome, OrderManager};
pub use store::{MemoryOrderStore, OrderStore};

/// Order orchestration error
#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("order not found: {0}")]
    NotFound(String),

    /// Event inapplicable to the current state - expected under
    /// at-least-once delivery, logged and dropped rather than surfaced
    #[error("event {attempted} not applicable to order {order_id} in state {current}")]
    StateConflict {
        order_id: String,
        current: String,
        attempted: String,
    },

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error(transparent)]
    Shipping(#[from] ShippingError),
}

/// Normalized carrier lifecycle event
#[derive(Debug, Clone, PartialEq)]
pub enum ShippingEvent {
    Created {
        protocol: Option<String>,
        tracking_code: Option<String>,
    },
    Paid,
    Generated {
        label_url: Option<String>,
    },
    Dispatched,
    Delivered {
        at: Option<DateTime<Utc>>,
    },
    Cancelled {
        reason: Option<String>,
    },
}

impl ShippingEvent {
    /// Map a carrier webhook event name onto the internal vocabulary
    ///
    /// Unknown event names return None; the caller logs and accepts
    /// them so provider vocabulary growth never becomes an error.
    pub fn parse(event: &str, data: &ShippingWebhookData) -> Option<Self> {
        match event {
            "shipment.created" => Some(ShippingEvent::Created {
                protocol: data.protocol.clone(),
                tracking_code: data.tracking_code.clone(),
            }),
            "shipment.paid" => Some(ShippingEvent::Paid),
            "shipment.generated" => Some(ShippingEvent::Generated {
                label_url: data.label_url.clone(),
            }),
            "shipment.dispatched" => Some(ShippingEvent::Dispatched),
            "shipment.delivered" => Some(ShippingEvent::Delivered {
                at: data.delivered_at,
            }),
            "shipment.cancelled" => Some(ShippingEvent::Cancelled {
                reason: data.reason.clone(),
            }),
            _ => None,
        }
    }

    /// Short name for logging and conflict reporting
    pub fn name(&self) -> &'static str {
        match self {
            ShippingEvent::Created { .. } => "created",
            ShippingEvent::Paid => "paid",
            ShippingEvent::Generated { .. } => "generated",
            ShippingEvent::Dispatched => "dispatched",
            ShippingEvent::Delivered { .. } => "delivered",
            ShippingEvent::Cancelled { .. } => "cancelled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(order_id: &str) -> ShippingWebhookData {
        ShippingWebhookData {
            order_id: order_id.into(),
            protocol: Some("PROTO-1".into()),
            tracking_code: Some("BR123".into()),
            label_url: None,
            reason: None,
            delivered_at: None,
        }
    }

    #[test]
    fn known_carrier_events_parse() {
        let d = data("ORD-1");
        assert!(matches!(
            ShippingEvent::parse("shipment.created", &d),
            Some(ShippingEvent::Created { .. })
        ));
        assert_eq!(
            ShippingEvent::parse("shipment.dispatched", &d),
            Some(ShippingEvent::Dispatched)
        );
        assert!(matches!(
            ShippingEvent::parse("shipment.delivered", &d),
            Some(ShippingEvent::Delivered { .. })
        ));
    }

    #[test]
    fn unknown_carrier_events_are_none() {
        let d = data("ORD-1");
        assert_eq!(ShippingEvent::parse("shipment.arrived_at_hub", &d), None);
        assert_eq!(ShippingEvent::parse("invoice.created", &d), None);
    }
}

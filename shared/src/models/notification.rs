//! Customer notification record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A customer-facing status message
///
/// Created by the orchestrator as a side effect of shipping
/// transitions; owned by the notification store and never mutated by
/// any other component. Delivery (email/SMS/push) happens downstream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub id: String,
    pub order_id: String,
    /// Recipient email snapshot
    pub recipient: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

impl Notification {
    pub fn new(order_id: impl Into<String>, recipient: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            order_id: order_id.into(),
            recipient: recipient.into(),
            message: message.into(),
            created_at: Utc::now(),
            read: false,
        }
    }
}

//! Shipping gateway adapters
//!
//! Two carrier shapes behind one interface:
//!
//! - `melhor_envio`: full label lifecycle via the carrier API
//! - `super_frete`: quoting only - label creation is not exposed by the
//!   API, so the adapter issues clearly-tagged simulated labels
//!
//! A simulated label keeps fulfillment moving when the carrier cannot
//! issue a real one; it must never be shown to the customer as a real
//! tracking number without its `simulated` flag.

pub mod melhor_envio;
pub mod super_frete;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::{Order, ShippingLabel, ShippingStatus};
use uuid::Uuid;

pub use melhor_envio::MelhorEnvioGateway;
pub use super_frete::SuperFreteGateway;

/// Typed shipping provider error
#[derive(Debug, thiserror::Error)]
pub enum ShippingError {
    #[error("shipping provider unavailable: {0}")]
    Transient(String),

    #[error("shipping request rejected: {0}")]
    Rejected(String),
}

impl From<reqwest::Error> for ShippingError {
    fn from(e: reqwest::Error) -> Self {
        ShippingError::Transient(e.to_string())
    }
}

/// One tracking history entry
#[derive(Debug, Clone, serde::Serialize)]
pub struct TrackingEvent {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occurred_at: Option<DateTime<Utc>>,
}

/// Tracking snapshot for a label
#[derive(Debug, Clone, serde::Serialize)]
pub struct TrackingInfo {
    pub status: ShippingStatus,
    pub events: Vec<TrackingEvent>,
}

/// Normalized shipping gateway interface
#[async_trait]
pub trait ShippingGateway: Send + Sync {
    /// Create (or simulate) a shipping label for a paid order
    async fn create_label(&self, order: &Order) -> Result<ShippingLabel, ShippingError>;

    /// Current tracking state for a label
    async fn track(&self, tracking_code: &str) -> Result<TrackingInfo, ShippingError>;
}

/// Prefix tagging simulated label ids
pub const SIMULATED_LABEL_PREFIX: &str = "SIM-";

/// Prefix tagging simulated tracking codes
pub const SIMULATED_TRACKING_PREFIX: &str = "TRK";

/// Issue a synthetic label for carriers without label-creation support
pub fn simulated_label(order: &Order) -> ShippingLabel {
    let short = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
    tracing::warn!(order_id = %order.id,
        "Carrier cannot issue labels; generating simulated label");
    ShippingLabel {
        label_id: format!("{SIMULATED_LABEL_PREFIX}{short}"),
        protocol: None,
        tracking_code: format!("{}{}", SIMULATED_TRACKING_PREFIX, Utc::now().timestamp_millis()),
        label_url: None,
        status: ShippingStatus::Created,
        simulated: true,
        created_at: Utc::now(),
    }
}

/// Whether a tracking code belongs to a simulated label
pub fn is_simulated_tracking(tracking_code: &str) -> bool {
    tracking_code.starts_with(SIMULATED_TRACKING_PREFIX)
}

/// Synthetic tracking snapshot for a simulated label
pub fn simulated_tracking() -> TrackingInfo {
    TrackingInfo {
        status: ShippingStatus::Created,
        events: vec![TrackingEvent {
            status: "created".into(),
            description: Some("Simulated label awaiting carrier handoff".into()),
            occurred_at: Some(Utc::now()),
        }],
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulated_labels_are_tagged() {
        let label = simulated_label(&tests_support::sample_order());
        assert!(label.simulated);
        assert!(label.label_id.starts_with(SIMULATED_LABEL_PREFIX));
        assert!(label.tracking_code.starts_with(SIMULATED_TRACKING_PREFIX));
        assert!(is_simulated_tracking(&label.tracking_code));
    }
}

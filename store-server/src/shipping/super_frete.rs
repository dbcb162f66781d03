//! Super Frete adapter (quote-capable, no label API)
//!
//! Super Frete exposes rate calculation but no label creation; orders
//! shipped through it get a simulated label so fulfillment can proceed
//! while labels are handled out of band. Tracking of simulated codes
//! reports a synthetic created state.

use async_trait::async_trait;
use shared::{Order, ShippingLabel};

use super::{
    ShippingError, ShippingGateway, TrackingInfo, is_simulated_tracking, simulated_label,
    simulated_tracking,
};
use crate::core::Config;

pub struct SuperFreteGateway;

impl SuperFreteGateway {
    pub fn new(_config: &Config) -> Self {
        Self
    }
}

#[async_trait]
impl ShippingGateway for SuperFreteGateway {
    async fn create_label(&self, order: &Order) -> Result<ShippingLabel, ShippingError> {
        // No label-creation endpoint; always simulate
        Ok(simulated_label(order))
    }

    async fn track(&self, tracking_code: &str) -> Result<TrackingInfo, ShippingError> {
        if is_simulated_tracking(tracking_code) {
            return Ok(simulated_tracking());
        }
        Err(ShippingError::Rejected(format!(
            "tracking not supported for code {tracking_code}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::ShippingStatus;

    #[tokio::test]
    async fn label_creation_always_simulates() {
        let gateway = SuperFreteGateway;
        let order = crate::shipping::tests_support::sample_order();
        let label = gateway.create_label(&order).await.unwrap();
        assert!(label.simulated);
        assert_eq!(label.status, ShippingStatus::Created);
    }

    #[tokio::test]
    async fn simulated_codes_track_synthetically() {
        let gateway = SuperFreteGateway;
        let info = gateway.track("TRK1700000000000").await.unwrap();
        assert_eq!(info.status, ShippingStatus::Created);
        assert!(!info.events.is_empty());
    }

    #[tokio::test]
    async fn real_codes_are_rejected() {
        let gateway = SuperFreteGateway;
        assert!(gateway.track("BR123456789").await.is_err());
    }
}

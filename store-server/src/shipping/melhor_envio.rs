//! Melhor Envio adapter (full label lifecycle)
//!
//! Labels are created by inserting a shipment into the account cart;
//! the carrier answers with id/protocol/tracking and later pushes
//! `shipment.*` webhook events as the label progresses. With a
//! placeholder credential the adapter degrades to simulated labels
//! instead of calling out.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use shared::{Order, ShippingLabel, ShippingStatus};

use super::{
    ShippingError, ShippingGateway, TrackingEvent, TrackingInfo, is_simulated_tracking,
    simulated_label, simulated_tracking,
};
use crate::core::Config;
use crate::core::config::is_placeholder_token;
use crate::utils::validation::format_postal_code;

/// Sender identity stamped on outbound labels
struct StoreIdentity {
    name: &'static str,
    email: &'static str,
    phone: &'static str,
    document: &'static str,
}

const STORE: StoreIdentity = StoreIdentity {
    name: "Storefront Fulfillment",
    email: "shipping@storefront.example",
    phone: "(11) 99999-9999",
    document: "12.345.678/0001-90",
};

pub struct MelhorEnvioGateway {
    http: reqwest::Client,
    base_url: String,
    token: String,
    origin_postal_code: String,
    package: crate::core::config::PackageDimensions,
    default_item_weight_kg: f64,
}

#[derive(Debug, Deserialize)]
struct CartResponse {
    id: String,
    #[serde(default)]
    protocol: Option<String>,
    #[serde(default, alias = "tracking")]
    tracking_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TrackingResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    tracking: Option<Vec<TrackingLine>>,
}

#[derive(Debug, Deserialize)]
struct TrackingLine {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    occurred_at: Option<chrono::DateTime<Utc>>,
}

/// Map a carrier tracking status string onto the label state axis
fn normalize_tracking_status(raw: &str) -> ShippingStatus {
    match raw {
        "pending" | "created" => ShippingStatus::Created,
        "paid" => ShippingStatus::Paid,
        "generated" | "released" => ShippingStatus::Generated,
        "posted" | "dispatched" => ShippingStatus::Dispatched,
        "delivered" => ShippingStatus::Delivered,
        "cancelled" | "canceled" => ShippingStatus::Cancelled,
        _ => ShippingStatus::Created,
    }
}

impl MelhorEnvioGateway {
    pub fn new(config: &Config) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: config.melhor_envio_base_url.clone(),
            token: config.melhor_envio_token.clone(),
            origin_postal_code: config.origin_postal_code.clone(),
            package: config.package_dimensions,
            default_item_weight_kg: config.default_item_weight_kg,
        }
    }
}

#[async_trait]
impl ShippingGateway for MelhorEnvioGateway {
    async fn create_label(&self, order: &Order) -> Result<ShippingLabel, ShippingError> {
        if is_placeholder_token(&self.token) {
            return Ok(simulated_label(order));
        }

        let to = &order.shipping_address;
        let body = json!({
            "service": order.shipping.service_id,
            "from": {
                "name": STORE.name,
                "phone": STORE.phone,
                "email": STORE.email,
                "document": STORE.document,
                "country_id": "BR",
                "postal_code": format_postal_code(&self.origin_postal_code),
            },
            "to": {
                "name": order.buyer.name,
                "phone": to.phone,
                "email": order.buyer.email,
                "document": to.document,
                "address": to.street,
                "complement": to.complement,
                "number": to.number,
                "district": to.district,
                "city": to.city,
                "state_abbr": to.state,
                "country_id": "BR",
                "postal_code": format_postal_code(&to.postal_code),
            },
            "products": order.items.iter().map(|item| json!({
                "name": item.name,
                "quantity": item.quantity,
                "unitary_value": item.unit_price,
            })).collect::<Vec<_>>(),
            "volumes": [{
                "height": self.package.height_cm,
                "width": self.package.width_cm,
                "length": self.package.length_cm,
                "weight": order.total_weight_kg(self.default_item_weight_kg),
            }],
            "options": {
                "insurance_value": order.shipping.declared_value,
                "receipt": false,
                "own_hand": false,
            },
        });

        let response = self
            .http
            .post(format!("{}/api/v2/me/cart", self.base_url))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            if status.is_client_error() {
                return Err(ShippingError::Rejected(format!(
                    "label creation declined: HTTP {status}"
                )));
            }
            return Err(ShippingError::Transient(format!(
                "label creation failed: HTTP {status}"
            )));
        }

        let cart: CartResponse = response
            .json()
            .await
            .map_err(|e| ShippingError::Transient(format!("malformed cart response: {e}")))?;

        Ok(ShippingLabel {
            tracking_code: cart.tracking_code.unwrap_or_else(|| cart.id.clone()),
            label_id: cart.id,
            protocol: cart.protocol,
            label_url: None,
            status: ShippingStatus::Created,
            simulated: false,
            created_at: Utc::now(),
        })
    }

    async fn track(&self, tracking_code: &str) -> Result<TrackingInfo, ShippingError> {
        if is_simulated_tracking(tracking_code) || is_placeholder_token(&self.token) {
            return Ok(simulated_tracking());
        }

        let response = self
            .http
            .post(format!("{}/api/v2/me/shipment/tracking", self.base_url))
            .bearer_auth(&self.token)
            .json(&json!({ "orders": [tracking_code] }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ShippingError::Transient(format!(
                "tracking failed: HTTP {}",
                response.status()
            )));
        }

        let tracked: TrackingResponse = response
            .json()
            .await
            .map_err(|e| ShippingError::Transient(format!("malformed tracking response: {e}")))?;

        let status = tracked
            .status
            .as_deref()
            .map(normalize_tracking_status)
            .unwrap_or(ShippingStatus::Created);
        let events = tracked
            .tracking
            .unwrap_or_default()
            .into_iter()
            .map(|line| TrackingEvent {
                status: line.status.unwrap_or_else(|| "unknown".into()),
                description: line.description,
                occurred_at: line.occurred_at,
            })
            .collect();

        Ok(TrackingInfo { status, events })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracking_vocabulary_normalizes() {
        assert_eq!(normalize_tracking_status("paid"), ShippingStatus::Paid);
        assert_eq!(normalize_tracking_status("posted"), ShippingStatus::Dispatched);
        assert_eq!(normalize_tracking_status("delivered"), ShippingStatus::Delivered);
        // Unknown vocabulary degrades to the earliest label state
        assert_eq!(normalize_tracking_status("teleported"), ShippingStatus::Created);
    }
}

//! Provider webhook payload shapes
//!
//! Both providers deliver at-least-once and may duplicate or reorder
//! events; the payload shapes here are deliberately loose (everything
//! optional beyond the discriminator) so vocabulary growth on the
//! provider side never turns into a deserialization failure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Payment provider callback: `{type, data: {...}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentWebhook {
    /// Event class, e.g. "payment"
    #[serde(rename = "type")]
    pub kind: String,
    pub data: PaymentWebhookData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentWebhookData {
    /// Provider-side charge id
    pub id: String,
    /// Our order id, echoed back by the provider
    #[serde(
        default,
        alias = "externalReference",
        skip_serializing_if = "Option::is_none"
    )]
    pub external_reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(
        default,
        alias = "statusDetail",
        skip_serializing_if = "Option::is_none"
    )]
    pub status_detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
}

/// Shipping provider callback: `{event, data: {...}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingWebhook {
    /// Carrier event name, e.g. "shipment.dispatched"
    pub event: String,
    pub data: ShippingWebhookData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingWebhookData {
    pub order_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_payload_accepts_camel_case_aliases() {
        let raw = r#"{"type":"payment","data":{"id":"123","externalReference":"ORD-1","statusDetail":"accredited"}}"#;
        let hook: PaymentWebhook = serde_json::from_str(raw).unwrap();
        assert_eq!(hook.data.external_reference.as_deref(), Some("ORD-1"));
        assert_eq!(hook.data.status_detail.as_deref(), Some("accredited"));
    }

    #[test]
    fn shipping_payload_tolerates_missing_fields() {
        let raw = r#"{"event":"shipment.posted_somewhere_new","data":{"order_id":"ORD-1"}}"#;
        let hook: ShippingWebhook = serde_json::from_str(raw).unwrap();
        assert_eq!(hook.data.order_id, "ORD-1");
        assert!(hook.data.tracking_code.is_none());
    }
}

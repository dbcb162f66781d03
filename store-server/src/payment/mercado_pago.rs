//! Mercado Pago adapter (preference/redirect model)
//!
//! PIX and boleto go through a hosted checkout preference: the buyer
//! is redirected to `init_point` and the final status arrives later on
//! the payment webhook. Card payments use the direct `/v1/payments`
//! endpoint with a client-side token and return a status synchronously.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use shared::{Order, PaymentMethod, PaymentStatus};

use super::{CardInstrument, ChargeLedger, ChargeReceipt, ChargeStatus, PaymentError, PaymentGateway};
use crate::core::Config;

pub struct MercadoPagoGateway {
    http: reqwest::Client,
    base_url: String,
    token: String,
    public_base_url: String,
    ledger: ChargeLedger,
}

#[derive(Debug, Deserialize)]
struct PreferenceResponse {
    id: String,
    init_point: Option<String>,
    sandbox_init_point: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PaymentResponse {
    id: serde_json::Value,
    status: String,
    #[serde(default)]
    status_detail: Option<String>,
    #[serde(default)]
    transaction_amount: Option<f64>,
    #[serde(default)]
    external_reference: Option<String>,
}

/// Normalize a Mercado Pago status string into the closed status set
fn normalize_status(raw: &str) -> PaymentStatus {
    match raw {
        "approved" => PaymentStatus::Approved,
        "rejected" => PaymentStatus::Rejected,
        "cancelled" | "refunded" | "charged_back" => PaymentStatus::Cancelled,
        // pending, in_process, authorized and future vocabulary
        _ => PaymentStatus::Pending,
    }
}

impl MercadoPagoGateway {
    pub fn new(config: &Config) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: config.mercado_pago_base_url.clone(),
            token: config.mercado_pago_token.clone(),
            public_base_url: config.public_base_url.clone(),
            ledger: ChargeLedger::new(),
        }
    }

    async fn create_preference(&self, order: &Order) -> Result<ChargeReceipt, PaymentError> {
        let body = json!({
            "items": order.items.iter().map(|item| json!({
                "id": item.product_id,
                "title": item.name,
                "quantity": item.quantity,
                "unit_price": item.unit_price,
                "currency_id": "BRL",
            })).collect::<Vec<_>>(),
            "payer": {
                "name": order.buyer.name,
                "email": order.buyer.email,
            },
            "back_urls": {
                "success": format!("{}/#checkout?status=success", self.public_base_url),
                "failure": format!("{}/#checkout?status=failure", self.public_base_url),
                "pending": format!("{}/#checkout?status=pending", self.public_base_url),
            },
            "auto_return": "approved",
            "external_reference": order.id,
            "notification_url": format!("{}/api/webhooks/payment", self.public_base_url),
            "metadata": { "order_id": order.id, "user_id": order.buyer.id },
        });

        let response = self
            .http
            .post(format!("{}/checkout/preferences", self.base_url))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(classify_http_error(response.status(), "create preference"));
        }

        let pref: PreferenceResponse = response
            .json()
            .await
            .map_err(|e| PaymentError::Transient(format!("malformed preference response: {e}")))?;

        Ok(ChargeReceipt {
            charge_id: pref.id,
            redirect_url: pref.init_point.or(pref.sandbox_init_point),
            status: PaymentStatus::Pending,
            detail: None,
        })
    }

    async fn create_card_payment(
        &self,
        order: &Order,
        card: &CardInstrument,
    ) -> Result<ChargeReceipt, PaymentError> {
        let body = json!({
            "transaction_amount": order.total,
            "description": format!("Order #{}", order.id),
            "payment_method_id": card.payment_method_id,
            "issuer_id": card.issuer_id,
            "installments": card.installments,
            "token": card.token,
            "payer": {
                "email": order.buyer.email,
                "identification": {
                    "type": card.document_type,
                    "number": card.document_number,
                },
            },
            "external_reference": order.id,
            "metadata": { "order_id": order.id, "user_id": order.buyer.id },
        });

        let response = self
            .http
            .post(format!("{}/v1/payments", self.base_url))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(classify_http_error(response.status(), "create payment"));
        }

        let payment: PaymentResponse = response
            .json()
            .await
            .map_err(|e| PaymentError::Transient(format!("malformed payment response: {e}")))?;

        let status = normalize_status(&payment.status);
        if status == PaymentStatus::Rejected {
            return Err(PaymentError::Rejected(
                payment.status_detail.unwrap_or(payment.status),
            ));
        }

        Ok(ChargeReceipt {
            charge_id: payment.id.to_string().trim_matches('"').to_string(),
            redirect_url: None,
            status,
            detail: payment.status_detail,
        })
    }
}

fn classify_http_error(status: reqwest::StatusCode, action: &str) -> PaymentError {
    if status.is_client_error() {
        PaymentError::Rejected(format!("{action} declined: HTTP {status}"))
    } else {
        PaymentError::Transient(format!("{action} failed: HTTP {status}"))
    }
}

#[async_trait]
impl PaymentGateway for MercadoPagoGateway {
    async fn create_charge(
        &self,
        order: &Order,
        card: Option<&CardInstrument>,
    ) -> Result<ChargeReceipt, PaymentError> {
        if let Some(existing) = self.ledger.open_charge(&order.id) {
            tracing::info!(order_id = %order.id, charge_id = %existing.charge_id,
                "Reusing unresolved charge");
            return Ok(existing);
        }

        let receipt = match (order.payment_method, card) {
            (PaymentMethod::CreditCard, Some(card)) => {
                self.create_card_payment(order, card).await?
            }
            (PaymentMethod::CreditCard, None) => {
                return Err(PaymentError::Rejected(
                    "card payment requires a tokenized card".into(),
                ));
            }
            // PIX and boleto ride the hosted checkout preference
            _ => self.create_preference(order).await?,
        };

        self.ledger.record(&order.id, &receipt);
        Ok(receipt)
    }

    async fn charge_status(&self, charge_id: &str) -> Result<ChargeStatus, PaymentError> {
        let response = self
            .http
            .get(format!("{}/v1/payments/{}", self.base_url, charge_id))
            .bearer_auth(&self.token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(classify_http_error(response.status(), "query payment"));
        }

        let payment: PaymentResponse = response
            .json()
            .await
            .map_err(|e| PaymentError::Transient(format!("malformed payment response: {e}")))?;

        let status = normalize_status(&payment.status);
        if status.is_terminal() {
            if let Some(order_ref) = &payment.external_reference {
                self.ledger.resolve(order_ref);
            }
        }

        Ok(ChargeStatus {
            status,
            detail: payment.status_detail,
            amount: payment.transaction_amount,
            order_ref: payment.external_reference,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_vocabulary_normalizes_to_closed_set() {
        assert_eq!(normalize_status("approved"), PaymentStatus::Approved);
        assert_eq!(normalize_status("rejected"), PaymentStatus::Rejected);
        assert_eq!(normalize_status("cancelled"), PaymentStatus::Cancelled);
        assert_eq!(normalize_status("in_process"), PaymentStatus::Pending);
        // Unknown future vocabulary must not break orchestration
        assert_eq!(normalize_status("under_review_v2"), PaymentStatus::Pending);
    }
}

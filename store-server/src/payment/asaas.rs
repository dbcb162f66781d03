//! Asaas adapter (direct-charge model)
//!
//! Charges are created directly against the provider: a customer is
//! upserted first, then a payment with the proper `billingType`. The
//! response carries an immediate status plus an invoice URL usable as
//! a hosted fallback for PIX/boleto flows.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use serde::Deserialize;
use serde_json::json;
use shared::{Order, PaymentMethod, PaymentStatus};

use super::{CardInstrument, ChargeLedger, ChargeReceipt, ChargeStatus, PaymentError, PaymentGateway};
use crate::core::Config;

pub struct AsaasGateway {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    public_base_url: String,
    ledger: ChargeLedger,
}

#[derive(Debug, Deserialize)]
struct CustomerResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct AsaasPayment {
    id: String,
    status: String,
    #[serde(default)]
    value: Option<f64>,
    #[serde(default, rename = "invoiceUrl")]
    invoice_url: Option<String>,
    #[serde(default, rename = "externalReference")]
    external_reference: Option<String>,
}

/// Normalize an Asaas status string into the closed status set
fn normalize_status(raw: &str) -> PaymentStatus {
    match raw {
        "CONFIRMED" | "RECEIVED" | "RECEIVED_IN_CASH" => PaymentStatus::Approved,
        "REFUSED" | "CHARGEBACK_REQUESTED" => PaymentStatus::Rejected,
        "REFUNDED" | "DELETED" | "CANCELLED" => PaymentStatus::Cancelled,
        // PENDING, AWAITING_RISK_ANALYSIS, OVERDUE and future vocabulary
        _ => PaymentStatus::Pending,
    }
}

fn billing_type(method: PaymentMethod) -> &'static str {
    match method {
        PaymentMethod::Pix => "PIX",
        PaymentMethod::Boleto => "BOLETO",
        PaymentMethod::CreditCard => "CREDIT_CARD",
    }
}

impl AsaasGateway {
    pub fn new(config: &Config) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: config.asaas_base_url.clone(),
            api_key: config.asaas_api_key.clone(),
            public_base_url: config.public_base_url.clone(),
            ledger: ChargeLedger::new(),
        }
    }

    /// Upsert the buyer as an Asaas customer, returning its id
    async fn upsert_customer(&self, order: &Order) -> Result<String, PaymentError> {
        let address = &order.shipping_address;
        let body = json!({
            "name": order.buyer.name,
            "email": order.buyer.email,
            "cpfCnpj": address.document,
            "postalCode": address.postal_code,
            "address": address.street,
            "addressNumber": address.number,
            "complement": address.complement,
            "province": address.district,
            "city": address.city,
            "state": address.state,
            "country": "Brasil",
            "externalReference": order.buyer.id,
        });

        let response = self
            .http
            .post(format!("{}/customers", self.base_url))
            .header("access_token", &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(classify_http_error(response.status(), "upsert customer"));
        }

        let customer: CustomerResponse = response
            .json()
            .await
            .map_err(|e| PaymentError::Transient(format!("malformed customer response: {e}")))?;
        Ok(customer.id)
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
impl PaymentGateway for AsaasGateway {
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

        let customer_id = self.upsert_customer(order).await?;

        // Boleto gets a longer settlement horizon than PIX/card
        let due_days = match order.payment_method {
            PaymentMethod::Boleto => 3,
            _ => 1,
        };
        let due_date = (Utc::now() + ChronoDuration::days(due_days))
            .format("%Y-%m-%d")
            .to_string();

        let mut body = json!({
            "customer": customer_id,
            "billingType": billing_type(order.payment_method),
            "value": order.total,
            "dueDate": due_date,
            "description": format!("Order {}", order.id),
            "externalReference": order.id,
            "callback": {
                "successUrl": format!("{}/#checkout-success", self.public_base_url),
                "autoRedirect": true,
            },
        });

        if let (PaymentMethod::CreditCard, Some(card)) = (order.payment_method, card) {
            body["creditCardToken"] = json!(card.token);
            body["installmentCount"] = json!(card.installments);
        }

        let response = self
            .http
            .post(format!("{}/payments", self.base_url))
            .header("access_token", &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(classify_http_error(response.status(), "create payment"));
        }

        let payment: AsaasPayment = response
            .json()
            .await
            .map_err(|e| PaymentError::Transient(format!("malformed payment response: {e}")))?;

        let status = normalize_status(&payment.status);
        if status == PaymentStatus::Rejected {
            return Err(PaymentError::Rejected(payment.status));
        }

        let receipt = ChargeReceipt {
            charge_id: payment.id,
            redirect_url: payment.invoice_url,
            status,
            detail: Some(payment.status),
        };
        self.ledger.record(&order.id, &receipt);
        Ok(receipt)
    }

    async fn charge_status(&self, charge_id: &str) -> Result<ChargeStatus, PaymentError> {
        let response = self
            .http
            .get(format!("{}/payments/{}", self.base_url, charge_id))
            .header("access_token", &self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(classify_http_error(response.status(), "query payment"));
        }

        let payment: AsaasPayment = response
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
            detail: Some(payment.status),
            amount: payment.value,
            order_ref: payment.external_reference,
        })
    }
}

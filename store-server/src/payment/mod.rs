//! Payment gateway adapters
//!
//! Two provider shapes behind one interface:
//!
//! - `mercado_pago`: preference/redirect model - the buyer is sent to
//!   a hosted checkout and the final status arrives via webhook
//! - `asaas`: direct-charge model - the charge is created against the
//!   provider and a status comes back synchronously
//!
//! Callers never branch on provider identity; the active adapter is
//! selected once from configuration.

pub mod asaas;
pub mod mercado_pago;

use async_trait::async_trait;
use dashmap::DashMap;
use shared::{Order, PaymentStatus};

pub use asaas::AsaasGateway;
pub use mercado_pago::MercadoPagoGateway;

/// Typed payment provider error
///
/// `Transient` failures (network, 5xx, timeout) are safe to retry;
/// `Rejected` is an explicit provider decline and must not be retried.
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("payment provider unavailable: {0}")]
    Transient(String),

    #[error("payment rejected: {0}")]
    Rejected(String),
}

impl PaymentError {
    pub fn is_transient(&self) -> bool {
        matches!(self, PaymentError::Transient(_))
    }
}

impl From<reqwest::Error> for PaymentError {
    fn from(e: reqwest::Error) -> Self {
        // Timeouts and transport errors are treated identically
        PaymentError::Transient(e.to_string())
    }
}

/// Tokenized card details forwarded to direct-charge flows
///
/// The raw card never reaches this service; providers tokenize it on
/// the client side.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct CardInstrument {
    pub token: String,
    pub payment_method_id: String,
    #[serde(default)]
    pub issuer_id: Option<String>,
    #[serde(default = "default_installments")]
    pub installments: u32,
    pub document_type: String,
    pub document_number: String,
}

fn default_installments() -> u32 {
    1
}

/// Result of creating a charge
#[derive(Debug, Clone)]
pub struct ChargeReceipt {
    pub charge_id: String,
    /// Hosted checkout URL, None for synchronous charges
    pub redirect_url: Option<String>,
    pub status: PaymentStatus,
    /// Raw provider status string, metadata only
    pub detail: Option<String>,
}

/// Result of querying a charge
#[derive(Debug, Clone)]
pub struct ChargeStatus {
    pub status: PaymentStatus,
    pub detail: Option<String>,
    pub amount: Option<f64>,
    /// Our order id as echoed back by the provider
    pub order_ref: Option<String>,
}

/// Normalized payment gateway interface
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a charge for the order
    ///
    /// Creating a charge twice for the same order must not
    /// double-charge: adapters reuse the unresolved charge recorded in
    /// their [`ChargeLedger`].
    async fn create_charge(
        &self,
        order: &Order,
        card: Option<&CardInstrument>,
    ) -> Result<ChargeReceipt, PaymentError>;

    /// Query the normalized status of an existing charge
    async fn charge_status(&self, charge_id: &str) -> Result<ChargeStatus, PaymentError>;
}

/// Open-charge bookkeeping keyed by order id
///
/// Guards charge creation against duplicate checkout submissions and
/// webhook-driven re-entry. Entries are removed once the charge
/// resolves; an unresolved entry is returned instead of creating a
/// second provider-side charge.
#[derive(Debug, Default)]
pub struct ChargeLedger {
    open: DashMap<String, ChargeReceipt>,
}

impl ChargeLedger {
    pub fn new() -> Self {
        Self {
            open: DashMap::new(),
        }
    }

    /// Existing unresolved charge for this order, if any
    pub fn open_charge(&self, order_id: &str) -> Option<ChargeReceipt> {
        self.open
            .get(order_id)
            .filter(|r| r.status == PaymentStatus::Pending)
            .map(|r| r.clone())
    }

    pub fn record(&self, order_id: &str, receipt: &ChargeReceipt) {
        if receipt.status == PaymentStatus::Pending {
            self.open.insert(order_id.to_string(), receipt.clone());
        }
    }

    /// Drop the open entry once the charge reached a terminal status
    pub fn resolve(&self, order_id: &str) {
        self.open.remove(order_id);
    }
}

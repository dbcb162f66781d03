//! Order model and status axes
//!
//! An [`Order`] is created once at checkout and only transitioned
//! afterwards, never deleted. Line items are immutable snapshots taken
//! at creation time; the catalog is never re-read. The three status
//! axes (order, payment, shipping) move independently: a payment is
//! never undone because shipping failed.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::models::rate::DeliveryWindow;
use crate::money;

/// Order lifecycle status
///
/// Happy path: `PendingPayment → PaymentApproved → ShippingCreated →
/// Shipped → Delivered`. Payment failures are terminal; shipping
/// failures are recoverable and may be retried back into
/// `ShippingCreated`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    PendingPayment,
    PaymentApproved,
    PaymentFailed,
    PaymentCancelled,
    ShippingCreated,
    Shipped,
    Delivered,
    ShippingCancelled,
    ShippingFailed,
}

impl OrderStatus {
    /// No further transitions are accepted from a terminal state
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::PaymentFailed | OrderStatus::PaymentCancelled | OrderStatus::Delivered
        )
    }

    /// Progress rank along the happy path, used to reject regressions
    ///
    /// Webhook delivery is at-least-once and unordered: a duplicate
    /// `approved` arriving after `shipped` must not move the order
    /// backwards. Recoverable failure states rank alongside the state
    /// they fell out of so a retry can move forward again.
    pub fn rank(self) -> u8 {
        match self {
            OrderStatus::PendingPayment => 0,
            OrderStatus::PaymentFailed | OrderStatus::PaymentCancelled => 1,
            OrderStatus::PaymentApproved => 1,
            OrderStatus::ShippingFailed | OrderStatus::ShippingCancelled => 1,
            OrderStatus::ShippingCreated => 2,
            OrderStatus::Shipped => 3,
            OrderStatus::Delivered => 4,
        }
    }
}

/// Provider-reported payment status, normalized to a closed set
///
/// Provider-specific detail strings are preserved as metadata on the
/// order but never drive orchestration logic.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl PaymentStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

/// Carrier-reported shipping label state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ShippingStatus {
    /// No label requested yet
    #[default]
    Pending,
    Created,
    Paid,
    Generated,
    Dispatched,
    Delivered,
    Cancelled,
    Failed,
}

/// Payment method chosen at checkout
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Pix,
    Boleto,
    CreditCard,
}

impl PaymentMethod {
    /// Surcharge for this method on top of subtotal + shipping
    ///
    /// PIX carries none, boleto a flat issuing fee, credit card a
    /// percentage of the charged base.
    pub fn surcharge(self, base: f64) -> f64 {
        match self {
            PaymentMethod::Pix => 0.0,
            PaymentMethod::Boleto => money::BOLETO_SURCHARGE,
            PaymentMethod::CreditCard => {
                money::round2(base * money::CARD_SURCHARGE_PERCENT / 100.0)
            }
        }
    }
}

/// Buyer identity snapshot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Buyer {
    pub id: String,
    pub email: String,
    pub name: String,
}

/// Line item snapshot taken at order creation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineItem {
    /// Product ID in the catalog (snapshot only, never re-queried)
    pub product_id: String,
    /// Product name at purchase time
    pub name: String,
    /// Unit price at purchase time
    pub unit_price: f64,
    /// Quantity
    pub quantity: i32,
    /// Unit weight in kg; None falls back to the store default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f64>,
}

/// Shipping destination
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShippingAddress {
    pub postal_code: String,
    pub street: String,
    pub number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complement: Option<String>,
    pub district: String,
    pub city: String,
    /// Two-letter state abbreviation
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// CPF/CNPJ, required by carriers for label issuance
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
}

/// Shipping quote locked into the order at creation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShippingQuote {
    /// Carrier service id (e.g. "pac", "sedex", or a numeric API id)
    pub service_id: String,
    pub service_name: String,
    pub carrier: String,
    pub price: f64,
    pub delivery: DeliveryWindow,
    pub declared_value: f64,
    /// True when the quote came from the local fallback table
    #[serde(default)]
    pub estimated: bool,
}

/// Charge handle returned by the payment provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentRecord {
    pub charge_id: String,
    /// Hosted checkout URL for redirect-style providers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    /// Raw provider status detail, kept as metadata only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Shipping label record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShippingLabel {
    pub label_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    pub tracking_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_url: Option<String>,
    /// Carrier-reported state of the label itself
    pub status: ShippingStatus,
    /// True for synthetic labels issued when the carrier lacks
    /// label-creation support; must never be presented to the
    /// customer as a real tracking number without this flag
    #[serde(default)]
    pub simulated: bool,
    pub created_at: DateTime<Utc>,
}

/// A customer order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    /// Opaque, human-shareable, collision-resistant id
    pub id: String,
    pub buyer: Buyer,
    pub items: Vec<LineItem>,
    pub subtotal: f64,
    pub shipping: ShippingQuote,
    /// Payment-method surcharge included in `total`
    pub surcharge: f64,
    /// subtotal + shipping.price + surcharge, computed once at creation
    pub total: f64,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub shipping_status: ShippingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment: Option<PaymentRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<ShippingLabel>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Total cart weight in kg, using the store default for items
    /// without a declared weight
    pub fn total_weight_kg(&self, default_item_weight: f64) -> f64 {
        self.items
            .iter()
            .map(|i| i.weight_kg.unwrap_or(default_item_weight) * i.quantity as f64)
            .sum()
    }
}

const ID_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Generate a human-shareable order id: `ORD-<base36 millis>-<random>`
///
/// The timestamp prefix keeps ids roughly sortable; the random suffix
/// makes collisions under concurrent checkouts implausible.
pub fn generate_order_id() -> String {
    let millis = Utc::now().timestamp_millis().max(0) as u64;
    let mut ts = String::new();
    let mut n = millis;
    while n > 0 {
        ts.push(ID_ALPHABET[(n % 36) as usize] as char);
        n /= 36;
    }
    let ts: String = ts.chars().rev().collect();

    let mut rng = rand::thread_rng();
    let suffix: String = (0..5)
        .map(|_| ID_ALPHABET[rng.gen_range(0..36)] as char)
        .collect();

    format!("ORD-{}-{}", ts, suffix)
}

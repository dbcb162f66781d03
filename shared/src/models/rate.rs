//! Shipping rate quote types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Delivery time window in business days
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeliveryWindow {
    pub min_days: u32,
    pub max_days: u32,
}

impl DeliveryWindow {
    pub fn new(min_days: u32, max_days: u32) -> Self {
        Self { min_days, max_days }
    }
}

impl fmt::Display for DeliveryWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.min_days == self.max_days {
            write!(f, "{}", self.min_days)
        } else {
            write!(f, "{}-{}", self.min_days, self.max_days)
        }
    }
}

/// A transient shipping rate quote
///
/// Produced by the rate estimator, consumed immediately by the
/// orchestrator to lock an order's shipping quote. Never persisted or
/// mutated on its own.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RateQuote {
    /// Service id (e.g. "pac", "sedex", or a numeric carrier id)
    pub service_id: String,
    pub service_name: String,
    /// Carrier company name
    pub carrier: String,
    pub price: f64,
    pub delivery: DeliveryWindow,
    /// Insured/declared value the quote was computed for
    pub declared_value: f64,
    /// True when computed by the local fallback table rather than the
    /// carrier API; approximate, not authoritative
    #[serde(default)]
    pub estimated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

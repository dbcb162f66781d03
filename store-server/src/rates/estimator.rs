//! Carrier-backed rate estimation with local fallback
//!
//! The primary path calls the carrier's calculator endpoint; any
//! transport error, non-2xx status, malformed body, or an absent/
//! placeholder credential falls back to the local rate tables. A valid
//! postal code therefore always yields at least one quote - fallback
//! success is success, marked `estimated: true`.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use shared::models::rate::{DeliveryWindow, RateQuote};

use crate::core::Config;
use crate::core::config::{PackageDimensions, is_placeholder_token};
use crate::rates::fallback;
use crate::utils::validation::{format_postal_code, normalize_postal_code, validate_positive};

/// Rate estimation error - only bad input reaches the caller
#[derive(Debug, thiserror::Error)]
pub enum RateError {
    #[error("invalid input: {0}")]
    Validation(String),
}

/// Internal carrier call failure, always handled by falling back
#[derive(Debug, thiserror::Error)]
enum CarrierError {
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("carrier returned HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("malformed carrier response: {0}")]
    Malformed(String),
}

/// Carriers quote prices as numbers or numeric strings
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PriceField {
    Num(f64),
    Str(String),
}

impl PriceField {
    fn value(&self) -> Option<f64> {
        match self {
            PriceField::Num(n) => Some(*n),
            PriceField::Str(s) => s.parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CarrierCompany {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeliveryRange {
    #[serde(default)]
    min: Option<u32>,
    #[serde(default)]
    max: Option<u32>,
}

/// One service line from the carrier calculator
#[derive(Debug, Deserialize)]
struct CarrierRate {
    id: serde_json::Value,
    name: String,
    #[serde(default)]
    company: Option<CarrierCompany>,
    #[serde(default)]
    price: Option<PriceField>,
    #[serde(default)]
    delivery_time: Option<u32>,
    #[serde(default)]
    delivery_range: Option<DeliveryRange>,
    /// Carrier-side per-line error; errored lines are dropped
    #[serde(default)]
    error: Option<String>,
}

/// Shipping rate estimator
pub struct RateEstimator {
    http: reqwest::Client,
    base_url: String,
    token: String,
    origin_postal_code: String,
    package: PackageDimensions,
}

impl RateEstimator {
    pub fn new(config: &Config) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: config.super_frete_base_url.clone(),
            token: config.super_frete_token.clone(),
            origin_postal_code: config.origin_postal_code.clone(),
            package: config.package_dimensions,
        }
    }

    /// Quote shipping options for a destination, weight, and declared value
    ///
    /// Errors only on invalid input; carrier unavailability degrades
    /// to the local fallback table.
    pub async fn quote(
        &self,
        destination_postal_code: &str,
        total_weight_kg: f64,
        declared_value: f64,
    ) -> Result<Vec<RateQuote>, RateError> {
        let destination = normalize_postal_code(destination_postal_code)
            .map_err(|e| RateError::Validation(e.to_string()))?;
        validate_positive(total_weight_kg, "weight")
            .map_err(|e| RateError::Validation(e.to_string()))?;
        validate_positive(declared_value, "declared value")
            .map_err(|e| RateError::Validation(e.to_string()))?;

        if is_placeholder_token(&self.token) {
            tracing::warn!("Carrier credential unconfigured; using fallback rates");
            return Ok(self.fallback(&destination, total_weight_kg, declared_value));
        }

        match self
            .carrier_quote(&destination, total_weight_kg, declared_value)
            .await
        {
            Ok(quotes) if !quotes.is_empty() => Ok(quotes),
            Ok(_) => {
                tracing::warn!(destination = %destination,
                    "Carrier returned no usable rates; using fallback");
                Ok(self.fallback(&destination, total_weight_kg, declared_value))
            }
            Err(e) => {
                tracing::warn!(destination = %destination, error = %e,
                    "Carrier quote failed; using fallback");
                Ok(self.fallback(&destination, total_weight_kg, declared_value))
            }
        }
    }

    fn fallback(&self, destination: &str, weight_kg: f64, declared_value: f64) -> Vec<RateQuote> {
        fallback::fallback_quotes(&self.origin_postal_code, destination, weight_kg, declared_value)
    }

    async fn carrier_quote(
        &self,
        destination: &str,
        weight_kg: f64,
        declared_value: f64,
    ) -> Result<Vec<RateQuote>, CarrierError> {
        let body = json!({
            "from": { "postal_code": format_postal_code(&self.origin_postal_code) },
            "to": { "postal_code": format_postal_code(destination) },
            "services": "1,2,17",
            "options": {
                "own_hand": false,
                "receipt": false,
                "insurance_value": declared_value,
                "use_insurance_value": true,
            },
            "products": [{
                "quantity": 1,
                "height": self.package.height_cm,
                "width": self.package.width_cm,
                "length": self.package.length_cm,
                "weight": weight_kg,
            }],
        });

        let response = self
            .http
            .post(format!("{}/api/v0/calculator", self.base_url))
            .bearer_auth(&self.token)
            .header("accept", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CarrierError::Status(response.status()));
        }

        let lines: Vec<CarrierRate> = response
            .json()
            .await
            .map_err(|e| CarrierError::Malformed(e.to_string()))?;

        Ok(lines
            .into_iter()
            .filter_map(|line| to_quote(line, declared_value))
            .collect())
    }
}

/// Convert a carrier line into a RateQuote, dropping errored or
/// priceless lines
fn to_quote(line: CarrierRate, declared_value: f64) -> Option<RateQuote> {
    if let Some(err) = line.error {
        tracing::debug!(service = %line.name, error = %err, "Dropping errored carrier line");
        return None;
    }
    let price = line.price.as_ref().and_then(PriceField::value)?;
    if price <= 0.0 {
        return None;
    }

    let delivery = match (&line.delivery_range, line.delivery_time) {
        (Some(range), _) if range.min.is_some() || range.max.is_some() => {
            let min = range.min.or(range.max).unwrap_or(5);
            let max = range.max.or(range.min).unwrap_or(8);
            DeliveryWindow::new(min, max)
        }
        (_, Some(days)) => DeliveryWindow::new(days, days),
        _ => DeliveryWindow::new(5, 8),
    };

    Some(RateQuote {
        service_id: line.id.to_string().trim_matches('"').to_string(),
        service_name: line.name,
        carrier: line
            .company
            .and_then(|c| c.name)
            .unwrap_or_else(|| "Correios".into()),
        price: shared::money::round2(price),
        delivery,
        declared_value,
        estimated: false,
        description: None,
    })
}

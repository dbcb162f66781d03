//! Address lookup collaborator (ViaCEP)
//!
//! Resolves a postal code to street/district/city/state, used only to
//! validate and enrich the shipping address before quoting. Lookup
//! failure is never fatal to checkout - the buyer-supplied address
//! stands on its own.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::core::Config;
use crate::utils::validation::normalize_postal_code;

#[derive(Debug, thiserror::Error)]
pub enum AddressError {
    #[error("invalid postal code: {0}")]
    Validation(String),

    #[error("postal code not found: {0}")]
    NotFound(String),

    #[error("address lookup unavailable: {0}")]
    Transient(String),
}

impl From<reqwest::Error> for AddressError {
    fn from(e: reqwest::Error) -> Self {
        AddressError::Transient(e.to_string())
    }
}

/// Address data resolved from a postal code
#[derive(Debug, Clone, serde::Serialize)]
pub struct ResolvedAddress {
    pub postal_code: String,
    pub street: String,
    pub district: String,
    pub city: String,
    pub state: String,
}

/// Postal-code resolution interface
#[async_trait]
pub trait AddressLookup: Send + Sync {
    async fn resolve(&self, postal_code: &str) -> Result<ResolvedAddress, AddressError>;
}

/// ViaCEP response; `erro: true` signals an unknown CEP
#[derive(Debug, Deserialize)]
struct ViaCepResponse {
    #[serde(default)]
    erro: bool,
    #[serde(default)]
    cep: Option<String>,
    #[serde(default)]
    logradouro: Option<String>,
    #[serde(default)]
    bairro: Option<String>,
    #[serde(default)]
    localidade: Option<String>,
    #[serde(default)]
    uf: Option<String>,
}

/// ViaCEP client
pub struct ViaCepClient {
    http: reqwest::Client,
    base_url: String,
}

impl ViaCepClient {
    pub fn new(config: &Config) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: config.viacep_base_url.clone(),
        }
    }
}

#[async_trait]
impl AddressLookup for ViaCepClient {
    async fn resolve(&self, postal_code: &str) -> Result<ResolvedAddress, AddressError> {
        let digits = normalize_postal_code(postal_code)
            .map_err(|e| AddressError::Validation(e.to_string()))?;

        let response = self
            .http
            .get(format!("{}/{}/json/", self.base_url, digits))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AddressError::Transient(format!(
                "lookup failed: HTTP {}",
                response.status()
            )));
        }

        let data: ViaCepResponse = response
            .json()
            .await
            .map_err(|e| AddressError::Transient(format!("malformed lookup response: {e}")))?;

        if data.erro {
            return Err(AddressError::NotFound(digits));
        }

        Ok(ResolvedAddress {
            postal_code: data
                .cep
                .map(|c| c.chars().filter(|ch| ch.is_ascii_digit()).collect())
                .unwrap_or(digits),
            street: data.logradouro.unwrap_or_default(),
            district: data.bairro.unwrap_or_default(),
            city: data.localidade.unwrap_or_default(),
            state: data.uf.unwrap_or_default(),
        })
    }
}

//! Rates API Handlers

use std::time::Duration;

use axum::{Json, extract::State};
use serde::Deserialize;
use shared::models::rate::RateQuote;

use crate::core::ServerState;
use crate::rates::RateError;
use crate::utils::validation::normalize_postal_code;
use crate::utils::{AppError, AppResponse, AppResult, ok};

/// Quote requests allowed per destination per window
const QUOTE_MAX_ATTEMPTS: usize = 30;
const QUOTE_WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
pub struct QuoteRequest {
    pub postal_code: String,
    pub weight_kg: f64,
    pub declared_value: f64,
}

/// Quote shipping options for a destination
///
/// Always answers with at least one quote for a valid input; carrier
/// outages degrade to table-based estimates flagged `estimated`.
pub async fn quote(
    State(state): State<ServerState>,
    Json(payload): Json<QuoteRequest>,
) -> AppResult<Json<AppResponse<Vec<RateQuote>>>> {
    let destination = normalize_postal_code(&payload.postal_code)?;

    if !state
        .rate_limiter
        .check("quote", &destination, QUOTE_MAX_ATTEMPTS, QUOTE_WINDOW)
    {
        return Err(AppError::RateLimited(
            "too many quote requests for this destination".into(),
        ));
    }

    let quotes = state
        .rates
        .quote(&destination, payload.weight_kg, payload.declared_value)
        .await
        .map_err(|e| match e {
            RateError::Validation(msg) => AppError::Validation(msg),
        })?;
    Ok(ok(quotes))
}

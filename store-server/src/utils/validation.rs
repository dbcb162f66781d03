//! Input validation helpers
//!
//! Field validation shared by the rate estimator, orchestrator, and
//! provider payload builders. Postal codes are Brazilian CEPs:
//! exactly 8 digits after stripping punctuation.

use crate::utils::AppError;

/// Normalize a postal code to its 8-digit form
///
/// Accepts formatted ("59140-000") or bare ("59140000") input.
pub fn normalize_postal_code(raw: &str) -> Result<String, AppError> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() != 8 {
        return Err(AppError::validation(format!(
            "postal code must have 8 digits, got {:?}",
            raw
        )));
    }
    Ok(digits)
}

/// Format an 8-digit postal code as "12345-678" for provider payloads
pub fn format_postal_code(digits: &str) -> String {
    if digits.len() == 8 {
        format!("{}-{}", &digits[..5], &digits[5..])
    } else {
        digits.to_string()
    }
}

/// Validate a positive, finite weight or monetary amount
pub fn validate_positive(value: f64, field: &str) -> Result<(), AppError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(AppError::validation(format!(
            "{field} must be positive, got {value}"
        )));
    }
    Ok(())
}

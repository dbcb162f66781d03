//! Money calculation utilities using rust_decimal for precision
//!
//! All monetary arithmetic is done with `Decimal` internally, then
//! converted back to `f64` for storage/serialization. Rounding is
//! 2 decimal places, half-up, matching carrier and provider invoices.

use rust_decimal::prelude::*;

/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Tolerance for monetary comparisons (0.01)
pub const MONEY_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Flat surcharge applied to boleto payments
pub const BOLETO_SURCHARGE: f64 = 3.49;

/// Percentage surcharge applied to credit card payments (single installment)
pub const CARD_SURCHARGE_PERCENT: f64 = 4.99;

/// Convert f64 to Decimal
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or(Decimal::ZERO)
}

/// Convert Decimal to f64, rounded to 2 decimal places
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or(0.0)
}

/// Round an f64 monetary value to 2 decimal places (half-up)
#[inline]
pub fn round2(value: f64) -> f64 {
    to_f64(to_decimal(value))
}

/// Sum of `unit_price * quantity` over line items, exact to 2 decimals
pub fn line_subtotal(items: impl IntoIterator<Item = (f64, i32)>) -> f64 {
    let mut total = Decimal::ZERO;
    for (price, quantity) in items {
        total += to_decimal(price) * Decimal::from(quantity);
    }
    to_f64(total)
}

/// Compute the order total: subtotal + shipping + payment surcharge
///
/// Computed once at order creation and never silently recomputed.
pub fn order_total(subtotal: f64, shipping: f64, surcharge: f64) -> f64 {
    to_f64(to_decimal(subtotal) + to_decimal(shipping) + to_decimal(surcharge))
}

/// Whether two monetary values are equal within tolerance
pub fn money_eq(a: f64, b: f64) -> bool {
    (to_decimal(a) - to_decimal(b)).abs() <= MONEY_TOLERANCE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtotal_is_exact_over_float_unfriendly_prices() {
        // 0.1 + 0.2 style accumulation must not drift
        let items = vec![(19.99, 3), (0.1, 1), (0.2, 1)];
        assert_eq!(line_subtotal(items), 60.27);
    }

    #[test]
    fn total_adds_all_three_components() {
        assert_eq!(order_total(60.27, 15.50, 3.49), 79.26);
    }

    #[test]
    fn round2_uses_half_up() {
        assert_eq!(round2(8.505), 8.51);
        assert_eq!(round2(8.504), 8.50);
    }

    #[test]
    fn money_eq_tolerates_a_cent() {
        assert!(money_eq(10.00, 10.01));
        assert!(!money_eq(10.00, 10.02));
    }
}

//! Local fallback rate tables
//!
//! Pure functions computing a best-effort shipping quote when the
//! carrier API is unreachable or unconfigured. Distances come from a
//! symmetric macro-region table keyed by the leading postal-code
//! digit; prices are flat weight tiers per service class with a
//! distance surcharge once the route crosses fixed thresholds. The
//! constants are rough estimates, not carrier-accurate tariffs.

use shared::models::rate::{DeliveryWindow, RateQuote};
use shared::money::round2;

/// Macro-regions covered by the distance table
const REGIONS: [&str; 13] = [
    "SP", "RJ", "MG", "PR", "SC", "RS", "DF", "GO", "BA", "PE", "CE", "PA", "AM",
];

/// Symmetric region-to-region distances in distance-units
const DISTANCES: [[u32; 13]; 13] = [
    // SP    RJ    MG    PR    SC    RS    DF    GO    BA    PE    CE    PA    AM
    [0, 400, 500, 300, 600, 800, 900, 800, 1000, 2000, 2500, 3000, 4000], // SP
    [400, 0, 300, 700, 1000, 1200, 1000, 1100, 800, 1800, 2200, 2800, 3800], // RJ
    [500, 300, 0, 800, 1100, 1300, 600, 700, 500, 1500, 1900, 2500, 3500], // MG
    [300, 700, 800, 0, 300, 500, 1200, 1300, 1500, 2300, 2700, 3300, 4300], // PR
    [600, 1000, 1100, 300, 0, 200, 1500, 1600, 1800, 2600, 3000, 3600, 4600], // SC
    [800, 1200, 1300, 500, 200, 0, 1700, 1800, 2000, 2800, 3200, 3800, 4800], // RS
    [900, 1000, 600, 1200, 1500, 1700, 0, 100, 800, 1600, 2000, 2600, 3600], // DF
    [800, 1100, 700, 1300, 1600, 1800, 100, 0, 900, 1700, 2100, 2700, 3700], // GO
    [1000, 800, 500, 1500, 1800, 2000, 800, 900, 0, 800, 1200, 1800, 2800], // BA
    [2000, 1800, 1500, 2300, 2600, 2800, 1600, 1700, 800, 0, 400, 1000, 2000], // PE
    [2500, 2200, 1900, 2700, 3000, 3200, 2000, 2100, 1200, 400, 0, 600, 1600], // CE
    [3000, 2800, 2500, 3300, 3600, 3800, 2600, 2700, 1800, 1000, 600, 0, 1000], // PA
    [4000, 3800, 3500, 4300, 4600, 4800, 3600, 3700, 2800, 2000, 1600, 1000, 0], // AM
];

/// Distance for unknown region pairs
const DEFAULT_DISTANCE: u32 = 1000;

/// Macro-region for a normalized 8-digit postal code
///
/// Keyed by the leading digit; codes outside the map fall back to the
/// São Paulo region.
pub fn region_of(postal_code: &str) -> &'static str {
    match postal_code.as_bytes().first() {
        Some(b'0') | Some(b'1') => "SP",
        Some(b'2') => "RJ",
        Some(b'3') => "MG",
        Some(b'4') => "RS",
        Some(b'5') => "PE",
        Some(b'6') => "CE",
        Some(b'7') => "BA",
        Some(b'8') => "PR",
        Some(b'9') => "DF",
        _ => "SP",
    }
}

fn region_index(region: &str) -> Option<usize> {
    REGIONS.iter().position(|r| *r == region)
}

/// Approximate distance between two postal codes, in distance-units
pub fn distance_between(origin_postal_code: &str, dest_postal_code: &str) -> u32 {
    let from = region_index(region_of(origin_postal_code));
    let to = region_index(region_of(dest_postal_code));
    match (from, to) {
        (Some(f), Some(t)) => DISTANCES[f][t],
        _ => DEFAULT_DISTANCE,
    }
}

/// Fallback service classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackService {
    /// PAC-like economy tier
    Economy,
    /// SEDEX-like express tier
    Express,
    /// Next-morning express, only offered up to 1 kg
    ExpressTen,
}

/// Tiered economy price: flat weight steps plus distance surcharges
pub fn economy_price(weight_kg: f64, distance: u32) -> f64 {
    let mut price = if weight_kg <= 0.3 {
        8.50
    } else if weight_kg <= 0.5 {
        10.50
    } else if weight_kg <= 1.0 {
        12.50
    } else if weight_kg <= 2.0 {
        15.50
    } else if weight_kg <= 3.0 {
        18.50
    } else if weight_kg <= 5.0 {
        22.50
    } else if weight_kg <= 10.0 {
        30.50
    } else {
        30.50 + (weight_kg - 10.0) * 2.5
    };

    if distance > 1000 {
        price += 5.0;
    }
    if distance > 2000 {
        price += 10.0;
    }
    if distance > 3000 {
        price += 15.0;
    }

    round2(price)
}

/// Tiered express price
pub fn express_price(weight_kg: f64, distance: u32) -> f64 {
    let mut price = if weight_kg <= 0.3 {
        15.50
    } else if weight_kg <= 0.5 {
        18.50
    } else if weight_kg <= 1.0 {
        22.50
    } else if weight_kg <= 2.0 {
        28.50
    } else if weight_kg <= 3.0 {
        34.50
    } else if weight_kg <= 5.0 {
        42.50
    } else if weight_kg <= 10.0 {
        55.50
    } else {
        55.50 + (weight_kg - 10.0) * 4.5
    };

    if distance > 1000 {
        price += 8.0;
    }
    if distance > 2000 {
        price += 15.0;
    }
    if distance > 3000 {
        price += 25.0;
    }

    round2(price)
}

/// Next-morning express price, None above 1 kg
pub fn express_ten_price(weight_kg: f64, distance: u32) -> Option<f64> {
    let mut price = if weight_kg <= 0.3 {
        25.50
    } else if weight_kg <= 0.5 {
        30.50
    } else if weight_kg <= 1.0 {
        35.50
    } else {
        return None;
    };

    if distance > 1000 {
        price += 10.0;
    }
    if distance > 2000 {
        price += 20.0;
    }
    if distance > 3000 {
        price += 35.0;
    }

    Some(round2(price))
}

/// Delivery window by service and distance category
/// (local < 200, regional < 1000, national otherwise)
pub fn delivery_window(service: FallbackService, distance: u32) -> DeliveryWindow {
    let category = if distance < 200 {
        0
    } else if distance < 1000 {
        1
    } else {
        2
    };
    match (service, category) {
        (FallbackService::Economy, 0) => DeliveryWindow::new(2, 3),
        (FallbackService::Economy, 1) => DeliveryWindow::new(3, 5),
        (FallbackService::Economy, _) => DeliveryWindow::new(5, 8),
        (FallbackService::Express, 0) => DeliveryWindow::new(1, 2),
        (FallbackService::Express, 1) => DeliveryWindow::new(2, 3),
        (FallbackService::Express, _) => DeliveryWindow::new(3, 5),
        (FallbackService::ExpressTen, 0) => DeliveryWindow::new(1, 1),
        (FallbackService::ExpressTen, 1) => DeliveryWindow::new(1, 2),
        (FallbackService::ExpressTen, _) => DeliveryWindow::new(2, 3),
    }
}

/// Compute all fallback quotes for a route
///
/// Always returns at least the economy and express options for a
/// valid postal code; every quote carries `estimated: true`.
pub fn fallback_quotes(
    origin_postal_code: &str,
    dest_postal_code: &str,
    weight_kg: f64,
    declared_value: f64,
) -> Vec<RateQuote> {
    let distance = distance_between(origin_postal_code, dest_postal_code);

    let mut quotes = vec![
        RateQuote {
            service_id: "pac".into(),
            service_name: "PAC".into(),
            carrier: "Correios".into(),
            price: economy_price(weight_kg, distance),
            delivery: delivery_window(FallbackService::Economy, distance),
            declared_value,
            estimated: true,
            description: Some("Economy shipping".into()),
        },
        RateQuote {
            service_id: "sedex".into(),
            service_name: "SEDEX".into(),
            carrier: "Correios".into(),
            price: express_price(weight_kg, distance),
            delivery: delivery_window(FallbackService::Express, distance),
            declared_value,
            estimated: true,
            description: Some("Express shipping".into()),
        },
    ];

    if let Some(price) = express_ten_price(weight_kg, distance) {
        quotes.push(RateQuote {
            service_id: "sedex10".into(),
            service_name: "SEDEX 10".into(),
            carrier: "Correios".into(),
            price,
            delivery: delivery_window(FallbackService::ExpressTen, distance),
            declared_value,
            estimated: true,
            description: Some("Delivery by 10am".into()),
        });
    }

    quotes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_region_has_zero_distance() {
        // Both CEPs lead with 0/1 -> SP
        assert_eq!(distance_between("01310100", "11000000"), 0);
    }

    #[test]
    fn distance_table_is_symmetric() {
        for i in 0..13 {
            for j in 0..13 {
                assert_eq!(DISTANCES[i][j], DISTANCES[j][i]);
            }
        }
    }

    #[test]
    fn light_parcel_same_region_hits_lowest_tier() {
        // 0.3 kg, origin region == destination region: lowest economy
        // tier with no distance surcharge
        assert_eq!(economy_price(0.3, 0), 8.50);
        assert_eq!(express_price(0.3, 0), 15.50);
    }

    #[test]
    fn heavy_parcel_far_route_gets_over_ten_formula_plus_surcharges() {
        // 12 kg over a >3000 route: 30.50 + 2 * 2.5 base, then the
        // cumulative distance surcharges (5 + 10 + 15)
        assert_eq!(economy_price(12.0, 3500), 65.50);
        // Express: 55.50 + 2 * 4.5, then 8 + 15 + 25
        assert_eq!(express_price(12.0, 3500), 112.50);
    }

    #[test]
    fn surcharges_apply_in_steps() {
        let base = economy_price(1.0, 1000);
        assert_eq!(economy_price(1.0, 1001), base + 5.0);
        assert_eq!(economy_price(1.0, 2001), base + 15.0);
        assert_eq!(economy_price(1.0, 3001), base + 30.0);
    }

    #[test]
    fn express_ten_is_limited_to_one_kg() {
        assert_eq!(express_ten_price(0.3, 0), Some(25.50));
        assert_eq!(express_ten_price(1.0, 0), Some(35.50));
        assert_eq!(express_ten_price(1.1, 0), None);
    }

    #[test]
    fn fallback_quotes_are_marked_estimated() {
        let quotes = fallback_quotes("59140000", "01310100", 0.3, 100.0);
        assert!(quotes.len() >= 2);
        assert!(quotes.iter().all(|q| q.estimated));
        assert!(quotes.iter().all(|q| q.price > 0.0));
    }

    #[test]
    fn heavy_cart_drops_express_ten() {
        let quotes = fallback_quotes("59140000", "01310100", 5.0, 100.0);
        assert!(quotes.iter().all(|q| q.service_id != "sedex10"));
    }

    #[test]
    fn delivery_windows_stretch_with_distance() {
        let near = delivery_window(FallbackService::Economy, 100);
        let far = delivery_window(FallbackService::Economy, 3500);
        assert!(far.max_days > near.max_days);
    }
}

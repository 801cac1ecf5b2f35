//! Floor price estimation from a moving average and historical volatility.
//!
//! A floor is `MA × (1 − k × σ_daily)` where `σ_daily` is the annualized
//! historical volatility scaled down by `sqrt(252)`. Results are rounded to
//! cents, half to even.
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::{FloorEstimate, FloorVariant, TechnicalSnapshot};

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Convert an annualized volatility percentage to a daily fraction.
pub fn daily_volatility(annual_volatility_pct: f64) -> f64 {
    (annual_volatility_pct / 100.0) / TRADING_DAYS_PER_YEAR.sqrt()
}

/// Round to two decimals, half to even.
pub fn round_cents(value: f64) -> Option<f64> {
    Decimal::from_f64(value)
        .map(|d| d.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven))
        .and_then(|d| d.to_f64())
}

/// Floor price for one (moving average, volatility, sigma) triple.
///
/// Returns `None` when either input is absent, when the moving average is not
/// positive, when the volatility is negative, or when the resulting floor is
/// not a positive price.
pub fn floor_price(
    moving_average: Option<f64>,
    volatility_pct: Option<f64>,
    sigma: f64,
) -> Option<f64> {
    let ma = moving_average.filter(|v| v.is_finite() && *v > 0.0)?;
    let hv = volatility_pct.filter(|v| v.is_finite() && *v >= 0.0)?;
    if !sigma.is_finite() {
        return None;
    }

    let raw = ma * (1.0 - sigma * daily_volatility(hv));
    round_cents(raw).filter(|floor| *floor > 0.0)
}

/// Every computable floor of `snapshot`, one per variant, in variant order.
pub fn compute_floors(snapshot: &TechnicalSnapshot, variants: &[FloorVariant]) -> Vec<FloorEstimate> {
    variants
        .iter()
        .filter_map(|variant| {
            let ma = snapshot.moving_averages.get(variant.window);
            let hv = snapshot.historical_volatility.get(variant.window);
            let floor = floor_price(ma, hv, variant.sigma)?;
            Some(FloorEstimate {
                symbol: snapshot.symbol.clone(),
                variant: *variant,
                moving_average: ma?,
                historical_volatility: hv?,
                floor_price: floor,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MaWindow, TickerSymbol};

    #[test]
    fn test_daily_volatility() {
        let daily = daily_volatility(31.75);
        assert!((daily - 0.02).abs() < 1e-4);
    }

    #[test]
    fn test_floor_two_sigma() {
        assert_eq!(floor_price(Some(100.0), Some(31.75), 2.0), Some(96.0));
    }

    #[test]
    fn test_floor_formula_matches_definition() {
        let ma = 57.31;
        let hv = 44.2;
        for sigma in [1.0, 2.0, 3.0] {
            let expected = ma * (1.0 - sigma * (hv / 100.0) / 252f64.sqrt());
            let floor = floor_price(Some(ma), Some(hv), sigma).unwrap();
            assert!((floor - expected).abs() <= 0.005 + 1e-9);
        }
    }

    #[test]
    fn test_floor_zero_volatility_is_average() {
        assert_eq!(floor_price(Some(123.456), Some(0.0), 3.0), Some(123.46));
    }

    #[test]
    fn test_floor_not_computable() {
        assert_eq!(floor_price(None, Some(30.0), 2.0), None);
        assert_eq!(floor_price(Some(100.0), None, 2.0), None);
        assert_eq!(floor_price(Some(0.0), Some(30.0), 2.0), None);
        assert_eq!(floor_price(Some(100.0), Some(-1.0), 2.0), None);
        assert_eq!(floor_price(Some(100.0), Some(30.0), f64::NAN), None);
        // Volatility so large the floor would be negative
        assert_eq!(floor_price(Some(100.0), Some(5000.0), 3.0), None);
    }

    #[test]
    fn test_round_half_even() {
        use rust_decimal_macros::dec;
        let d = dec!(2.345).round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven);
        assert_eq!(d, dec!(2.34));
        assert_eq!(round_cents(96.0), Some(96.0));

        // Exact binary midpoints resolve to the even cent
        assert_eq!(round_cents(0.125), Some(0.12));
        assert_eq!(round_cents(0.375), Some(0.38));
        assert_eq!(round_cents(96.125), Some(96.12));
    }

    #[test]
    fn test_compute_floors_skips_missing_windows() {
        let mut snapshot = TechnicalSnapshot::empty(TickerSymbol::parse("XYZ").unwrap());
        snapshot.moving_averages.set(MaWindow::Day20, 100.0);
        snapshot.historical_volatility.set(MaWindow::Day20, 31.75);
        snapshot.moving_averages.set(MaWindow::Day50, 98.0);

        let variants = vec![
            FloorVariant::new(MaWindow::Day20, 1.0),
            FloorVariant::new(MaWindow::Day20, 2.0),
            FloorVariant::new(MaWindow::Day50, 2.0),
        ];
        let floors = compute_floors(&snapshot, &variants);

        assert_eq!(floors.len(), 2);
        assert_eq!(floors[0].floor_price, 98.0);
        assert_eq!(floors[1].floor_price, 96.0);
        assert!(floors.iter().all(|f| f.variant.window == MaWindow::Day20));
    }

    #[test]
    fn test_compute_floors_order_independent() {
        let mut snapshot = TechnicalSnapshot::empty(TickerSymbol::parse("XYZ").unwrap());
        snapshot.moving_averages.set(MaWindow::Day20, 80.0);
        snapshot.historical_volatility.set(MaWindow::Day20, 25.0);
        snapshot.moving_averages.set(MaWindow::Day50, 75.0);
        snapshot.historical_volatility.set(MaWindow::Day50, 20.0);

        let forward = vec![
            FloorVariant::new(MaWindow::Day20, 1.0),
            FloorVariant::new(MaWindow::Day50, 3.0),
        ];
        let reversed: Vec<_> = forward.iter().rev().copied().collect();

        let mut a = compute_floors(&snapshot, &forward);
        let mut b = compute_floors(&snapshot, &reversed);
        a.sort_by(|x, y| x.variant.cmp(&y.variant));
        b.sort_by(|x, y| x.variant.cmp(&y.variant));
        assert_eq!(a, b);
    }
}

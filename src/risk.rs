//! Position sizing and leverage
//!
//! Contract-aware sizing: margin times leverage buys notional, the raw
//! quantity is floored to the exchange quantity step, and anything below the
//! contract minimum is rejected so the engine holds instead of sending a
//! sub-minimum order.
//!
//! Rounding runs in decimal arithmetic. Binary floating point cannot floor
//! `1.0 / 0.001` reliably (the quotient lands a hair below 1000), which
//! would shave a step off clean quantities.

use rust_decimal::prelude::*;
use rust_decimal::Decimal;

/// Compute the order quantity for a new entry.
///
/// Returns 0.0 when the inputs cannot produce a valid order: non-positive
/// equity, entry price, or margin fraction, or a floored quantity below
/// `min_qty`.
pub fn position_size(
    equity: f64,
    margin_pct: f64,
    entry_price: f64,
    leverage: u32,
    min_qty: f64,
    quantity_step: f64,
) -> f64 {
    if equity <= 0.0 || entry_price <= 0.0 || margin_pct <= 0.0 {
        return 0.0;
    }

    let (Some(equity), Some(margin_pct), Some(entry_price)) = (
        Decimal::from_f64(equity),
        Decimal::from_f64(margin_pct),
        Decimal::from_f64(entry_price),
    ) else {
        return 0.0;
    };

    let notional = equity * margin_pct * Decimal::from(leverage);
    let raw = notional / entry_price;

    let quantity = match Decimal::from_f64(quantity_step) {
        Some(step) if step > Decimal::ZERO => (raw / step).floor() * step,
        _ => raw,
    };

    let min_qty = Decimal::from_f64(min_qty).unwrap_or(Decimal::ZERO);
    if quantity < min_qty {
        return 0.0;
    }

    quantity.to_f64().unwrap_or(0.0)
}

/// Clamp the base leverage into the configured band
pub fn compute_leverage(base: u32, min: u32, max: u32) -> u32 {
    base.clamp(min, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_size_exact_step_multiple() {
        // 1000 * 0.02 * 5 = 100 notional at entry 100: exactly 1.000
        let qty = position_size(1000.0, 0.02, 100.0, 5, 0.001, 0.001);
        assert_eq!(qty, 1.0);
    }

    #[test]
    fn test_position_size_floors_to_step() {
        // 100 notional at entry 103: raw 0.97087..., floored to 0.970
        let qty = position_size(1000.0, 0.02, 103.0, 5, 0.001, 0.001);
        assert_eq!(qty, 0.970);
    }

    #[test]
    fn test_position_size_rejects_below_minimum() {
        // 0.1 notional at entry 50000: raw 0.000002, below min 0.001
        let qty = position_size(1.0, 0.02, 50000.0, 5, 0.001, 0.001);
        assert_eq!(qty, 0.0);
    }

    #[test]
    fn test_position_size_rejects_degenerate_inputs() {
        assert_eq!(position_size(0.0, 0.02, 100.0, 5, 0.001, 0.001), 0.0);
        assert_eq!(position_size(-50.0, 0.02, 100.0, 5, 0.001, 0.001), 0.0);
        assert_eq!(position_size(1000.0, 0.0, 100.0, 5, 0.001, 0.001), 0.0);
        assert_eq!(position_size(1000.0, 0.02, 0.0, 5, 0.001, 0.001), 0.0);
    }

    #[test]
    fn test_position_size_coarse_step() {
        // raw 2.5 with step 1.0 floors to 2
        let qty = position_size(10000.0, 0.05, 1000.0, 5, 1.0, 1.0);
        assert_eq!(qty, 2.0);
    }

    #[test]
    fn test_quantity_is_step_multiple() {
        let step = 0.005;
        let qty = position_size(7531.0, 0.037, 217.0, 7, 0.005, step);
        assert!(qty > 0.0);
        let steps = qty / step;
        assert!((steps - steps.round()).abs() < 1e-9, "qty {} not on step", qty);
    }

    #[test]
    fn test_compute_leverage_clamps() {
        assert_eq!(compute_leverage(5, 5, 20), 5);
        assert_eq!(compute_leverage(3, 5, 20), 5);
        assert_eq!(compute_leverage(50, 5, 20), 20);
    }
}

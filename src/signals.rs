//! Signal generation
//!
//! Entry on Supertrend regime flips, exit on stop/target/trailing/time in a
//! fixed priority, and the 1R-gated trailing-stop ratchet.

use crate::config::StrategyConfig;
use crate::indicators::Trend;
use crate::state::OpenPosition;
use crate::types::{Reason, Side};

/// Detect a Supertrend regime flip on the closed bar at `idx`.
///
/// Fails open: warmup bars carry no regime and produce no flip.
pub fn detect_flip(trend: &[Option<Trend>], idx: usize) -> Option<Side> {
    if idx < 1 {
        return None;
    }
    match (trend[idx - 1], trend[idx]) {
        (Some(Trend::Bearish), Some(Trend::Bullish)) => Some(Side::Long),
        (Some(Trend::Bullish), Some(Trend::Bearish)) => Some(Side::Short),
        _ => None,
    }
}

/// Confirm a detected flip: the close must clear the Supertrend line by
/// `buffer_pct` of ATR, rejecting marginal crosses.
pub fn confirm_flip(side: Side, close: f64, supertrend_line: f64, atr: f64, buffer_pct: f64) -> bool {
    let buffer = buffer_pct * atr;
    match side {
        Side::Long => close >= supertrend_line + buffer,
        Side::Short => close <= supertrend_line - buffer,
    }
}

/// Evaluate exit conditions for an open position, first match wins.
///
/// Priority is stop, target, trailing, time: the intra-bar path is unknown,
/// so a bar that reaches both stop and target is assumed to have hit the
/// stop first. `stop_loss` already equals the trailing level once the
/// trailing stop has activated, so a ratcheted-stop exit reports `stop_hit`;
/// the `trailing_stop` reason covers externally supplied states that keep
/// the two levels distinct.
pub fn check_exit(
    position: &OpenPosition,
    high: f64,
    low: f64,
    close: f64,
    config: &StrategyConfig,
) -> Option<Reason> {
    match position.side {
        Side::Long => {
            if low <= position.stop_loss {
                return Some(Reason::StopHit);
            }
            if high >= position.take_profit {
                return Some(Reason::TpHit);
            }
            if let Some(trailing) = position.trailing_stop {
                if low <= trailing {
                    return Some(Reason::TrailingStop);
                }
            }
        }
        Side::Short => {
            if high >= position.stop_loss {
                return Some(Reason::StopHit);
            }
            if low <= position.take_profit {
                return Some(Reason::TpHit);
            }
            if let Some(trailing) = position.trailing_stop {
                if high >= trailing {
                    return Some(Reason::TrailingStop);
                }
            }
        }
    }

    if position.bars_in_trade >= config.max_bars_in_trade {
        if config.time_exit_flat_r > 0.0 {
            // Trades in meaningful profit are left to the trailing stop
            let risk = position.risk_distance();
            if risk > 0.0 {
                let r_multiple = match position.side {
                    Side::Long => (close - position.entry_price) / risk,
                    Side::Short => (position.entry_price - close) / risk,
                };
                if r_multiple > config.time_exit_flat_r {
                    return None;
                }
            }
        }
        return Some(Reason::TimeExit);
    }

    None
}

/// Compute the trailing-stop level for the current bar, if any.
///
/// Activates once the running extreme is at least 1R in profit. The
/// candidate level sits `tsl_atr_mult` ATRs behind the extreme and is
/// ratcheted against the previous trailing level (the effective stop on
/// first activation): it moves up for LONG, down for SHORT, never away.
pub fn update_trailing(position: &OpenPosition, atr: f64, tsl_atr_mult: f64) -> Option<f64> {
    let risk = position.risk_distance();

    match position.side {
        Side::Long => {
            let activated = position.extreme_price >= position.entry_price + risk;
            let candidate = position.extreme_price - tsl_atr_mult * atr;
            match (position.trailing_stop, activated) {
                (None, false) => None,
                (None, true) => Some(position.stop_loss.max(candidate)),
                (Some(trailing), true) => Some(trailing.max(candidate)),
                (Some(trailing), false) => Some(trailing),
            }
        }
        Side::Short => {
            let activated = position.extreme_price <= position.entry_price - risk;
            let candidate = position.extreme_price + tsl_atr_mult * atr;
            match (position.trailing_stop, activated) {
                (None, false) => None,
                (None, true) => Some(position.stop_loss.min(candidate)),
                (Some(trailing), true) => Some(trailing.min(candidate)),
                (Some(trailing), false) => Some(trailing),
            }
        }
    }
}

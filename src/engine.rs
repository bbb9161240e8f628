//! Strategy engine
//!
//! Orchestrates indicators, signals, risk, and state into a single
//! deterministic `process_candle` decision per closed bar. The engine is a
//! pure function of its inputs: no I/O, no clocks, no shared state, so
//! identical inputs always produce identical decisions.

use tracing::debug;

use crate::config::{ConfigError, StrategyConfig};
use crate::indicators::{atr_above_median, supertrend, wilder_atr};
use crate::risk::{compute_leverage, position_size};
use crate::signals::{check_exit, confirm_flip, detect_flip, update_trailing};
use crate::state::{OpenPosition, TradeState};
use crate::types::{Candle, ContractSpec, ProposedPosition, Reason, Side, StrategyOutput};

/// One decision plus the successor trade state.
///
/// The engine never mutates state in place; the caller swaps `state` in
/// atomically after acting on `output`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub output: StrategyOutput,
    pub state: TradeState,
}

impl Decision {
    fn hold(reason: Reason, state: TradeState) -> Self {
        Self {
            output: StrategyOutput::hold(reason),
            state,
        }
    }
}

/// Supertrend flip strategy over closed candles.
///
/// Holds a validated configuration; construction is the only place parameter
/// errors can surface, so a live engine never runs out of range.
#[derive(Debug, Clone)]
pub struct SupertrendStrategy {
    config: StrategyConfig,
}

impl SupertrendStrategy {
    pub fn new(config: StrategyConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    /// Process the latest closed candle and decide: enter, exit, or hold.
    ///
    /// `candles` is the chronological series ending at the current closed
    /// bar. Malformed candles or a negative/non-finite equity are classified
    /// as `HOLD`/`invalid_input` with the previous state untouched; every
    /// other data condition maps to its reason from the closed set.
    pub fn process_candle(
        &self,
        candles: &[Candle],
        equity: f64,
        contract: &ContractSpec,
        prev_state: &TradeState,
    ) -> Decision {
        if !equity.is_finite() || equity < 0.0 || candles.iter().any(|c| !c.is_valid()) {
            return Decision::hold(Reason::InvalidInput, *prev_state);
        }

        if candles.len() < self.config.atr_period + 1 {
            return Decision::hold(Reason::InsufficientData, *prev_state);
        }

        let high: Vec<f64> = candles.iter().map(|c| c.high).collect();
        let low: Vec<f64> = candles.iter().map(|c| c.low).collect();
        let close: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let idx = close.len() - 1;

        let atr = wilder_atr(&high, &low, &close, self.config.atr_period);
        let st = supertrend(&high, &low, &close, &atr, self.config.supertrend_factor);

        let atr_value = match atr[idx] {
            Some(value) if value > 0.0 => value,
            _ => return Decision::hold(Reason::InvalidAtr, *prev_state),
        };

        match prev_state.position() {
            Some(position) => self.manage_position(position, high[idx], low[idx], close[idx], atr_value),
            None => self.look_for_entry(
                &close, &high, &low, &atr, &st.line, &st.trend, idx, atr_value, equity, contract,
            ),
        }
    }

    /// Open-position path: roll the state forward, evaluate exits in
    /// priority order, otherwise ratchet the trailing stop.
    fn manage_position(
        &self,
        position: &OpenPosition,
        high: f64,
        low: f64,
        close: f64,
        atr_value: f64,
    ) -> Decision {
        let in_flight = position.advance(high, low);

        if let Some(reason) = check_exit(&in_flight, high, low, close, &self.config) {
            debug!(
                side = %in_flight.side,
                entry = in_flight.entry_price,
                bars = in_flight.bars_in_trade,
                reason = %reason,
                "position exit"
            );
            return Decision {
                output: StrategyOutput::exit(reason),
                state: TradeState::Flat,
            };
        }

        let trailing = update_trailing(&in_flight, atr_value, self.config.tsl_atr_mult);
        if trailing != in_flight.trailing_stop {
            debug!(
                side = %in_flight.side,
                trailing = ?trailing,
                extreme = in_flight.extreme_price,
                "trailing stop ratcheted"
            );
        }

        Decision::hold(
            Reason::PositionOpen,
            TradeState::Open(in_flight.with_trailing(trailing)),
        )
    }

    /// Flat path: flip detection, confirmation buffer, volatility filter,
    /// then sizing.
    #[allow(clippy::too_many_arguments)]
    fn look_for_entry(
        &self,
        close: &[f64],
        high: &[f64],
        low: &[f64],
        atr: &[Option<f64>],
        st_line: &[Option<f64>],
        st_trend: &[Option<crate::indicators::Trend>],
        idx: usize,
        atr_value: f64,
        equity: f64,
        contract: &ContractSpec,
    ) -> Decision {
        let Some(side) = detect_flip(st_trend, idx) else {
            return Decision::hold(Reason::NoFlip, TradeState::Flat);
        };

        // The line is defined wherever the trend is
        let st_value = match st_line[idx] {
            Some(value) => value,
            None => return Decision::hold(Reason::NoFlip, TradeState::Flat),
        };

        if !confirm_flip(
            side,
            close[idx],
            st_value,
            atr_value,
            self.config.flip_confirm_atr_pct,
        ) {
            debug!(side = %side, close = close[idx], line = st_value, "flip rejected by confirmation buffer");
            return Decision::hold(Reason::NoFlip, TradeState::Flat);
        }

        if self.config.volatility_filter_enabled
            && !atr_above_median(atr, idx, self.config.volatility_median_window)
        {
            debug!(side = %side, atr = atr_value, "flip rejected by volatility filter");
            return Decision::hold(Reason::VolatilityFilter, TradeState::Flat);
        }

        let entry_price = close[idx];
        let stop_distance = self.config.risk_atr_mult * atr_value;
        let (stop_loss, take_profit) = match side {
            Side::Long => (
                entry_price - stop_distance,
                entry_price + stop_distance * self.config.tp_rr,
            ),
            Side::Short => (
                entry_price + stop_distance,
                entry_price - stop_distance * self.config.tp_rr,
            ),
        };

        let leverage = compute_leverage(
            self.config.leverage,
            self.config.leverage_min,
            self.config.leverage_max,
        );
        let quantity = position_size(
            equity,
            self.config.margin_pct,
            entry_price,
            leverage,
            contract.effective_min_quantity(),
            contract.effective_quantity_step(),
        );

        if quantity <= 0.0 {
            debug!(side = %side, equity, entry = entry_price, "entry rejected: below minimum quantity");
            return Decision::hold(Reason::BelowMinQty, TradeState::Flat);
        }

        debug!(
            side = %side,
            entry = entry_price,
            stop = stop_loss,
            target = take_profit,
            quantity,
            leverage,
            "supertrend flip entry"
        );

        let position = OpenPosition::open(
            side,
            entry_price,
            stop_loss,
            take_profit,
            high[idx],
            low[idx],
        );

        Decision {
            output: StrategyOutput::entry(ProposedPosition {
                side,
                quantity,
                leverage,
                entry_price,
                stop_loss,
                take_profit,
            }),
            state: TradeState::Open(position),
        }
    }
}

//! Per-instrument trade state
//!
//! One `TradeState` value per instrument, replaced wholesale by the engine on
//! every closed candle. The serialized form is lossless over all fields so
//! the outer system can persist it across process restarts.

use serde::{Deserialize, Serialize};

use crate::types::Side;

/// An open LONG or SHORT position and its lifecycle bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OpenPosition {
    pub side: Side,

    /// Close of the bar on which the position was opened
    pub entry_price: f64,

    /// Immutable stop fixed at entry; the 1R anchor
    pub initial_stop: f64,

    /// Immutable target fixed at entry
    pub take_profit: f64,

    /// Current effective stop: equals `initial_stop` until the trailing stop
    /// activates, the trailing level afterwards
    pub stop_loss: f64,

    /// Active trailing level; `None` until 1R profit is reached. Once set it
    /// ratchets monotonically toward price and is never unset.
    pub trailing_stop: Option<f64>,

    /// Closed bars since entry; the entry bar counts as 0
    pub bars_in_trade: u32,

    /// Running max high (LONG) or min low (SHORT) since entry, inclusive of
    /// the entry bar
    pub extreme_price: f64,
}

impl OpenPosition {
    /// Open a position at the close of the current bar
    pub fn open(side: Side, entry_price: f64, initial_stop: f64, take_profit: f64, entry_bar_high: f64, entry_bar_low: f64) -> Self {
        let extreme_price = match side {
            Side::Long => entry_bar_high,
            Side::Short => entry_bar_low,
        };
        Self {
            side,
            entry_price,
            initial_stop,
            take_profit,
            stop_loss: initial_stop,
            trailing_stop: None,
            bars_in_trade: 0,
            extreme_price,
        }
    }

    /// Roll the position forward onto the next closed bar: one more bar in
    /// trade, extreme updated from the bar's high/low. An extreme of 0.0 is
    /// the legacy flat-state sentinel and is reseeded from the current bar.
    pub fn advance(&self, high: f64, low: f64) -> Self {
        let extreme_price = if self.extreme_price == 0.0 {
            match self.side {
                Side::Long => high,
                Side::Short => low,
            }
        } else {
            match self.side {
                Side::Long => self.extreme_price.max(high),
                Side::Short => self.extreme_price.min(low),
            }
        };

        Self {
            bars_in_trade: self.bars_in_trade + 1,
            extreme_price,
            ..*self
        }
    }

    /// Apply a trailing level computed for this bar. The trailing level is
    /// the effective stop once set.
    pub fn with_trailing(self, trailing: Option<f64>) -> Self {
        match trailing {
            Some(level) => Self {
                trailing_stop: Some(level),
                stop_loss: level,
                ..self
            },
            None => self,
        }
    }

    /// The 1R distance fixed at entry
    pub fn risk_distance(&self) -> f64 {
        (self.entry_price - self.initial_stop).abs()
    }
}

/// Position state of one instrument
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TradeState {
    #[default]
    Flat,
    Open(OpenPosition),
}

impl TradeState {
    /// Initial state for a fresh instrument
    pub fn flat() -> Self {
        TradeState::Flat
    }

    pub fn is_flat(&self) -> bool {
        matches!(self, TradeState::Flat)
    }

    pub fn position(&self) -> Option<&OpenPosition> {
        match self {
            TradeState::Flat => None,
            TradeState::Open(position) => Some(position),
        }
    }
}

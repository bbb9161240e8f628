//! Core data types shared across the strategy core

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for candle data
#[derive(Debug, Error)]
pub enum CandleValidationError {
    #[error("candle fields must be finite: open={open}, high={high}, low={low}, close={close}, volume={volume}")]
    NonFinite {
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    },

    #[error("prices must be >= 0: open={open}, high={high}, low={low}, close={close}")]
    NegativePrice {
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    },

    #[error("high ({high}) must be >= low ({low})")]
    HighLessThanLow { high: f64, low: f64 },

    #[error("volume ({0}) must be >= 0")]
    NegativeVolume(f64),

    #[error("open ({open}) must be between low ({low}) and high ({high})")]
    OpenOutOfRange { open: f64, low: f64, high: f64 },

    #[error("close ({close}) must be between low ({low}) and high ({high})")]
    CloseOutOfRange { close: f64, low: f64, high: f64 },
}

/// OHLCV candlestick for one closed bar of a fixed timeframe.
///
/// Candles carry no timestamp: the series passed to the engine is positional,
/// one element per closed bar in chronological order, the last element being
/// the current (just-closed) bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Create a new candle with validation
    pub fn new(
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Result<Self, CandleValidationError> {
        let candle = Self {
            open,
            high,
            low,
            close,
            volume,
        };
        candle.validate()?;
        Ok(candle)
    }

    /// Create a candle without validation (for trusted sources)
    pub fn new_unchecked(open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Validate the candle data
    pub fn validate(&self) -> Result<(), CandleValidationError> {
        if !self.open.is_finite()
            || !self.high.is_finite()
            || !self.low.is_finite()
            || !self.close.is_finite()
            || !self.volume.is_finite()
        {
            return Err(CandleValidationError::NonFinite {
                open: self.open,
                high: self.high,
                low: self.low,
                close: self.close,
                volume: self.volume,
            });
        }

        if self.open < 0.0 || self.high < 0.0 || self.low < 0.0 || self.close < 0.0 {
            return Err(CandleValidationError::NegativePrice {
                open: self.open,
                high: self.high,
                low: self.low,
                close: self.close,
            });
        }

        if self.high < self.low {
            return Err(CandleValidationError::HighLessThanLow {
                high: self.high,
                low: self.low,
            });
        }

        if self.volume < 0.0 {
            return Err(CandleValidationError::NegativeVolume(self.volume));
        }

        if self.open < self.low || self.open > self.high {
            return Err(CandleValidationError::OpenOutOfRange {
                open: self.open,
                low: self.low,
                high: self.high,
            });
        }

        if self.close < self.low || self.close > self.high {
            return Err(CandleValidationError::CloseOutOfRange {
                close: self.close,
                low: self.low,
                high: self.high,
            });
        }

        Ok(())
    }

    /// Check if the candle is valid without returning detailed error
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

/// Positional (o, h, l, c, v) form, as delivered by most exchange kline feeds
impl From<(f64, f64, f64, f64, f64)> for Candle {
    fn from((open, high, low, close, volume): (f64, f64, f64, f64, f64)) -> Self {
        Self {
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

/// Per-instrument contract metadata from the exchange
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ContractSpec {
    /// Smallest orderable size
    #[serde(default = "default_contract_value")]
    pub min_quantity: f64,

    /// Tick that divides all permissible order quantities
    #[serde(default = "default_contract_value")]
    pub quantity_step: f64,
}

fn default_contract_value() -> f64 {
    0.001
}

impl Default for ContractSpec {
    fn default() -> Self {
        Self {
            min_quantity: 0.001,
            quantity_step: 0.001,
        }
    }
}

impl ContractSpec {
    /// Minimum quantity, substituting the default for unusable values
    pub fn effective_min_quantity(&self) -> f64 {
        if self.min_quantity.is_finite() && self.min_quantity > 0.0 {
            self.min_quantity
        } else {
            default_contract_value()
        }
    }

    /// Quantity step, substituting the default for unusable values
    pub fn effective_quantity_step(&self) -> f64 {
        if self.quantity_step.is_finite() && self.quantity_step > 0.0 {
            self.quantity_step
        } else {
            default_contract_value()
        }
    }
}

/// Trade direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Long,
    Short,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Long => write!(f, "LONG"),
            Side::Short => write!(f, "SHORT"),
        }
    }
}

/// Decision emitted for the current closed bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    Hold,
    Long,
    Short,
    Exit,
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Signal::Hold => "HOLD",
            Signal::Long => "LONG",
            Signal::Short => "SHORT",
            Signal::Exit => "EXIT",
        };
        write!(f, "{}", s)
    }
}

/// Closed set of reasons accompanying every decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    InsufficientData,
    InvalidAtr,
    InvalidInput,
    NoFlip,
    VolatilityFilter,
    BelowMinQty,
    PositionOpen,
    SupertrendFlip,
    StopHit,
    TpHit,
    TrailingStop,
    TimeExit,
}

impl Reason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reason::InsufficientData => "insufficient_data",
            Reason::InvalidAtr => "invalid_atr",
            Reason::InvalidInput => "invalid_input",
            Reason::NoFlip => "no_flip",
            Reason::VolatilityFilter => "volatility_filter",
            Reason::BelowMinQty => "below_min_qty",
            Reason::PositionOpen => "position_open",
            Reason::SupertrendFlip => "supertrend_flip",
            Reason::StopHit => "stop_hit",
            Reason::TpHit => "tp_hit",
            Reason::TrailingStop => "trailing_stop",
            Reason::TimeExit => "time_exit",
        }
    }

    /// True for the four reasons that close an open position
    pub fn is_exit(&self) -> bool {
        matches!(
            self,
            Reason::StopHit | Reason::TpHit | Reason::TrailingStop | Reason::TimeExit
        )
    }
}

impl std::fmt::Display for Reason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Order proposal attached to LONG/SHORT signals
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProposedPosition {
    pub side: Side,
    pub quantity: f64,
    pub leverage: u32,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
}

/// Structured output of one `process_candle` call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrategyOutput {
    pub signal: Signal,
    pub reason: Reason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proposed_position: Option<ProposedPosition>,
}

impl StrategyOutput {
    pub fn hold(reason: Reason) -> Self {
        Self {
            signal: Signal::Hold,
            reason,
            proposed_position: None,
        }
    }

    pub fn exit(reason: Reason) -> Self {
        Self {
            signal: Signal::Exit,
            reason,
            proposed_position: None,
        }
    }

    pub fn entry(position: ProposedPosition) -> Self {
        Self {
            signal: match position.side {
                Side::Long => Signal::Long,
                Side::Short => Signal::Short,
            },
            reason: Reason::SupertrendFlip,
            proposed_position: Some(position),
        }
    }
}

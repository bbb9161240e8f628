//! Strategy configuration
//!
//! Immutable parameter bundle for the Supertrend strategy. All fields have
//! serde defaults so a partial JSON object deserializes to a runnable config.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("atr_period ({0}) must be >= 2")]
    AtrPeriodTooShort(usize),

    #[error("{field} must be a positive finite number")]
    NonPositive { field: &'static str },

    #[error("margin_pct must be in (0, 1]")]
    MarginOutOfRange,

    #[error("leverage ordering must satisfy 1 <= leverage_min <= leverage <= leverage_max")]
    LeverageOrdering,

    #[error("max_bars_in_trade must be >= 1")]
    MaxBarsZero,

    #[error("volatility_median_window ({0}) must be >= 2")]
    MedianWindowTooShort(usize),

    #[error("{field} must be a non-negative finite number")]
    Negative { field: &'static str },
}

/// Strategy parameters. Immutable for deterministic behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Wilder ATR smoothing length and minimum history
    #[serde(default = "default_atr_period")]
    pub atr_period: usize,

    /// Band width multiplier for Supertrend
    #[serde(default = "default_supertrend_factor")]
    pub supertrend_factor: f64,

    /// Distance from entry to initial stop, in ATR units
    #[serde(default = "default_risk_atr_mult")]
    pub risk_atr_mult: f64,

    /// Distance from running extreme to trailing stop, in ATR units
    #[serde(default = "default_tsl_atr_mult")]
    pub tsl_atr_mult: f64,

    /// Take-profit distance as a multiple of the risk distance
    #[serde(default = "default_tp_rr")]
    pub tp_rr: f64,

    /// Fraction of equity committed as margin per entry
    #[serde(default = "default_margin_pct")]
    pub margin_pct: f64,

    /// Base leverage, clamped to [leverage_min, leverage_max]
    #[serde(default = "default_leverage")]
    pub leverage: u32,

    #[serde(default = "default_leverage")]
    pub leverage_min: u32,

    #[serde(default = "default_leverage_max")]
    pub leverage_max: u32,

    /// Time-exit threshold in closed bars
    #[serde(default = "default_max_bars_in_trade")]
    pub max_bars_in_trade: u32,

    /// Exempt trades in meaningful profit from the time exit.
    ///
    /// A position whose unrealized profit exceeds this many R at the
    /// time-exit bar keeps running and is left to the trailing stop.
    /// 0.0 disables the exemption (time exit fires unconditionally).
    #[serde(default)]
    pub time_exit_flat_r: f64,

    /// Only trade when ATR is above its rolling median (avoids chop)
    #[serde(default = "default_true")]
    pub volatility_filter_enabled: bool,

    #[serde(default = "default_volatility_median_window")]
    pub volatility_median_window: usize,

    /// Close-beyond-Supertrend buffer as a fraction of ATR
    #[serde(default = "default_flip_confirm_atr_pct")]
    pub flip_confirm_atr_pct: f64,
}

fn default_atr_period() -> usize {
    10
}
fn default_supertrend_factor() -> f64 {
    4.0
}
fn default_risk_atr_mult() -> f64 {
    2.5
}
fn default_tsl_atr_mult() -> f64 {
    2.5
}
fn default_tp_rr() -> f64 {
    2.0
}
fn default_margin_pct() -> f64 {
    0.02
}
fn default_leverage() -> u32 {
    5
}
fn default_leverage_max() -> u32 {
    20
}
fn default_max_bars_in_trade() -> u32 {
    96
}
fn default_true() -> bool {
    true
}
fn default_volatility_median_window() -> usize {
    20
}
fn default_flip_confirm_atr_pct() -> f64 {
    0.15
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            atr_period: default_atr_period(),
            supertrend_factor: default_supertrend_factor(),
            risk_atr_mult: default_risk_atr_mult(),
            tsl_atr_mult: default_tsl_atr_mult(),
            tp_rr: default_tp_rr(),
            margin_pct: default_margin_pct(),
            leverage: default_leverage(),
            leverage_min: default_leverage(),
            leverage_max: default_leverage_max(),
            max_bars_in_trade: default_max_bars_in_trade(),
            time_exit_flat_r: 0.0,
            volatility_filter_enabled: default_true(),
            volatility_median_window: default_volatility_median_window(),
            flip_confirm_atr_pct: default_flip_confirm_atr_pct(),
        }
    }
}

impl StrategyConfig {
    /// Validate parameter ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.atr_period < 2 {
            return Err(ConfigError::AtrPeriodTooShort(self.atr_period));
        }

        for (field, value) in [
            ("supertrend_factor", self.supertrend_factor),
            ("risk_atr_mult", self.risk_atr_mult),
            ("tsl_atr_mult", self.tsl_atr_mult),
            ("tp_rr", self.tp_rr),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::NonPositive { field });
            }
        }

        if !self.margin_pct.is_finite() || self.margin_pct <= 0.0 || self.margin_pct > 1.0 {
            return Err(ConfigError::MarginOutOfRange);
        }

        if self.leverage_min < 1
            || self.leverage_min > self.leverage
            || self.leverage > self.leverage_max
        {
            return Err(ConfigError::LeverageOrdering);
        }

        if self.max_bars_in_trade < 1 {
            return Err(ConfigError::MaxBarsZero);
        }

        if self.volatility_median_window < 2 {
            return Err(ConfigError::MedianWindowTooShort(
                self.volatility_median_window,
            ));
        }

        for (field, value) in [
            ("flip_confirm_atr_pct", self.flip_confirm_atr_pct),
            ("time_exit_flat_r", self.time_exit_flat_r),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Negative { field });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(StrategyConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: StrategyConfig =
            serde_json::from_str(r#"{"atr_period": 14, "supertrend_factor": 3.0}"#).unwrap();
        assert_eq!(config.atr_period, 14);
        assert_eq!(config.supertrend_factor, 3.0);
        assert_eq!(config.tp_rr, 2.0);
        assert_eq!(config.leverage_max, 20);
        assert!(config.volatility_filter_enabled);
    }

    #[test]
    fn test_validation_rejects_bad_ranges() {
        let mut config = StrategyConfig::default();
        config.atr_period = 1;
        assert_eq!(config.validate(), Err(ConfigError::AtrPeriodTooShort(1)));

        let mut config = StrategyConfig::default();
        config.margin_pct = 1.5;
        assert_eq!(config.validate(), Err(ConfigError::MarginOutOfRange));

        let mut config = StrategyConfig::default();
        config.supertrend_factor = 0.0;
        assert!(config.validate().is_err());

        let mut config = StrategyConfig::default();
        config.leverage = 25; // above leverage_max
        assert_eq!(config.validate(), Err(ConfigError::LeverageOrdering));

        let mut config = StrategyConfig::default();
        config.volatility_median_window = 1;
        assert!(config.validate().is_err());
    }
}

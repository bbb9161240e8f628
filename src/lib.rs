//! Supertrend Strategy Core
//!
//! The pure decision core of a futures-trading system: given closed price
//! candles, account equity, contract metadata, and the prior trade state for
//! one instrument, emit a structured decision (enter long/short, exit, or
//! hold) with the price levels governing the position's lifecycle.
//!
//! The core is deterministic and side-effect free. Brokerage connectivity,
//! candle acquisition, state persistence, and process supervision live in
//! the outer system; each instrument's `TradeState` is owned by the caller
//! and swapped wholesale after every [`engine::SupertrendStrategy::process_candle`]
//! call, so instruments can be processed from separate threads.

pub mod backtest;
pub mod config;
pub mod engine;
pub mod indicators;
pub mod risk;
pub mod signals;
pub mod state;
pub mod types;

pub use backtest::{BacktestReport, Backtester};
pub use config::{ConfigError, StrategyConfig};
pub use engine::{Decision, SupertrendStrategy};
pub use state::{OpenPosition, TradeState};
pub use types::*;

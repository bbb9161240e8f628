//! Backtesting harness
//!
//! Replays a candle series through the strategy engine with a growing
//! window, threading the trade state exactly as a live caller would. Exits
//! fill at the triggering level clamped into the exit bar's range (time
//! exits at the close). No commission or slippage modelling.

use tracing::info;

use crate::config::{ConfigError, StrategyConfig};
use crate::engine::SupertrendStrategy;
use crate::state::{OpenPosition, TradeState};
use crate::types::{Candle, ContractSpec, Reason, Side, Signal};

/// One completed round trip
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosedTrade {
    pub side: Side,
    pub entry_index: usize,
    pub exit_index: usize,
    pub entry_price: f64,
    pub exit_price: f64,
    pub quantity: f64,
    pub leverage: u32,
    pub pnl: f64,
    pub exit_reason: Reason,
}

/// Summary statistics over a replay
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BacktestMetrics {
    pub total_return: f64,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub max_drawdown: f64,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub avg_win: f64,
    pub avg_loss: f64,
}

/// Full replay result
#[derive(Debug, Clone)]
pub struct BacktestReport {
    pub initial_equity: f64,
    pub final_equity: f64,
    pub trades: Vec<ClosedTrade>,
    /// Position still open when the series ended, if any
    pub open_position: Option<OpenPosition>,
    pub metrics: BacktestMetrics,
}

/// Candle-replay backtester around the strategy engine
pub struct Backtester {
    strategy: SupertrendStrategy,
    contract: ContractSpec,
    initial_equity: f64,
}

impl Backtester {
    pub fn new(
        config: StrategyConfig,
        contract: ContractSpec,
        initial_equity: f64,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            strategy: SupertrendStrategy::new(config)?,
            contract,
            initial_equity,
        })
    }

    /// Replay the series bar by bar
    pub fn run(&self, candles: &[Candle]) -> BacktestReport {
        let mut state = TradeState::flat();
        let mut equity = self.initial_equity;
        let mut trades: Vec<ClosedTrade> = Vec::new();
        let mut quantity = 0.0;
        let mut leverage = 0;
        let mut entry_index = 0;

        let mut peak = equity;
        let mut max_drawdown = 0.0;

        let warmup = self.strategy.config().atr_period;
        for i in warmup..candles.len() {
            let window = &candles[..=i];
            let prev_position = state.position().copied();
            let decision = self
                .strategy
                .process_candle(window, equity, &self.contract, &state);

            match decision.output.signal {
                Signal::Long | Signal::Short => {
                    // Proposal accompanies every entry signal
                    let proposal = decision.output.proposed_position.unwrap();
                    quantity = proposal.quantity;
                    leverage = proposal.leverage;
                    entry_index = i;
                }
                Signal::Exit => {
                    let position = prev_position.unwrap();
                    let bar = &candles[i];
                    let exit_price = fill_price(&position, bar, decision.output.reason);
                    let pnl = match position.side {
                        Side::Long => (exit_price - position.entry_price) * quantity,
                        Side::Short => (position.entry_price - exit_price) * quantity,
                    };
                    equity += pnl;
                    trades.push(ClosedTrade {
                        side: position.side,
                        entry_index,
                        exit_index: i,
                        entry_price: position.entry_price,
                        exit_price,
                        quantity,
                        leverage,
                        pnl,
                        exit_reason: decision.output.reason,
                    });
                }
                Signal::Hold => {}
            }

            state = decision.state;

            // Mark to market for the drawdown track
            let marked = match state.position() {
                Some(position) => {
                    let close = candles[i].close;
                    let unrealized = match position.side {
                        Side::Long => (close - position.entry_price) * quantity,
                        Side::Short => (position.entry_price - close) * quantity,
                    };
                    equity + unrealized
                }
                None => equity,
            };
            if marked > peak {
                peak = marked;
            }
            if peak > 0.0 {
                let drawdown = (peak - marked) / peak;
                if drawdown > max_drawdown {
                    max_drawdown = drawdown;
                }
            }
        }

        let metrics = self.calculate_metrics(&trades, equity, max_drawdown);

        info!(
            trades = metrics.total_trades,
            win_rate = format!("{:.1}%", metrics.win_rate),
            total_return = format!("{:.2}%", metrics.total_return),
            max_drawdown = format!("{:.2}%", metrics.max_drawdown),
            "backtest complete"
        );

        BacktestReport {
            initial_equity: self.initial_equity,
            final_equity: equity,
            trades,
            open_position: state.position().copied(),
            metrics,
        }
    }

    fn calculate_metrics(
        &self,
        trades: &[ClosedTrade],
        final_equity: f64,
        max_drawdown: f64,
    ) -> BacktestMetrics {
        // One pass over the trade log: count wins and bucket gross PnL
        let mut winning_trades = 0usize;
        let mut gross_profit = 0.0;
        let mut gross_loss = 0.0;
        for trade in trades {
            if trade.pnl > 0.0 {
                winning_trades += 1;
                gross_profit += trade.pnl;
            } else {
                gross_loss -= trade.pnl;
            }
        }
        let losing_trades = trades.len() - winning_trades;

        let total_return = if self.initial_equity > 0.0 {
            (final_equity - self.initial_equity) / self.initial_equity * 100.0
        } else {
            0.0
        };

        let win_rate = match trades.len() {
            0 => 0.0,
            n => winning_trades as f64 / n as f64 * 100.0,
        };

        // All profit against zero loss is unbounded by convention
        let profit_factor = match (gross_loss > 0.0, gross_profit > 0.0) {
            (true, _) => gross_profit / gross_loss,
            (false, true) => f64::INFINITY,
            (false, false) => 0.0,
        };

        let per_trade = |total: f64, count: usize| {
            if count == 0 {
                0.0
            } else {
                total / count as f64
            }
        };

        BacktestMetrics {
            total_return,
            win_rate,
            profit_factor,
            max_drawdown: max_drawdown * 100.0,
            total_trades: trades.len(),
            winning_trades,
            losing_trades,
            avg_win: per_trade(gross_profit, winning_trades),
            avg_loss: per_trade(gross_loss, losing_trades),
        }
    }
}

/// Fill an exit at the level that triggered it, held inside the bar's range.
/// Time exits fill at the close.
fn fill_price(position: &OpenPosition, bar: &Candle, reason: Reason) -> f64 {
    let level = match reason {
        Reason::StopHit => position.stop_loss,
        Reason::TpHit => position.take_profit,
        Reason::TrailingStop => position.trailing_stop.unwrap_or(position.stop_loss),
        _ => bar.close,
    };
    level.clamp(bar.low, bar.high)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_price_clamped_to_bar() {
        let position = OpenPosition::open(Side::Long, 100.0, 95.0, 110.0, 100.5, 99.0);
        let bar = Candle::new_unchecked(96.0, 97.0, 93.0, 94.0, 1000.0);
        // Stop level inside the bar fills at the level
        assert_eq!(fill_price(&position, &bar, Reason::StopHit), 95.0);

        // Gap through the level fills at the best price the bar offers
        let gap = Candle::new_unchecked(92.0, 93.5, 91.0, 92.0, 1000.0);
        assert_eq!(fill_price(&position, &gap, Reason::StopHit), 93.5);

        // Time exit fills at the close
        assert_eq!(fill_price(&position, &bar, Reason::TimeExit), 94.0);
    }

    #[test]
    fn test_empty_series_produces_empty_report() {
        let backtester = Backtester::new(
            StrategyConfig::default(),
            ContractSpec::default(),
            1000.0,
        )
        .unwrap();
        let report = backtester.run(&[]);
        assert_eq!(report.final_equity, 1000.0);
        assert!(report.trades.is_empty());
        assert!(report.open_position.is_none());
        assert_eq!(report.metrics.total_trades, 0);
    }
}

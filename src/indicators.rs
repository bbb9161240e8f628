//! Technical indicators
//!
//! Wilder ATR, the path-dependent Supertrend, and the rolling-median
//! volatility filter. Undefined warmup entries are `None`; every consumer
//! must check before using a value.

use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Supertrend regime label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Bullish,
    Bearish,
}

/// Supertrend line and regime per bar
#[derive(Debug, Clone)]
pub struct Supertrend {
    pub line: Vec<Option<f64>>,
    pub trend: Vec<Option<Trend>>,
}

/// True range per bar: the bar's own range, stretched to cover any gap from
/// the prior close. Equivalent to Wilder's three-way maximum.
pub fn true_range(high: &[f64], low: &[f64], close: &[f64]) -> Vec<f64> {
    (0..high.len())
        .map(|i| match i.checked_sub(1) {
            Some(prev) => high[i].max(close[prev]) - low[i].min(close[prev]),
            None => high[i] - low[i],
        })
        .collect()
}

/// Wilder Average True Range.
///
/// Seeded with the arithmetic mean of the first `period` true ranges, then
/// smoothed as `(atr_prev * (period - 1) + tr) / period`. Entries before
/// index `period - 1` are `None`.
pub fn wilder_atr(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Vec<Option<f64>> {
    let n = close.len();
    let mut atr = vec![None; n];

    if period == 0 || n < period {
        return atr;
    }

    let tr = true_range(high, low, close);

    let seed: f64 = tr[..period].iter().sum::<f64>() / period as f64;
    atr[period - 1] = Some(seed);

    let mut prev = seed;
    for i in period..n {
        let value = (prev * (period - 1) as f64 + tr[i]) / period as f64;
        atr[i] = Some(value);
        prev = value;
    }

    atr
}

/// Calculate Supertrend from precomputed ATR.
///
/// Single forward pass carrying the previous bands, line, and regime. Band
/// tightening: the upper band only ratchets down while the prior close stays
/// at or below it, the lower band only ratchets up while the prior close
/// stays at or above it. The regime flips bullish when the close crosses
/// above the upper band and bearish when it crosses below the lower band;
/// the first defined bar is seeded bullish. Bars with undefined or
/// non-positive ATR propagate the prior line and regime and drop the band
/// memory.
pub fn supertrend(
    high: &[f64],
    low: &[f64],
    close: &[f64],
    atr: &[Option<f64>],
    factor: f64,
) -> Supertrend {
    let n = close.len();
    let mut line: Vec<Option<f64>> = Vec::with_capacity(n);
    let mut trend: Vec<Option<Trend>> = Vec::with_capacity(n);

    let mut upper_prev: Option<f64> = None;
    let mut lower_prev: Option<f64> = None;
    let mut line_prev: Option<f64> = None;
    let mut trend_prev: Option<Trend> = None;

    for i in 0..n {
        let atr_value = match atr[i] {
            Some(a) if a > 0.0 => a,
            _ => {
                line.push(line_prev);
                trend.push(trend_prev);
                upper_prev = None;
                lower_prev = None;
                continue;
            }
        };

        let midpoint = (high[i] + low[i]) / 2.0;
        let raw_upper = midpoint + factor * atr_value;
        let raw_lower = midpoint - factor * atr_value;

        let upper = match upper_prev {
            Some(prev) if i > 0 && close[i - 1] <= prev => raw_upper.min(prev),
            _ => raw_upper,
        };
        let lower = match lower_prev {
            Some(prev) if i > 0 && close[i - 1] >= prev => raw_lower.max(prev),
            _ => raw_lower,
        };

        let regime = match trend_prev {
            None => Trend::Bullish,
            Some(Trend::Bearish) => {
                if close[i] > upper {
                    Trend::Bullish
                } else {
                    Trend::Bearish
                }
            }
            Some(Trend::Bullish) => {
                if close[i] < lower {
                    Trend::Bearish
                } else {
                    Trend::Bullish
                }
            }
        };

        let st = match regime {
            Trend::Bullish => lower,
            Trend::Bearish => upper,
        };

        line.push(Some(st));
        trend.push(Some(regime));
        upper_prev = Some(upper);
        lower_prev = Some(lower);
        line_prev = Some(st);
        trend_prev = Some(regime);
    }

    Supertrend { line, trend }
}

/// Volatility filter: is ATR at `idx` strictly above the median of the
/// preceding `window` values?
///
/// Fails open (returns true) on short history or when the window or the
/// current value is undefined.
pub fn atr_above_median(atr: &[Option<f64>], idx: usize, window: usize) -> bool {
    if idx < window || idx >= atr.len() {
        return true;
    }

    let current = match atr[idx] {
        Some(value) => value,
        None => return true,
    };

    let slice = &atr[idx - window..idx];
    if slice.iter().any(|value| value.is_none()) {
        return true;
    }

    let values: Vec<f64> = slice.iter().map(|value| value.unwrap()).collect();
    current > median(&values)
}

/// Median of a non-empty slice; even lengths average the two middle values
fn median(values: &[f64]) -> f64 {
    let sorted: Vec<f64> = values
        .iter()
        .copied()
        .sorted_by(|a, b| a.total_cmp(b))
        .collect();
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_true_range_uses_prior_close() {
        let high = vec![10.0, 12.0, 11.0];
        let low = vec![9.0, 10.5, 8.0];
        let close = vec![9.5, 11.0, 9.0];

        let tr = true_range(&high, &low, &close);
        assert_eq!(tr[0], 1.0); // no prior close on the first bar
        assert_relative_eq!(tr[1], 2.5); // gap up from 9.5 stretches the 1.5 range
        assert_relative_eq!(tr[2], 3.0); // prior close sits at the high
    }

    #[test]
    fn test_wilder_atr_warmup_and_seed() {
        // Constant range 2.0, no gaps: every TR is 2.0
        let high: Vec<f64> = (0..6).map(|_| 102.0).collect();
        let low: Vec<f64> = (0..6).map(|_| 100.0).collect();
        let close: Vec<f64> = (0..6).map(|_| 101.0).collect();

        let atr = wilder_atr(&high, &low, &close, 3);
        assert_eq!(atr[0], None);
        assert_eq!(atr[1], None);
        assert_relative_eq!(atr[2].unwrap(), 2.0);
        assert_relative_eq!(atr[5].unwrap(), 2.0);
    }

    #[test]
    fn test_wilder_atr_smoothing() {
        let high = vec![11.0, 11.0, 11.0, 15.0];
        let low = vec![10.0, 10.0, 10.0, 10.0];
        let close = vec![10.5, 10.5, 10.5, 14.0];

        let atr = wilder_atr(&high, &low, &close, 3);
        assert_relative_eq!(atr[2].unwrap(), 1.0);
        // (1.0 * 2 + 5.0) / 3
        assert_relative_eq!(atr[3].unwrap(), 7.0 / 3.0);
    }

    #[test]
    fn test_wilder_atr_insufficient_history() {
        let series = vec![10.0, 11.0];
        let atr = wilder_atr(&series, &series, &series, 5);
        assert!(atr.iter().all(|value| value.is_none()));
    }

    #[test]
    fn test_supertrend_bearish_in_downtrend_flips_on_breakout() {
        // Steady 0.75/bar downtrend, then a strong reversal bar
        let mut high = Vec::new();
        let mut low = Vec::new();
        let mut close = Vec::new();
        let mut open = 115.75;
        for _ in 0..30 {
            let c = open - 0.75;
            high.push(open + 0.5);
            low.push(c - 0.5);
            close.push(c);
            open = c;
        }
        high.push(100.5);
        low.push(93.0);
        close.push(100.0);

        let atr = wilder_atr(&high, &low, &close, 10);
        let st = supertrend(&high, &low, &close, &atr, 3.0);

        let last = close.len() - 1;
        assert_eq!(st.trend[last - 1], Some(Trend::Bearish));
        assert_eq!(st.trend[last], Some(Trend::Bullish));
        // Bullish regime rides the lower band, below price
        assert!(st.line[last].unwrap() < close[last]);
        // Warmup bars carry no regime
        assert_eq!(st.trend[0], None);
        assert_eq!(st.line[5], None);
    }

    #[test]
    fn test_supertrend_direction_total_once_defined() {
        let high: Vec<f64> = (0..40).map(|i| 100.0 + (i % 7) as f64).collect();
        let low: Vec<f64> = high.iter().map(|h| h - 2.0).collect();
        let close: Vec<f64> = high.iter().map(|h| h - 1.0).collect();

        let atr = wilder_atr(&high, &low, &close, 10);
        let st = supertrend(&high, &low, &close, &atr, 3.0);

        for i in 0..close.len() {
            if atr[i].is_some() {
                assert!(st.trend[i].is_some(), "regime undefined at {}", i);
                assert!(st.line[i].is_some(), "line undefined at {}", i);
            }
        }
    }

    #[test]
    fn test_atr_above_median_fail_open() {
        let atr = vec![None, None, Some(1.0), Some(2.0)];
        // Short history
        assert!(atr_above_median(&atr, 3, 10));
        // Window contains undefined entries
        assert!(atr_above_median(&atr, 3, 3));
    }

    #[test]
    fn test_atr_above_median_window_excludes_current() {
        let atr: Vec<Option<f64>> = vec![1.0, 2.0, 3.0, 4.0, 10.0]
            .into_iter()
            .map(Some)
            .collect();
        // Median of [1, 2, 3, 4] = 2.5; 10 > 2.5
        assert!(atr_above_median(&atr, 4, 4));

        let flat: Vec<Option<f64>> = vec![2.0, 2.0, 2.0, 2.0, 2.0].into_iter().map(Some).collect();
        // Strictly greater is required
        assert!(!atr_above_median(&flat, 4, 4));
    }

    #[test]
    fn test_median_even_and_odd() {
        assert_relative_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_relative_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
    }
}

//! Forward win-rate backtest.
//!
//! For every bar where a strategy's historical mask is set, compares the
//! close `HOLD_BARS` later against the close on the signal bar. The last
//! `HOLD_BARS` bars have no observable outcome and are excluded.

use std::fmt;

use serde::Serialize;

use crate::domain::indicator::IndicatorPanel;
use crate::domain::strategy::Strategy;

pub const HOLD_BARS: usize = 5;
pub const MIN_BACKTEST_BARS: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BacktestSummary {
    /// Too little history to backtest.
    NotAvailable,
    Computed { wins: usize, total: usize },
}

impl BacktestSummary {
    /// 100 × wins / total, or 0 when nothing fired.
    pub fn win_rate(&self) -> Option<f64> {
        match *self {
            BacktestSummary::NotAvailable => None,
            BacktestSummary::Computed { total: 0, .. } => Some(0.0),
            BacktestSummary::Computed { wins, total } => {
                Some(wins as f64 / total as f64 * 100.0)
            }
        }
    }
}

impl fmt::Display for BacktestSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            BacktestSummary::NotAvailable => f.write_str("N/A"),
            BacktestSummary::Computed { wins, total } => {
                let rate = self.win_rate().unwrap_or(0.0);
                write!(f, "{rate:.0}% ({wins}/{total})")
            }
        }
    }
}

/// Counts wins over a signal mask: a signal at t wins iff close[t+h] > close[t].
pub fn forward_outcomes(mask: &[bool], closes: &[f64], horizon: usize) -> BacktestSummary {
    let (wins, total) = mask
        .iter()
        .zip(closes)
        .zip(closes.iter().skip(horizon))
        .filter(|((fired, _), _)| **fired)
        .fold((0, 0), |(wins, total), ((_, entry), exit)| {
            (wins + usize::from(exit > entry), total + 1)
        });
    BacktestSummary::Computed { wins, total }
}

pub fn backtest(panel: &IndicatorPanel, strategy: Strategy) -> BacktestSummary {
    if panel.len() < MIN_BACKTEST_BARS {
        return BacktestSummary::NotAvailable;
    }
    forward_outcomes(&strategy.historical_mask(panel), &panel.close, HOLD_BARS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn win_requires_strictly_higher_close() {
        let closes = [10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 11.0];
        let mask = [true, true, false, false, false, false, false];
        // t=0 -> close[5] = 10 (not a win), t=1 -> close[6] = 11 (win)
        assert_eq!(
            forward_outcomes(&mask, &closes, 5),
            BacktestSummary::Computed { wins: 1, total: 2 }
        );
    }

    #[test]
    fn trailing_signals_are_excluded() {
        let closes = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        let mask = [false, false, true, true, true, true, true];
        assert_eq!(
            forward_outcomes(&mask, &closes, 5),
            BacktestSummary::Computed { wins: 0, total: 0 }
        );
    }

    #[test]
    fn zero_occurrences_formats_as_zero_percent() {
        let summary = BacktestSummary::Computed { wins: 0, total: 0 };
        assert_eq!(summary.to_string(), "0% (0/0)");
        assert_eq!(summary.win_rate(), Some(0.0));
    }

    #[test]
    fn formats_rate_with_counts() {
        let summary = BacktestSummary::Computed { wins: 2, total: 3 };
        assert_eq!(summary.to_string(), "67% (2/3)");
        assert_eq!(BacktestSummary::NotAvailable.to_string(), "N/A");
    }

    #[test]
    fn win_rate_is_exact_ratio() {
        let summary = BacktestSummary::Computed { wins: 3, total: 8 };
        assert!((summary.win_rate().unwrap() - 37.5).abs() < f64::EPSILON);
    }
}

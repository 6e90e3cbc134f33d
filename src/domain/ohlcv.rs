//! Daily OHLCV bars.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcvBar {
    pub code: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl OhlcvBar {
    /// (high + low + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// Largest of the bar's range and its gaps from the previous close.
    pub fn true_range(&self, prev_close: f64) -> f64 {
        [
            self.high - self.low,
            (self.high - prev_close).abs(),
            (self.low - prev_close).abs(),
        ]
        .into_iter()
        .fold(0.0, f64::max)
    }

    /// Finite prices and non-negative volume.
    pub fn is_well_formed(&self) -> bool {
        [self.open, self.high, self.low, self.close]
            .iter()
            .all(|v| v.is_finite())
            && self.volume >= 0
    }
}

/// Returns true when dates are strictly increasing.
pub fn is_chronological(bars: &[OhlcvBar]) -> bool {
    bars.windows(2).all(|w| w[0].date < w[1].date)
}

//! Average True Range indicator.
//!
//! TR[0] = H - L, TR[i] = max(H-L, |H-C[i-1]|, |L-C[i-1]|).
//! ATR(n) = SMA(n) of TR. Warmup: first (n-1) bars are undefined.

use crate::domain::indicator::Series;
use crate::domain::indicator::rolling::{defined, rolling_mean};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_true_range(bars: &[OhlcvBar]) -> Vec<f64> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| match i {
            0 => bar.high - bar.low,
            _ => bar.true_range(bars[i - 1].close),
        })
        .collect()
}

pub fn calculate_atr(bars: &[OhlcvBar], period: usize) -> Series {
    rolling_mean(&defined(&calculate_true_range(bars)), period)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bar(day: u32, high: f64, low: f64, close: f64) -> OhlcvBar {
        OhlcvBar {
            code: "TEST".into(),
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open: close,
            high,
            low,
            close,
            volume: 1000,
        }
    }

    #[test]
    fn first_true_range_is_high_low() {
        let bars = vec![bar(1, 12.0, 8.0, 10.0), bar(2, 20.0, 15.0, 18.0)];
        let tr = calculate_true_range(&bars);
        assert!((tr[0] - 4.0).abs() < f64::EPSILON);
        // |20 - 10| = 10 dominates
        assert!((tr[1] - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn atr_is_simple_mean() {
        let bars = vec![
            bar(1, 12.0, 8.0, 10.0),
            bar(2, 20.0, 15.0, 18.0),
            bar(3, 19.0, 17.0, 18.0),
        ];
        let atr = calculate_atr(&bars, 2);
        assert_eq!(atr[0], None);
        assert!((atr[1].unwrap() - 7.0).abs() < f64::EPSILON);
        assert!((atr[2].unwrap() - 6.0).abs() < f64::EPSILON);
    }
}

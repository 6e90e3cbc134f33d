//! Price channel references.
//!
//! HIGH(n)[i] = max(H[i-n..i-1]) and LOW(n)[i] = min(L[i-n..i-1]): the
//! rolling extreme strictly before bar i, so a close above HIGH(n) is a
//! breakout against the prior channel.

use crate::domain::indicator::Series;
use crate::domain::indicator::rolling::{defined, lag, rolling_max, rolling_min};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_channel_high(bars: &[OhlcvBar], period: usize) -> Series {
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    lag(&rolling_max(&defined(&highs), period), 1)
}

pub fn calculate_channel_low(bars: &[OhlcvBar], period: usize) -> Series {
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
    lag(&rolling_min(&defined(&lows), period), 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_bars(highs: &[f64]) -> Vec<OhlcvBar> {
        highs
            .iter()
            .enumerate()
            .map(|(i, &high)| OhlcvBar {
                code: "TEST".into(),
                date: NaiveDate::from_ymd_opt(2024, 1, (i + 1) as u32).unwrap(),
                open: high - 1.0,
                high,
                low: high - 2.0,
                close: high - 1.0,
                volume: 1000,
            })
            .collect()
    }

    #[test]
    fn channel_excludes_current_bar() {
        let bars = make_bars(&[1.0, 2.0, 3.0, 10.0]);
        let high = calculate_channel_high(&bars, 3);
        assert_eq!(high[2], None);
        // Window [0..=2] shifted onto bar 3; bar 3's own high of 10 is excluded.
        assert_eq!(high[3], Some(3.0));
    }

    #[test]
    fn channel_low_lags_one_bar() {
        let bars = make_bars(&[5.0, 4.0, 3.0, 2.0]);
        let low = calculate_channel_low(&bars, 2);
        assert_eq!(low[2], Some(2.0));
        assert_eq!(low[3], Some(1.0));
    }
}

//! Anchored Volume Weighted Average Price.
//!
//! The anchor is the bar with the lowest low (first occurrence) among the
//! trailing `window` bars, or all bars when fewer are available.
//! VWAP[i] = cumsum(TP × V) / cumsum(V) from the anchor to i.
//!
//! Two forms are produced. The display form anchors once, at the end of the
//! series, and is undefined before that anchor. The point-in-time form
//! re-anchors at every bar using only bars up to that bar, so it can be
//! evaluated historically without lookahead. Both agree at the last bar.

use crate::domain::indicator::Series;
use crate::domain::ohlcv::OhlcvBar;

pub const VWAP_ANCHOR_WINDOW: usize = 150;

/// First index of the lowest low within the `window` bars ending at `end`.
pub fn anchor_index(bars: &[OhlcvBar], end: usize, window: usize) -> usize {
    let start = (end + 1).saturating_sub(window.max(1));
    let mut anchor = start;
    for (i, bar) in bars.iter().enumerate().take(end + 1).skip(start) {
        if bar.low < bars[anchor].low {
            anchor = i;
        }
    }
    anchor
}

fn accumulate(bars: &[OhlcvBar], anchor: usize, end: usize) -> Option<f64> {
    let mut cum_tpv = 0.0;
    let mut cum_vol = 0.0;
    for bar in &bars[anchor..=end] {
        cum_tpv += bar.typical_price() * bar.volume as f64;
        cum_vol += bar.volume as f64;
    }
    (cum_vol != 0.0).then(|| cum_tpv / cum_vol)
}

/// Display VWAP anchored at the lowest low of the trailing window at the
/// end of the series. Bars before the anchor are undefined.
pub fn calculate_vwap(bars: &[OhlcvBar], window: usize) -> Series {
    let mut values = vec![None; bars.len()];
    if bars.is_empty() {
        return values;
    }
    let anchor = anchor_index(bars, bars.len() - 1, window);
    let mut cum_tpv = 0.0;
    let mut cum_vol = 0.0;
    for (i, bar) in bars.iter().enumerate().skip(anchor) {
        cum_tpv += bar.typical_price() * bar.volume as f64;
        cum_vol += bar.volume as f64;
        values[i] = (cum_vol != 0.0).then(|| cum_tpv / cum_vol);
    }
    values
}

/// Point-in-time VWAP: bar i is anchored within the window ending at i.
pub fn calculate_vwap_point_in_time(bars: &[OhlcvBar], window: usize) -> Series {
    (0..bars.len())
        .map(|i| accumulate(bars, anchor_index(bars, i, window), i))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_bars(lows: &[f64]) -> Vec<OhlcvBar> {
        lows.iter()
            .enumerate()
            .map(|(i, &low)| OhlcvBar {
                code: "TEST".into(),
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
                    + chrono::Duration::days(i as i64),
                open: low + 1.0,
                high: low + 2.0,
                low,
                close: low + 1.0,
                volume: 1000,
            })
            .collect()
    }

    #[test]
    fn anchor_is_first_lowest_low() {
        let bars = make_bars(&[5.0, 3.0, 4.0, 3.0, 6.0]);
        assert_eq!(anchor_index(&bars, 4, 150), 1);
        assert_eq!(anchor_index(&bars, 4, 2), 3);
    }

    #[test]
    fn undefined_before_anchor() {
        let bars = make_bars(&[5.0, 3.0, 4.0, 6.0]);
        let vwap = calculate_vwap(&bars, 150);
        assert_eq!(vwap[0], None);
        // Anchor bar: TP = (5 + 3 + 4) / 3 = 4
        assert!((vwap[1].unwrap() - 4.0).abs() < 1e-12);
        // Equal volumes: mean of TPs 4 and 5
        assert!((vwap[2].unwrap() - 4.5).abs() < 1e-12);
    }

    #[test]
    fn point_in_time_agrees_at_last_bar() {
        let lows: Vec<f64> = (0..200).map(|i| 100.0 + ((i * 37) % 23) as f64).collect();
        let bars = make_bars(&lows);
        let display = calculate_vwap(&bars, VWAP_ANCHOR_WINDOW);
        let pit = calculate_vwap_point_in_time(&bars, VWAP_ANCHOR_WINDOW);
        assert_eq!(display[199], pit[199]);
        assert!(pit.iter().all(Option::is_some));
    }

    #[test]
    fn zero_volume_is_undefined() {
        let mut bars = make_bars(&[5.0, 6.0]);
        for bar in &mut bars {
            bar.volume = 0;
        }
        assert!(calculate_vwap(&bars, 150).iter().all(Option::is_none));
    }
}

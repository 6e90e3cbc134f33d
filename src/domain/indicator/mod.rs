//! Technical indicator engine.
//!
//! [`compute`] turns an OHLCV series into an [`IndicatorPanel`]: one value
//! per bar for every derived field. Fields are [`Series`] values where
//! `None` marks a bar at which the indicator is undefined (warmup, zero
//! divisor). Every field at bar i depends only on bars up to i; the channel
//! references are additionally lagged by one bar, and the display VWAP is
//! anchored from the end of the series.

pub mod atr;
pub mod bollinger;
pub mod channel;
pub mod ema;
pub mod macd;
pub mod mfi;
pub mod rolling;
pub mod rsi;
pub mod stddev;
pub mod stochastic;
pub mod vwap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::error::QuantscanError;
use crate::domain::ohlcv::OhlcvBar;

/// A per-bar indicator series; `None` where the value is undefined.
pub type Series = Vec<Option<f64>>;

/// Minimum history needed for the 200-bar moving average.
pub const MIN_BARS: usize = 200;

/// Reads bar `i` of a series, treating out-of-range as undefined.
pub fn value_at(series: &[Option<f64>], i: usize) -> Option<f64> {
    series.get(i).copied().flatten()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorPanel {
    pub dates: Vec<NaiveDate>,
    pub open: Vec<f64>,
    pub high: Vec<f64>,
    pub low: Vec<f64>,
    pub close: Vec<f64>,
    pub volume: Vec<f64>,

    pub ma5: Series,
    pub ma20: Series,
    pub ma25: Series,
    pub ma60: Series,
    pub ma200: Series,
    pub ema10: Vec<f64>,
    pub ema20: Vec<f64>,
    pub ema60: Vec<f64>,

    pub macd: Vec<f64>,
    pub macd_signal: Vec<f64>,
    pub macd_hist: Vec<f64>,

    pub bb_up1: Series,
    pub bb_dn1: Series,
    pub bb_up2: Series,
    pub bb_dn2: Series,
    pub bandwidth: Series,
    pub bandwidth_avg120: Series,
    pub volume_avg20: Series,

    pub rsi: Series,
    pub stoch_k: Series,
    pub stoch_d: Series,
    pub stoch_slow_d: Series,
    pub disparity25: Series,

    pub vwap: Series,
    pub vwap_pit: Series,
    pub mfi: Series,

    pub high20: Series,
    pub low20: Series,
    pub high10: Series,
    pub low10: Series,
    pub atr: Series,
}

impl IndicatorPanel {
    pub fn len(&self) -> usize {
        self.close.len()
    }

    pub fn is_empty(&self) -> bool {
        self.close.is_empty()
    }

    pub fn last_index(&self) -> usize {
        self.len().saturating_sub(1)
    }

    pub fn last_close(&self) -> f64 {
        self.close.last().copied().unwrap_or(0.0)
    }
}

/// Computes the full indicator panel. Fails with `InsufficientData` when
/// the series is shorter than [`MIN_BARS`].
pub fn compute(bars: &[OhlcvBar]) -> Result<IndicatorPanel, QuantscanError> {
    if bars.len() < MIN_BARS {
        return Err(QuantscanError::InsufficientData {
            code: bars.first().map(|b| b.code.clone()).unwrap_or_default(),
            bars: bars.len(),
            minimum: MIN_BARS,
        });
    }

    let dates: Vec<NaiveDate> = bars.iter().map(|b| b.date).collect();
    let open: Vec<f64> = bars.iter().map(|b| b.open).collect();
    let high: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let low: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let close: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let volume: Vec<f64> = bars.iter().map(|b| b.volume as f64).collect();

    let ma25 = rolling::calculate_sma(&close, 25);
    let macd = macd::calculate_macd(&close, 12, 26, 9);
    let bands = bollinger::calculate_bollinger(&close, 20);
    let stoch = stochastic::calculate_stochastic(&high, &low, &close, 14);

    let disparity25 = close
        .iter()
        .zip(&ma25)
        .map(|(c, m)| match m {
            Some(m) if *m != 0.0 => Some(c / m * 100.0),
            _ => None,
        })
        .collect();

    Ok(IndicatorPanel {
        ma5: rolling::calculate_sma(&close, 5),
        ma20: bands.middle.clone(),
        ma60: rolling::calculate_sma(&close, 60),
        ma200: rolling::calculate_sma(&close, 200),
        ema10: ema::calculate_ema(&close, 10),
        ema20: ema::calculate_ema(&close, 20),
        ema60: ema::calculate_ema(&close, 60),
        macd: macd.line,
        macd_signal: macd.signal,
        macd_hist: macd.histogram,
        bandwidth_avg120: rolling::rolling_mean(&bands.bandwidth, 120),
        bb_up1: bands.upper1,
        bb_dn1: bands.lower1,
        bb_up2: bands.upper2,
        bb_dn2: bands.lower2,
        bandwidth: bands.bandwidth,
        volume_avg20: rolling::calculate_sma(&volume, 20),
        rsi: rsi::calculate_rsi(&close, 14),
        stoch_k: stoch.k,
        stoch_d: stoch.d,
        stoch_slow_d: stoch.slow_d,
        disparity25,
        ma25,
        vwap: vwap::calculate_vwap(bars, vwap::VWAP_ANCHOR_WINDOW),
        vwap_pit: vwap::calculate_vwap_point_in_time(bars, vwap::VWAP_ANCHOR_WINDOW),
        mfi: mfi::calculate_mfi(bars, 14),
        high20: channel::calculate_channel_high(bars, 20),
        low20: channel::calculate_channel_low(bars, 20),
        high10: channel::calculate_channel_high(bars, 10),
        low10: channel::calculate_channel_low(bars, 10),
        atr: atr::calculate_atr(bars, 20),
        dates,
        open,
        high,
        low,
        close,
        volume,
    })
}

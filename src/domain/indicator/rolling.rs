//! Rolling-window primitives shared by the indicator calculations.
//!
//! A window is only defined once it is full, and any undefined value inside
//! the window makes the result undefined.

use crate::domain::indicator::Series;

/// Lifts a dense slice into a series where every value is defined.
pub fn defined(values: &[f64]) -> Series {
    values.iter().map(|&v| Some(v)).collect()
}

fn rolling_fold<F>(values: &[Option<f64>], period: usize, init: f64, f: F) -> Series
where
    F: Fn(f64, f64) -> f64,
{
    (0..values.len())
        .map(|i| {
            if period == 0 || i + 1 < period {
                return None;
            }
            values[i + 1 - period..=i]
                .iter()
                .try_fold(init, |acc, v| v.map(|v| f(acc, v)))
        })
        .collect()
}

pub fn rolling_sum(values: &[Option<f64>], period: usize) -> Series {
    rolling_fold(values, period, 0.0, |acc, v| acc + v)
}

pub fn rolling_mean(values: &[Option<f64>], period: usize) -> Series {
    rolling_sum(values, period)
        .into_iter()
        .map(|s| s.map(|s| s / period as f64))
        .collect()
}

pub fn rolling_max(values: &[Option<f64>], period: usize) -> Series {
    rolling_fold(values, period, f64::NEG_INFINITY, f64::max)
}

pub fn rolling_min(values: &[Option<f64>], period: usize) -> Series {
    rolling_fold(values, period, f64::INFINITY, f64::min)
}

/// SMA(n)[i] = mean(C[i-n+1..=i]). Warmup: first (n-1) bars are undefined.
pub fn calculate_sma(values: &[f64], period: usize) -> Series {
    rolling_mean(&defined(values), period)
}

/// Shifts a series forward by `n` bars so bar i carries the value of bar i-n.
pub fn lag(series: &[Option<f64>], n: usize) -> Series {
    (0..series.len())
        .map(|i| if i >= n { series[i - n] } else { None })
        .collect()
}

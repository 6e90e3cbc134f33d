//! Standard Deviation indicator.
//!
//! Sample standard deviation (n - 1 denominator) over n closing prices.
//! Warmup: first (n-1) bars are undefined.

use crate::domain::indicator::Series;

pub fn calculate_stddev(values: &[f64], period: usize) -> Series {
    (0..values.len())
        .map(|i| {
            if period < 2 || i + 1 < period {
                return None;
            }
            let window = &values[i + 1 - period..=i];
            let mean = window.iter().sum::<f64>() / period as f64;
            let variance = window
                .iter()
                .map(|v| {
                    let diff = v - mean;
                    diff * diff
                })
                .sum::<f64>()
                / (period - 1) as f64;
            Some(variance.sqrt())
        })
        .collect()
}

//! Stochastic oscillator.
//!
//! %K = (C - LL(n)) / (HH(n) - LL(n)) × 100, %D = SMA(3) of %K,
//! slow %D = SMA(3) of %D. A zero high-low range leaves %K undefined.

use crate::domain::indicator::Series;
use crate::domain::indicator::rolling::{defined, rolling_max, rolling_mean, rolling_min};

#[derive(Debug, Clone, PartialEq)]
pub struct Stochastic {
    pub k: Series,
    pub d: Series,
    pub slow_d: Series,
}

pub fn calculate_stochastic(
    highs: &[f64],
    lows: &[f64],
    closes: &[f64],
    period: usize,
) -> Stochastic {
    let highest = rolling_max(&defined(highs), period);
    let lowest = rolling_min(&defined(lows), period);

    let k: Series = closes
        .iter()
        .zip(highest.iter().zip(&lowest))
        .map(|(c, (h, l))| {
            let (h, l) = ((*h)?, (*l)?);
            let range = h - l;
            (range != 0.0).then(|| (c - l) / range * 100.0)
        })
        .collect();
    let d = rolling_mean(&k, 3);
    let slow_d = rolling_mean(&d, 3);

    Stochastic { k, d, slow_d }
}

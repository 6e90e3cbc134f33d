//! Bollinger Bands indicator.
//!
//! Middle = SMA(n); bands at middle ± k × sample stddev(n) for k = 1 and 2.
//! Bandwidth = (upper2 - lower2) / middle, the squeeze tightness measure.

use crate::domain::indicator::Series;
use crate::domain::indicator::rolling::calculate_sma;
use crate::domain::indicator::stddev::calculate_stddev;

#[derive(Debug, Clone, PartialEq)]
pub struct BollingerBands {
    pub middle: Series,
    pub upper1: Series,
    pub lower1: Series,
    pub upper2: Series,
    pub lower2: Series,
    pub bandwidth: Series,
}

pub fn calculate_bollinger(closes: &[f64], period: usize) -> BollingerBands {
    let middle = calculate_sma(closes, period);
    let stddev = calculate_stddev(closes, period);

    let band = |k: f64| -> Series {
        middle
            .iter()
            .zip(&stddev)
            .map(|(m, s)| Some((*m)? + k * (*s)?))
            .collect()
    };

    let upper1 = band(1.0);
    let lower1 = band(-1.0);
    let upper2 = band(2.0);
    let lower2 = band(-2.0);

    let bandwidth = upper2
        .iter()
        .zip(&lower2)
        .zip(&middle)
        .map(|((u, l), m)| match (u, l, m) {
            (Some(u), Some(l), Some(m)) if *m != 0.0 => Some((u - l) / m),
            _ => None,
        })
        .collect();

    BollingerBands {
        middle,
        upper1,
        lower1,
        upper2,
        lower2,
        bandwidth,
    }
}

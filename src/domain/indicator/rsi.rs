//! Relative Strength Index indicator.
//!
//! Gains and losses are averaged with a simple rolling mean over n deltas
//! (not Wilder smoothing). RSI = 100 - 100 / (1 + avg_gain / avg_loss).
//! Zero average loss with positive gains yields 100; a window with no
//! movement at all is undefined. Warmup: first n bars are undefined.

use crate::domain::indicator::Series;
use crate::domain::indicator::rolling::rolling_mean;

pub fn calculate_rsi(closes: &[f64], period: usize) -> Series {
    let deltas: Series = (0..closes.len())
        .map(|i| (i > 0).then(|| closes[i] - closes[i - 1]))
        .collect();
    let gains: Series = deltas.iter().map(|d| d.map(|d| d.max(0.0))).collect();
    let losses: Series = deltas.iter().map(|d| d.map(|d| (-d).max(0.0))).collect();

    let avg_gain = rolling_mean(&gains, period);
    let avg_loss = rolling_mean(&losses, period);

    avg_gain
        .iter()
        .zip(&avg_loss)
        .map(|(g, l)| {
            let (g, l) = ((*g)?, (*l)?);
            if l == 0.0 {
                // Limit of the formula as avg_loss -> 0.
                return (g > 0.0).then_some(100.0);
            }
            Some(100.0 - 100.0 / (1.0 + g / l))
        })
        .collect()
}

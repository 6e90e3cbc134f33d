//! Money Flow Index.
//!
//! Raw flow TP × V counts as positive when TP rises versus the prior bar and
//! negative when it falls. MFI = 100 - 100 / (1 + pos_sum(n) / neg_sum(n)),
//! with a zero negative sum replaced by 1. Warmup: first (n-1) bars are undefined.

use crate::domain::indicator::Series;
use crate::domain::indicator::rolling::rolling_sum;
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_mfi(bars: &[OhlcvBar], period: usize) -> Series {
    let mut positive = vec![Some(0.0); bars.len()];
    let mut negative = vec![Some(0.0); bars.len()];

    for i in 1..bars.len() {
        let tp = bars[i].typical_price();
        let prev_tp = bars[i - 1].typical_price();
        let flow = tp * bars[i].volume as f64;
        if tp > prev_tp {
            positive[i] = Some(flow);
        } else if tp < prev_tp {
            negative[i] = Some(flow);
        }
    }

    let pos_sum = rolling_sum(&positive, period);
    let neg_sum = rolling_sum(&negative, period);

    pos_sum
        .iter()
        .zip(&neg_sum)
        .map(|(p, n)| {
            let (p, n) = ((*p)?, (*n)?);
            let n = if n == 0.0 { 1.0 } else { n };
            Some(100.0 - 100.0 / (1.0 + p / n))
        })
        .collect()
}

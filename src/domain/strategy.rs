//! The seven signal strategies.
//!
//! Each strategy is a single entry predicate over the indicator panel,
//! [`Strategy::fires_at`]. The live check evaluates it at the last bar and
//! the historical mask evaluates it at every bar, so both paths encode the
//! same condition by construction. "Crosses above" means above at bar t and
//! at-or-below at bar t-1; it never fires at the first bar.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::indicator::{IndicatorPanel, value_at};

pub const DISPARITY_OVERSOLD: f64 = 90.0;
pub const SQUEEZE_BANDWIDTH: f64 = 0.15;
pub const SQUEEZE_RELATIVE: f64 = 0.7;
pub const VOLUME_SURGE: f64 = 1.5;
pub const VWAP_BAND: f64 = 0.03;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// EMA10 > EMA20 > EMA60 with a fresh MACD cross.
    Elite,
    /// Close crosses above the upper 2σ band.
    Dbb,
    /// Close at least 10% below its 25-day average.
    Bnf,
    /// Volume surge on an up day after a tight band.
    #[serde(rename = "squeeze")]
    AiSqueeze,
    /// Close crosses above the prior 20-bar high in a long-term uptrend.
    Turtle,
    /// Close crosses above the 200-day average.
    Buffett,
    /// Close within 3% of the anchored VWAP.
    Vwap,
}

impl Strategy {
    pub const ALL: [Strategy; 7] = [
        Strategy::Elite,
        Strategy::Dbb,
        Strategy::Bnf,
        Strategy::AiSqueeze,
        Strategy::Turtle,
        Strategy::Buffett,
        Strategy::Vwap,
    ];

    /// Stable identifier used in config files and the store.
    pub fn key(self) -> &'static str {
        match self {
            Strategy::Elite => "elite",
            Strategy::Dbb => "dbb",
            Strategy::Bnf => "bnf",
            Strategy::AiSqueeze => "squeeze",
            Strategy::Turtle => "turtle",
            Strategy::Buffett => "buffett",
            Strategy::Vwap => "vwap",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Strategy::Elite => "Elite",
            Strategy::Dbb => "DBB",
            Strategy::Bnf => "BNF",
            Strategy::AiSqueeze => "AI Squeeze",
            Strategy::Turtle => "Turtle",
            Strategy::Buffett => "Buffett",
            Strategy::Vwap => "VWAP",
        }
    }

    /// Whether the entry condition holds at bar `i`.
    pub fn fires_at(self, panel: &IndicatorPanel, i: usize) -> bool {
        if i >= panel.len() {
            return false;
        }
        let close = panel.close[i];
        match self {
            Strategy::Elite => {
                let aligned =
                    panel.ema10[i] > panel.ema20[i] && panel.ema20[i] > panel.ema60[i];
                aligned && i > 0 && crossed_above(&panel.macd, &panel.macd_signal, i)
            }
            Strategy::Dbb => i > 0 && close_crossed_above(panel, &panel.bb_up2, i),
            Strategy::Bnf => {
                matches!(value_at(&panel.disparity25, i), Some(d) if d <= DISPARITY_OVERSOLD)
            }
            Strategy::AiSqueeze => {
                if i == 0 {
                    return false;
                }
                let tight = match value_at(&panel.bandwidth, i - 1) {
                    Some(prev_bw) => {
                        prev_bw < SQUEEZE_BANDWIDTH
                            || matches!(
                                value_at(&panel.bandwidth_avg120, i),
                                Some(avg) if prev_bw < avg * SQUEEZE_RELATIVE
                            )
                    }
                    None => false,
                };
                let surge = matches!(
                    value_at(&panel.volume_avg20, i),
                    Some(avg) if panel.volume[i] > avg * VOLUME_SURGE
                );
                tight && surge && close > panel.close[i - 1]
            }
            Strategy::Turtle => {
                i > 0
                    && close_crossed_above(panel, &panel.high20, i)
                    && matches!(value_at(&panel.ma200, i), Some(ma) if close > ma)
            }
            Strategy::Buffett => i > 0 && close_crossed_above(panel, &panel.ma200, i),
            Strategy::Vwap => vwap_distance(panel, i).is_some_and(|r| r <= VWAP_BAND),
        }
    }

    /// Ranking score at bar `i`. Only meaningful where [`fires_at`] holds
    /// and only comparable between strategies of the same symbol.
    ///
    /// [`fires_at`]: Strategy::fires_at
    pub fn score_at(self, panel: &IndicatorPanel, i: usize) -> f64 {
        let close = panel.close[i];
        let ratio_minus_one = |reference: Option<f64>| match reference {
            Some(r) if r != 0.0 => close / r - 1.0,
            _ => 0.0,
        };
        match self {
            Strategy::Elite => 10.0 + (value_at(&panel.rsi, i).unwrap_or(50.0) - 50.0),
            Strategy::Dbb => ratio_minus_one(value_at(&panel.bb_up2, i)) * 1000.0,
            Strategy::Bnf => (100.0 - value_at(&panel.disparity25, i).unwrap_or(100.0)) * 2.0,
            Strategy::AiSqueeze => match value_at(&panel.volume_avg20, i) {
                Some(avg) if avg != 0.0 => panel.volume[i] / avg * 10.0,
                _ => 0.0,
            },
            Strategy::Turtle => ratio_minus_one(value_at(&panel.high20, i)) * 1000.0,
            Strategy::Buffett => ratio_minus_one(value_at(&panel.ma200, i)) * 100.0,
            Strategy::Vwap => match vwap_distance(panel, i) {
                Some(r) => (1.0 - r / VWAP_BAND) * 50.0,
                None => 0.0,
            },
        }
    }

    /// Live evaluation at the latest bar: the score when the signal fired.
    pub fn live_signal(self, panel: &IndicatorPanel) -> Option<f64> {
        if panel.is_empty() {
            return None;
        }
        let i = panel.last_index();
        self.fires_at(panel, i).then(|| self.score_at(panel, i))
    }

    /// Historical evaluation: one flag per bar of the panel.
    pub fn historical_mask(self, panel: &IndicatorPanel) -> Vec<bool> {
        (0..panel.len()).map(|i| self.fires_at(panel, i)).collect()
    }
}

/// a crosses above b at i: a[i] > b[i] and a[i-1] <= b[i-1]. Requires i > 0.
fn crossed_above(a: &[f64], b: &[f64], i: usize) -> bool {
    a[i] > b[i] && a[i - 1] <= b[i - 1]
}

fn close_crossed_above(panel: &IndicatorPanel, reference: &[Option<f64>], i: usize) -> bool {
    match (value_at(reference, i), value_at(reference, i - 1)) {
        (Some(now), Some(prev)) => panel.close[i] > now && panel.close[i - 1] <= prev,
        _ => false,
    }
}

/// |close - VWAP| / VWAP against the point-in-time VWAP.
fn vwap_distance(panel: &IndicatorPanel, i: usize) -> Option<f64> {
    match value_at(&panel.vwap_pit, i) {
        Some(v) if v > 0.0 => Some((panel.close[i] - v).abs() / v),
        _ => None,
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown strategy: {0}")]
pub struct UnknownStrategy(pub String);

impl FromStr for Strategy {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace([' ', '_', '-'], "");
        match normalized.as_str() {
            "elite" => Ok(Strategy::Elite),
            "dbb" => Ok(Strategy::Dbb),
            "bnf" => Ok(Strategy::Bnf),
            "squeeze" | "aisqueeze" => Ok(Strategy::AiSqueeze),
            "turtle" => Ok(Strategy::Turtle),
            "buffett" => Ok(Strategy::Buffett),
            "vwap" => Ok(Strategy::Vwap),
            _ => Err(UnknownStrategy(s.to_string())),
        }
    }
}

/// Parses a comma-separated strategy list; an empty string selects none.
pub fn parse_strategies(input: &str) -> Result<Vec<Strategy>, UnknownStrategy> {
    let mut out = Vec::new();
    for token in input.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let strategy: Strategy = token.parse()?;
        if !out.contains(&strategy) {
            out.push(strategy);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::compute;
    use crate::domain::ohlcv::OhlcvBar;
    use chrono::NaiveDate;

    fn bars_from(closes: &[f64], volumes: &[i64]) -> Vec<OhlcvBar> {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        closes
            .iter()
            .zip(volumes)
            .enumerate()
            .map(|(i, (&close, &volume))| OhlcvBar {
                code: "TEST".into(),
                date: start + chrono::Duration::days(i as i64),
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume,
            })
            .collect()
    }

    fn flat_then(tail: &[f64]) -> Vec<OhlcvBar> {
        let mut closes = vec![100.0; 220];
        closes.extend_from_slice(tail);
        let volumes = vec![1000; closes.len()];
        bars_from(&closes, &volumes)
    }

    mod parsing {
        use super::*;

        #[test]
        fn parses_keys_and_labels() {
            assert_eq!("elite".parse::<Strategy>().unwrap(), Strategy::Elite);
            assert_eq!("AI Squeeze".parse::<Strategy>().unwrap(), Strategy::AiSqueeze);
            assert_eq!("VWAP".parse::<Strategy>().unwrap(), Strategy::Vwap);
            assert!("momentum".parse::<Strategy>().is_err());
        }

        #[test]
        fn key_round_trips_for_all() {
            for s in Strategy::ALL {
                assert_eq!(s.key().parse::<Strategy>().unwrap(), s);
                assert_eq!(s.label().parse::<Strategy>().unwrap(), s);
            }
        }

        #[test]
        fn parse_list_dedupes_and_skips_blanks() {
            let list = parse_strategies("dbb, turtle,,dbb").unwrap();
            assert_eq!(list, vec![Strategy::Dbb, Strategy::Turtle]);
            assert!(parse_strategies("").unwrap().is_empty());
        }
    }

    mod conditions {
        use super::*;

        #[test]
        fn buffett_fires_on_cross_only() {
            // Flat at 100 then one jump: close crosses MA200 exactly once.
            let panel = compute(&flat_then(&[110.0, 111.0])).unwrap();
            let mask = Strategy::Buffett.historical_mask(&panel);
            assert!(mask[220]);
            assert!(!mask[221]);
            assert_eq!(mask.iter().filter(|&&m| m).count(), 1);
        }

        #[test]
        fn dbb_fires_on_band_break() {
            let panel = compute(&flat_then(&[110.0])).unwrap();
            let i = panel.last_index();
            assert!(Strategy::Dbb.fires_at(&panel, i));
            assert!(Strategy::Dbb.live_signal(&panel).unwrap() > 0.0);
        }

        #[test]
        fn turtle_requires_prior_channel_break() {
            let panel = compute(&flat_then(&[110.0])).unwrap();
            // Prior 20-bar high is 101; 110 > 101 and > MA200.
            assert!(Strategy::Turtle.live_signal(&panel).is_some());
            let score = Strategy::Turtle.score_at(&panel, panel.last_index());
            assert!((score - (110.0 / 101.0 - 1.0) * 1000.0).abs() < 1e-9);
        }

        #[test]
        fn bnf_fires_below_disparity_90() {
            let panel = compute(&flat_then(&[80.0])).unwrap();
            assert!(Strategy::Bnf.live_signal(&panel).is_some());
            let panel = compute(&flat_then(&[99.0])).unwrap();
            assert!(Strategy::Bnf.live_signal(&panel).is_none());
        }

        #[test]
        fn vwap_fires_near_anchor() {
            let panel = compute(&flat_then(&[100.5])).unwrap();
            let score = Strategy::Vwap.live_signal(&panel).unwrap();
            assert!(score > 0.0 && score <= 50.0);
        }

        #[test]
        fn squeeze_needs_volume_surge() {
            let mut closes = vec![100.0; 220];
            closes.push(101.0);
            let mut volumes = vec![1000; 220];
            volumes.push(5000);
            let panel = compute(&bars_from(&closes, &volumes)).unwrap();
            let score = Strategy::AiSqueeze.live_signal(&panel).unwrap();
            // avg20 = (19 * 1000 + 5000) / 20 = 1200
            assert!((score - 5000.0 / 1200.0 * 10.0).abs() < 1e-9);

            let quiet = compute(&flat_then(&[101.0])).unwrap();
            assert!(Strategy::AiSqueeze.live_signal(&quiet).is_none());
        }

        #[test]
        fn nothing_fires_at_first_bar() {
            let panel = compute(&flat_then(&[])).unwrap();
            for s in [
                Strategy::Elite,
                Strategy::Dbb,
                Strategy::AiSqueeze,
                Strategy::Turtle,
                Strategy::Buffett,
            ] {
                assert!(!s.fires_at(&panel, 0));
            }
        }

        #[test]
        fn live_matches_mask_at_last_bar() {
            let panel = compute(&flat_then(&[110.0, 111.0, 95.0])).unwrap();
            let last = panel.last_index();
            for s in Strategy::ALL {
                assert_eq!(s.live_signal(&panel).is_some(), s.historical_mask(&panel)[last]);
            }
        }
    }
}

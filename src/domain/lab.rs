//! Strategy lab: per-strategy stance and risk-sized trade plan for one symbol.

use std::fmt;

use serde::Serialize;

use crate::domain::indicator::{IndicatorPanel, value_at};
use crate::domain::market::Currency;
use crate::domain::report::atr_or_fallback;
use crate::domain::strategy::Strategy;

/// Fraction of applied capital put at risk per trade.
pub const RISK_FRACTION: f64 = 0.02;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Stance {
    Buy,
    Hold,
    Exit,
    Wait,
}

impl fmt::Display for Stance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stance::Buy => "BUY",
            Stance::Hold => "HOLD",
            Stance::Exit => "EXIT",
            Stance::Wait => "Wait",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabConfig {
    /// Capital in domestic currency.
    pub capital: f64,
    /// Domestic units per foreign unit.
    pub usd_rate: f64,
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            capital: 10_000_000.0,
            usd_rate: 1400.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradePlan {
    pub strategy: Strategy,
    pub stance: Stance,
    pub price: f64,
    pub atr: f64,
    pub atr_pct: f64,
    pub entry: f64,
    pub stop: f64,
    pub target: f64,
    pub applied_capital: f64,
    pub allowable_risk: f64,
    pub shares: u64,
    pub total_loss: f64,
}

/// Stance at the latest bar. `Buy` holds exactly when the live signal fires.
pub fn stance(strategy: Strategy, panel: &IndicatorPanel) -> Stance {
    if strategy.live_signal(panel).is_some() {
        return Stance::Buy;
    }
    let i = panel.last_index();
    let close = panel.close[i];
    let above = |series: &[Option<f64>]| matches!(value_at(series, i), Some(v) if close > v);
    let below = |series: &[Option<f64>]| matches!(value_at(series, i), Some(v) if close < v);

    match strategy {
        Strategy::Turtle if below(&panel.low10) => Stance::Exit,
        Strategy::Turtle | Strategy::Buffett if above(&panel.ma200) => Stance::Hold,
        Strategy::Elite if panel.ema10[i] > panel.ema20[i] && panel.ema20[i] > panel.ema60[i] => {
            Stance::Hold
        }
        Strategy::Dbb if above(&panel.bb_up2) => Stance::Hold,
        Strategy::Vwap if above(&panel.vwap_pit) => Stance::Hold,
        _ => Stance::Wait,
    }
}

/// Stance of every strategy, in declaration order.
pub fn consensus(panel: &IndicatorPanel) -> Vec<(Strategy, Stance)> {
    Strategy::ALL
        .iter()
        .map(|&s| (s, stance(s, panel)))
        .collect()
}

fn levels(strategy: Strategy, panel: &IndicatorPanel, atr: f64) -> (f64, f64, f64) {
    let i = panel.last_index();
    let close = panel.close[i];
    let or_close = |series: &[Option<f64>]| value_at(series, i).unwrap_or(close);

    match strategy {
        Strategy::Vwap => {
            let vwap = or_close(&panel.vwap_pit);
            (vwap, vwap * 0.97, vwap * 1.15)
        }
        Strategy::Turtle => {
            let entry = or_close(&panel.high20);
            (entry, entry - 2.0 * atr, entry + 4.0 * atr)
        }
        Strategy::Elite => (close, or_close(&panel.ma20), close * 1.10),
        Strategy::Dbb => {
            let entry = or_close(&panel.bb_up2);
            (entry, close * 0.97, entry * 1.15)
        }
        Strategy::Bnf => (close, close * 0.95, or_close(&panel.ma25)),
        Strategy::AiSqueeze => (close, or_close(&panel.ma20), close * 1.20),
        Strategy::Buffett => (close, or_close(&panel.ma200), close * 1.20),
    }
}

/// Share count risking at most `risk` with `risk_per_share` each, capped by capital.
pub fn position_size(capital: f64, risk: f64, entry: f64, risk_per_share: f64) -> u64 {
    let mut shares = if risk_per_share > 0.0 {
        (risk / risk_per_share).floor() as u64
    } else {
        0
    };
    if entry > 0.0 && shares as f64 * entry > capital {
        shares = (capital / entry).floor() as u64;
    }
    shares
}

pub fn trade_plan(
    strategy: Strategy,
    panel: &IndicatorPanel,
    currency: Currency,
    config: &LabConfig,
) -> TradePlan {
    let i = panel.last_index();
    let price = panel.close[i];
    let atr = atr_or_fallback(panel, i);
    let (entry, stop, target) = levels(strategy, panel, atr);

    let applied_capital = match currency {
        Currency::Foreign if config.usd_rate > 0.0 => config.capital / config.usd_rate,
        _ => config.capital,
    };
    let allowable_risk = applied_capital * RISK_FRACTION;
    let risk_per_share = entry - stop;
    let shares = position_size(applied_capital, allowable_risk, entry, risk_per_share);

    TradePlan {
        strategy,
        stance: stance(strategy, panel),
        price,
        atr,
        atr_pct: if price != 0.0 { atr / price * 100.0 } else { 0.0 },
        entry,
        stop,
        target,
        applied_capital,
        allowable_risk,
        shares,
        total_loss: shares as f64 * risk_per_share.max(0.0),
    }
}

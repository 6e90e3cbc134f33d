//! Narrative report and stop-loss for a match's top strategy.

use serde::Serialize;

use crate::domain::indicator::{IndicatorPanel, value_at};
use crate::domain::market::Currency;
use crate::domain::strategy::Strategy;

/// ATR at bar `i`, falling back to 1% of the close when undefined or zero.
pub fn atr_or_fallback(panel: &IndicatorPanel, i: usize) -> f64 {
    match value_at(&panel.atr, i) {
        Some(atr) if atr > 0.0 => atr,
        _ => panel.close[i] * 0.01,
    }
}

/// Suggested stop-loss for entering `strategy` at the latest close.
pub fn stop_loss(strategy: Strategy, panel: &IndicatorPanel) -> f64 {
    let i = panel.last_index();
    let price = panel.close[i];
    let ma20 = value_at(&panel.ma20, i).unwrap_or(price);
    match strategy {
        Strategy::Turtle => price - 2.0 * atr_or_fallback(panel, i),
        Strategy::Elite | Strategy::AiSqueeze => ma20,
        Strategy::Dbb | Strategy::Vwap => price * 0.97,
        Strategy::Bnf | Strategy::Buffett => price * 0.95,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub strategy: Strategy,
    pub title: String,
    pub situation: String,
    pub action: String,
    pub stop_loss: f64,
}

pub fn build_report(strategy: Strategy, panel: &IndicatorPanel, currency: Currency) -> Report {
    let (title, situation, stance) = match strategy {
        Strategy::Turtle => (
            "Turtle: new 20-day high",
            "Broke above the 20-day resistance today.",
            "Trend-following entry",
        ),
        Strategy::AiSqueeze => (
            "AI Squeeze: volatility release",
            "First expansion candle after a band squeeze.",
            "Aggressive entry",
        ),
        Strategy::Elite => (
            "Elite: golden cross",
            "EMAs aligned with a fresh MACD buy cross.",
            "Textbook entry",
        ),
        Strategy::Dbb => (
            "DBB: upper band breakout",
            "Just closed above the upper Bollinger band.",
            "Breakout entry",
        ),
        Strategy::Bnf => (
            "BNF: oversold rebound",
            "Price stretched far below the 25-day average.",
            "Counter-trend entry",
        ),
        Strategy::Vwap => (
            "VWAP: holding support",
            "Trading near the anchored VWAP line.",
            "Pullback entry",
        ),
        Strategy::Buffett => (
            "Buffett: long-term trend change",
            "Just crossed above the 200-day average.",
            "Long-term position entry",
        ),
    };
    let stop = stop_loss(strategy, panel);
    Report {
        strategy,
        title: title.to_string(),
        situation: situation.to_string(),
        action: format!("{stance}. Stop-loss: {}", currency.format_price(stop)),
        stop_loss: stop,
    }
}

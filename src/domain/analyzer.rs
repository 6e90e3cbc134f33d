//! Single-symbol analysis.
//!
//! Fetch, validate, filter, compute the panel, evaluate every strategy,
//! rank the matches, and backtest the top one. A symbol with no firing
//! strategy yields `Ok(None)`.

use serde::Serialize;
use tracing::debug;

use crate::domain::backtest::{self, BacktestSummary};
use crate::domain::error::QuantscanError;
use crate::domain::indicator::{self, IndicatorPanel, Series, value_at};
use crate::domain::market::Currency;
use crate::domain::ohlcv::{OhlcvBar, is_chronological};
use crate::domain::report::{self, Report};
use crate::domain::strategy::Strategy;
use crate::domain::universe::Symbol;
use crate::ports::data_port::DataPort;

/// Bars of indicator history carried for charting.
pub const CHART_TAIL: usize = 100;

/// Neutral MFI used where the index is undefined.
const MFI_NEUTRAL: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StrategyMatch {
    pub strategy: Strategy,
    pub score: f64,
}

/// Latest-bar values shown alongside a match.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorSnapshot {
    pub close: f64,
    pub rsi: Option<f64>,
    pub bandwidth: Option<f64>,
    pub disparity25: Option<f64>,
    pub ma5: Option<f64>,
    pub ma20: Option<f64>,
    pub high20: Option<f64>,
    pub atr: f64,
}

/// Chart-ready tail of the panel. Undefined values are filled with 0,
/// MFI with 50, and VWAP stays `None` where it is not positive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartTail {
    pub dates: Vec<String>,
    pub open: Vec<f64>,
    pub high: Vec<f64>,
    pub low: Vec<f64>,
    pub close: Vec<f64>,
    pub volume: Vec<f64>,
    pub ma20: Vec<f64>,
    pub bb_up2: Vec<f64>,
    pub bb_dn2: Vec<f64>,
    pub bb_up1: Vec<f64>,
    pub bb_dn1: Vec<f64>,
    pub macd: Vec<f64>,
    pub macd_signal: Vec<f64>,
    pub macd_hist: Vec<f64>,
    pub stoch_d: Vec<f64>,
    pub stoch_slow_d: Vec<f64>,
    pub rsi: Vec<f64>,
    pub vwap: Vec<Option<f64>>,
    pub mfi: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchRecord {
    pub symbol: Symbol,
    pub currency: Currency,
    pub price: f64,
    /// Highest score first.
    pub matches: Vec<StrategyMatch>,
    pub top_win_rate: BacktestSummary,
    pub snapshot: IndicatorSnapshot,
    pub report: Report,
    pub chart: ChartTail,
}

impl MatchRecord {
    pub fn top_strategy(&self) -> Strategy {
        self.matches[0].strategy
    }

    pub fn strategies(&self) -> impl Iterator<Item = Strategy> + '_ {
        self.matches.iter().map(|m| m.strategy)
    }

    pub fn contains(&self, strategy: Strategy) -> bool {
        self.strategies().any(|s| s == strategy)
    }

    /// "Elite > DBB" style summary of the ranked matches.
    pub fn strategy_line(&self) -> String {
        self.strategies()
            .map(Strategy::label)
            .collect::<Vec<_>>()
            .join(" > ")
    }
}

/// Ranked live matches at the latest bar, highest score first.
pub fn rank_matches(panel: &IndicatorPanel) -> Vec<StrategyMatch> {
    let mut matches: Vec<StrategyMatch> = Strategy::ALL
        .iter()
        .filter_map(|&strategy| {
            strategy
                .live_signal(panel)
                .map(|score| StrategyMatch { strategy, score })
        })
        .collect();
    matches.sort_by(|a, b| b.score.total_cmp(&a.score));
    matches
}

pub fn analyze(
    data_port: &dyn DataPort,
    symbol: &Symbol,
    exclude_penny: bool,
    lookback_days: u32,
) -> Result<Option<MatchRecord>, QuantscanError> {
    let bars = data_port.fetch_ohlcv(&symbol.code, lookback_days)?;
    if bars.is_empty() {
        return Err(QuantscanError::NoData {
            code: symbol.code.clone(),
        });
    }
    analyze_bars(symbol, &bars, exclude_penny)
}

/// Analysis over already-fetched bars, oldest first.
pub fn analyze_bars(
    symbol: &Symbol,
    bars: &[OhlcvBar],
    exclude_penny: bool,
) -> Result<Option<MatchRecord>, QuantscanError> {
    if bars.len() < indicator::MIN_BARS {
        return Err(QuantscanError::InsufficientData {
            code: symbol.code.clone(),
            bars: bars.len(),
            minimum: indicator::MIN_BARS,
        });
    }
    validate_bars(symbol, bars)?;

    let Some(last) = bars.last() else {
        return Ok(None);
    };
    if last.volume == 0 {
        debug!(code = %symbol.code, "latest bar has no volume");
        return Ok(None);
    }

    let currency = symbol.currency();
    if exclude_penny && currency.is_penny(last.close) {
        debug!(code = %symbol.code, price = last.close, "penny stock excluded");
        return Ok(None);
    }

    let panel = indicator::compute(bars)?;
    let matches = rank_matches(&panel);
    let Some(top) = matches.first().map(|m| m.strategy) else {
        return Ok(None);
    };

    let top_win_rate = backtest::backtest(&panel, top);
    debug!(code = %symbol.code, top = top.key(), win_rate = %top_win_rate, "matched");

    Ok(Some(MatchRecord {
        symbol: symbol.clone(),
        currency,
        price: last.close,
        snapshot: snapshot(&panel),
        report: report::build_report(top, &panel, currency),
        chart: chart_tail(&panel, CHART_TAIL),
        top_win_rate,
        matches,
    }))
}

fn validate_bars(symbol: &Symbol, bars: &[OhlcvBar]) -> Result<(), QuantscanError> {
    if !is_chronological(bars) {
        return Err(QuantscanError::Computation {
            code: symbol.code.clone(),
            reason: "bars are not in strictly increasing date order".into(),
        });
    }
    if !bars.iter().all(OhlcvBar::is_well_formed) {
        return Err(QuantscanError::Computation {
            code: symbol.code.clone(),
            reason: "non-finite price or negative volume".into(),
        });
    }
    Ok(())
}

pub fn snapshot(panel: &IndicatorPanel) -> IndicatorSnapshot {
    let i = panel.last_index();
    IndicatorSnapshot {
        close: panel.close[i],
        rsi: value_at(&panel.rsi, i),
        bandwidth: value_at(&panel.bandwidth, i),
        disparity25: value_at(&panel.disparity25, i),
        ma5: value_at(&panel.ma5, i),
        ma20: value_at(&panel.ma20, i),
        high20: value_at(&panel.high20, i),
        atr: report::atr_or_fallback(panel, i),
    }
}

pub fn chart_tail(panel: &IndicatorPanel, bars: usize) -> ChartTail {
    let start = panel.len().saturating_sub(bars);
    let fill = |s: &Series, default: f64| -> Vec<f64> {
        s[start..].iter().map(|v| v.unwrap_or(default)).collect()
    };
    let tail = |v: &[f64]| v[start..].to_vec();

    ChartTail {
        dates: panel.dates[start..]
            .iter()
            .map(|d| d.format("%Y-%m-%d").to_string())
            .collect(),
        open: tail(&panel.open),
        high: tail(&panel.high),
        low: tail(&panel.low),
        close: tail(&panel.close),
        volume: tail(&panel.volume),
        ma20: fill(&panel.ma20, 0.0),
        bb_up2: fill(&panel.bb_up2, 0.0),
        bb_dn2: fill(&panel.bb_dn2, 0.0),
        bb_up1: fill(&panel.bb_up1, 0.0),
        bb_dn1: fill(&panel.bb_dn1, 0.0),
        macd: tail(&panel.macd),
        macd_signal: tail(&panel.macd_signal),
        macd_hist: tail(&panel.macd_hist),
        stoch_d: fill(&panel.stoch_d, 0.0),
        stoch_slow_d: fill(&panel.stoch_slow_d, 0.0),
        rsi: fill(&panel.rsi, 0.0),
        vwap: panel.vwap[start..]
            .iter()
            .map(|v| v.filter(|&x| x > 0.0))
            .collect(),
        mfi: fill(&panel.mfi, MFI_NEUTRAL),
    }
}

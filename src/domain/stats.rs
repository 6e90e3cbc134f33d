//! Strategy win-rate statistics.
//!
//! Each aggregation run recomputes win rate and count from one cohort of
//! outcomes and replaces the stored snapshot for the strategies it covers.
//! Strategies absent from the cohort keep their previous snapshot.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::error::QuantscanError;
use crate::domain::history::HistoryRow;
use crate::domain::quotes;
use crate::domain::strategy::Strategy;
use crate::ports::data_port::DataPort;
use crate::ports::store_port::StorePort;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub strategy: Strategy,
    pub is_win: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyStat {
    pub strategy: Strategy,
    pub wins: usize,
    pub total: usize,
    pub win_rate: f64,
    pub last_updated: NaiveDate,
}

impl StrategyStat {
    pub fn new(strategy: Strategy, wins: usize, total: usize, last_updated: NaiveDate) -> Self {
        let win_rate = if total > 0 {
            wins as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        Self {
            strategy,
            wins,
            total,
            win_rate,
            last_updated,
        }
    }

    /// "Elite (62.5%)" label used next to strategy filters.
    pub fn label(&self) -> String {
        format!("{} ({:.1}%)", self.strategy.label(), self.win_rate)
    }
}

pub fn fold_outcomes(outcomes: &[Outcome], as_of: NaiveDate) -> Vec<StrategyStat> {
    let mut counts: BTreeMap<Strategy, (usize, usize)> = BTreeMap::new();
    for outcome in outcomes {
        let entry = counts.entry(outcome.strategy).or_default();
        entry.0 += usize::from(outcome.is_win);
        entry.1 += 1;
    }
    counts
        .into_iter()
        .map(|(strategy, (wins, total))| StrategyStat::new(strategy, wins, total, as_of))
        .collect()
}

/// Folds the outcomes and replaces the stored snapshot for each strategy.
pub fn apply_outcomes(
    store: &dyn StorePort,
    outcomes: &[Outcome],
    as_of: NaiveDate,
) -> Result<Vec<StrategyStat>, QuantscanError> {
    let stats = fold_outcomes(outcomes, as_of);
    store.replace_strategy_stats(&stats)?;
    Ok(stats)
}

/// A row wins when the latest quote is strictly above its entry price.
/// Rows without a positive quote are left out.
pub fn classify_rows(rows: &[HistoryRow], quotes: &HashMap<String, f64>) -> Vec<Outcome> {
    rows.iter()
        .filter_map(|row| {
            let current = *quotes.get(&row.code)?;
            (current > 0.0).then_some(Outcome {
                strategy: row.strategy,
                is_win: current > row.entry_price,
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verification {
    pub scan_date: NaiveDate,
    pub rows: usize,
    pub priced: usize,
    pub stats: Vec<StrategyStat>,
}

/// Re-prices the history cohort of `scan_date` and replaces the stats.
pub async fn verify_date(
    data_port: Arc<dyn DataPort>,
    store: Arc<dyn StorePort>,
    scan_date: NaiveDate,
    as_of: NaiveDate,
    workers: usize,
    task_timeout: Duration,
) -> Result<Verification, QuantscanError> {
    let rows = {
        let store = Arc::clone(&store);
        tokio::task::spawn_blocking(move || store.history_for_date(scan_date))
            .await
            .map_err(|e| QuantscanError::Computation {
                code: "history".into(),
                reason: e.to_string(),
            })??
    };

    let mut codes: Vec<String> = rows.iter().map(|r| r.code.clone()).collect();
    codes.sort();
    codes.dedup();
    let prices = quotes::fetch_quotes(data_port, codes, workers, task_timeout).await;
    let outcomes = classify_rows(&rows, &prices);

    let stats = tokio::task::spawn_blocking(move || apply_outcomes(store.as_ref(), &outcomes, as_of))
        .await
        .map_err(|e| QuantscanError::Computation {
            code: "stats".into(),
            reason: e.to_string(),
        })??;

    info!(date = %scan_date, rows = rows.len(), priced = prices.len(), "verified scan history");
    Ok(Verification {
        scan_date,
        rows: rows.len(),
        priced: prices.len(),
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()
    }

    fn outcome(strategy: Strategy, is_win: bool) -> Outcome {
        Outcome { strategy, is_win }
    }

    #[test]
    fn folds_per_strategy() {
        let stats = fold_outcomes(
            &[
                outcome(Strategy::Elite, true),
                outcome(Strategy::Elite, false),
                outcome(Strategy::Elite, true),
                outcome(Strategy::Turtle, false),
            ],
            date(),
        );
        assert_eq!(stats.len(), 2);
        let elite = stats.iter().find(|s| s.strategy == Strategy::Elite).unwrap();
        assert_eq!((elite.wins, elite.total), (2, 3));
        assert!((elite.win_rate - 200.0 / 3.0).abs() < 1e-9);
        let turtle = stats.iter().find(|s| s.strategy == Strategy::Turtle).unwrap();
        assert_eq!(turtle.win_rate, 0.0);
    }

    #[test]
    fn empty_cohort_has_no_stats() {
        assert!(fold_outcomes(&[], date()).is_empty());
    }

    #[test]
    fn classify_skips_unpriced_rows() {
        let row = |code: &str, entry: f64| HistoryRow {
            scan_date: date(),
            strategy: Strategy::Dbb,
            code: code.into(),
            name: code.into(),
            entry_price: entry,
            market: "KOSPI".into(),
        };
        let rows = vec![row("A", 100.0), row("B", 100.0), row("C", 100.0), row("D", 100.0)];
        let quotes = HashMap::from([
            ("A".to_string(), 101.0),
            ("B".to_string(), 100.0),
            ("C".to_string(), 0.0),
        ]);
        let outcomes = classify_rows(&rows, &quotes);
        assert_eq!(
            outcomes,
            vec![outcome(Strategy::Dbb, true), outcome(Strategy::Dbb, false)]
        );
    }

    #[test]
    fn stat_label() {
        let stat = StrategyStat::new(Strategy::Vwap, 5, 8, date());
        assert_eq!(stat.label(), "VWAP (62.5%)");
    }
}

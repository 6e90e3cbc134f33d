//! Scan history: one row per matched strategy per symbol per scan date.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::analyzer::MatchRecord;
use crate::domain::error::QuantscanError;
use crate::domain::strategy::Strategy;
use crate::ports::store_port::StorePort;

/// Keyed by (scan_date, strategy, code).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRow {
    pub scan_date: NaiveDate,
    pub strategy: Strategy,
    pub code: String,
    pub name: String,
    pub entry_price: f64,
    pub market: String,
}

pub fn rows_from_matches(scan_date: NaiveDate, records: &[MatchRecord]) -> Vec<HistoryRow> {
    records
        .iter()
        .flat_map(|record| {
            record.strategies().map(move |strategy| HistoryRow {
                scan_date,
                strategy,
                code: record.symbol.code.clone(),
                name: record.symbol.name.clone(),
                entry_price: record.price,
                market: record.symbol.market.clone(),
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistSummary {
    pub inserted: usize,
    pub duplicates: usize,
}

/// Inserts every row, ignoring rows whose key already exists.
pub fn persist(store: &dyn StorePort, rows: &[HistoryRow]) -> Result<PersistSummary, QuantscanError> {
    let mut summary = PersistSummary::default();
    for row in rows {
        if store.insert_history(row)? {
            summary.inserted += 1;
        } else {
            summary.duplicates += 1;
        }
    }
    if summary.duplicates > 0 {
        warn!(duplicates = summary.duplicates, "history rows already recorded");
    }
    info!(inserted = summary.inserted, "scan history saved");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::analyzer::analyze_bars;
    use crate::domain::ohlcv::OhlcvBar;
    use crate::domain::universe::Symbol;

    fn record() -> MatchRecord {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let bars: Vec<OhlcvBar> = (0..221)
            .map(|i| {
                let close = if i == 220 { 11_000.0 } else { 10_000.0 };
                OhlcvBar {
                    code: "005930".into(),
                    date: start + chrono::Duration::days(i),
                    open: close,
                    high: close + 100.0,
                    low: close - 100.0,
                    close,
                    volume: 1000,
                }
            })
            .collect();
        analyze_bars(&Symbol::new("005930", "Samsung", "KOSPI"), &bars, false)
            .unwrap()
            .unwrap()
    }

    #[test]
    fn one_row_per_matched_strategy() {
        let record = record();
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let rows = rows_from_matches(date, std::slice::from_ref(&record));
        assert_eq!(rows.len(), record.matches.len());
        assert!(rows.iter().all(|r| r.code == "005930" && r.scan_date == date));
        assert!(rows.iter().all(|r| (r.entry_price - 11_000.0).abs() < f64::EPSILON));
        assert_eq!(rows[0].strategy, record.top_strategy());
    }
}

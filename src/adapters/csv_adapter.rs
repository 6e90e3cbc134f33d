//! CSV directory data adapter.
//!
//! Layout: one `{code}.csv` per symbol with a `date,open,high,low,close,volume`
//! header, plus a `symbols.csv` listing with `code,name,market`.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::domain::error::QuantscanError;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::universe::Symbol;
use crate::ports::data_port::DataPort;

pub const SYMBOLS_FILE: &str = "symbols.csv";

#[derive(Debug, Deserialize)]
struct BarRow {
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: i64,
}

#[derive(Debug, Deserialize)]
struct SymbolRow {
    code: String,
    name: String,
    market: String,
}

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, code: &str) -> PathBuf {
        self.base_path.join(format!("{code}.csv"))
    }

    fn read_bars(&self, code: &str) -> Result<Vec<OhlcvBar>, QuantscanError> {
        let path = self.csv_path(code);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(QuantscanError::NoData { code: code.into() });
            }
            Err(e) => {
                return Err(QuantscanError::Database {
                    reason: format!("failed to read {}: {e}", path.display()),
                });
            }
        };

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();
        for result in rdr.deserialize::<BarRow>() {
            let row = result.map_err(|e| QuantscanError::Database {
                reason: format!("CSV parse error in {}: {e}", path.display()),
            })?;
            bars.push(OhlcvBar {
                code: code.to_string(),
                date: row.date,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
            });
        }

        bars.sort_by_key(|b| b.date);
        bars.dedup_by_key(|b| b.date);
        Ok(bars)
    }
}

impl DataPort for CsvAdapter {
    /// The window ends at the file's latest bar.
    fn fetch_ohlcv(
        &self,
        code: &str,
        lookback_days: u32,
    ) -> Result<Vec<OhlcvBar>, QuantscanError> {
        let mut bars = self.read_bars(code)?;
        if let Some(latest) = bars.last().map(|b| b.date) {
            let start = latest
                .checked_sub_days(chrono::Days::new(u64::from(lookback_days)))
                .unwrap_or(NaiveDate::MIN);
            bars.retain(|b| b.date >= start);
        }
        Ok(bars)
    }

    fn fetch_latest_quote(&self, code: &str) -> Result<Option<f64>, QuantscanError> {
        match self.read_bars(code) {
            Ok(bars) => Ok(bars.last().map(|b| b.close)),
            Err(QuantscanError::NoData { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn list_symbols(&self, market: &str) -> Result<Vec<Symbol>, QuantscanError> {
        let path = self.base_path.join(SYMBOLS_FILE);
        let mut rdr = csv::Reader::from_path(&path).map_err(|e| QuantscanError::Database {
            reason: format!("failed to read {}: {e}", path.display()),
        })?;

        let mut symbols = Vec::new();
        for result in rdr.deserialize::<SymbolRow>() {
            let row = result.map_err(|e| QuantscanError::Database {
                reason: format!("CSV parse error in {}: {e}", path.display()),
            })?;
            if row.market.trim().eq_ignore_ascii_case(market) {
                symbols.push(Symbol::new(&row.code, &row.name, &row.market));
            }
        }
        Ok(symbols)
    }
}

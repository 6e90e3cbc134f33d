#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use chrono::NaiveDate;
pub use quantscan::domain::ohlcv::OhlcvBar;
use quantscan::domain::error::QuantscanError;
use quantscan::domain::favorites::Favorite;
use quantscan::domain::history::HistoryRow;
use quantscan::domain::stats::StrategyStat;
use quantscan::domain::universe::Symbol;
use quantscan::ports::data_port::DataPort;
use quantscan::ports::store_port::StorePort;

/// In-memory market data with per-code failure injection.
#[derive(Default)]
pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
    pub delays: HashMap<String, Duration>,
    pub panics: HashSet<String>,
    pub quotes: HashMap<String, f64>,
    pub listings: HashMap<String, Vec<Symbol>>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bars(mut self, code: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(code.to_string(), bars);
        self
    }

    pub fn with_error(mut self, code: &str, reason: &str) -> Self {
        self.errors.insert(code.to_string(), reason.to_string());
        self
    }

    pub fn with_delay(mut self, code: &str, delay: Duration) -> Self {
        self.delays.insert(code.to_string(), delay);
        self
    }

    pub fn with_panic(mut self, code: &str) -> Self {
        self.panics.insert(code.to_string());
        self
    }

    pub fn with_quote(mut self, code: &str, price: f64) -> Self {
        self.quotes.insert(code.to_string(), price);
        self
    }

    pub fn with_symbols(mut self, market: &str, symbols: Vec<Symbol>) -> Self {
        self.listings.insert(market.to_uppercase(), symbols);
        self
    }

    fn check(&self, code: &str) -> Result<(), QuantscanError> {
        if let Some(delay) = self.delays.get(code) {
            std::thread::sleep(*delay);
        }
        if self.panics.contains(code) {
            panic!("provider blew up on {code}");
        }
        if let Some(reason) = self.errors.get(code) {
            return Err(QuantscanError::Database {
                reason: reason.clone(),
            });
        }
        Ok(())
    }
}

impl DataPort for MockDataPort {
    fn fetch_ohlcv(&self, code: &str, _lookback_days: u32) -> Result<Vec<OhlcvBar>, QuantscanError> {
        self.check(code)?;
        Ok(self.data.get(code).cloned().unwrap_or_default())
    }

    fn fetch_latest_quote(&self, code: &str) -> Result<Option<f64>, QuantscanError> {
        if let Some(reason) = self.errors.get(code) {
            return Err(QuantscanError::Database {
                reason: reason.clone(),
            });
        }
        Ok(self
            .quotes
            .get(code)
            .copied()
            .or_else(|| self.data.get(code).and_then(|b| b.last()).map(|b| b.close)))
    }

    fn list_symbols(&self, market: &str) -> Result<Vec<Symbol>, QuantscanError> {
        self.listings
            .get(&market.to_uppercase())
            .cloned()
            .ok_or_else(|| QuantscanError::Database {
                reason: format!("no listing for {market}"),
            })
    }
}

/// Store kept in process memory, mirroring the SQLite adapter's semantics.
#[derive(Default)]
pub struct MemoryStore {
    favorites: Mutex<Vec<Favorite>>,
    history: Mutex<Vec<HistoryRow>>,
    stats: Mutex<Vec<StrategyStat>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history_len(&self) -> usize {
        self.history.lock().unwrap().len()
    }
}

impl StorePort for MemoryStore {
    fn add_favorite(&self, favorite: &Favorite) -> Result<bool, QuantscanError> {
        let mut favorites = self.favorites.lock().unwrap();
        if favorites.iter().any(|f| f.code == favorite.code) {
            return Ok(false);
        }
        favorites.push(favorite.clone());
        Ok(true)
    }

    fn remove_favorite(&self, code: &str) -> Result<bool, QuantscanError> {
        let mut favorites = self.favorites.lock().unwrap();
        let before = favorites.len();
        favorites.retain(|f| f.code != code);
        Ok(favorites.len() != before)
    }

    fn list_favorites(&self) -> Result<Vec<Favorite>, QuantscanError> {
        Ok(self.favorites.lock().unwrap().clone())
    }

    fn update_favorite_price(&self, code: &str, price: f64) -> Result<bool, QuantscanError> {
        let mut favorites = self.favorites.lock().unwrap();
        Ok(match favorites.iter_mut().find(|f| f.code == code) {
            Some(f) => {
                f.entry_price = price;
                true
            }
            None => false,
        })
    }

    fn update_favorite_date(&self, code: &str, date: NaiveDate) -> Result<bool, QuantscanError> {
        let mut favorites = self.favorites.lock().unwrap();
        Ok(match favorites.iter_mut().find(|f| f.code == code) {
            Some(f) => {
                f.entry_date = date;
                true
            }
            None => false,
        })
    }

    fn insert_history(&self, row: &HistoryRow) -> Result<bool, QuantscanError> {
        let mut history = self.history.lock().unwrap();
        let exists = history.iter().any(|r| {
            r.scan_date == row.scan_date && r.strategy == row.strategy && r.code == row.code
        });
        if exists {
            return Ok(false);
        }
        history.push(row.clone());
        Ok(true)
    }

    fn history_dates(&self) -> Result<Vec<NaiveDate>, QuantscanError> {
        let mut dates: Vec<NaiveDate> = self.history.lock().unwrap().iter().map(|r| r.scan_date).collect();
        dates.sort_by(|a, b| b.cmp(a));
        dates.dedup();
        Ok(dates)
    }

    fn history_for_date(&self, date: NaiveDate) -> Result<Vec<HistoryRow>, QuantscanError> {
        Ok(self
            .history
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.scan_date == date)
            .cloned()
            .collect())
    }

    fn replace_strategy_stats(&self, stats: &[StrategyStat]) -> Result<(), QuantscanError> {
        let mut stored = self.stats.lock().unwrap();
        for stat in stats {
            stored.retain(|s| s.strategy != stat.strategy);
            stored.push(stat.clone());
        }
        Ok(())
    }

    fn strategy_stats(&self) -> Result<Vec<StrategyStat>, QuantscanError> {
        Ok(self.stats.lock().unwrap().clone())
    }
}

/// Store whose every write fails, for persistence-failure paths.
pub struct FailingStore {
    pub reason: String,
}

impl FailingStore {
    pub fn new(reason: &str) -> Self {
        Self {
            reason: reason.to_string(),
        }
    }

    fn fail<T>(&self) -> Result<T, QuantscanError> {
        Err(QuantscanError::Database {
            reason: self.reason.clone(),
        })
    }
}

impl StorePort for FailingStore {
    fn add_favorite(&self, _: &Favorite) -> Result<bool, QuantscanError> {
        self.fail()
    }

    fn remove_favorite(&self, _: &str) -> Result<bool, QuantscanError> {
        self.fail()
    }

    fn list_favorites(&self) -> Result<Vec<Favorite>, QuantscanError> {
        Ok(Vec::new())
    }

    fn update_favorite_price(&self, _: &str, _: f64) -> Result<bool, QuantscanError> {
        self.fail()
    }

    fn update_favorite_date(&self, _: &str, _: NaiveDate) -> Result<bool, QuantscanError> {
        self.fail()
    }

    fn insert_history(&self, _: &HistoryRow) -> Result<bool, QuantscanError> {
        self.fail()
    }

    fn history_dates(&self) -> Result<Vec<NaiveDate>, QuantscanError> {
        Ok(Vec::new())
    }

    fn history_for_date(&self, _: NaiveDate) -> Result<Vec<HistoryRow>, QuantscanError> {
        Ok(Vec::new())
    }

    fn replace_strategy_stats(&self, _: &[StrategyStat]) -> Result<(), QuantscanError> {
        self.fail()
    }

    fn strategy_stats(&self) -> Result<Vec<StrategyStat>, QuantscanError> {
        Ok(Vec::new())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_bar(code: &str, date: &str, close: f64) -> OhlcvBar {
    OhlcvBar {
        code: code.to_string(),
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        open: close,
        high: close * 1.01,
        low: close * 0.99,
        close,
        volume: 1000,
    }
}

/// Daily bars from 2023-01-02, high/low 1% around the close, volume 1000.
pub fn bars_from_closes(code: &str, closes: &[f64]) -> Vec<OhlcvBar> {
    let start = date(2023, 1, 2);
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| OhlcvBar {
            code: code.to_string(),
            date: start + chrono::Duration::days(i as i64),
            open: close,
            high: close * 1.01,
            low: close * 0.99,
            close,
            volume: 1000,
        })
        .collect()
}

/// Flat at `base` for bars 0..=209, then one unit higher each bar, `count` bars total.
pub fn flat_then_rise(code: &str, base: f64, count: usize) -> Vec<OhlcvBar> {
    let closes: Vec<f64> = (0..count)
        .map(|t| {
            if t <= 209 {
                base
            } else {
                base + (t - 209) as f64
            }
        })
        .collect();
    bars_from_closes(code, &closes)
}

/// Decline to bar 59, steady recovery to bar 199, a shallow pullback on
/// bars 200..=209 that keeps EMA10 > EMA20 > EMA60 while MACD slips under
/// its signal, then a gap up at bar 210 that crosses it back. Bar 210
/// closes at 305 and the rise continues one unit per bar.
pub fn elite_setup(code: &str, count: usize) -> Vec<OhlcvBar> {
    let closes: Vec<f64> = (0..count)
        .map(|t| {
            let t = t as f64;
            if t < 60.0 {
                200.0 - t
            } else if t < 200.0 {
                140.0 + (t - 60.0)
            } else if t < 210.0 {
                280.0 - 0.5 * (t - 199.0)
            } else {
                305.0 + (t - 210.0)
            }
        })
        .collect();
    bars_from_closes(code, &closes)
}

/// Flat at `base` for 220 bars, then a single bar at `last`.
pub fn flat_then_jump(code: &str, base: f64, last: f64) -> Vec<OhlcvBar> {
    let mut closes = vec![base; 220];
    closes.push(last);
    bars_from_closes(code, &closes)
}

pub fn symbol(code: &str, market: &str) -> Symbol {
    Symbol::new(code, code, market)
}

//! SQLite adapter: cached market data plus the persistent store.

use chrono::NaiveDate;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{OptionalExtension, params};

use crate::domain::error::QuantscanError;
use crate::domain::favorites::{Favorite, split_tags};
use crate::domain::history::HistoryRow;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::stats::StrategyStat;
use crate::domain::strategy::Strategy;
use crate::domain::universe::Symbol;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::store_port::StorePort;

const DATE_FORMAT: &str = "%Y-%m-%d";

fn window_start(latest: NaiveDate, lookback_days: u32) -> NaiveDate {
    latest
        .checked_sub_days(chrono::Days::new(u64::from(lookback_days)))
        .unwrap_or(NaiveDate::MIN)
}

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

fn pool_err(e: r2d2::Error) -> QuantscanError {
    QuantscanError::Database {
        reason: e.to_string(),
    }
}

fn query_err(e: rusqlite::Error) -> QuantscanError {
    QuantscanError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn parse_date(raw: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            raw.len(),
            rusqlite::types::Type::Text,
            Box::new(e),
        )
    })
}

fn parse_strategy(raw: &str) -> rusqlite::Result<Strategy> {
    raw.parse::<Strategy>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            raw.len(),
            rusqlite::types::Type::Text,
            Box::new(e),
        )
    })
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, QuantscanError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| QuantscanError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;

        let pool_size = config.get_int("sqlite", "pool_size", 4).max(1) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(pool_err)?;

        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, QuantscanError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(pool_err)?;

        Ok(Self { pool })
    }

    fn conn(&self) -> Result<r2d2::PooledConnection<SqliteConnectionManager>, QuantscanError> {
        self.pool.get().map_err(pool_err)
    }

    pub fn initialize_schema(&self) -> Result<(), QuantscanError> {
        self.conn()?
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS ohlcv (
                    code TEXT NOT NULL,
                    date TEXT NOT NULL,
                    open REAL NOT NULL,
                    high REAL NOT NULL,
                    low REAL NOT NULL,
                    close REAL NOT NULL,
                    volume INTEGER NOT NULL,
                    PRIMARY KEY (code, date)
                );
                CREATE INDEX IF NOT EXISTS idx_ohlcv_date ON ohlcv(date);
                CREATE TABLE IF NOT EXISTS symbols (
                    code TEXT NOT NULL,
                    name TEXT NOT NULL,
                    market TEXT NOT NULL,
                    PRIMARY KEY (code, market)
                );
                CREATE TABLE IF NOT EXISTS favorites (
                    code TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    entry_price REAL NOT NULL,
                    entry_date TEXT NOT NULL,
                    tags TEXT NOT NULL DEFAULT ''
                );
                CREATE TABLE IF NOT EXISTS scan_history (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    scan_date TEXT NOT NULL,
                    strategy_name TEXT NOT NULL,
                    code TEXT NOT NULL,
                    name TEXT NOT NULL,
                    entry_price REAL NOT NULL,
                    market TEXT NOT NULL,
                    UNIQUE (scan_date, strategy_name, code)
                );
                CREATE TABLE IF NOT EXISTS strategy_stats (
                    strategy_name TEXT PRIMARY KEY,
                    wins INTEGER NOT NULL,
                    total_count INTEGER NOT NULL,
                    win_rate REAL NOT NULL,
                    last_updated TEXT NOT NULL
                );",
            )
            .map_err(query_err)
    }

    pub fn insert_bars(&self, bars: &[OhlcvBar]) -> Result<(), QuantscanError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;

        for bar in bars {
            tx.execute(
                "INSERT OR REPLACE INTO ohlcv (code, date, open, high, low, close, volume)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    bar.code,
                    bar.date.format(DATE_FORMAT).to_string(),
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                    bar.volume
                ],
            )
            .map_err(query_err)?;
        }

        tx.commit().map_err(query_err)
    }

    pub fn insert_symbols(&self, symbols: &[Symbol]) -> Result<(), QuantscanError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;
        for symbol in symbols {
            tx.execute(
                "INSERT OR REPLACE INTO symbols (code, name, market) VALUES (?1, ?2, ?3)",
                params![symbol.code, symbol.name, symbol.market.to_uppercase()],
            )
            .map_err(query_err)?;
        }
        tx.commit().map_err(query_err)
    }

    fn latest_date(&self, code: &str) -> Result<Option<NaiveDate>, QuantscanError> {
        let conn = self.conn()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT MAX(date) FROM ohlcv WHERE code = ?1",
                params![code],
                |row| row.get(0),
            )
            .map_err(query_err)?;
        raw.map(|d| parse_date(&d).map_err(query_err)).transpose()
    }
}

impl DataPort for SqliteAdapter {
    /// The window ends at the latest stored bar for the code.
    fn fetch_ohlcv(
        &self,
        code: &str,
        lookback_days: u32,
    ) -> Result<Vec<OhlcvBar>, QuantscanError> {
        let Some(latest) = self.latest_date(code)? else {
            return Ok(Vec::new());
        };
        let start = window_start(latest, lookback_days);

        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT code, date, open, high, low, close, volume
                 FROM ohlcv
                 WHERE code = ?1 AND date >= ?2
                 ORDER BY date ASC",
            )
            .map_err(query_err)?;

        let rows = stmt
            .query_map(params![code, start.format(DATE_FORMAT).to_string()], |row| {
                let date: String = row.get(1)?;
                Ok(OhlcvBar {
                    code: row.get(0)?,
                    date: parse_date(&date)?,
                    open: row.get(2)?,
                    high: row.get(3)?,
                    low: row.get(4)?,
                    close: row.get(5)?,
                    volume: row.get(6)?,
                })
            })
            .map_err(query_err)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(query_err)
    }

    fn fetch_latest_quote(&self, code: &str) -> Result<Option<f64>, QuantscanError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT close FROM ohlcv WHERE code = ?1 ORDER BY date DESC LIMIT 1",
            params![code],
            |row| row.get(0),
        )
        .optional()
        .map_err(query_err)
    }

    fn list_symbols(&self, market: &str) -> Result<Vec<Symbol>, QuantscanError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT code, name, market FROM symbols WHERE market = ?1 ORDER BY code")
            .map_err(query_err)?;
        let rows = stmt
            .query_map(params![market.to_uppercase()], |row| {
                Ok(Symbol {
                    code: row.get(0)?,
                    name: row.get(1)?,
                    market: row.get(2)?,
                })
            })
            .map_err(query_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(query_err)
    }
}

impl StorePort for SqliteAdapter {
    fn add_favorite(&self, favorite: &Favorite) -> Result<bool, QuantscanError> {
        let changed = self
            .conn()?
            .execute(
                "INSERT OR IGNORE INTO favorites (code, name, entry_price, entry_date, tags)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    favorite.code,
                    favorite.name,
                    favorite.entry_price,
                    favorite.entry_date.format(DATE_FORMAT).to_string(),
                    favorite.tags_joined()
                ],
            )
            .map_err(query_err)?;
        Ok(changed > 0)
    }

    fn remove_favorite(&self, code: &str) -> Result<bool, QuantscanError> {
        let changed = self
            .conn()?
            .execute("DELETE FROM favorites WHERE code = ?1", params![code])
            .map_err(query_err)?;
        Ok(changed > 0)
    }

    fn list_favorites(&self) -> Result<Vec<Favorite>, QuantscanError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT code, name, entry_price, entry_date, tags
                 FROM favorites ORDER BY entry_date DESC, code",
            )
            .map_err(query_err)?;
        let rows = stmt
            .query_map([], |row| {
                let date: String = row.get(3)?;
                let tags: String = row.get(4)?;
                Ok(Favorite {
                    code: row.get(0)?,
                    name: row.get(1)?,
                    entry_price: row.get(2)?,
                    entry_date: parse_date(&date)?,
                    tags: split_tags(&tags),
                })
            })
            .map_err(query_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(query_err)
    }

    fn update_favorite_price(&self, code: &str, price: f64) -> Result<bool, QuantscanError> {
        let changed = self
            .conn()?
            .execute(
                "UPDATE favorites SET entry_price = ?1 WHERE code = ?2",
                params![price, code],
            )
            .map_err(query_err)?;
        Ok(changed > 0)
    }

    fn update_favorite_date(&self, code: &str, date: NaiveDate) -> Result<bool, QuantscanError> {
        let changed = self
            .conn()?
            .execute(
                "UPDATE favorites SET entry_date = ?1 WHERE code = ?2",
                params![date.format(DATE_FORMAT).to_string(), code],
            )
            .map_err(query_err)?;
        Ok(changed > 0)
    }

    fn insert_history(&self, row: &HistoryRow) -> Result<bool, QuantscanError> {
        let changed = self
            .conn()?
            .execute(
                "INSERT OR IGNORE INTO scan_history
                 (scan_date, strategy_name, code, name, entry_price, market)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    row.scan_date.format(DATE_FORMAT).to_string(),
                    row.strategy.key(),
                    row.code,
                    row.name,
                    row.entry_price,
                    row.market
                ],
            )
            .map_err(query_err)?;
        Ok(changed > 0)
    }

    fn history_dates(&self) -> Result<Vec<NaiveDate>, QuantscanError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT DISTINCT scan_date FROM scan_history ORDER BY scan_date DESC")
            .map_err(query_err)?;
        let rows = stmt
            .query_map([], |row| {
                let date: String = row.get(0)?;
                parse_date(&date)
            })
            .map_err(query_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(query_err)
    }

    fn history_for_date(&self, date: NaiveDate) -> Result<Vec<HistoryRow>, QuantscanError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT scan_date, strategy_name, code, name, entry_price, market
                 FROM scan_history WHERE scan_date = ?1 ORDER BY id",
            )
            .map_err(query_err)?;
        let rows = stmt
            .query_map(params![date.format(DATE_FORMAT).to_string()], |row| {
                let scan_date: String = row.get(0)?;
                let strategy: String = row.get(1)?;
                Ok(HistoryRow {
                    scan_date: parse_date(&scan_date)?,
                    strategy: parse_strategy(&strategy)?,
                    code: row.get(2)?,
                    name: row.get(3)?,
                    entry_price: row.get(4)?,
                    market: row.get(5)?,
                })
            })
            .map_err(query_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(query_err)
    }

    fn replace_strategy_stats(&self, stats: &[StrategyStat]) -> Result<(), QuantscanError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;
        for stat in stats {
            tx.execute(
                "INSERT OR REPLACE INTO strategy_stats
                 (strategy_name, wins, total_count, win_rate, last_updated)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    stat.strategy.key(),
                    stat.wins as i64,
                    stat.total as i64,
                    stat.win_rate,
                    stat.last_updated.format(DATE_FORMAT).to_string()
                ],
            )
            .map_err(query_err)?;
        }
        tx.commit().map_err(query_err)
    }

    fn strategy_stats(&self) -> Result<Vec<StrategyStat>, QuantscanError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT strategy_name, wins, total_count, win_rate, last_updated
                 FROM strategy_stats ORDER BY strategy_name",
            )
            .map_err(query_err)?;
        let rows = stmt
            .query_map([], |row| {
                let strategy: String = row.get(0)?;
                let wins: i64 = row.get(1)?;
                let total: i64 = row.get(2)?;
                let updated: String = row.get(4)?;
                Ok(StrategyStat {
                    strategy: parse_strategy(&strategy)?,
                    wins: wins.max(0) as usize,
                    total: total.max(0) as usize,
                    win_rate: row.get(3)?,
                    last_updated: parse_date(&updated)?,
                })
            })
            .map_err(query_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(query_err)
    }
}

//! Persistent store port: favorites, scan history, strategy stats.

use chrono::NaiveDate;

use crate::domain::error::QuantscanError;
use crate::domain::favorites::Favorite;
use crate::domain::history::HistoryRow;
use crate::domain::stats::StrategyStat;
use crate::domain::strategy::Strategy;

/// The store serializes its own writes; callers never coordinate transactions.
pub trait StorePort: Send + Sync {
    /// Adds a favorite unless the code is already present. Returns whether a row was added.
    fn add_favorite(&self, favorite: &Favorite) -> Result<bool, QuantscanError>;
    fn remove_favorite(&self, code: &str) -> Result<bool, QuantscanError>;
    fn list_favorites(&self) -> Result<Vec<Favorite>, QuantscanError>;
    fn update_favorite_price(&self, code: &str, price: f64) -> Result<bool, QuantscanError>;
    fn update_favorite_date(&self, code: &str, date: NaiveDate) -> Result<bool, QuantscanError>;

    /// Inserts a history row if its (date, strategy, code) key is new.
    /// Returns whether a row was written; duplicates are not an error.
    fn insert_history(&self, row: &HistoryRow) -> Result<bool, QuantscanError>;
    /// Distinct scan dates, most recent first.
    fn history_dates(&self) -> Result<Vec<NaiveDate>, QuantscanError>;
    fn history_for_date(&self, date: NaiveDate) -> Result<Vec<HistoryRow>, QuantscanError>;

    /// Replaces the stored snapshot for every strategy in `stats`.
    fn replace_strategy_stats(&self, stats: &[StrategyStat]) -> Result<(), QuantscanError>;
    fn strategy_stats(&self) -> Result<Vec<StrategyStat>, QuantscanError>;
    fn strategy_stat(&self, strategy: Strategy) -> Result<Option<StrategyStat>, QuantscanError> {
        Ok(self
            .strategy_stats()?
            .into_iter()
            .find(|s| s.strategy == strategy))
    }
}

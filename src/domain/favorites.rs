//! Watch-list entries and their performance since entry.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::universe::{Symbol, normalize_code};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Favorite {
    pub code: String,
    pub name: String,
    pub entry_price: f64,
    pub entry_date: NaiveDate,
    /// Strategy tags recorded when the favorite was added.
    pub tags: Vec<String>,
}

impl Favorite {
    pub fn new(symbol: &Symbol, entry_price: f64, entry_date: NaiveDate, tags: Vec<String>) -> Self {
        Self {
            code: normalize_code(&symbol.code),
            name: symbol.name.clone(),
            entry_price,
            entry_date,
            tags,
        }
    }

    pub fn tags_joined(&self) -> String {
        self.tags.join(",")
    }
}

pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FavoritePerformance {
    pub favorite: Favorite,
    pub current: Option<f64>,
    pub return_pct: f64,
    pub days_held: i64,
    pub daily_return_pct: f64,
}

/// Return since entry. Zero unless both the entry and current prices are positive.
pub fn performance(favorite: &Favorite, current: Option<f64>, today: NaiveDate) -> FavoritePerformance {
    let return_pct = match current {
        Some(cur) if cur > 0.0 && favorite.entry_price > 0.0 => {
            (cur - favorite.entry_price) / favorite.entry_price * 100.0
        }
        _ => 0.0,
    };
    let days_held = (today - favorite.entry_date).num_days();
    FavoritePerformance {
        favorite: favorite.clone(),
        current,
        return_pct,
        days_held,
        daily_return_pct: return_pct / days_held.max(1) as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn favorite(entry_price: f64) -> Favorite {
        Favorite::new(
            &Symbol::new("5930", "Samsung", "KOSPI"),
            entry_price,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            vec!["dbb".into()],
        )
    }

    #[test]
    fn new_favorite_normalizes_code() {
        assert_eq!(favorite(100.0).code, "005930");
    }

    #[test]
    fn return_and_daily_return() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 11).unwrap();
        let perf = performance(&favorite(100.0), Some(110.0), today);
        assert!((perf.return_pct - 10.0).abs() < 1e-9);
        assert_eq!(perf.days_held, 10);
        assert!((perf.daily_return_pct - 1.0).abs() < 1e-9);
    }

    #[test]
    fn same_day_divides_by_one() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let perf = performance(&favorite(100.0), Some(90.0), today);
        assert_eq!(perf.days_held, 0);
        assert!((perf.daily_return_pct + 10.0).abs() < 1e-9);
    }

    #[test]
    fn missing_quote_is_zero_return() {
        let today = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        assert_eq!(performance(&favorite(100.0), None, today).return_pct, 0.0);
        assert_eq!(performance(&favorite(0.0), Some(50.0), today).return_pct, 0.0);
    }

    #[test]
    fn tags_round_trip() {
        assert_eq!(split_tags("dbb, turtle,,"), vec!["dbb", "turtle"]);
        assert_eq!(favorite(1.0).tags_joined(), "dbb");
    }
}

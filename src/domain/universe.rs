//! Symbol universe assembly.
//!
//! Parses the configured market list, fetches each market's listing, and
//! merges them into one universe de-duplicated by symbol code.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::error::QuantscanError;
use crate::domain::market::{self, Currency};
use crate::ports::data_port::DataPort;

/// Width that purely numeric domestic codes are zero-padded to.
pub const DOMESTIC_CODE_WIDTH: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub code: String,
    pub name: String,
    pub market: String,
}

impl Symbol {
    pub fn new(code: &str, name: &str, market: &str) -> Self {
        Self {
            code: normalize_code(code),
            name: name.trim().to_string(),
            market: market.trim().to_string(),
        }
    }

    pub fn currency(&self) -> Currency {
        market::classify(&self.code, &self.market)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in market list")]
    EmptyToken,

    #[error("duplicate market: {0}")]
    DuplicateMarket(String),

    #[error("no markets configured")]
    NoMarkets,
}

/// Numeric codes shorter than six digits are zero-padded; others are trimmed.
pub fn normalize_code(code: &str) -> String {
    let trimmed = code.trim();
    if !trimmed.is_empty()
        && trimmed.chars().all(|c| c.is_ascii_digit())
        && trimmed.len() < DOMESTIC_CODE_WIDTH
    {
        format!("{trimmed:0>width$}", width = DOMESTIC_CODE_WIDTH)
    } else {
        trimmed.to_string()
    }
}

pub fn parse_markets(input: &str) -> Result<Vec<String>, UniverseError> {
    if input.trim().is_empty() {
        return Err(UniverseError::NoMarkets);
    }
    let mut markets = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let market = trimmed.to_uppercase();
        if !seen.insert(market.clone()) {
            return Err(UniverseError::DuplicateMarket(market));
        }
        markets.push(market);
    }

    Ok(markets)
}

/// Union of listings in order; the first occurrence of a code wins.
pub fn merge_listings(listings: impl IntoIterator<Item = Vec<Symbol>>) -> Vec<Symbol> {
    let mut seen = HashSet::new();
    listings
        .into_iter()
        .flatten()
        .map(|s| Symbol {
            code: normalize_code(&s.code),
            ..s
        })
        .filter(|s| seen.insert(s.code.clone()))
        .collect()
}

/// Fetches every market's listing and merges them. A market whose listing
/// fails is skipped; the call fails only when every market fails.
pub fn build_universe(
    data_port: &dyn DataPort,
    markets: &[String],
) -> Result<Vec<Symbol>, QuantscanError> {
    let mut listings = Vec::new();
    let mut last_error = None;

    for market in markets {
        match data_port.list_symbols(market) {
            Ok(symbols) => {
                debug!(market = %market, count = symbols.len(), "listed market");
                listings.push(symbols);
            }
            Err(e) => {
                warn!(market = %market, error = %e, "skipping market listing");
                last_error = Some(e);
            }
        }
    }

    if listings.is_empty() {
        if let Some(e) = last_error {
            return Err(e);
        }
    }

    Ok(merge_listings(listings))
}

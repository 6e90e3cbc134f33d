//! Currency classification and price presentation.
//!
//! Whether a symbol trades in the domestic currency or abroad is decided
//! here and nowhere else. The current rule is a heuristic over the ticker
//! shape and the market name.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    Domestic,
    Foreign,
}

const FOREIGN_MARKETS: [&str; 4] = ["US", "NASDAQ", "NYSE", "S&P"];

/// Alphabetic tickers and US venues are foreign; everything else is domestic.
pub fn classify(code: &str, market: &str) -> Currency {
    let alphabetic = !code.is_empty() && code.chars().all(|c| c.is_alphabetic());
    let market = market.to_uppercase();
    if alphabetic || FOREIGN_MARKETS.iter().any(|m| market.contains(m)) {
        Currency::Foreign
    } else {
        Currency::Domestic
    }
}

impl Currency {
    /// Prices strictly below this are penny stocks.
    pub fn penny_threshold(self) -> f64 {
        match self {
            Currency::Domestic => 1000.0,
            Currency::Foreign => 1.0,
        }
    }

    pub fn is_penny(self, price: f64) -> bool {
        price < self.penny_threshold()
    }

    /// `$1,234.56` for foreign prices, `₩1,234` for domestic ones.
    pub fn format_price(self, price: f64) -> String {
        match self {
            Currency::Foreign => {
                let cents = (price.abs() * 100.0).round() as u64;
                let sign = if price < 0.0 { "-" } else { "" };
                format!(
                    "{sign}${}.{:02}",
                    group_thousands(cents / 100),
                    cents % 100
                )
            }
            Currency::Domestic => {
                let sign = if price < 0.0 { "-" } else { "" };
                format!("{sign}₩{}", group_thousands(price.abs().trunc() as u64))
            }
        }
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

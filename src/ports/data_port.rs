//! Market data and symbol universe port.

use crate::domain::error::QuantscanError;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::universe::Symbol;

/// Source of price history, latest quotes, and market listings.
///
/// Implementations are shared across scan workers, so they must be
/// `Send + Sync`. Listings are expected to be pre-filtered to common equity.
pub trait DataPort: Send + Sync {
    /// Bars covering roughly the last `lookback_days` calendar days, oldest first.
    fn fetch_ohlcv(&self, code: &str, lookback_days: u32)
    -> Result<Vec<OhlcvBar>, QuantscanError>;

    /// Latest traded price, or `None` when no quote is available.
    fn fetch_latest_quote(&self, code: &str) -> Result<Option<f64>, QuantscanError>;

    fn list_symbols(&self, market: &str) -> Result<Vec<Symbol>, QuantscanError>;
}

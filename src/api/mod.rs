pub mod synthetic;
pub mod yahoo;

pub use synthetic::SyntheticSource;
pub use yahoo::{YahooClient, YAHOO_API_BASE};

use crate::error::DataError;
use crate::models::{BarInterval, LookbackRange, Series};
use std::future::Future;

/// Provider of OHLC bars for a symbol
///
/// Implementations normalize whatever shape the provider returns into a
/// chronologically ordered `Series` and report an empty result as
/// `DataError::Empty`.
pub trait MarketDataSource: Send + Sync {
    /// Human-readable provider name
    fn name(&self) -> &str;

    fn fetch_bars(
        &self,
        symbol: &str,
        range: LookbackRange,
        interval: BarInterval,
    ) -> impl Future<Output = Result<Series, DataError>> + Send;
}

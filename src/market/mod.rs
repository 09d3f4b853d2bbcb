pub mod binance;
pub mod types;

use crate::error::AppError;
use futures_util::future::BoxFuture;

/// Source of the current price for an exchange ticker (e.g. `BTCUSDT`).
///
/// Implementations return the price already formatted to two decimals.
pub trait PriceSource: Send + Sync + 'static {
    fn fetch_price<'a>(&'a self, ticker: &'a str) -> BoxFuture<'a, Result<String, AppError>>;
}

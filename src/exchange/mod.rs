pub mod coinbase;
pub mod historical;

pub use coinbase::CoinbaseClient;
pub use historical::HistoricalFeed;

use async_trait::async_trait;

use crate::error::SignalResult;
use crate::models::{CandleSeries, Timeframe};

/// Source of OHLCV candles. Implementations return the most recent
/// `count` bars oldest-first, or `DataUnavailable` when there are none.
#[async_trait]
pub trait MarketData: Send + Sync {
    async fn fetch_candles(
        &mut self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> SignalResult<CandleSeries>;

    fn name(&self) -> &str;
}

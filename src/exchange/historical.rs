use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::error::{SignalError, SignalResult};
use crate::exchange::MarketData;
use crate::models::{Candle, CandleSeries, Timeframe};

/// Replays pre-loaded candles. A cursor (`now`) controls which candles
/// are visible: only candles with timestamp <= now are returned,
/// simulating a forward walk. Without a cursor everything is visible.
#[derive(Default)]
pub struct HistoricalFeed {
    data: HashMap<(String, Timeframe), Vec<Candle>>,
    now: Option<DateTime<Utc>>,
}

impl HistoricalFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Candles must be sorted oldest-first.
    pub fn load(&mut self, symbol: &str, tf: Timeframe, candles: Vec<Candle>) {
        self.data.insert((symbol.to_string(), tf), candles);
    }

    pub fn with_series(mut self, symbol: &str, tf: Timeframe, series: CandleSeries) -> Self {
        self.load(symbol, tf, series.into_iter().collect());
        self
    }

    pub fn set_time(&mut self, t: DateTime<Utc>) {
        self.now = Some(t);
    }

    /// Candles up to the cursor, capped at `limit`.
    fn visible(&self, symbol: &str, tf: Timeframe, limit: usize) -> Option<CandleSeries> {
        let all = self.data.get(&(symbol.to_string(), tf))?;
        let end = match self.now {
            Some(now) => all.partition_point(|c| c.timestamp <= now),
            None => all.len(),
        };
        let start = end.saturating_sub(limit);
        Some(CandleSeries::new(all[start..end].to_vec()))
    }
}

#[async_trait]
impl MarketData for HistoricalFeed {
    async fn fetch_candles(
        &mut self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> SignalResult<CandleSeries> {
        let series = match self.visible(symbol, timeframe, count) {
            Some(s) => s,
            // Fall back to resampling hourly data for H4
            None if timeframe == Timeframe::H4 => self
                .visible(symbol, Timeframe::H1, count * 4)
                .map(|h1| h1.resample(Timeframe::H4.as_duration()).tail(count))
                .unwrap_or_default(),
            None => {
                return Err(SignalError::DataUnavailable(format!(
                    "no {} data loaded for {}",
                    timeframe, symbol
                )))
            }
        };

        if series.is_empty() {
            return Err(SignalError::DataUnavailable(format!(
                "no {} candles for {} at cursor",
                timeframe, symbol
            )));
        }
        Ok(series)
    }

    fn name(&self) -> &str {
        "historical"
    }
}

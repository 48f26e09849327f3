use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{SignalError, SignalResult};
use crate::exchange::MarketData;
use crate::models::{Candle, CandleSeries, Timeframe};
use crate::retry::RetryPolicy;

const BASE_URL: &str = "https://api.coinbase.com";
const MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(100);
/// Largest page the public candles endpoint serves
const MAX_CANDLES_PER_REQUEST: usize = 350;

#[derive(Debug, Deserialize)]
struct CandleResponse {
    candles: Vec<RawCandle>,
}

#[derive(Debug, Deserialize)]
struct RawCandle {
    start: String,
    low: String,
    high: String,
    open: String,
    close: String,
    volume: String,
}

impl RawCandle {
    fn into_candle(self) -> Option<Candle> {
        let ts = self.start.parse::<i64>().ok()?;
        let volume: f64 = self.volume.parse().ok()?;
        Some(Candle {
            timestamp: DateTime::from_timestamp(ts, 0)?,
            open: self.open.parse().ok()?,
            high: self.high.parse().ok()?,
            low: self.low.parse().ok()?,
            close: self.close.parse().ok()?,
            volume: volume.max(0.0).round() as u64,
        })
    }
}

/// Public (unauthenticated) Coinbase market-data client for any number
/// of products.
pub struct CoinbaseClient {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
    last_request: Option<Instant>,
    cache: HashMap<String, (Instant, CandleSeries)>,
    cache_ttl: Duration,
}

impl CoinbaseClient {
    pub fn new(cfg: &Config) -> Self {
        Self {
            client: Client::new(),
            base_url: BASE_URL.to_string(),
            retry: cfg.fetch_retry.clone(),
            last_request: None,
            cache: HashMap::new(),
            cache_ttl: Duration::from_secs(5),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// "BTCUSD" -> "BTC-USD"; already-dashed ids pass through.
    pub fn product_id(symbol: &str) -> String {
        let s = symbol.trim().to_uppercase();
        if s.contains('-') || s.len() != 6 {
            s
        } else {
            format!("{}-{}", &s[..3], &s[3..])
        }
    }

    async fn rate_limit(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < MIN_REQUEST_INTERVAL {
                tokio::time::sleep(MIN_REQUEST_INTERVAL - elapsed).await;
            }
        }
        self.last_request = Some(Instant::now());
    }

    async fn request_candles(
        &self,
        product: &str,
        granularity: Timeframe,
        start: u64,
        end: u64,
    ) -> SignalResult<Vec<Candle>> {
        let resp = self
            .client
            .get(format!(
                "{}/api/v3/brokerage/market/products/{}/candles",
                self.base_url, product
            ))
            .query(&[
                ("start", start.to_string()),
                ("end", end.to_string()),
                ("granularity", granularity.coinbase_granularity().to_string()),
                ("limit", MAX_CANDLES_PER_REQUEST.to_string()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SignalError::DataUnavailable(format!(
                "Coinbase API error {} for {}: {}",
                status, product, body
            )));
        }

        let data: CandleResponse = resp.json().await?;
        let mut candles: Vec<Candle> = data
            .candles
            .into_iter()
            .filter_map(RawCandle::into_candle)
            .collect();

        // Coinbase returns newest first, we want oldest first
        candles.sort_by_key(|c| c.timestamp);
        Ok(candles)
    }

    /// Walks `[start, end)` in pages the endpoint will serve in full.
    async fn fetch_range(
        &mut self,
        product: &str,
        granularity: Timeframe,
        start: u64,
        end: u64,
    ) -> SignalResult<Vec<Candle>> {
        let windows = chunk_windows(start, end, granularity.as_seconds());
        let total = windows.len();
        let mut all = Vec::new();

        for (n, (chunk_start, chunk_end)) in windows.into_iter().enumerate() {
            self.rate_limit().await;
            let this = &*self;
            let label = format!("coinbase {} chunk {}/{}", product, n + 1, total);
            let candles = self
                .retry
                .run(&label, || {
                    this.request_candles(product, granularity, chunk_start, chunk_end)
                })
                .await?;
            all.extend(candles);
        }

        all.sort_by_key(|c| c.timestamp);
        all.dedup_by_key(|c| c.timestamp);
        Ok(all)
    }
}

/// Splits `[start, end)` into consecutive windows of at most
/// `MAX_CANDLES_PER_REQUEST` bars of `bar_secs` each.
fn chunk_windows(start: u64, end: u64, bar_secs: u64) -> Vec<(u64, u64)> {
    let step = bar_secs.max(1) * MAX_CANDLES_PER_REQUEST as u64;
    let mut windows = Vec::new();
    let mut chunk_start = start;
    while chunk_start < end {
        let chunk_end = (chunk_start + step).min(end);
        windows.push((chunk_start, chunk_end));
        chunk_start = chunk_end;
    }
    windows
}

#[async_trait]
impl MarketData for CoinbaseClient {
    async fn fetch_candles(
        &mut self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> SignalResult<CandleSeries> {
        let product = Self::product_id(symbol);
        let cache_key = format!("{}_{}_{}", product, timeframe, count);
        if let Some((cached_at, series)) = self.cache.get(&cache_key) {
            if cached_at.elapsed() < self.cache_ttl {
                return Ok(series.clone());
            }
        }

        // H4 is not served directly; fetch H1 and resample
        let (granularity, bars) = match timeframe {
            Timeframe::H4 => (Timeframe::H1, count * 4),
            tf => (tf, count),
        };
        let end = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| SignalError::Computation(e.to_string()))?
            .as_secs();
        let start = end.saturating_sub(granularity.as_seconds() * bars as u64);
        let candles = self.fetch_range(&product, granularity, start, end).await?;

        let mut series = CandleSeries::new(candles);
        if timeframe == Timeframe::H4 {
            series = series.resample(Timeframe::H4.as_duration());
        }
        if series.is_empty() {
            return Err(SignalError::DataUnavailable(format!(
                "no {} candles for {}",
                timeframe, product
            )));
        }
        let series = series.tail(count);
        if series.len() < count {
            warn!(
                "[coinbase] {} returned {} of {} requested {} bars",
                product,
                series.len(),
                count,
                timeframe
            );
        }
        debug!("[coinbase] {} {} bars for {}", series.len(), timeframe, product);

        self.cache.insert(cache_key, (Instant::now(), series.clone()));
        Ok(series)
    }

    fn name(&self) -> &str {
        "coinbase"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_ids() {
        assert_eq!(CoinbaseClient::product_id("btcusd"), "BTC-USD");
        assert_eq!(CoinbaseClient::product_id("ETH-EUR"), "ETH-EUR");
        assert_eq!(CoinbaseClient::product_id("XAUUSDm"), "XAUUSDM");
    }

    #[test]
    fn range_is_paged_in_full_chunks() {
        let hour = 3600;
        // 800 H1 bars for a 200-bar H4 request
        let windows = chunk_windows(0, 800 * hour, hour);
        assert_eq!(windows.len(), 3);
        assert_eq!(windows[0], (0, 350 * hour));
        assert_eq!(windows[1], (350 * hour, 700 * hour));
        assert_eq!(windows[2], (700 * hour, 800 * hour));

        let covered: u64 = windows.iter().map(|(s, e)| (e - s) / hour).sum();
        assert_eq!(covered, 800);
    }

    #[test]
    fn small_range_is_one_chunk() {
        assert_eq!(chunk_windows(100, 160, 60), vec![(100, 160)]);
        assert!(chunk_windows(100, 100, 60).is_empty());
    }

    #[test]
    fn raw_candle_parsing() {
        let raw = RawCandle {
            start: "1705320000".into(),
            low: "99.5".into(),
            high: "101.0".into(),
            open: "100.0".into(),
            close: "100.5".into(),
            volume: "12.6".into(),
        };
        let c = raw.into_candle().unwrap();
        assert_eq!(c.timestamp.timestamp(), 1_705_320_000);
        assert_eq!(c.volume, 13);
        assert_eq!(c.close, 100.5);

        let bad = RawCandle {
            start: "x".into(),
            low: "1".into(),
            high: "1".into(),
            open: "1".into(),
            close: "1".into(),
            volume: "1".into(),
        };
        assert!(bad.into_candle().is_none());
    }
}

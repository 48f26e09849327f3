use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::exchange::MarketData;
use crate::models::{Candle, CandleSeries, Timeframe};

pub fn cache_path(data_dir: &Path, symbol: &str, tf: Timeframe, count: usize) -> PathBuf {
    let safe = symbol.replace(['/', '\\'], "_");
    data_dir.join(format!("{}_{}_{}.json", safe, tf, count))
}

pub fn save_series(path: &Path, series: &CandleSeries) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string(series.as_slice())?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

pub fn load_series(path: &Path) -> Result<CandleSeries> {
    let content =
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
    let candles: Vec<Candle> = serde_json::from_str(&content)
        .with_context(|| format!("malformed candle cache {}", path.display()))?;
    Ok(CandleSeries::new(candles))
}

/// Loads candles from the JSON cache in `data_dir`, fetching and caching
/// them first when absent or when `refresh` is set.
pub async fn fetch_and_cache(
    market: &mut dyn MarketData,
    symbol: &str,
    tf: Timeframe,
    count: usize,
    data_dir: &Path,
    refresh: bool,
) -> Result<CandleSeries> {
    let cache_file = cache_path(data_dir, symbol, tf, count);

    if !refresh && cache_file.exists() {
        info!("Loading cached {} {} data from {}", symbol, tf, cache_file.display());
        let series = load_series(&cache_file)?;
        info!("  Loaded {} candles", series.len());
        return Ok(series);
    }

    info!("Fetching {} {} candles for {} from {}...", count, tf, symbol, market.name());
    let series = market
        .fetch_candles(symbol, tf, count)
        .await
        .with_context(|| format!("failed to fetch {} candles", symbol))?;
    info!("  Fetched {} candles", series.len());

    save_series(&cache_file, &series)?;
    info!("  Cached to {}", cache_file.display());
    Ok(series)
}

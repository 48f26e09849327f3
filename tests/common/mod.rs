#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use fx_signal_bot::config::Config;
use fx_signal_bot::error::{SignalError, SignalResult};
use fx_signal_bot::exchange::MarketData;
use fx_signal_bot::models::{Candle, CandleSeries, Pips, Timeframe};
use fx_signal_bot::notify::Notifier;
use fx_signal_bot::retry::RetryPolicy;

fn base_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-01-15T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

/// Create candles from (open, high, low, close) tuples with auto-incrementing 1m timestamps.
pub fn make_candles(data: &[(f64, f64, f64, f64)]) -> CandleSeries {
    let base = base_time();
    data.iter()
        .enumerate()
        .map(|(i, &(o, h, l, c))| Candle {
            timestamp: base + Duration::minutes(i as i64),
            open: o,
            high: h,
            low: l,
            close: c,
            volume: 100,
        })
        .collect()
}

/// Candles from closes only; each bar opens at the previous close.
pub fn make_closes(closes: &[f64]) -> CandleSeries {
    let mut prev = closes.first().copied().unwrap_or(0.0);
    let data: Vec<(f64, f64, f64, f64)> = closes
        .iter()
        .map(|&c| {
            let o = prev;
            prev = c;
            (o, o.max(c) + 0.5, o.min(c) - 0.5, c)
        })
        .collect();
    make_candles(&data)
}

/// 100 -> 200 -> 120 -> 145: resumes an uptrend well below the swing high.
pub fn make_recovery() -> CandleSeries {
    let mut closes: Vec<f64> = (0..=40).map(|i| 100.0 + 2.5 * i as f64).collect();
    closes.extend((1..=40).map(|i| 200.0 - 2.0 * i as f64));
    closes.extend((1..=10).map(|i| 120.0 + 2.5 * i as f64));
    make_closes(&closes)
}

/// The recovery series closed by a bearish bar and a bullish engulfing bar,
/// so every optional gate agrees with the uptrend.
pub fn make_engulfing_recovery() -> CandleSeries {
    let mut data: Vec<(f64, f64, f64, f64)> = make_recovery()
        .iter()
        .map(|c| (c.open, c.high, c.low, c.close))
        .collect();
    data.push((145.0, 145.5, 142.5, 143.0));
    data.push((142.8, 152.5, 142.5, 152.0));
    make_candles(&data)
}

pub fn make_flat(n: usize, price: f64) -> CandleSeries {
    make_closes(&vec![price; n])
}

/// Core rule only: optional filters off, no network, no retry delay.
pub fn test_config(symbols: &[&str], log_dir: &Path) -> Config {
    Config {
        symbols: symbols.iter().map(|s| s.to_string()).collect(),
        timeframe: Timeframe::H1,
        candle_count: 200,
        min_candles: 50,
        scan_interval_secs: 1,

        enable_smc: false,
        use_bos: true,
        use_order_blocks: true,
        use_fvg: true,
        use_liquidity_grabs: true,
        enable_trendline: false,
        trendline_lookback: 20,
        trendline_chart: false,
        enable_candlestick: false,
        enable_sentiment: false,

        require_rsi_guard: false,
        require_ema_confluence: false,
        require_sr_confluence: false,

        rsi_period: 14,
        rsi_overbought: 70.0,
        rsi_oversold: 30.0,
        macd_fast: 12,
        macd_slow: 26,
        macd_signal: 9,
        ema_fast: 20,
        ema_slow: 50,
        fib_lookback: 100,
        fib_tolerance: Pips(5.0),
        sr_proximity: 0.001,

        stop_loss_pips: Pips(20.0),
        min_risk_reward: 2.0,
        pip_overrides: HashMap::new(),
        lot_size: 0.1,
        pip_value: 10.0,

        fetch_retry: RetryPolicy::fixed(1, 0),
        notify_retry: RetryPolicy::fixed(1, 0),

        enable_telegram: false,
        telegram_bot_token: String::new(),
        telegram_chat_id: String::new(),
        bot_name: "Test Bot".to_string(),
        send_status_message: false,
        telegram_send_chart: false,

        news_api_key: String::new(),
        sentiment_lookback_days: 1,
        sentiment_bullish_threshold: 0.1,
        sentiment_bearish_threshold: -0.1,

        max_hold_bars: 24,

        log_dir: log_dir.to_string_lossy().to_string(),
        log_level: "ERROR".to_string(),
    }
}

/// Serves fixed series per symbol and counts fetches.
#[derive(Default)]
pub struct MockMarket {
    pub series: HashMap<String, CandleSeries>,
    pub fetches: Arc<Mutex<Vec<String>>>,
}

impl MockMarket {
    pub fn with(mut self, symbol: &str, series: CandleSeries) -> Self {
        self.series.insert(symbol.to_string(), series);
        self
    }
}

#[async_trait]
impl MarketData for MockMarket {
    async fn fetch_candles(
        &mut self,
        symbol: &str,
        _timeframe: Timeframe,
        count: usize,
    ) -> SignalResult<CandleSeries> {
        self.fetches.lock().unwrap().push(symbol.to_string());
        self.series
            .get(symbol)
            .map(|s| s.tail(count))
            .ok_or_else(|| SignalError::DataUnavailable(format!("unknown symbol {}", symbol)))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Keeps every message; optionally fails every send.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    pub sent: Arc<Mutex<Vec<String>>>,
    pub fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: &str) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("channel down");
        }
        self.sent.lock().unwrap().push(message.to_string());
        Ok(())
    }

    async fn send_document(&self, path: &Path, caption: &str) -> anyhow::Result<()> {
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned());
        let entry = format!("document:{}|{}", name.unwrap_or_default(), caption);
        self.send(&entry).await
    }

    fn name(&self) -> &str {
        "recording"
    }
}

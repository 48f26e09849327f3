use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

use crate::config::Config;
use crate::models::{Candle, CandleSeries, Pips, Timeframe};
use crate::retry::RetryPolicy;

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

/// Create n rising (bullish) candles starting from `start` price.
pub fn make_bullish_trend(n: usize, start: f64) -> CandleSeries {
    let base = base_time();
    (0..n)
        .map(|i| {
            let open = start + i as f64 * 10.0;
            let close = open + 8.0;
            Candle {
                timestamp: base + Duration::minutes(i as i64),
                open,
                high: close + 2.0,
                low: open - 1.0,
                close,
                volume: 100,
            }
        })
        .collect()
}

/// Create n falling (bearish) candles starting from `start` price.
pub fn make_bearish_trend(n: usize, start: f64) -> CandleSeries {
    let base = base_time();
    (0..n)
        .map(|i| {
            let open = start - i as f64 * 10.0;
            let close = open - 8.0;
            Candle {
                timestamp: base + Duration::minutes(i as i64),
                open,
                high: open + 1.0,
                low: close - 2.0,
                close,
                volume: 100,
            }
        })
        .collect()
}

/// 100 -> 200 -> 120 -> 145 closes (91 bars): an uptrend resuming after a
/// deep pullback, far enough below the swing high for a 2:1 buy with a
/// 20 pip stop on a 1.0 pip instrument.
pub fn make_recovery_closes() -> Vec<f64> {
    let mut closes: Vec<f64> = (0..=40).map(|i| 100.0 + 2.5 * i as f64).collect();
    closes.extend((1..=40).map(|i| 200.0 - 2.0 * i as f64));
    closes.extend((1..=10).map(|i| 120.0 + 2.5 * i as f64));
    closes
}

/// A Config suitable for testing: no network credentials, no retry delay,
/// optional filters off so the core rule can be exercised in isolation.
pub fn default_test_config() -> Config {
    Config {
        symbols: vec!["EURUSD".to_string(), "BTC-USD".to_string()],
        timeframe: Timeframe::H1,
        candle_count: 200,
        min_candles: 50,
        scan_interval_secs: 600,

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

        stop_loss_pips: Pips(30.0),
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

        log_dir: std::env::temp_dir()
            .join("fx_signal_bot_test")
            .to_string_lossy()
            .to_string(),
        log_level: "ERROR".to_string(),
    }
}

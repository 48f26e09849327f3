use crate::error::{SignalError, SignalResult};
use crate::indicators::structure::StructureToggles;
use crate::models::{pip_size, Pips, Timeframe};
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Universe
    pub symbols: Vec<String>,
    pub timeframe: Timeframe,
    pub candle_count: usize,
    pub min_candles: usize,
    pub scan_interval_secs: u64,

    // Optional filters
    pub enable_smc: bool,
    pub use_bos: bool,
    pub use_order_blocks: bool,
    pub use_fvg: bool,
    pub use_liquidity_grabs: bool,
    pub enable_trendline: bool,
    pub trendline_lookback: usize,
    pub trendline_chart: bool,
    pub enable_candlestick: bool,
    pub enable_sentiment: bool,

    // Confluence guards (off by default)
    pub require_rsi_guard: bool,
    pub require_ema_confluence: bool,
    pub require_sr_confluence: bool,

    // Indicator thresholds
    pub rsi_period: usize,
    pub rsi_overbought: f64,
    pub rsi_oversold: f64,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub ema_fast: usize,
    pub ema_slow: usize,
    pub fib_lookback: usize,
    pub fib_tolerance: Pips,
    /// Fraction of price within which a pivot counts as "near"
    pub sr_proximity: f64,

    // Trade levels
    pub stop_loss_pips: Pips,
    pub min_risk_reward: f64,
    pub pip_overrides: HashMap<String, f64>,
    pub lot_size: f64,
    /// Account-currency value of one pip for one lot
    pub pip_value: f64,

    // Retries
    pub fetch_retry: RetryPolicy,
    pub notify_retry: RetryPolicy,

    // Telegram
    pub enable_telegram: bool,
    pub telegram_bot_token: String,
    pub telegram_chat_id: String,
    pub bot_name: String,
    pub send_status_message: bool,
    /// Attach the trendline chart to alerts (needs `trendline_chart`)
    pub telegram_send_chart: bool,

    // Sentiment
    pub news_api_key: String,
    pub sentiment_lookback_days: i64,
    pub sentiment_bullish_threshold: f64,
    pub sentiment_bearish_threshold: f64,

    // Backtesting
    pub max_hold_bars: usize,

    // Logging
    pub log_dir: String,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let env = |key: &str, default: &str| -> String {
            std::env::var(key).unwrap_or_else(|_| default.to_string())
        };
        let flag = |key: &str, default: bool| -> bool {
            parse_flag(&env(key, if default { "true" } else { "false" }), default)
        };

        let telegram_bot_token = env("TELEGRAM_BOT_TOKEN", "");
        let telegram_enabled_default = !telegram_bot_token.is_empty();

        Config {
            symbols: parse_list(&env("SYMBOLS", "EURUSD,GBPUSD,USDJPY,XAUUSD,BTC-USD")),
            timeframe: Timeframe::from_str_loose(&env("TIMEFRAME", "1h"))
                .unwrap_or(Timeframe::H1),
            candle_count: env("NUM_CANDLES", "200").parse().unwrap_or(200),
            min_candles: env("MIN_CANDLES", "50").parse().unwrap_or(50),
            scan_interval_secs: env("SCAN_INTERVAL", "600").parse().unwrap_or(600),

            enable_smc: flag("ENABLE_SMC_FILTER", true),
            use_bos: flag("USE_BOS", true),
            use_order_blocks: flag("USE_ORDER_BLOCKS", true),
            use_fvg: flag("USE_FVG", true),
            use_liquidity_grabs: flag("USE_LIQUIDITY_GRABS", true),
            enable_trendline: flag("ENABLE_TRENDLINE_DETECTION", true),
            trendline_lookback: env("TRENDLINE_LOOKBACK", "20").parse().unwrap_or(20),
            trendline_chart: flag("TRENDLINE_CHART", false),
            enable_candlestick: flag("ENABLE_CANDLESTICK_FILTER", true),
            enable_sentiment: flag("ENABLE_SENTIMENT_ANALYSIS", false),

            require_rsi_guard: flag("REQUIRE_RSI_GUARD", false),
            require_ema_confluence: flag("REQUIRE_EMA_CONFLUENCE", false),
            require_sr_confluence: flag("REQUIRE_SR_CONFLUENCE", false),

            rsi_period: env("RSI_PERIOD", "14").parse().unwrap_or(14),
            rsi_overbought: env("RSI_OVERBOUGHT", "70").parse().unwrap_or(70.0),
            rsi_oversold: env("RSI_OVERSOLD", "30").parse().unwrap_or(30.0),
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            ema_fast: 20,
            ema_slow: 50,
            fib_lookback: env("FIB_LOOKBACK", "100").parse().unwrap_or(100),
            fib_tolerance: Pips(env("FIB_TOLERANCE_PIPS", "5").parse().unwrap_or(5.0)),
            sr_proximity: env("SR_PROXIMITY", "0.001").parse().unwrap_or(0.001),

            stop_loss_pips: Pips(env("STOP_LOSS_PIPS", "30").parse().unwrap_or(30.0)),
            min_risk_reward: env("MIN_RR_RATIO", "2.0").parse().unwrap_or(2.0),
            pip_overrides: parse_pip_overrides(&env("PIP_SIZES", "")),
            lot_size: env("LOT_SIZE", "0.1").parse().unwrap_or(0.1),
            pip_value: env("PIP_VALUE", "10").parse().unwrap_or(10.0),

            fetch_retry: RetryPolicy::fixed(
                env("MAX_RETRY_ATTEMPTS", "3").parse().unwrap_or(3),
                env("RETRY_DELAY_MS", "2000").parse().unwrap_or(2000),
            ),
            notify_retry: RetryPolicy::fixed(
                env("TELEGRAM_RETRY_ATTEMPTS", "3").parse().unwrap_or(3),
                2000,
            ),

            enable_telegram: flag("ENABLE_TELEGRAM_ALERTS", telegram_enabled_default),
            telegram_bot_token,
            telegram_chat_id: env("TELEGRAM_CHAT_ID", ""),
            bot_name: env("TELEGRAM_BOT_NAME", "FX Signal Bot"),
            send_status_message: flag("TELEGRAM_BOT_STATUS_MESSAGE", true),
            telegram_send_chart: flag("TELEGRAM_SEND_CHART_IMAGE", false),

            news_api_key: env("NEWSAPI_KEY", ""),
            sentiment_lookback_days: env("SENTIMENT_LOOKBACK_DAYS", "1")
                .parse()
                .unwrap_or(1),
            sentiment_bullish_threshold: env("SENTIMENT_BULLISH_THRESHOLD", "0.1")
                .parse()
                .unwrap_or(0.1),
            sentiment_bearish_threshold: env("SENTIMENT_BEARISH_THRESHOLD", "-0.1")
                .parse()
                .unwrap_or(-0.1),

            max_hold_bars: env("MAX_HOLD_BARS", "24").parse().unwrap_or(24),

            log_dir: env("LOG_DIR", "logs"),
            log_level: env("LOG_LEVEL", "INFO"),
        }
    }

    /// Rejects settings the pipeline cannot run with.
    pub fn validate(&self) -> SignalResult<()> {
        if self.symbols.is_empty() {
            return Err(SignalError::Configuration("symbol list is empty".into()));
        }
        if let Some(bad) = self.symbols.iter().find(|s| s.trim().is_empty()) {
            return Err(SignalError::Configuration(format!(
                "malformed symbol {:?}",
                bad
            )));
        }
        if [
            self.rsi_period,
            self.macd_fast,
            self.macd_slow,
            self.macd_signal,
            self.ema_fast,
            self.ema_slow,
            self.fib_lookback,
        ]
        .contains(&0)
        {
            return Err(SignalError::Configuration(
                "indicator periods must be positive".into(),
            ));
        }
        if self.rsi_oversold >= self.rsi_overbought {
            return Err(SignalError::Configuration(format!(
                "RSI oversold {} must be below overbought {}",
                self.rsi_oversold, self.rsi_overbought
            )));
        }
        if self.macd_fast >= self.macd_slow {
            return Err(SignalError::Configuration(format!(
                "MACD fast period {} must be below slow period {}",
                self.macd_fast, self.macd_slow
            )));
        }
        if self.ema_fast >= self.ema_slow {
            return Err(SignalError::Configuration(format!(
                "EMA fast period {} must be below slow period {}",
                self.ema_fast, self.ema_slow
            )));
        }
        if self.stop_loss_pips.0.is_nan() || self.stop_loss_pips.0 <= 0.0 {
            return Err(SignalError::Configuration(format!(
                "stop loss must be a positive pip distance, got {}",
                self.stop_loss_pips.0
            )));
        }
        if self.sr_proximity.is_nan() || self.sr_proximity <= 0.0 {
            return Err(SignalError::Configuration(format!(
                "support/resistance proximity must be positive, got {}",
                self.sr_proximity
            )));
        }
        if self.fib_tolerance.0 < 0.0 {
            return Err(SignalError::Configuration(
                "Fibonacci tolerance cannot be negative".into(),
            ));
        }
        if self.min_risk_reward <= 0.0 {
            return Err(SignalError::Configuration(
                "minimum risk:reward must be positive".into(),
            ));
        }
        if self.trendline_lookback < 2 {
            return Err(SignalError::Configuration(
                "trendline lookback needs at least two bars".into(),
            ));
        }
        Ok(())
    }

    pub fn pip_size(&self, symbol: &str) -> f64 {
        pip_size(symbol, &self.pip_overrides)
    }

    pub fn structure_toggles(&self) -> StructureToggles {
        StructureToggles {
            bos: self.use_bos,
            order_blocks: self.use_order_blocks,
            fvg: self.use_fvg,
            liquidity_grabs: self.use_liquidity_grabs,
        }
    }

    /// Longest window any required indicator needs.
    pub fn required_bars(&self) -> usize {
        [
            self.min_candles,
            self.rsi_period + 1,
            self.macd_slow + self.macd_signal,
            self.ema_slow,
            6,
        ]
        .into_iter()
        .max()
        .unwrap_or(self.min_candles)
    }
}

fn parse_flag(raw: &str, default: bool) -> bool {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => true,
        "false" | "0" | "no" | "off" => false,
        _ => default,
    }
}

pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// "BTCUSDm=1.0,XAGUSD=0.01" -> map. Malformed entries are skipped.
pub fn parse_pip_overrides(raw: &str) -> HashMap<String, f64> {
    raw.split(',')
        .filter_map(|entry| {
            let (sym, size) = entry.split_once('=')?;
            let size: f64 = size.trim().parse().ok()?;
            let sym = sym.trim();
            if sym.is_empty() || size <= 0.0 {
                return None;
            }
            Some((sym.to_string(), size))
        })
        .collect()
}

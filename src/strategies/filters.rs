use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::Config;
use crate::error::{SignalError, SignalResult};
use crate::indicators::{
    candlestick_pattern, fit_trendlines, latest_ema, latest_rsi, macd, nearest_fib_level,
    nearest_level, pivot_levels, summarize_structure, trend_direction, LevelKind, TrendlineFit,
};
use crate::models::{Bias, CandleSeries, Direction, TrendLabel};
use crate::strategies::sentiment::sentiment_bias;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterName {
    Trend,
    Rsi,
    Macd,
    Ema,
    Fibonacci,
    RiskReward,
    SupportResistance,
    Candlestick,
    Smc,
    Trendline,
    Sentiment,
}

impl FilterName {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterName::Trend => "trend",
            FilterName::Rsi => "rsi",
            FilterName::Macd => "macd",
            FilterName::Ema => "ema",
            FilterName::Fibonacci => "fibonacci",
            FilterName::RiskReward => "risk_reward",
            FilterName::SupportResistance => "support_resistance",
            FilterName::Candlestick => "candlestick",
            FilterName::Smc => "smc",
            FilterName::Trendline => "trendline",
            FilterName::Sentiment => "sentiment",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterStatus {
    /// Filter disabled by configuration
    NotEvaluated,
    Passed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterResult {
    pub status: FilterStatus,
    /// Bullish reads as buy, bearish as sell
    pub reading: Bias,
    pub label: Option<String>,
    pub value: Option<f64>,
}

impl FilterResult {
    pub fn not_evaluated() -> Self {
        Self {
            status: FilterStatus::NotEvaluated,
            reading: Bias::Neutral,
            label: None,
            value: None,
        }
    }

    pub fn passed(reading: Bias) -> Self {
        Self {
            status: FilterStatus::Passed,
            reading,
            label: None,
            value: None,
        }
    }

    pub fn failed(reading: Bias) -> Self {
        Self {
            status: FilterStatus::Failed,
            reading,
            label: None,
            value: None,
        }
    }

    pub fn check(ok: bool, reading: Bias) -> Self {
        if ok {
            Self::passed(reading)
        } else {
            Self::failed(reading)
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    pub fn is_evaluated(&self) -> bool {
        self.status != FilterStatus::NotEvaluated
    }

    /// Evaluated and leaning buy or sell.
    pub fn is_conclusive(&self) -> bool {
        self.is_evaluated() && self.reading.is_directional()
    }
}

/// Filter outcomes keyed by name, iterated in a fixed order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterResults(BTreeMap<FilterName, FilterResult>);

impl FilterResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: FilterName, result: FilterResult) {
        self.0.insert(name, result);
    }

    pub fn get(&self, name: FilterName) -> Option<&FilterResult> {
        self.0.get(&name)
    }

    /// Missing entries count as not evaluated.
    pub fn status(&self, name: FilterName) -> FilterStatus {
        self.get(name)
            .map(|r| r.status)
            .unwrap_or(FilterStatus::NotEvaluated)
    }

    pub fn reading(&self, name: FilterName) -> Bias {
        self.get(name).map(|r| r.reading).unwrap_or(Bias::Neutral)
    }

    pub fn label(&self, name: FilterName) -> Option<&str> {
        self.get(name).and_then(|r| r.label.as_deref())
    }

    pub fn value(&self, name: FilterName) -> Option<f64> {
        self.get(name).and_then(|r| r.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FilterName, &FilterResult)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeLevels {
    pub entry: f64,
    pub stop: f64,
    pub target: f64,
    /// `None` when the stop sits on the entry
    pub risk_reward: Option<f64>,
}

impl TradeLevels {
    /// Stop a fixed distance behind the entry, target at the swing extreme
    /// in the trade's direction. Hold, a negative distance or a non-finite
    /// level yields `None`.
    pub fn for_direction(
        direction: Direction,
        entry: f64,
        stop_distance: f64,
        swing_high: f64,
        swing_low: f64,
    ) -> Option<TradeLevels> {
        let (stop, target) = match direction {
            Direction::Buy => (entry - stop_distance, swing_high),
            Direction::Sell => (entry + stop_distance, swing_low),
            Direction::Hold => return None,
        };
        if stop_distance < 0.0 || ![entry, stop, target].iter().all(|v| v.is_finite()) {
            return None;
        }
        Some(Self::new(entry, stop, target))
    }

    pub fn new(entry: f64, stop: f64, target: f64) -> TradeLevels {
        let risk = (entry - stop).abs();
        let reward = (target - entry).abs();
        let risk_reward = if risk > 0.0 { Some(reward / risk) } else { None };
        TradeLevels {
            entry,
            stop,
            target,
            risk_reward,
        }
    }
}

/// Everything the aggregator needs from one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterEvaluation {
    pub evaluated_at: DateTime<Utc>,
    pub trend: TrendLabel,
    pub last_close: f64,
    pub results: FilterResults,
    pub levels: Option<TradeLevels>,
    /// Set only when the trendline chart is requested
    pub chart: Option<TrendlineFit>,
}

fn insufficient(needed: usize, got: usize) -> SignalError {
    SignalError::InsufficientData { needed, got }
}

/// Runs every filter over one symbol's candles. `sentiment` is a
/// pre-computed polarity score, consulted only when sentiment is enabled.
pub fn evaluate_filters(
    symbol: &str,
    series: &CandleSeries,
    cfg: &Config,
    sentiment: Option<f64>,
) -> SignalResult<FilterEvaluation> {
    let got = series.len();
    let needed = cfg.required_bars();
    if got < needed {
        return Err(insufficient(needed, got));
    }
    series.validate()?;

    let last = series
        .last()
        .ok_or_else(|| SignalError::DataUnavailable(format!("{} has no candles", symbol)))?;
    let price = last.close;
    let closes = series.closes();

    let trend = trend_direction(&closes).ok_or_else(|| insufficient(6, got))?;
    let rsi = latest_rsi(&closes, cfg.rsi_period)
        .ok_or_else(|| insufficient(cfg.rsi_period + 1, got))?;
    let m = macd(&closes, cfg.macd_fast, cfg.macd_slow, cfg.macd_signal)
        .ok_or_else(|| insufficient(cfg.macd_slow + cfg.macd_signal, got))?;
    let ema_fast =
        latest_ema(&closes, cfg.ema_fast).ok_or_else(|| insufficient(cfg.ema_fast, got))?;
    let ema_slow =
        latest_ema(&closes, cfg.ema_slow).ok_or_else(|| insufficient(cfg.ema_slow, got))?;

    let trend_bias = trend.bias();
    let agrees = |reading: Bias| trend_bias.is_directional() && reading == trend_bias;
    let mut results = FilterResults::new();

    results.insert(
        FilterName::Trend,
        FilterResult::check(trend_bias.is_directional(), trend_bias).with_label(trend.as_str()),
    );

    // RSI
    let rsi_reading = if rsi < cfg.rsi_oversold {
        Bias::Bullish
    } else if rsi > cfg.rsi_overbought {
        Bias::Bearish
    } else {
        Bias::Neutral
    };
    let overextended = (trend == TrendLabel::Uptrend && rsi > cfg.rsi_overbought)
        || (trend == TrendLabel::Downtrend && rsi < cfg.rsi_oversold);
    let mut rsi_result = FilterResult::check(!overextended, rsi_reading).with_value(rsi);
    if rsi > cfg.rsi_overbought {
        rsi_result = rsi_result.with_label("overbought");
    } else if rsi < cfg.rsi_oversold {
        rsi_result = rsi_result.with_label("oversold");
    }
    results.insert(FilterName::Rsi, rsi_result);

    // MACD
    let macd_reading = if m.macd > m.signal {
        Bias::Bullish
    } else if m.macd < m.signal {
        Bias::Bearish
    } else {
        Bias::Neutral
    };
    results.insert(
        FilterName::Macd,
        FilterResult::check(agrees(macd_reading), macd_reading).with_value(m.histogram),
    );

    // EMA stack
    let ema_reading = if price > ema_fast && ema_fast > ema_slow {
        Bias::Bullish
    } else if price < ema_fast && ema_fast < ema_slow {
        Bias::Bearish
    } else {
        Bias::Neutral
    };
    results.insert(
        FilterName::Ema,
        FilterResult::check(agrees(ema_reading), ema_reading).with_value(ema_fast),
    );

    // Fibonacci
    let fib_window = series.tail(cfg.fib_lookback);
    let swing_high = fib_window.highs_max();
    let swing_low = fib_window.lows_min();
    let pip = cfg.pip_size(symbol);
    let tolerance = cfg.fib_tolerance.to_price(pip);
    let fib_result = match nearest_fib_level(price, swing_high, swing_low, tolerance) {
        Some(level) => {
            let reading = if level.is_discount() {
                Bias::Bullish
            } else if level.is_premium() {
                Bias::Bearish
            } else {
                Bias::Neutral
            };
            FilterResult::passed(reading)
                .with_label(level.name)
                .with_value(level.price)
        }
        None => FilterResult::failed(Bias::Neutral),
    };
    results.insert(FilterName::Fibonacci, fib_result);

    // Risk:reward against the swing extremes
    let levels = TradeLevels::for_direction(
        trend_bias.to_direction(),
        price,
        cfg.stop_loss_pips.to_price(pip),
        swing_high,
        swing_low,
    );
    let rr_result = match levels.as_ref().map(|l| l.risk_reward) {
        None if trend_bias.is_directional() => {
            FilterResult::failed(trend_bias).with_label("invalid_levels")
        }
        None => FilterResult::failed(Bias::Neutral).with_label("no_direction"),
        Some(None) => FilterResult::failed(trend_bias).with_label("zero_risk"),
        Some(Some(rr)) => {
            FilterResult::check(rr >= cfg.min_risk_reward, trend_bias).with_value(rr)
        }
    };
    results.insert(FilterName::RiskReward, rr_result);

    // Support / resistance
    let pivots = pivot_levels(series);
    let sr_result = match nearest_level(price, &pivots, cfg.sr_proximity) {
        Some((kind, level)) => {
            let reading = match kind {
                LevelKind::Support => Bias::Bullish,
                LevelKind::Resistance => Bias::Bearish,
            };
            FilterResult::passed(reading)
                .with_label(kind.as_str())
                .with_value(level)
        }
        None => FilterResult::failed(Bias::Neutral),
    };
    results.insert(FilterName::SupportResistance, sr_result);

    // Optional filters
    let candle_result = if cfg.enable_candlestick {
        match candlestick_pattern(series) {
            Some(p) => FilterResult::passed(p.bias()).with_label(p.as_str()),
            None => FilterResult::failed(Bias::Neutral).with_label("none"),
        }
    } else {
        FilterResult::not_evaluated()
    };
    results.insert(FilterName::Candlestick, candle_result);

    let smc_result = if cfg.enable_smc {
        let summary = summarize_structure(series, cfg.structure_toggles());
        FilterResult::check(summary.overall.is_directional(), summary.overall)
            .with_label(summary.overall.to_string())
    } else {
        FilterResult::not_evaluated()
    };
    results.insert(FilterName::Smc, smc_result);

    let mut chart = None;
    let trendline_result = if cfg.enable_trendline {
        match fit_trendlines(series, cfg.trendline_lookback) {
            Some(fit) => {
                let result =
                    FilterResult::check(fit.breakout(), fit.bias).with_label(fit.label());
                if cfg.trendline_chart {
                    chart = Some(fit);
                }
                result
            }
            None => FilterResult::failed(Bias::Neutral),
        }
    } else {
        FilterResult::not_evaluated()
    };
    results.insert(FilterName::Trendline, trendline_result);

    let sentiment_result = match (cfg.enable_sentiment, sentiment) {
        (false, _) => FilterResult::not_evaluated(),
        (true, Some(score)) => {
            let bias = sentiment_bias(
                score,
                cfg.sentiment_bullish_threshold,
                cfg.sentiment_bearish_threshold,
            );
            FilterResult::passed(bias)
                .with_label(bias.to_string())
                .with_value(score)
        }
        (true, None) => FilterResult::failed(Bias::Neutral).with_label("unavailable"),
    };
    results.insert(FilterName::Sentiment, sentiment_result);

    Ok(FilterEvaluation {
        evaluated_at: last.timestamp,
        trend,
        last_close: price,
        results,
        levels,
        chart,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{default_test_config, make_bullish_trend, make_closes};

    #[test]
    fn short_series_is_insufficient() {
        let cfg = default_test_config();
        let s = make_bullish_trend(49, 100.0);
        match evaluate_filters("EURUSD", &s, &cfg, None) {
            Err(SignalError::InsufficientData { needed, got }) => {
                assert_eq!(needed, 50);
                assert_eq!(got, 49);
            }
            other => panic!("expected InsufficientData, got {:?}", other),
        }
    }

    #[test]
    fn slow_indicator_longer_than_min_candles_is_insufficient() {
        let mut cfg = default_test_config();
        cfg.ema_slow = 80;
        let s = make_bullish_trend(60, 100.0);
        assert_eq!(cfg.required_bars(), 80);
        assert!(matches!(
            evaluate_filters("EURUSD", &s, &cfg, None),
            Err(SignalError::InsufficientData { needed: 80, .. })
        ));
    }

    #[test]
    fn disabled_filters_are_not_evaluated() {
        let cfg = default_test_config();
        let s = make_bullish_trend(60, 100.0);
        let eval = evaluate_filters("BTC-USD", &s, &cfg, Some(0.5)).unwrap();
        for name in [
            FilterName::Candlestick,
            FilterName::Smc,
            FilterName::Trendline,
            FilterName::Sentiment,
        ] {
            assert_eq!(eval.results.status(name), FilterStatus::NotEvaluated, "{:?}", name);
        }
        assert_eq!(eval.results.len(), 11);
    }

    #[test]
    fn uptrend_readings() {
        let mut cfg = default_test_config();
        cfg.enable_smc = true;
        cfg.enable_trendline = true;
        let s = make_bullish_trend(60, 100.0);
        let eval = evaluate_filters("BTC-USD", &s, &cfg, None).unwrap();

        assert_eq!(eval.trend, TrendLabel::Uptrend);
        assert_eq!(eval.results.label(FilterName::Trend), Some("uptrend"));
        // every close-to-close change is a gain
        assert_eq!(eval.results.value(FilterName::Rsi), Some(100.0));
        assert_eq!(eval.results.reading(FilterName::Rsi), Bias::Bearish);
        assert_eq!(eval.results.status(FilterName::Rsi), FilterStatus::Failed);
        assert_eq!(eval.results.reading(FilterName::Ema), Bias::Bullish);
        assert_eq!(eval.results.status(FilterName::Ema), FilterStatus::Passed);
        assert_eq!(eval.results.reading(FilterName::Smc), Bias::Bullish);
        assert_eq!(eval.evaluated_at, s.last().unwrap().timestamp);

        let levels = eval.levels.unwrap();
        assert_eq!(levels.entry, s.last().unwrap().close);
        // BTC pip is 1.0, stop 30 pips
        assert!((levels.entry - levels.stop - 30.0).abs() < 1e-9);
        assert_eq!(levels.target, s.highs_max());
    }

    #[test]
    fn fibonacci_tolerance_scales_with_pip_size() {
        let cfg = default_test_config();
        // last close sits 2.0 under the swing high
        let s = make_bullish_trend(60, 100.0);
        let btc = evaluate_filters("BTC-USD", &s, &cfg, None).unwrap();
        assert_eq!(btc.results.label(FilterName::Fibonacci), Some("0.0%"));

        let eur = evaluate_filters("EURUSD", &s, &cfg, None).unwrap();
        assert_eq!(eur.results.status(FilterName::Fibonacci), FilterStatus::Failed);
    }

    #[test]
    fn sideways_has_no_trade_levels() {
        let cfg = default_test_config();
        // five-bar cycle: the last close equals the close five bars back
        let cycle = [100.0, 101.0, 102.0, 101.0, 100.5];
        let closes: Vec<f64> = (0..60).map(|i| cycle[i % 5]).collect();
        let eval = evaluate_filters("EURUSD", &make_closes(&closes), &cfg, None).unwrap();
        assert_eq!(eval.trend, TrendLabel::Sideways);
        assert!(eval.levels.is_none());
        assert_eq!(eval.results.label(FilterName::RiskReward), Some("no_direction"));
        assert_eq!(eval.results.status(FilterName::Trend), FilterStatus::Failed);
    }

    #[test]
    fn evaluation_is_deterministic() {
        let mut cfg = default_test_config();
        cfg.enable_smc = true;
        cfg.enable_trendline = true;
        cfg.enable_candlestick = true;
        let s = make_bullish_trend(80, 100.0);
        let a = evaluate_filters("EURUSD", &s, &cfg, None).unwrap();
        let b = evaluate_filters("EURUSD", &s, &cfg, None).unwrap();
        assert_eq!(
            serde_json::to_string(&a.results).unwrap(),
            serde_json::to_string(&b.results).unwrap()
        );
    }

    #[test]
    fn zero_stop_distance_fails_risk_reward() {
        let mut cfg = default_test_config();
        cfg.stop_loss_pips = crate::models::Pips(0.0);
        let eval = evaluate_filters("EURUSD", &make_bullish_trend(60, 100.0), &cfg, None).unwrap();
        assert_eq!(eval.results.label(FilterName::RiskReward), Some("zero_risk"));
        assert_eq!(eval.levels.unwrap().risk_reward, None);
    }

    #[test]
    fn trade_levels_ratio() {
        let l = TradeLevels::new(100.0, 99.0, 103.0);
        assert_eq!(l.risk_reward, Some(3.0));
        assert_eq!(TradeLevels::new(100.0, 100.0, 103.0).risk_reward, None);
        let sell = TradeLevels::for_direction(Direction::Sell, 100.0, 2.0, 110.0, 90.0).unwrap();
        assert_eq!(sell.stop, 102.0);
        assert_eq!(sell.target, 90.0);
        assert_eq!(sell.risk_reward, Some(5.0));
        assert!(TradeLevels::for_direction(Direction::Hold, 100.0, 2.0, 110.0, 90.0).is_none());
    }

    #[test]
    fn non_finite_or_inverted_levels_are_rejected() {
        // an empty swing window leaves the extremes at infinity
        let buy = TradeLevels::for_direction(
            Direction::Buy,
            100.0,
            2.0,
            f64::NEG_INFINITY,
            f64::INFINITY,
        );
        assert!(buy.is_none());
        assert!(TradeLevels::for_direction(Direction::Buy, 100.0, -2.0, 110.0, 90.0).is_none());
    }

    #[test]
    fn empty_fibonacci_window_never_yields_a_trade() {
        let mut cfg = default_test_config();
        cfg.fib_lookback = 0;
        let eval = evaluate_filters("BTC-USD", &make_bullish_trend(60, 100.0), &cfg, None).unwrap();
        assert!(eval.levels.is_none());
        assert_eq!(eval.results.label(FilterName::RiskReward), Some("invalid_levels"));
        assert_eq!(eval.results.status(FilterName::RiskReward), FilterStatus::Failed);
    }
}

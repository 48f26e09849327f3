use tracing::debug;

use crate::config::Config;
use crate::models::{Direction, Timeframe};
use crate::strategies::filters::{FilterEvaluation, FilterName, FilterResults, FilterStatus};
use crate::strategies::signals::Signal;

pub const MAX_STRENGTH: u8 = 100;

/// Points a filter adds to the strength score when its reading is
/// conclusive.
pub const STRENGTH_WEIGHTS: [(FilterName, u8); 6] = [
    (FilterName::Rsi, 15),
    (FilterName::Macd, 15),
    (FilterName::Ema, 15),
    (FilterName::Smc, 20),
    (FilterName::Fibonacci, 15),
    (FilterName::SupportResistance, 20),
];

/// Optional filters that must pass when enabled, with the reason logged
/// when they do not.
const OPTIONAL_GATES: [(FilterName, &str); 3] = [
    (FilterName::Smc, "SMC filter failed"),
    (FilterName::Trendline, "No trendline breakout"),
    (FilterName::Candlestick, "No valid candlestick pattern"),
];

pub fn strength_score(results: &FilterResults) -> u8 {
    let total: u32 = STRENGTH_WEIGHTS
        .iter()
        .filter(|(name, _)| results.get(*name).is_some_and(|r| r.is_conclusive()))
        .map(|(_, w)| *w as u32)
        .sum();
    total.min(MAX_STRENGTH as u32) as u8
}

/// Folds one evaluation into a signal. The strength score never affects
/// the direction.
pub fn aggregate(
    symbol: &str,
    timeframe: Timeframe,
    eval: FilterEvaluation,
    cfg: &Config,
) -> Signal {
    let results = &eval.results;
    let trend = eval.trend;
    let trend_bias = trend.bias();
    let mut reasons: Vec<String> = Vec::new();

    if !trend_bias.is_directional() {
        reasons.push(format!("No clear trend ({})", trend));
    } else if results.status(FilterName::Macd) != FilterStatus::Passed {
        reasons.push(format!(
            "MACD ({}) does not confirm {}",
            results.reading(FilterName::Macd),
            trend
        ));
    }

    let rr = eval.levels.and_then(|l| l.risk_reward);
    match (eval.levels, rr) {
        (None, _) => reasons.push("No trade levels without a trend".to_string()),
        (Some(_), None) => reasons.push("Risk:reward undefined (zero risk)".to_string()),
        (Some(_), Some(r)) if r < cfg.min_risk_reward => reasons.push(format!(
            "Risk:reward {:.2} below minimum {:.2}",
            r, cfg.min_risk_reward
        )),
        _ => {}
    }

    for (name, reason) in OPTIONAL_GATES {
        if results.status(name) == FilterStatus::Failed {
            reasons.push(reason.to_string());
        }
    }

    if cfg.require_rsi_guard && results.status(FilterName::Rsi) == FilterStatus::Failed {
        let rsi = results.value(FilterName::Rsi).unwrap_or_default();
        reasons.push(format!("RSI {:.1} overextended against {}", rsi, trend));
    }
    if cfg.require_ema_confluence && results.status(FilterName::Ema) != FilterStatus::Passed {
        reasons.push(format!("EMA not aligned with {}", trend));
    }
    if cfg.require_sr_confluence {
        let aligned = results.status(FilterName::SupportResistance) == FilterStatus::Passed
            && results.reading(FilterName::SupportResistance) == trend_bias;
        if !aligned {
            reasons.push("No S/R confluence".to_string());
        }
    }

    let valid = reasons.is_empty();
    let direction = if valid {
        reasons.push("Valid signal conditions met".to_string());
        trend_bias.to_direction()
    } else {
        debug!("[{}] rejected: {}", symbol, reasons.join("; "));
        reasons.push("Signal conditions not fully met".to_string());
        Direction::Hold
    };

    let strength = strength_score(results);
    let rsi = results.value(FilterName::Rsi);
    let levels = if direction.is_actionable() { eval.levels } else { None };

    Signal {
        symbol: symbol.to_string(),
        timeframe,
        evaluated_at: eval.evaluated_at,
        direction,
        trend,
        rsi,
        strength,
        entry: levels.map(|l| l.entry),
        stop_loss: levels.map(|l| l.stop),
        take_profit: levels.map(|l| l.target),
        risk_reward: rr,
        reasons,
        filters: eval.results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Bias, TrendLabel};
    use crate::strategies::filters::{FilterResult, TradeLevels};
    use crate::test_helpers::default_test_config;
    use chrono::{DateTime, Utc};

    fn ts() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-15T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    /// Uptrend with a confirming MACD and the given risk:reward.
    fn uptrend_eval(rr: f64) -> FilterEvaluation {
        let levels = TradeLevels::new(100.0, 99.0, 100.0 + rr);
        let mut results = FilterResults::new();
        results.insert(
            FilterName::Trend,
            FilterResult::passed(Bias::Bullish).with_label("uptrend"),
        );
        results.insert(FilterName::Macd, FilterResult::passed(Bias::Bullish).with_value(0.2));
        results.insert(FilterName::Rsi, FilterResult::passed(Bias::Neutral).with_value(55.0));
        results.insert(
            FilterName::RiskReward,
            FilterResult::check(rr >= 2.0, Bias::Bullish).with_value(rr),
        );
        for name in [FilterName::Smc, FilterName::Trendline, FilterName::Candlestick] {
            results.insert(name, FilterResult::not_evaluated());
        }
        FilterEvaluation {
            evaluated_at: ts(),
            trend: TrendLabel::Uptrend,
            last_close: 100.0,
            results,
            levels: Some(levels),
            chart: None,
        }
    }

    #[test]
    fn buy_when_risk_reward_clears_minimum() {
        let cfg = default_test_config();
        let sig = aggregate("EURUSD", Timeframe::H1, uptrend_eval(3.0), &cfg);
        assert_eq!(sig.direction, Direction::Buy);
        assert_eq!(sig.entry, Some(100.0));
        assert_eq!(sig.stop_loss, Some(99.0));
        assert_eq!(sig.take_profit, Some(103.0));
        assert_eq!(sig.reasons, vec!["Valid signal conditions met".to_string()]);
        assert_eq!(sig.evaluated_at, ts());
    }

    #[test]
    fn hold_when_risk_reward_too_small() {
        let cfg = default_test_config();
        let sig = aggregate("EURUSD", Timeframe::H1, uptrend_eval(1.0), &cfg);
        assert_eq!(sig.direction, Direction::Hold);
        assert!(sig.entry.is_none() && sig.stop_loss.is_none() && sig.take_profit.is_none());
        assert!(sig.reasons.iter().any(|r| r.starts_with("Risk:reward 1.00")));
        assert_eq!(sig.reasons.last().unwrap(), "Signal conditions not fully met");
    }

    #[test]
    fn zero_risk_is_a_hard_fail() {
        let cfg = default_test_config();
        let mut eval = uptrend_eval(3.0);
        eval.levels = Some(TradeLevels::new(100.0, 100.0, 110.0));
        let sig = aggregate("EURUSD", Timeframe::H1, eval, &cfg);
        assert_eq!(sig.direction, Direction::Hold);
        assert_eq!(sig.risk_reward, None);
    }

    #[test]
    fn disagreeing_macd_holds() {
        let cfg = default_test_config();
        let mut eval = uptrend_eval(3.0);
        eval.results
            .insert(FilterName::Macd, FilterResult::failed(Bias::Bearish));
        let sig = aggregate("EURUSD", Timeframe::H1, eval, &cfg);
        assert_eq!(sig.direction, Direction::Hold);
    }

    #[test]
    fn enabled_optional_filter_must_pass() {
        let cfg = default_test_config();
        let mut eval = uptrend_eval(3.0);
        eval.results
            .insert(
                FilterName::Trendline,
                FilterResult::failed(Bias::Neutral).with_label("sideways"),
            );
        let sig = aggregate("EURUSD", Timeframe::H1, eval, &cfg);
        assert_eq!(sig.direction, Direction::Hold);
        assert!(sig.reasons.contains(&"No trendline breakout".to_string()));

        let mut eval = uptrend_eval(3.0);
        eval.results
            .insert(FilterName::Smc, FilterResult::passed(Bias::Bullish).with_label("bullish"));
        assert_eq!(aggregate("EURUSD", Timeframe::H1, eval, &cfg).direction, Direction::Buy);
    }

    #[test]
    fn downtrend_sells() {
        let cfg = default_test_config();
        let mut eval = uptrend_eval(3.0);
        eval.trend = TrendLabel::Downtrend;
        eval.results
            .insert(FilterName::Macd, FilterResult::passed(Bias::Bearish));
        eval.levels = Some(TradeLevels::new(100.0, 101.0, 97.0));
        let sig = aggregate("EURUSD", Timeframe::H1, eval, &cfg);
        assert_eq!(sig.direction, Direction::Sell);
        assert_eq!(sig.take_profit, Some(97.0));
    }

    #[test]
    fn confluence_guards_are_opt_in() {
        let mut cfg = default_test_config();
        let mut eval = uptrend_eval(3.0);
        eval.results
            .insert(FilterName::Rsi, FilterResult::failed(Bias::Bearish).with_value(82.0));
        let sig = aggregate("EURUSD", Timeframe::H1, eval.clone(), &cfg);
        assert_eq!(sig.direction, Direction::Buy);

        cfg.require_rsi_guard = true;
        let sig = aggregate("EURUSD", Timeframe::H1, eval.clone(), &cfg);
        assert_eq!(sig.direction, Direction::Hold);
        assert!(sig.reasons[0].contains("82.0"));

        cfg.require_rsi_guard = false;
        cfg.require_sr_confluence = true;
        assert_eq!(aggregate("EURUSD", Timeframe::H1, eval, &cfg).direction, Direction::Hold);
    }

    #[test]
    fn strength_weights() {
        let mut results = FilterResults::new();
        for name in [
            FilterName::Rsi,
            FilterName::Macd,
            FilterName::Fibonacci,
            FilterName::Smc,
            FilterName::SupportResistance,
        ] {
            results.insert(name, FilterResult::passed(Bias::Bullish));
        }
        results.insert(FilterName::Ema, FilterResult::failed(Bias::Neutral));
        assert_eq!(strength_score(&results), 85);

        results.insert(FilterName::Ema, FilterResult::failed(Bias::Bearish));
        assert_eq!(strength_score(&results), 100);
    }

    #[test]
    fn strength_ignores_unevaluated_and_neutral() {
        let mut results = FilterResults::new();
        results.insert(FilterName::Smc, FilterResult::not_evaluated());
        results.insert(FilterName::Rsi, FilterResult::passed(Bias::Neutral));
        results.insert(FilterName::Macd, FilterResult::failed(Bias::Bearish));
        assert_eq!(strength_score(&results), 15);
    }

    #[test]
    fn strength_does_not_gate_direction() {
        let cfg = default_test_config();
        let sig = aggregate("EURUSD", Timeframe::H1, uptrend_eval(3.0), &cfg);
        // only MACD is conclusive among the weighted filters
        assert_eq!(sig.strength, 15);
        assert_eq!(sig.direction, Direction::Buy);
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Direction, Timeframe, TrendLabel};
use crate::strategies::filters::FilterResults;

/// One symbol's decision for one evaluation. Built once by the aggregator
/// (or `Signal::hold` on an error) and only read afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: String,
    pub timeframe: Timeframe,
    /// Timestamp of the last candle evaluated
    pub evaluated_at: DateTime<Utc>,
    pub direction: Direction,
    pub trend: TrendLabel,
    pub rsi: Option<f64>,
    pub strength: u8,
    pub entry: Option<f64>,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub risk_reward: Option<f64>,
    pub reasons: Vec<String>,
    pub filters: FilterResults,
}

impl Signal {
    /// A hold carrying only the reason it could not be evaluated.
    pub fn hold(
        symbol: &str,
        timeframe: Timeframe,
        evaluated_at: DateTime<Utc>,
        reason: impl Into<String>,
    ) -> Signal {
        Signal {
            symbol: symbol.to_string(),
            timeframe,
            evaluated_at,
            direction: Direction::Hold,
            trend: TrendLabel::Unknown,
            rsi: None,
            strength: 0,
            entry: None,
            stop_loss: None,
            take_profit: None,
            risk_reward: None,
            reasons: vec![reason.into()],
            filters: FilterResults::new(),
        }
    }

    pub fn is_actionable(&self) -> bool {
        self.direction.is_actionable()
    }

    pub fn reason_summary(&self) -> String {
        self.reasons.join("; ")
    }
}

fn price(v: Option<f64>) -> String {
    v.map(|p| format!("{:.5}", p)).unwrap_or_else(|| "-".to_string())
}

/// Telegram-ready HTML alert.
pub fn format_alert(signal: &Signal) -> String {
    let arrow = match signal.direction {
        Direction::Buy => "🟢",
        Direction::Sell => "🔴",
        Direction::Hold => "⚪",
    };
    let rsi = signal
        .rsi
        .map(|r| format!("{:.2}", r))
        .unwrap_or_else(|| "N/A".to_string());
    let rr = signal
        .risk_reward
        .map(|r| format!("1:{:.2}", r))
        .unwrap_or_else(|| "N/A".to_string());

    format!(
        "{arrow} <b>{dir} SIGNAL</b> ({tf})\n\
         <b>Pair:</b> {symbol}\n\
         <b>Confidence:</b> {strength}%\n\
         <b>Entry:</b> {entry}\n\
         <b>SL:</b> {sl}\n\
         <b>TP:</b> {tp}\n\
         <b>R:R:</b> {rr}\n\
         <b>RSI:</b> {rsi}\n\
         <b>Trend:</b> {trend}\n\
         <i>{time}</i>",
        dir = signal.direction.as_str().to_uppercase(),
        tf = signal.timeframe,
        symbol = html_escape(&signal.symbol),
        strength = signal.strength,
        entry = price(signal.entry),
        sl = price(signal.stop_loss),
        tp = price(signal.take_profit),
        trend = signal.trend,
        time = signal.evaluated_at.format("%Y-%m-%d %H:%M UTC"),
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Signal {
        let mut s = Signal::hold(
            "EURUSD",
            Timeframe::H1,
            DateTime::parse_from_rfc3339("2024-01-15T12:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            "Valid signal conditions met",
        );
        s.direction = Direction::Buy;
        s.trend = TrendLabel::Uptrend;
        s.rsi = Some(48.256);
        s.strength = 85;
        s.entry = Some(1.1);
        s.stop_loss = Some(1.097);
        s.take_profit = Some(1.109);
        s.risk_reward = Some(3.0);
        s
    }

    #[test]
    fn alert_contains_trade_fields() {
        let text = format_alert(&sample());
        assert!(text.contains("<b>BUY SIGNAL</b> (1h)"));
        assert!(text.contains("<b>Pair:</b> EURUSD"));
        assert!(text.contains("<b>Confidence:</b> 85%"));
        assert!(text.contains("<b>Entry:</b> 1.10000"));
        assert!(text.contains("<b>SL:</b> 1.09700"));
        assert!(text.contains("<b>TP:</b> 1.10900"));
        assert!(text.contains("<b>RSI:</b> 48.26"));
        assert!(text.contains("<b>Trend:</b> uptrend"));
        assert!(text.contains("2024-01-15 12:00 UTC"));
    }

    #[test]
    fn hold_has_no_levels() {
        let s = Signal::hold("GBPUSD", Timeframe::H1, Utc::now(), "data unavailable");
        assert!(!s.is_actionable());
        assert!(s.entry.is_none());
        assert!(format_alert(&s).contains("<b>Entry:</b> -"));
        assert_eq!(s.reason_summary(), "data unavailable");
    }
}

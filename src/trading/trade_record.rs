use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{Direction, Pips};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeResult {
    Win,
    Loss,
    Breakeven,
}

impl fmt::Display for TradeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeResult::Win => write!(f, "win"),
            TradeResult::Loss => write!(f, "loss"),
            TradeResult::Breakeven => write!(f, "breakeven"),
        }
    }
}

/// A realized trade, one row of the trade log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeOutcome {
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub direction: Direction,
    pub result: TradeResult,
    pub pnl: f64,
    pub pnl_pips: f64,
    pub entry: f64,
    pub exit: f64,
    pub sl: f64,
    pub tp: f64,
}

/// Sizing used to turn a pip move into account currency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PnlSizing {
    pub pip_size: f64,
    pub lot_size: f64,
    /// Value of one pip for one full lot
    pub pip_value: f64,
}

impl TradeOutcome {
    #[allow(clippy::too_many_arguments)]
    pub fn settle(
        timestamp: DateTime<Utc>,
        symbol: &str,
        direction: Direction,
        entry: f64,
        exit: f64,
        sl: f64,
        tp: f64,
        sizing: PnlSizing,
    ) -> TradeOutcome {
        let pips = Pips::from_price((exit - entry) * direction.sign(), sizing.pip_size).value();
        let pnl = round2(pips * sizing.pip_value * sizing.lot_size);
        let result = if pnl > 0.0 {
            TradeResult::Win
        } else if pnl < 0.0 {
            TradeResult::Loss
        } else {
            TradeResult::Breakeven
        };

        TradeOutcome {
            timestamp,
            symbol: symbol.to_string(),
            direction,
            result,
            pnl,
            pnl_pips: round2(pips),
            entry,
            exit,
            sl,
            tp,
        }
    }

    pub fn is_win(&self) -> bool {
        self.result == TradeResult::Win
    }

    pub fn is_loss(&self) -> bool {
        self.result == TradeResult::Loss
    }
}

pub(crate) fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

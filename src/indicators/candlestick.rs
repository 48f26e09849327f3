use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{Bias, CandleSeries};

const SMALL_BODY_RATIO: f64 = 0.3;
const WICK_TO_BODY: f64 = 0.5;
const STAR_BODY_RATIO: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandlePattern {
    BullishEngulfing,
    BearishEngulfing,
    Hammer,
    ShootingStar,
    MorningStar,
    EveningStar,
}

impl CandlePattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            CandlePattern::BullishEngulfing => "bullish_engulfing",
            CandlePattern::BearishEngulfing => "bearish_engulfing",
            CandlePattern::Hammer => "hammer",
            CandlePattern::ShootingStar => "shooting_star",
            CandlePattern::MorningStar => "morning_star",
            CandlePattern::EveningStar => "evening_star",
        }
    }

    pub fn bias(self) -> Bias {
        match self {
            CandlePattern::BullishEngulfing
            | CandlePattern::Hammer
            | CandlePattern::MorningStar => Bias::Bullish,
            CandlePattern::BearishEngulfing
            | CandlePattern::ShootingStar
            | CandlePattern::EveningStar => Bias::Bearish,
        }
    }
}

impl fmt::Display for CandlePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies the last three bars. The first matching pattern in
/// declaration order wins.
pub fn candlestick_pattern(series: &CandleSeries) -> Option<CandlePattern> {
    let n = series.len();
    if n < 3 {
        return None;
    }
    let last = &series[n - 1];
    let prev = &series[n - 2];
    let first = &series[n - 3];

    let body = last.body();
    let small_body = last.body_ratio() < SMALL_BODY_RATIO;

    if prev.is_bearish() && last.is_bullish() && last.open < prev.close && last.close > prev.open {
        return Some(CandlePattern::BullishEngulfing);
    }
    if prev.is_bullish() && last.is_bearish() && last.open > prev.close && last.close < prev.open {
        return Some(CandlePattern::BearishEngulfing);
    }
    if small_body && last.lower_wick() > 0.0 && last.upper_wick() < body * WICK_TO_BODY {
        return Some(CandlePattern::Hammer);
    }
    if small_body && last.upper_wick() > 0.0 && last.lower_wick() < body * WICK_TO_BODY {
        return Some(CandlePattern::ShootingStar);
    }

    let star_middle = prev.body() < body * STAR_BODY_RATIO;
    if first.is_bearish() && star_middle && last.is_bullish() && last.close > first.open {
        return Some(CandlePattern::MorningStar);
    }
    if first.is_bullish() && star_middle && last.is_bearish() && last.close < first.open {
        return Some(CandlePattern::EveningStar);
    }
    None
}

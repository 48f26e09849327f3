use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Buy,
    Sell,
    Hold,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Buy => "buy",
            Direction::Sell => "sell",
            Direction::Hold => "hold",
        }
    }

    pub fn is_actionable(&self) -> bool {
        !matches!(self, Direction::Hold)
    }

    /// +1 for buy, -1 for sell, 0 for hold.
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Buy => 1.0,
            Direction::Sell => -1.0,
            Direction::Hold => 0.0,
        }
    }
}

/// Which way a single reading leans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bias {
    Bullish,
    Bearish,
    Neutral,
}

impl fmt::Display for Bias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bias::Bullish => write!(f, "bullish"),
            Bias::Bearish => write!(f, "bearish"),
            Bias::Neutral => write!(f, "neutral"),
        }
    }
}

impl Bias {
    pub fn is_directional(self) -> bool {
        !matches!(self, Bias::Neutral)
    }

    pub fn to_direction(self) -> Direction {
        match self {
            Bias::Bullish => Direction::Buy,
            Bias::Bearish => Direction::Sell,
            Bias::Neutral => Direction::Hold,
        }
    }

    /// Strict-majority vote; ties are neutral.
    pub fn from_counts(bullish: usize, bearish: usize) -> Bias {
        if bullish > bearish {
            Bias::Bullish
        } else if bearish > bullish {
            Bias::Bearish
        } else {
            Bias::Neutral
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendLabel {
    Uptrend,
    Downtrend,
    Sideways,
    Unknown,
}

impl fmt::Display for TrendLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TrendLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendLabel::Uptrend => "uptrend",
            TrendLabel::Downtrend => "downtrend",
            TrendLabel::Sideways => "sideways",
            TrendLabel::Unknown => "unknown",
        }
    }

    pub fn bias(self) -> Bias {
        match self {
            TrendLabel::Uptrend => Bias::Bullish,
            TrendLabel::Downtrend => Bias::Bearish,
            TrendLabel::Sideways | TrendLabel::Unknown => Bias::Neutral,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureLabel {
    BullishBos,
    BearishBos,
    BullishOb,
    BearishOb,
    BullishFvg,
    BearishFvg,
    BullishLiquidityGrab,
    BearishLiquidityGrab,
}

impl fmt::Display for StructureLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StructureLabel::BullishBos => "bullish_bos",
            StructureLabel::BearishBos => "bearish_bos",
            StructureLabel::BullishOb => "bullish_ob",
            StructureLabel::BearishOb => "bearish_ob",
            StructureLabel::BullishFvg => "bullish_fvg",
            StructureLabel::BearishFvg => "bearish_fvg",
            StructureLabel::BullishLiquidityGrab => "bullish_liquidity_grab",
            StructureLabel::BearishLiquidityGrab => "bearish_liquidity_grab",
        };
        f.write_str(s)
    }
}

impl StructureLabel {
    pub fn bias(self) -> Bias {
        match self {
            StructureLabel::BullishBos
            | StructureLabel::BullishOb
            | StructureLabel::BullishFvg
            | StructureLabel::BullishLiquidityGrab => Bias::Bullish,
            StructureLabel::BearishBos
            | StructureLabel::BearishOb
            | StructureLabel::BearishFvg
            | StructureLabel::BearishLiquidityGrab => Bias::Bearish,
        }
    }
}

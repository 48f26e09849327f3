use serde::{Deserialize, Serialize};

pub const FIB_RATIOS: [f64; 7] = [0.0, 0.236, 0.382, 0.5, 0.618, 0.786, 1.0];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FibLevel {
    pub name: String,
    pub ratio: f64,
    pub price: f64,
}

impl FibLevel {
    /// Deeper than the midpoint reads as a discount; shallower as a premium.
    pub fn is_discount(&self) -> bool {
        self.ratio > 0.5
    }

    pub fn is_premium(&self) -> bool {
        self.ratio < 0.5
    }
}

/// Retracement levels from `high` down to `low`. The 0% and 100% levels
/// are exactly `high` and `low`.
pub fn fibonacci_levels(high: f64, low: f64) -> [FibLevel; 7] {
    let diff = high - low;
    FIB_RATIOS.map(|ratio| {
        let price = if ratio == 0.0 {
            high
        } else if ratio == 1.0 {
            low
        } else {
            high - ratio * diff
        };
        FibLevel {
            name: format!("{:.1}%", ratio * 100.0),
            ratio,
            price,
        }
    })
}

/// Closest level within `tolerance` (price units) of `price`. On a tie the
/// higher level wins.
pub fn nearest_fib_level(price: f64, high: f64, low: f64, tolerance: f64) -> Option<FibLevel> {
    let mut best: Option<(f64, FibLevel)> = None;
    for level in fibonacci_levels(high, low) {
        let dist = (price - level.price).abs();
        if dist.is_nan() || dist > tolerance {
            continue;
        }
        match &best {
            Some((d, _)) if *d <= dist => {}
            _ => best = Some((dist, level)),
        }
    }
    best.map(|(_, level)| level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_for_110_100() {
        let levels = fibonacci_levels(110.0, 100.0);
        let expected = [110.0, 107.64, 106.18, 105.0, 103.82, 102.14, 100.0];
        for (level, want) in levels.iter().zip(expected) {
            assert!((level.price - want).abs() < 1e-9, "{} = {}", level.name, level.price);
        }
        assert_eq!(levels[0].price, 110.0);
        assert_eq!(levels[6].price, 100.0);
        assert_eq!(levels[1].name, "23.6%");
        assert_eq!(levels[6].name, "100.0%");
    }

    #[test]
    fn nearest_level_respects_tolerance() {
        let hit = nearest_fib_level(106.0, 110.0, 100.0, 0.5).unwrap();
        assert_eq!(hit.name, "38.2%");
        assert!(hit.is_premium());

        assert!(nearest_fib_level(108.8, 110.0, 100.0, 0.5).is_none());
    }

    #[test]
    fn degenerate_range_collapses_levels() {
        // every level sits on 100; the tie goes to the first (0%) level
        let hit = nearest_fib_level(100.0, 100.0, 100.0, 0.0).unwrap();
        assert_eq!(hit.name, "0.0%");
    }
}

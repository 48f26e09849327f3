use serde::{Deserialize, Serialize};

use crate::models::CandleSeries;

/// Pivot support/resistance as `(bar index, price)` pairs in bar order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PivotLevels {
    pub supports: Vec<(usize, f64)>,
    pub resistances: Vec<(usize, f64)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelKind {
    Support,
    Resistance,
}

impl LevelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LevelKind::Support => "support",
            LevelKind::Resistance => "resistance",
        }
    }
}

/// A low is a support pivot when it sits under both neighbours and the
/// lows keep falling into it and rising out of it. Resistance mirrors.
pub fn pivot_levels(series: &CandleSeries) -> PivotLevels {
    let mut levels = PivotLevels::default();
    let n = series.len();
    if n < 5 {
        return levels;
    }

    for i in 2..n - 2 {
        let low = |k: usize| series[k].low;
        let high = |k: usize| series[k].high;

        if low(i) < low(i - 1)
            && low(i) < low(i + 1)
            && low(i + 1) < low(i + 2)
            && low(i - 1) < low(i - 2)
        {
            levels.supports.push((i, low(i)));
        }
        if high(i) > high(i - 1)
            && high(i) > high(i + 1)
            && high(i + 1) > high(i + 2)
            && high(i - 1) > high(i - 2)
        {
            levels.resistances.push((i, high(i)));
        }
    }
    levels
}

/// Supports are checked before resistances. A level is near when its
/// distance relative to `price` is below `threshold`.
pub fn nearest_level(price: f64, pivots: &PivotLevels, threshold: f64) -> Option<(LevelKind, f64)> {
    if price == 0.0 {
        return None;
    }
    let near = |level: f64| ((price - level) / price).abs() < threshold;

    if let Some(&(_, level)) = pivots.supports.iter().find(|(_, l)| near(*l)) {
        return Some((LevelKind::Support, level));
    }
    pivots
        .resistances
        .iter()
        .find(|(_, l)| near(*l))
        .map(|&(_, level)| (LevelKind::Resistance, level))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::make_candles;

    fn v_shape() -> CandleSeries {
        // lows: 10, 9, 8, 9, 10 -> support at index 2
        // highs: 11, 12, 13, 12, 11 -> resistance at index 2
        make_candles(&[
            (10.5, 11.0, 10.0, 10.6),
            (10.6, 12.0, 9.0, 10.7),
            (10.7, 13.0, 8.0, 10.8),
            (10.8, 12.0, 9.0, 10.9),
            (10.9, 11.0, 10.0, 11.0),
        ])
    }

    #[test]
    fn finds_pivots_in_v_shape() {
        let p = pivot_levels(&v_shape());
        assert_eq!(p.supports, vec![(2, 8.0)]);
        assert_eq!(p.resistances, vec![(2, 13.0)]);
    }

    #[test]
    fn short_series_has_no_pivots() {
        let s = make_candles(&[(1.0, 2.0, 0.5, 1.5); 4]);
        assert_eq!(pivot_levels(&s), PivotLevels::default());
    }

    #[test]
    fn support_checked_before_resistance() {
        let pivots = PivotLevels {
            supports: vec![(1, 100.0)],
            resistances: vec![(2, 100.05)],
        };
        let hit = nearest_level(100.02, &pivots, 0.001).unwrap();
        assert_eq!(hit.0, LevelKind::Support);

        let far = nearest_level(105.0, &pivots, 0.001);
        assert!(far.is_none());
    }
}

use serde::{Deserialize, Serialize};

use crate::models::{Bias, CandleSeries, TrendLabel};

/// Latest close against the close five bars earlier.
pub fn trend_direction(closes: &[f64]) -> Option<TrendLabel> {
    if closes.len() < 6 {
        return None;
    }
    let last = closes[closes.len() - 1];
    let earlier = closes[closes.len() - 6];
    Some(if last > earlier {
        TrendLabel::Uptrend
    } else if last < earlier {
        TrendLabel::Downtrend
    } else {
        TrendLabel::Sideways
    })
}

/// Straight line `price = slope * x + intercept` over window bar indices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub slope: f64,
    pub intercept: f64,
}

impl Line {
    pub fn at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendlineFit {
    pub support: Line,
    pub resistance: Line,
    /// Closes inside the fitted window, oldest first
    pub closes: Vec<f64>,
    pub bias: Bias,
}

impl TrendlineFit {
    pub fn breakout(&self) -> bool {
        self.bias.is_directional()
    }

    pub fn label(&self) -> &'static str {
        match self.bias {
            Bias::Bullish => "bullish",
            Bias::Bearish => "bearish",
            Bias::Neutral => "sideways",
        }
    }
}

fn least_squares(ys: &[f64]) -> Option<Line> {
    let n = ys.len();
    if n < 2 {
        return None;
    }
    let nf = n as f64;
    let mean_x = (nf - 1.0) / 2.0;
    let mean_y = ys.iter().sum::<f64>() / nf;

    let mut num = 0.0;
    let mut den = 0.0;
    for (i, &y) in ys.iter().enumerate() {
        let dx = i as f64 - mean_x;
        num += dx * (y - mean_y);
        den += dx * dx;
    }
    let slope = if den > 0.0 { num / den } else { 0.0 };
    Some(Line {
        slope,
        intercept: mean_y - slope * mean_x,
    })
}

/// Fits support through the lows and resistance through the highs of the
/// last `lookback` bars. A last close above resistance is a bullish
/// breakout, below support a bearish one.
pub fn fit_trendlines(series: &CandleSeries, lookback: usize) -> Option<TrendlineFit> {
    let window = series.tail(lookback);
    let support = least_squares(&window.lows())?;
    let resistance = least_squares(&window.highs())?;
    let closes = window.closes();
    let last_close = *closes.last()?;

    let x = (closes.len() - 1) as f64;
    let bias = if last_close > resistance.at(x) {
        Bias::Bullish
    } else if last_close < support.at(x) {
        Bias::Bearish
    } else {
        Bias::Neutral
    };

    Some(TrendlineFit {
        support,
        resistance,
        closes,
        bias,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{make_bullish_trend, make_candles};

    #[test]
    fn trend_direction_cases() {
        let up: Vec<f64> = (1..=6).map(|i| i as f64).collect();
        assert_eq!(trend_direction(&up), Some(TrendLabel::Uptrend));

        let down: Vec<f64> = (1..=6).rev().map(|i| i as f64).collect();
        assert_eq!(trend_direction(&down), Some(TrendLabel::Downtrend));

        assert_eq!(trend_direction(&[1.0; 6]), Some(TrendLabel::Sideways));
        assert_eq!(trend_direction(&[1.0, 2.0, 3.0]), None);
    }

    #[test]
    fn least_squares_recovers_exact_line() {
        let ys: Vec<f64> = (0..10).map(|i| 3.0 + 2.0 * i as f64).collect();
        let line = least_squares(&ys).unwrap();
        assert!((line.slope - 2.0).abs() < 1e-9);
        assert!((line.intercept - 3.0).abs() < 1e-9);
        assert!(least_squares(&[1.0]).is_none());
    }

    #[test]
    fn steady_trend_stays_inside_channel() {
        let s = make_bullish_trend(30, 100.0);
        let fit = fit_trendlines(&s, 20).unwrap();
        assert_eq!(fit.bias, Bias::Neutral);
        assert_eq!(fit.label(), "sideways");
        let x = (fit.closes.len() - 1) as f64;
        assert!(fit.support.at(x) < fit.resistance.at(x));
    }

    #[test]
    fn spike_above_resistance_is_bullish_breakout() {
        let mut data: Vec<(f64, f64, f64, f64)> =
            (0..19).map(|_| (10.0, 10.5, 9.5, 10.0)).collect();
        data.push((10.0, 14.0, 9.9, 13.5));
        let fit = fit_trendlines(&make_candles(&data), 20).unwrap();
        assert!(fit.breakout());
        assert_eq!(fit.label(), "bullish");
    }

    #[test]
    fn single_bar_window_has_no_fit() {
        let s = make_candles(&[(1.0, 2.0, 0.5, 1.5)]);
        assert!(fit_trendlines(&s, 20).is_none());
    }
}

use tracing::{debug, info};

use crate::config::Config;
use crate::error::{SignalError, SignalResult};
use crate::models::{Candle, CandleSeries, Direction};
use crate::strategies::{aggregate, evaluate_filters, Signal};
use crate::trading::{PnlSizing, TradeOutcome};

use super::report::BacktestReport;

/// A virtual position opened from a signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpenTrade {
    pub direction: Direction,
    pub entry: f64,
    pub stop: f64,
    pub target: f64,
}

impl OpenTrade {
    pub fn from_signal(signal: &Signal) -> Option<OpenTrade> {
        if !signal.is_actionable() {
            return None;
        }
        Some(OpenTrade {
            direction: signal.direction,
            entry: signal.entry?,
            stop: signal.stop_loss?,
            target: signal.take_profit?,
        })
    }

    /// Exit price if this bar touches the stop or the target. The stop is
    /// checked first so a bar spanning both counts as a loss.
    pub fn exit_on(&self, bar: &Candle) -> Option<f64> {
        match self.direction {
            Direction::Buy if bar.low <= self.stop => Some(self.stop),
            Direction::Buy if bar.high >= self.target => Some(self.target),
            Direction::Sell if bar.high >= self.stop => Some(self.stop),
            Direction::Sell if bar.low <= self.target => Some(self.target),
            _ => None,
        }
    }
}

/// Walks a historical series bar by bar through the live pipeline,
/// holding at most one virtual trade at a time.
pub struct BacktestRunner {
    pub config: Config,
}

impl BacktestRunner {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Bars evaluated per step.
    pub fn window(&self) -> usize {
        self.config.candle_count.max(self.config.required_bars())
    }

    pub fn run(&self, symbol: &str, series: &CandleSeries) -> SignalResult<BacktestReport> {
        let cfg = &self.config;
        cfg.validate()?;
        series.validate()?;

        let window = self.window();
        let len = series.len();
        if len <= window {
            return Err(SignalError::InsufficientData {
                needed: window + 1,
                got: len,
            });
        }

        let sizing = PnlSizing {
            pip_size: cfg.pip_size(symbol),
            lot_size: cfg.lot_size,
            pip_value: cfg.pip_value,
        };

        info!("=== BACKTEST START: {} ===", symbol);
        info!("{} bars, window {}, max hold {} bars", len, window, cfg.max_hold_bars);

        let mut trades = Vec::new();
        let mut signals_generated = 0usize;
        let mut signals_held = 0usize;

        let mut i = window;
        while i < len {
            let history = series.slice(i - window, i);
            let signal = match evaluate_filters(symbol, &history, cfg, None) {
                Ok(eval) => aggregate(symbol, cfg.timeframe, eval, cfg),
                Err(e) => {
                    debug!("[{}] bar {} not evaluated: {}", symbol, i, e);
                    signals_held += 1;
                    i += 1;
                    continue;
                }
            };

            let Some(open) = OpenTrade::from_signal(&signal) else {
                signals_held += 1;
                i += 1;
                continue;
            };
            signals_generated += 1;

            let (outcome, last_bar) = self.settle(symbol, open, series, i, sizing);
            debug!(
                "[{}] {} {:.5} -> {:.5} ({})",
                symbol, open.direction, open.entry, outcome.exit, outcome.result
            );
            trades.push(outcome);
            i = last_bar + 1;
        }

        let report =
            BacktestReport::from_trades(symbol, series, trades, signals_generated, signals_held);
        info!(
            "=== BACKTEST DONE: {} trades, net {:+.1} pips ===",
            report.total_trades, report.net_pips
        );
        Ok(report)
    }

    /// Follows `open` from bar `from` until it exits. Returns the outcome
    /// and the index of the exit bar.
    pub fn settle(
        &self,
        symbol: &str,
        open: OpenTrade,
        series: &CandleSeries,
        from: usize,
        sizing: PnlSizing,
    ) -> (TradeOutcome, usize) {
        let end = (from + self.config.max_hold_bars.max(1)).min(series.len());
        let mut last = from;
        let mut exit = None;
        for j in from..end {
            last = j;
            if let Some(price) = open.exit_on(&series[j]) {
                exit = Some(price);
                break;
            }
        }

        let bar = &series[last];
        let outcome = TradeOutcome::settle(
            bar.timestamp,
            symbol,
            open.direction,
            open.entry,
            exit.unwrap_or(bar.close),
            open.stop,
            open.target,
            sizing,
        );
        (outcome, last)
    }
}

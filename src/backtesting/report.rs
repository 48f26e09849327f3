use chrono::{DateTime, Utc};

use crate::error::SignalResult;
use crate::models::CandleSeries;
use crate::store::CsvLogStore;
use crate::trading::{TradeOutcome, TradeResult};

#[derive(Debug, Clone)]
pub struct BacktestReport {
    pub symbol: String,

    // Period
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub bars: usize,

    // Trades
    pub trades: Vec<TradeOutcome>,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub profit_factor: f64,
    pub best_trade: f64,
    pub worst_trade: f64,

    // Performance
    pub net_pips: f64,
    pub net_pnl: f64,
    pub max_drawdown: f64,

    // Signals
    pub signals_generated: usize,
    pub signals_held: usize,

    /// Cumulative PnL after each trade
    pub equity_curve: Vec<(DateTime<Utc>, f64)>,
}

impl BacktestReport {
    pub fn from_trades(
        symbol: &str,
        series: &CandleSeries,
        trades: Vec<TradeOutcome>,
        signals_generated: usize,
        signals_held: usize,
    ) -> Self {
        let total_trades = trades.len();
        let wins: Vec<f64> = trades
            .iter()
            .filter(|t| t.result == TradeResult::Win)
            .map(|t| t.pnl)
            .collect();
        let losses: Vec<f64> = trades
            .iter()
            .filter(|t| t.result == TradeResult::Loss)
            .map(|t| t.pnl)
            .collect();

        let win_rate = if total_trades > 0 {
            wins.len() as f64 / total_trades as f64 * 100.0
        } else {
            0.0
        };
        let avg_win = mean(&wins);
        let avg_loss = mean(&losses);

        let gross_win: f64 = wins.iter().sum();
        let gross_loss: f64 = losses.iter().sum::<f64>().abs();
        let profit_factor = if gross_loss > 0.0 {
            gross_win / gross_loss
        } else if !wins.is_empty() {
            f64::INFINITY
        } else {
            0.0
        };

        let best_trade = trades.iter().map(|t| t.pnl).fold(f64::NEG_INFINITY, f64::max);
        let worst_trade = trades.iter().map(|t| t.pnl).fold(f64::INFINITY, f64::min);

        let mut equity = 0.0;
        let mut peak = 0.0f64;
        let mut max_drawdown = 0.0f64;
        let mut equity_curve = Vec::with_capacity(total_trades);
        for t in &trades {
            equity += t.pnl;
            peak = peak.max(equity);
            max_drawdown = max_drawdown.max(peak - equity);
            equity_curve.push((t.timestamp, equity));
        }

        BacktestReport {
            symbol: symbol.to_string(),
            start: series.first().map(|c| c.timestamp),
            end: series.last().map(|c| c.timestamp),
            bars: series.len(),
            total_trades,
            winning_trades: wins.len(),
            losing_trades: losses.len(),
            win_rate,
            avg_win,
            avg_loss,
            profit_factor,
            best_trade: if total_trades > 0 { best_trade } else { 0.0 },
            worst_trade: if total_trades > 0 { worst_trade } else { 0.0 },
            net_pips: trades.iter().map(|t| t.pnl_pips).sum(),
            net_pnl: equity,
            max_drawdown,
            signals_generated,
            signals_held,
            equity_curve,
            trades,
        }
    }

    /// Appends every settled trade to the store's trade log.
    pub fn log_trades(&self, store: &CsvLogStore) -> SignalResult<usize> {
        for trade in &self.trades {
            store.append_trade(trade)?;
        }
        Ok(self.trades.len())
    }

    pub fn print_summary(&self) {
        let fmt_ts = |t: Option<DateTime<Utc>>| {
            t.map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".to_string())
        };

        println!("\n{}", "=".repeat(70));
        println!("  BACKTEST REPORT: {}", self.symbol);
        println!("{}", "=".repeat(70));
        println!(
            "  Period:      {} to {} ({} bars)",
            fmt_ts(self.start),
            fmt_ts(self.end),
            self.bars
        );
        println!();
        println!("  PERFORMANCE");
        println!("  ───────────────────────────────────");
        println!("  Net Pips:    {:+.1}", self.net_pips);
        println!("  Net PnL:     ${:+.2}", self.net_pnl);
        println!("  Max DD:      ${:.2}", self.max_drawdown);
        println!();
        println!("  TRADES");
        println!("  ───────────────────────────────────");
        println!("  Total:       {}", self.total_trades);
        println!("  Win/Loss:    {} / {}", self.winning_trades, self.losing_trades);
        println!("  Win Rate:    {:.1}%", self.win_rate);
        println!("  Avg Win:     ${:+.2}", self.avg_win);
        println!("  Avg Loss:    ${:+.2}", self.avg_loss);
        println!("  Best:        ${:+.2}", self.best_trade);
        println!("  Worst:       ${:+.2}", self.worst_trade);
        println!("  Profit Factor: {:.2}", self.profit_factor);
        println!();
        println!("  SIGNALS");
        println!("  ───────────────────────────────────");
        println!("  Generated:   {}", self.signals_generated);
        println!("  Held:        {}", self.signals_held);
        println!("{}", "=".repeat(70));
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::trading::trade_record::{TradeOutcome, TradeResult};

const DIMENSIONS: &[&str] = &["symbol", "direction"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketStats {
    pub dimension: String,
    pub value: String,
    pub total: usize,
    pub wins: usize,
    pub losses: usize,
    pub win_rate: f64,
    pub avg_pnl: f64,
    pub total_pnl: f64,
    pub total_pips: f64,
    pub payoff_ratio: f64,
    pub edge: f64,
    pub sample_sufficient: bool,
}

/// Aggregate view over a slice of trade outcomes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub total: usize,
    pub wins: usize,
    pub losses: usize,
    pub breakeven: usize,
    pub win_rate: f64,
    pub total_pnl: f64,
    pub total_pips: f64,
    pub by_symbol: Vec<BucketStats>,
    pub by_direction: Vec<BucketStats>,
}

impl PerformanceSummary {
    pub fn print_summary(&self, title: &str) {
        println!("\n  {}", title);
        println!("  ───────────────────────────────────");
        println!(
            "  Trades: {}  (W {} / L {} / BE {})",
            self.total, self.wins, self.losses, self.breakeven
        );
        println!("  Win rate: {:.1}%", self.win_rate * 100.0);
        println!("  Net PnL: {:.2}  ({:.1} pips)", self.total_pnl, self.total_pips);
        if !self.by_symbol.is_empty() {
            println!("  ───────────────────────────────────");
            for b in &self.by_symbol {
                println!(
                    "  {:<10} {:>3} trades  {:>5.1}%  {:>9.2}",
                    b.value,
                    b.total,
                    b.win_rate * 100.0,
                    b.total_pnl
                );
            }
        }
    }
}

pub struct TradeAnalyzer {
    pub min_sample: usize,
}

impl TradeAnalyzer {
    pub fn new(min_sample: usize) -> Self {
        Self { min_sample }
    }

    pub fn analyze(
        &self,
        records: &[TradeOutcome],
    ) -> BTreeMap<String, BTreeMap<String, BucketStats>> {
        let refs: Vec<&TradeOutcome> = records.iter().collect();
        DIMENSIONS
            .iter()
            .map(|&dim| (dim.to_string(), self.analyze_dimension(&refs, dim)))
            .collect()
    }

    pub fn summarize(&self, records: &[TradeOutcome]) -> PerformanceSummary {
        let mut analysis = self.analyze(records);
        let total = records.len();
        let wins = records.iter().filter(|t| t.result == TradeResult::Win).count();
        let losses = records.iter().filter(|t| t.result == TradeResult::Loss).count();

        let take = |a: &mut BTreeMap<String, BTreeMap<String, BucketStats>>, dim: &str| {
            a.remove(dim)
                .map(|m| m.into_values().collect())
                .unwrap_or_default()
        };

        PerformanceSummary {
            total,
            wins,
            losses,
            breakeven: total - wins - losses,
            win_rate: if total > 0 { round4(wins as f64 / total as f64) } else { 0.0 },
            total_pnl: round4(records.iter().map(|t| t.pnl).sum()),
            total_pips: round4(records.iter().map(|t| t.pnl_pips).sum()),
            by_symbol: take(&mut analysis, "symbol"),
            by_direction: take(&mut analysis, "direction"),
        }
    }

    /// Summary over the trades of the last seven days before `now`.
    pub fn weekly_summary(
        &self,
        records: &[TradeOutcome],
        now: DateTime<Utc>,
    ) -> PerformanceSummary {
        let cutoff = now - Duration::days(7);
        let recent: Vec<TradeOutcome> = records
            .iter()
            .filter(|t| t.timestamp >= cutoff && t.timestamp <= now)
            .cloned()
            .collect();
        self.summarize(&recent)
    }

    fn analyze_dimension(
        &self,
        records: &[&TradeOutcome],
        dimension: &str,
    ) -> BTreeMap<String, BucketStats> {
        let mut buckets: BTreeMap<String, Vec<&TradeOutcome>> = BTreeMap::new();
        for r in records {
            if let Some(key) = extract_key(r, dimension) {
                buckets.entry(key).or_default().push(r);
            }
        }

        buckets
            .into_iter()
            .map(|(value, trades)| {
                let stats = self.compute_stats(dimension, &value, &trades);
                (value, stats)
            })
            .collect()
    }

    fn compute_stats(
        &self,
        dimension: &str,
        value: &str,
        trades: &[&TradeOutcome],
    ) -> BucketStats {
        let total = trades.len();
        let wins = trades.iter().filter(|t| t.is_win()).count();
        let losses = trades.iter().filter(|t| t.is_loss()).count();
        let win_rate = if total > 0 {
            wins as f64 / total as f64
        } else {
            0.0
        };

        let total_pnl: f64 = trades.iter().map(|t| t.pnl).sum();
        let total_pips: f64 = trades.iter().map(|t| t.pnl_pips).sum();
        let avg_pnl = if total > 0 { total_pnl / total as f64 } else { 0.0 };

        let avg_win = if wins > 0 {
            trades.iter().filter(|t| t.is_win()).map(|t| t.pnl).sum::<f64>() / wins as f64
        } else {
            0.0
        };
        let avg_loss = if losses > 0 {
            let loss_sum: f64 = trades.iter().filter(|t| t.is_loss()).map(|t| t.pnl).sum();
            (loss_sum / losses as f64).abs()
        } else {
            0.0
        };

        let payoff_ratio = if avg_loss > 0.0 { avg_win / avg_loss } else { 0.0 };
        let loss_rate = if total > 0 { losses as f64 / total as f64 } else { 0.0 };
        let edge = (win_rate * avg_win) - (loss_rate * avg_loss);

        BucketStats {
            dimension: dimension.to_string(),
            value: value.to_string(),
            total,
            wins,
            losses,
            win_rate: round4(win_rate),
            avg_pnl: round4(avg_pnl),
            total_pnl: round4(total_pnl),
            total_pips: round4(total_pips),
            payoff_ratio: round4(payoff_ratio),
            edge: round4(edge),
            sample_sufficient: total >= self.min_sample,
        }
    }
}

fn extract_key(record: &TradeOutcome, dimension: &str) -> Option<String> {
    match dimension {
        "symbol" => Some(record.symbol.clone()),
        "direction" => Some(record.direction.as_str().to_string()),
        _ => None,
    }
}

fn round4(x: f64) -> f64 {
    (x * 10000.0).round() / 10000.0
}

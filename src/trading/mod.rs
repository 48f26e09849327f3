pub mod trade_analyzer;
pub mod trade_record;

pub use trade_analyzer::{BucketStats, PerformanceSummary, TradeAnalyzer};
pub use trade_record::{PnlSizing, TradeOutcome, TradeResult};

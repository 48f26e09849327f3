pub mod data_fetcher;
pub mod report;
pub mod runner;

pub use report::BacktestReport;
pub use runner::{BacktestRunner, OpenTrade};

pub mod backtesting;
pub mod config;
pub mod error;
pub mod exchange;
pub mod indicators;
pub mod models;
pub mod notify;
pub mod retry;
pub mod scanner;
pub mod store;
pub mod strategies;
#[cfg(test)]
pub mod test_helpers;
pub mod trading;

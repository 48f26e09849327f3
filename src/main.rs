mod bot;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, EnvFilter};

use fx_signal_bot::config::Config;
use fx_signal_bot::exchange::CoinbaseClient;
use fx_signal_bot::notify;
use fx_signal_bot::scanner::Scanner;
use fx_signal_bot::store::CsvLogStore;
use fx_signal_bot::strategies::sentiment::NewsClient;

use crate::bot::SignalBot;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .init();

    cfg.validate().context("invalid configuration")?;

    let market = Box::new(CoinbaseClient::new(&cfg));
    let notifier = notify::from_config(&cfg);
    let store = CsvLogStore::open(&cfg.log_dir)
        .with_context(|| format!("failed to open log store at {}", cfg.log_dir))?;

    let mut scanner = Scanner::new(market, notifier, store);
    if cfg.enable_sentiment && !cfg.news_api_key.is_empty() {
        scanner = scanner.with_news(NewsClient::new(&cfg));
    }

    let mut bot = SignalBot::new(cfg, scanner);
    bot.run().await?;

    Ok(())
}

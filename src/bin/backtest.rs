use anyhow::{Context, Result};
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use fx_signal_bot::backtesting::{data_fetcher, BacktestReport, BacktestRunner};
use fx_signal_bot::config::Config;
use fx_signal_bot::exchange::CoinbaseClient;
use fx_signal_bot::store::CsvLogStore;
use fx_signal_bot::trading::TradeAnalyzer;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .init();

    cfg.validate().context("invalid configuration")?;

    // Usage: backtest [bars] [--refresh] [--no-log]
    let args: Vec<String> = std::env::args().skip(1).collect();
    let bars: usize = args
        .iter()
        .find_map(|s| s.parse().ok())
        .unwrap_or(cfg.candle_count * 3);
    let refresh = args.iter().any(|a| a == "--refresh");
    let log_trades = !args.iter().any(|a| a == "--no-log");

    println!("╔══════════════════════════════════════════════════════════╗");
    println!("║              FX SIGNAL BOT - BACKTESTER                  ║");
    println!("╚══════════════════════════════════════════════════════════╝");
    println!("  Symbols:   {}", cfg.symbols.join(", "));
    println!("  Timeframe: {}", cfg.timeframe);
    println!("  Bars:      {}", bars);
    println!("  Stop:      {} | Min R:R {:.1}", cfg.stop_loss_pips, cfg.min_risk_reward);
    println!();

    let data_dir = Path::new(&cfg.log_dir).join("data");
    let store = CsvLogStore::open(&cfg.log_dir)
        .with_context(|| format!("failed to open log store at {}", cfg.log_dir))?;
    let mut market = CoinbaseClient::new(&cfg);
    let runner = BacktestRunner::new(cfg.clone());
    let mut reports: Vec<BacktestReport> = Vec::new();

    for symbol in &cfg.symbols {
        let series = match data_fetcher::fetch_and_cache(
            &mut market,
            symbol,
            cfg.timeframe,
            bars,
            &data_dir,
            refresh,
        )
        .await
        {
            Ok(s) => s,
            Err(e) => {
                warn!("Skipping {}: {:#}", symbol, e);
                continue;
            }
        };

        match runner.run(symbol, &series) {
            Ok(report) => {
                report.print_summary();
                if log_trades {
                    match report.log_trades(&store) {
                        Ok(n) => info!("Logged {} {} trades to the trade log", n, symbol),
                        Err(e) => warn!("Could not log {} trades: {}", symbol, e),
                    }
                }
                reports.push(report);
            }
            Err(e) if e.is_skip() => warn!("Skipping {}: {}", symbol, e),
            Err(e) => return Err(e.into()),
        }
    }

    let all_trades: Vec<_> = reports
        .iter()
        .flat_map(|r| r.trades.iter().cloned())
        .collect();
    TradeAnalyzer::new(5)
        .summarize(&all_trades)
        .print_summary("ALL SYMBOLS");

    Ok(())
}

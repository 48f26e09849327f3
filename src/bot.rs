use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use tracing::{error, info, warn};

use fx_signal_bot::config::Config;
use fx_signal_bot::models::Direction;
use fx_signal_bot::scanner::Scanner;
use fx_signal_bot::store::{count_direction, HealthRecord};
use fx_signal_bot::trading::TradeAnalyzer;

pub struct SignalBot {
    config: Config,
    scanner: Scanner,
    cycles: u64,
    last_export: DateTime<Utc>,
}

impl SignalBot {
    pub fn new(config: Config, scanner: Scanner) -> Self {
        info!("{}", "=".repeat(60));
        info!("{} starting up", config.bot_name);
        info!("Symbols: {}", config.symbols.join(", "));
        info!(
            "Timeframe: {} | {} candles | every {}s",
            config.timeframe, config.candle_count, config.scan_interval_secs
        );
        info!(
            "Filters: smc={} trendline={} candlestick={} sentiment={}",
            config.enable_smc,
            config.enable_trendline,
            config.enable_candlestick,
            config.enable_sentiment
        );
        info!(
            "Stop: {} | Min R:R {:.1} | Notifier: {}",
            config.stop_loss_pips,
            config.min_risk_reward,
            scanner.notifier().name()
        );
        info!("{}", "=".repeat(60));

        Self {
            config,
            scanner,
            cycles: 0,
            last_export: Utc::now(),
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        info!("Bot is now running. Press Ctrl+C to stop.");
        self.record_health("started", "bot online");
        self.send_status("is online").await;
        self.print_status();

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    self.shutdown().await;
                    return Ok(());
                }
                result = self.tick() => {
                    if let Err(e) = result {
                        self.record_health("error", e.to_string());
                        return Err(e);
                    }
                }
            }
        }
    }

    async fn tick(&mut self) -> Result<()> {
        match self.scanner.scan_cycle(&self.config).await {
            Ok(report) => {
                self.cycles += 1;
                if report.notify_failures > 0 {
                    warn!("{} notifications failed this cycle", report.notify_failures);
                }
            }
            Err(e) if e.is_skip() => {
                error!("Scan cycle failed: {}", e);
                self.record_health("cycle_failed", e.to_string());
                self.scanner.alert_failure(&self.config, &e).await;
            }
            Err(e) => {
                error!("Configuration error, stopping: {}", e);
                self.scanner.alert_failure(&self.config, &e).await;
                return Err(e.into());
            }
        }

        let now = Utc::now();
        if now - self.last_export >= Duration::days(7) {
            if let Err(e) = self.scanner.export_weekly(&self.config, now).await {
                error!("Weekly summary export failed: {}", e);
            }
            self.last_export = now;
        }

        let pause = tokio::time::Duration::from_secs(self.config.scan_interval_secs);
        tokio::time::sleep(pause).await;
        Ok(())
    }

    async fn send_status(&self, what: &str) {
        if !self.config.send_status_message {
            return;
        }
        let message = format!("<b>{}</b> {}", self.config.bot_name, what);
        if let Err(e) = self.scanner.notifier().send(&message).await {
            warn!("Status message failed: {:#}", e);
        }
    }

    fn record_health(&self, status: &str, notes: impl Into<String>) {
        if let Err(e) = self.scanner.store().append_health(&HealthRecord::new(status, notes)) {
            error!("Failed to log health: {}", e);
        }
    }

    /// Replays the log store for a short summary.
    fn print_status(&self) {
        let store = self.scanner.store();
        let week_ago = Utc::now() - Duration::days(7);

        match store.signals_since(week_ago) {
            Ok(signals) => {
                info!(
                    "Signals (7d): {} | Buy: {} | Sell: {}",
                    signals.len(),
                    count_direction(&signals, Direction::Buy),
                    count_direction(&signals, Direction::Sell)
                );
            }
            Err(e) => warn!("Could not read signal log: {}", e),
        }

        match store.read_trades() {
            Ok(trades) => {
                let summary = TradeAnalyzer::new(5).weekly_summary(&trades, Utc::now());
                info!(
                    "Trades (7d): {} | Win Rate: {:.1}% | PnL: {:+.2}",
                    summary.total,
                    summary.win_rate * 100.0,
                    summary.total_pnl
                );
            }
            Err(e) => warn!("Could not read trade log: {}", e),
        }

        if let Ok(Some(health)) = store.latest_health() {
            info!(
                "Last health: {} ({}) at {}",
                health.status,
                health.notes,
                health.timestamp.to_rfc3339()
            );
        }
        info!("Cycles this run: {}", self.cycles);
    }

    async fn shutdown(&mut self) {
        info!("Shutting down...");
        self.record_health("stopped", format!("{} cycles", self.cycles));
        self.send_status("is going offline").await;
        self.print_status();
        info!("Bot stopped.");
    }
}

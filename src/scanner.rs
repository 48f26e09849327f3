use chrono::{DateTime, Duration, Utc};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{SignalError, SignalResult};
use crate::exchange::MarketData;
use crate::notify::Notifier;
use crate::store::{CsvLogStore, HealthRecord, SignalRecord, SignalStatus};
use crate::strategies::chart::save_trendline_chart;
use crate::strategies::sentiment::{compute_sentiment, NewsClient};
use crate::strategies::{aggregate, evaluate_filters, format_alert, Signal};

pub const WEEKLY_SUMMARY_FILE: &str = "weekly_summary.csv";

/// What one pass over the symbol list produced.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    /// One per symbol; skipped symbols appear as holds carrying the reason
    pub signals: Vec<Signal>,
    /// (symbol, reason) for every symbol that produced no evaluation
    pub skipped: Vec<(String, String)>,
    pub notify_failures: usize,
}

impl CycleReport {
    pub fn actionable(&self) -> impl Iterator<Item = &Signal> {
        self.signals.iter().filter(|s| s.is_actionable())
    }

    pub fn summary(&self) -> String {
        format!(
            "{} evaluated, {} signals, {} skipped",
            self.signals.len() - self.skipped.len(),
            self.actionable().count(),
            self.skipped.len()
        )
    }
}

pub struct Scanner {
    market: Box<dyn MarketData>,
    notifier: Box<dyn Notifier>,
    store: CsvLogStore,
    news: Option<NewsClient>,
}

impl Scanner {
    pub fn new(
        market: Box<dyn MarketData>,
        notifier: Box<dyn Notifier>,
        store: CsvLogStore,
    ) -> Self {
        Self {
            market,
            notifier,
            store,
            news: None,
        }
    }

    pub fn with_news(mut self, news: NewsClient) -> Self {
        self.news = Some(news);
        self
    }

    pub fn store(&self) -> &CsvLogStore {
        &self.store
    }

    pub fn notifier(&self) -> &dyn Notifier {
        self.notifier.as_ref()
    }

    /// Fetch, filter and aggregate one symbol.
    pub async fn evaluate_symbol(&mut self, symbol: &str, cfg: &Config) -> SignalResult<Signal> {
        self.evaluate(symbol, cfg).await.map(|(signal, _)| signal)
    }

    /// Like `evaluate_symbol`, also returning the path of a saved chart.
    async fn evaluate(
        &mut self,
        symbol: &str,
        cfg: &Config,
    ) -> SignalResult<(Signal, Option<PathBuf>)> {
        let series = self
            .market
            .fetch_candles(symbol, cfg.timeframe, cfg.candle_count)
            .await?;

        let sentiment = match (&self.news, cfg.enable_sentiment) {
            (Some(news), true) => compute_sentiment(news, symbol).await,
            _ => None,
        };

        let eval = evaluate_filters(symbol, &series, cfg, sentiment)?;
        let mut chart = None;
        if let Some(fit) = &eval.chart {
            let dir = Path::new(&cfg.log_dir).join("charts");
            match save_trendline_chart(&dir, symbol, fit) {
                Ok(path) => {
                    debug!("[{}] trendline chart saved to {}", symbol, path.display());
                    chart = Some(path);
                }
                Err(e) => error!("[{}] failed to save trendline chart: {:#}", symbol, e),
            }
        }

        Ok((aggregate(symbol, cfg.timeframe, eval, cfg), chart))
    }

    /// One pass over `cfg.symbols`. Only a configuration error aborts the
    /// cycle; any per-symbol failure is logged and the symbol skipped.
    pub async fn scan_cycle(&mut self, cfg: &Config) -> SignalResult<CycleReport> {
        cfg.validate()?;

        let mut report = CycleReport {
            started_at: Utc::now(),
            signals: Vec::new(),
            skipped: Vec::new(),
            notify_failures: 0,
        };

        info!(
            "Scanning {} symbols on {} ({} via {})",
            cfg.symbols.len(),
            cfg.timeframe,
            self.market.name(),
            self.notifier.name()
        );

        for symbol in &cfg.symbols {
            let (signal, chart) = match self.evaluate(symbol, cfg).await {
                Ok(evaluated) => evaluated,
                Err(e) if e.is_skip() => {
                    warn!("[{}] skipped: {}", symbol, e);
                    report.skipped.push((symbol.clone(), e.to_string()));
                    let reason = format!("Skipped: {}", e);
                    report
                        .signals
                        .push(Signal::hold(symbol, cfg.timeframe, Utc::now(), reason));
                    continue;
                }
                Err(e) => return Err(e),
            };

            if signal.is_actionable() {
                info!(
                    "[{}] {} signal, strength {} | {}",
                    symbol,
                    signal.direction.as_str().to_uppercase(),
                    signal.strength,
                    signal.reason_summary()
                );
                let status = match self.notifier.send(&format_alert(&signal)).await {
                    Ok(()) => SignalStatus::Sent,
                    Err(e) => {
                        let channel = self.notifier.name();
                        error!("[{}] {} notification failed: {:#}", symbol, channel, e);
                        report.notify_failures += 1;
                        SignalStatus::NotifyFailed
                    }
                };
                if let (Some(path), true) = (&chart, cfg.telegram_send_chart) {
                    self.send_chart(&signal, path).await;
                }
                let record = SignalRecord::from_signal(&signal, status);
                if let Err(e) = self.store.append_signal(&record) {
                    error!("[{}] failed to log signal: {}", symbol, e);
                }
            } else {
                debug!("[{}] hold | {}", symbol, signal.reason_summary());
            }

            report.signals.push(signal);
        }

        let health = HealthRecord::new("cycle_ok", report.summary());
        if let Err(e) = self.store.append_health(&health) {
            error!("Failed to log health: {}", e);
        }
        info!("Cycle complete: {}", report.summary());
        Ok(report)
    }

    async fn send_chart(&self, signal: &Signal, path: &Path) {
        let caption = format!(
            "{} {} trendlines ({})",
            signal.symbol,
            signal.timeframe,
            signal.direction.as_str().to_uppercase()
        );
        if let Err(e) = self.notifier.send_document(path, &caption).await {
            error!("[{}] chart delivery failed: {:#}", signal.symbol, e);
        }
    }

    /// Tells the channel a cycle failed. Returns whether it was delivered.
    pub async fn alert_failure(&self, cfg: &Config, err: &SignalError) -> bool {
        let message = format!("<b>{}</b> scan failed: {}", cfg.bot_name, err);
        match self.notifier.send(&message).await {
            Ok(()) => true,
            Err(e) => {
                error!("Failure alert not delivered: {:#}", e);
                false
            }
        }
    }

    /// Writes the last seven days of logged signals to
    /// `weekly_summary.csv` in the store directory and announces it.
    /// Nothing is written or sent when there are no signals.
    pub async fn export_weekly(&self, cfg: &Config, now: DateTime<Utc>) -> SignalResult<usize> {
        let path = self.store.dir().join(WEEKLY_SUMMARY_FILE);
        let n = self
            .store
            .export_signals_since(now - Duration::days(7), &path)?;
        if n == 0 {
            info!("No signals in the past 7 days, weekly summary skipped");
            return Ok(0);
        }

        info!("Weekly summary: {} signals written to {}", n, path.display());
        let message = format!(
            "<b>{}</b> weekly summary generated: {} signals",
            cfg.bot_name, n
        );
        if let Err(e) = self.notifier.send(&message).await {
            warn!("Weekly summary notice failed: {:#}", e);
        }
        Ok(n)
    }
}

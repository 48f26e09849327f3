pub mod telegram;

pub use telegram::TelegramNotifier;

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;
use tracing::info;

use crate::config::Config;

/// Best-effort message sink. Callers log failures and carry on.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &str) -> Result<()>;

    /// Sends a file with a caption. Sinks without attachments send the
    /// caption alone.
    async fn send_document(&self, _path: &Path, caption: &str) -> Result<()> {
        self.send(caption).await
    }

    fn name(&self) -> &str;
}

/// Writes alerts to the tracing log only.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &str) -> Result<()> {
        info!("[alert] {}", message.replace('\n', " | "));
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

/// Telegram when enabled and configured, otherwise the log.
pub fn from_config(cfg: &Config) -> Box<dyn Notifier> {
    if cfg.enable_telegram
        && !cfg.telegram_bot_token.is_empty()
        && !cfg.telegram_chat_id.is_empty()
    {
        Box::new(TelegramNotifier::new(cfg))
    } else {
        Box::new(LogNotifier)
    }
}

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::config::Config;
use crate::notify::Notifier;
use crate::retry::RetryPolicy;

const API_URL: &str = "https://api.telegram.org";

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
    disable_web_page_preview: bool,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

pub struct TelegramNotifier {
    client: Client,
    base_url: String,
    token: String,
    chat_id: String,
    retry: RetryPolicy,
}

impl TelegramNotifier {
    pub fn new(cfg: &Config) -> Self {
        Self {
            client: Client::new(),
            base_url: API_URL.to_string(),
            token: cfg.telegram_bot_token.clone(),
            chat_id: cfg.telegram_chat_id.clone(),
            retry: cfg.notify_retry.clone(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    async fn post(&self, message: &str) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.base_url, self.token);
        let body = SendMessage {
            chat_id: &self.chat_id,
            text: message,
            parse_mode: "HTML",
            disable_web_page_preview: true,
        };

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("Failed to reach Telegram")?;
        check_response(resp).await
    }

    async fn post_document(&self, path: &Path, caption: &str) -> Result<()> {
        let url = format!("{}/bot{}/sendDocument", self.base_url, self.token);
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "chart.svg".to_string());
        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime_for(path))?;
        let form = Form::new()
            .text("chat_id", self.chat_id.clone())
            .text("caption", caption.to_string())
            .part("document", part);

        let resp = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .context("Failed to reach Telegram")?;
        check_response(resp).await
    }
}

fn mime_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        _ => "application/octet-stream",
    }
}

async fn check_response(resp: Response) -> Result<()> {
    let status = resp.status();
    let parsed: ApiResponse = resp
        .json()
        .await
        .with_context(|| format!("Unreadable Telegram response ({})", status))?;
    if !status.is_success() || !parsed.ok {
        bail!(
            "Telegram API error {}: {}",
            status,
            parsed.description.unwrap_or_default()
        );
    }
    Ok(())
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, message: &str) -> Result<()> {
        self.retry.run("telegram", || self.post(message)).await?;
        debug!("[telegram] message delivered to chat {}", self.chat_id);
        Ok(())
    }

    async fn send_document(&self, path: &Path, caption: &str) -> Result<()> {
        self.retry
            .run("telegram document", || self.post_document(path, caption))
            .await?;
        debug!("[telegram] {} delivered to chat {}", path.display(), self.chat_id);
        Ok(())
    }

    fn name(&self) -> &str {
        "telegram"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_uses_html_parse_mode() {
        let body = SendMessage {
            chat_id: "42",
            text: "<b>BUY</b>",
            parse_mode: "HTML",
            disable_web_page_preview: true,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["parse_mode"], "HTML");
        assert_eq!(json["chat_id"], "42");
    }

    #[tokio::test]
    async fn unreachable_endpoint_fails_after_retries() {
        let mut cfg = crate::test_helpers::default_test_config();
        cfg.telegram_bot_token = "t".into();
        cfg.telegram_chat_id = "1".into();
        cfg.notify_retry = RetryPolicy::fixed(2, 0);
        // port 9 (discard) on localhost refuses connections
        let n = TelegramNotifier::new(&cfg).with_base_url("http://127.0.0.1:9");
        assert!(n.send("hi").await.is_err());
    }

    #[tokio::test]
    async fn missing_chart_file_is_an_error() {
        let mut cfg = crate::test_helpers::default_test_config();
        cfg.notify_retry = RetryPolicy::fixed(1, 0);
        let n = TelegramNotifier::new(&cfg).with_base_url("http://127.0.0.1:9");
        let err = n
            .send_document(Path::new("/nonexistent/chart.svg"), "BTC-USD")
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to read"));
    }

    #[test]
    fn chart_mime_types() {
        assert_eq!(mime_for(Path::new("a/BTC-USD.svg")), "image/svg+xml");
        assert_eq!(mime_for(Path::new("chart")), "application/octet-stream");
    }
}

//! Chat delivery of the run summary and the spreadsheet.
//!
//! Delivery is best-effort: failures are logged and reported back, never raised.

use anyhow::{anyhow, Context, Result};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use crate::analysis::FilteredTable;
use crate::models::{Config, IndicatorSnapshot, TelegramConfig};

/// Rows listed in the summary message
pub const SUMMARY_TOP_N: usize = 5;

/// Chat destination for the run results
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send_text(&self, text: &str) -> Result<()>;

    async fn send_document(&self, bytes: Vec<u8>, file_name: &str, caption: &str) -> Result<()>;
}

/// Telegram Bot API notifier
pub struct TelegramNotifier {
    client: Client,
    api_base_url: String,
    token: String,
    chat_id: String,
}

impl TelegramNotifier {
    /// Build from config, `None` when no credentials are configured
    pub fn from_config(config: &Config) -> Option<Self> {
        config
            .telegram
            .as_ref()
            .map(|telegram| Self::new(&config.telegram_api_base_url, telegram))
    }

    pub fn new(api_base_url: &str, telegram: &TelegramConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            token: telegram.token.clone(),
            chat_id: telegram.chat_id.clone(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base_url, self.token, method)
    }

    /// Fail on a non-2xx status or `"ok": false`, log the reply otherwise
    async fn check_response(response: reqwest::Response, operation: &str) -> Result<BotReply> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(anyhow!("Telegram {} failed with status {}: {}", operation, status, body));
        }

        let reply: BotReply = serde_json::from_str(&body)
            .with_context(|| format!("Telegram {} returned an unexpected body: {}", operation, body))?;
        if !reply.ok {
            return Err(anyhow!(
                "Telegram {} rejected: {}",
                operation,
                reply.description.as_deref().unwrap_or("no description")
            ));
        }

        info!("Telegram {}: {}", operation, reply.result.as_ref().unwrap_or(&serde_json::Value::Null));
        Ok(reply)
    }
}

/// Bot API reply envelope
#[derive(Debug, Deserialize)]
struct BotReply {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    result: Option<Value>,
}

#[async_trait::async_trait]
impl Notifier for TelegramNotifier {
    async fn send_text(&self, text: &str) -> Result<()> {
        let params = [("chat_id", self.chat_id.as_str()), ("text", text)];

        let response = self
            .client
            .post(self.api_url("sendMessage"))
            .form(&params)
            .send()
            .await?;

        Self::check_response(response, "sendMessage").await?;
        Ok(())
    }

    async fn send_document(&self, bytes: Vec<u8>, file_name: &str, caption: &str) -> Result<()> {
        let part = Part::bytes(bytes).file_name(file_name.to_string());
        let form = Form::new()
            .text("chat_id", self.chat_id.clone())
            .text("caption", caption.to_string())
            .part("document", part);

        let response = self
            .client
            .post(self.api_url("sendDocument"))
            .multipart(form)
            .send()
            .await?;

        Self::check_response(response, "sendDocument").await?;
        Ok(())
    }
}

/// Summary text: indicator moves, match count and the top rows
pub fn build_summary(indicators: &IndicatorSnapshot, filtered: &FilteredTable) -> String {
    let moves = indicators
        .iter()
        .map(|(key, value)| match value {
            Some(v) => format!("{}: {:.2}%", key, v),
            None => format!("{}: N/A", key),
        })
        .collect::<Vec<_>>()
        .join("  | ");

    let mut lines = vec![
        format!("📊 {}", moves),
        format!("✅ {} stocks matched all filters.", filtered.len()),
        format!("🏆 Top {} by % Change:", SUMMARY_TOP_N),
    ];
    lines.extend(
        filtered
            .top(SUMMARY_TOP_N)
            .iter()
            .map(|row| format!("{}: {:.2}%", row.ticker, row.change_pct)),
    );

    lines.join("\n")
}

/// Outcome of the two delivery steps
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryStatus {
    pub text_sent: bool,
    pub document_sent: bool,
}

/// Send the summary, then the report file captioned with its name.
/// Each step is independent of the other's outcome.
pub async fn deliver(notifier: &dyn Notifier, summary: &str, report_path: &Path) -> DeliveryStatus {
    let mut status = DeliveryStatus::default();

    match notifier.send_text(summary).await {
        Ok(()) => status.text_sent = true,
        Err(e) => warn!("‼️ Telegram message failed: {}", e),
    }

    let file_name = report_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("report.xlsx")
        .to_string();

    let result = match tokio::fs::read(report_path).await {
        Ok(bytes) => notifier.send_document(bytes, &file_name, &file_name).await,
        Err(e) => Err(anyhow!("could not read {}: {}", report_path.display(), e)),
    };

    match result {
        Ok(()) => status.document_sent = true,
        Err(e) => warn!("‼️ Telegram file failed: {}", e),
    }

    status
}

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use tracing::info;

use crate::models::Config;

/// Source of the reference index constituent list
#[async_trait::async_trait]
pub trait RosterSource: Send + Sync {
    async fn get_constituents(&self) -> Result<Vec<String>>;
}

/// S&P 500 constituents from the `datasets/s-and-p-500-companies` CSV
pub struct GithubRosterSource {
    client: Client,
    url: String,
}

impl GithubRosterSource {
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_url(&config.roster_url)
    }

    pub fn with_url(url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("rust-screener/1.0")
            .build()?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl RosterSource for GithubRosterSource {
    async fn get_constituents(&self) -> Result<Vec<String>> {
        info!("🌐 Fetching S&P 500 list from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .context("S&P 500 roster request failed")?;

        if !response.status().is_success() {
            return Err(anyhow!("S&P 500 roster request failed with status {}", response.status()));
        }

        let csv_text = response.text().await?;
        let symbols = parse_constituents_csv(&csv_text)?;

        info!("✅ Parsed {} S&P 500 companies", symbols.len());
        Ok(symbols)
    }
}

/// Symbol column (first) of a constituents CSV with a header row
pub fn parse_constituents_csv(csv_text: &str) -> Result<Vec<String>> {
    let mut reader = csv::Reader::from_reader(csv_text.as_bytes());
    let mut symbols = Vec::new();

    for result in reader.records() {
        let record = result.context("Malformed S&P 500 roster CSV")?;
        if let Some(symbol) = record.get(0).map(str::trim).filter(|s| !s.is_empty()) {
            symbols.push(symbol.to_string());
        }
    }

    if symbols.is_empty() {
        return Err(anyhow!("S&P 500 roster CSV contained no symbols"));
    }

    Ok(symbols)
}

use anyhow::{anyhow, Context, Result};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use super::{ApiRateLimiter, MarketDataProvider};
use crate::models::{Config, PriceBar, QuoteSnapshot};

/// Non-2xx reply from the market data host
#[derive(Debug, Error)]
#[error("API request failed with status {status}: {body}")]
pub struct StatusError {
    pub status: StatusCode,
    pub body: String,
}

/// Yahoo Finance market data client.
///
/// `quoteSummary` only answers with a crumb bound to a session cookie. The
/// cookie comes from `cookie_url`, the crumb from `v1/test/getcrumb`, and the
/// crumb is cached until the host rejects it.
pub struct YahooClient {
    client: Client,
    base_url: Url,
    cookie_url: Url,
    rate_limiter: ApiRateLimiter,
    crumb: Mutex<Option<String>>,
}

impl YahooClient {
    /// Create a new client from the application config
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_urls(
            &config.market_data_base_url,
            &config.market_data_cookie_url,
            config.rate_limit_per_minute,
        )
    }

    pub fn with_urls(base_url: &str, cookie_url: &str, rate_limit_per_minute: u32) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (compatible; rust-screener/1.0)")
            .cookie_store(true)
            .build()?;

        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid market data base URL: {}", base_url))?;
        let cookie_url = Url::parse(cookie_url)
            .with_context(|| format!("Invalid market data cookie URL: {}", cookie_url))?;

        Ok(Self {
            client,
            base_url,
            cookie_url,
            rate_limiter: ApiRateLimiter::new(rate_limit_per_minute),
            crumb: Mutex::new(None),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("Market data base URL cannot carry a path: {}", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Make a GET request and return the JSON body
    async fn make_request(&self, url: Url, query: &[(&str, String)]) -> Result<Value> {
        self.rate_limiter.wait().await;

        debug!("Making request to: {}", url);

        let response = self.client.get(url).query(query).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await?;
            return Err(StatusError { status, body }.into());
        }

        let json: Value = response.json().await?;
        Ok(json)
    }

    /// Cached crumb, fetched on first use
    async fn crumb(&self) -> Result<String> {
        let mut cached = self.crumb.lock().await;
        if let Some(crumb) = cached.as_ref() {
            return Ok(crumb.clone());
        }

        let crumb = self.fetch_crumb().await?;
        *cached = Some(crumb.clone());
        Ok(crumb)
    }

    async fn fetch_crumb(&self) -> Result<String> {
        // The cookie host usually answers 404; only the Set-Cookie matters
        self.rate_limiter.wait().await;
        self.client
            .get(self.cookie_url.clone())
            .send()
            .await
            .context("Yahoo session cookie request failed")?;

        let url = self.endpoint(&["v1", "test", "getcrumb"])?;
        self.rate_limiter.wait().await;
        let response = self.client.get(url).send().await.context("Yahoo crumb request failed")?;

        let status = response.status();
        let body = response.text().await?;
        let crumb = body.trim();
        if !status.is_success() || crumb.is_empty() || crumb.contains(char::is_whitespace) {
            return Err(anyhow!("Yahoo crumb request failed with status {}: {}", status, crumb));
        }

        info!("🔑 Obtained Yahoo session crumb");
        Ok(crumb.to_string())
    }

    async fn quote_summary(&self, url: &Url) -> Result<Value> {
        let crumb = self.crumb().await?;
        let query = [
            ("modules", "price,summaryProfile".to_string()),
            ("crumb", crumb),
        ];
        self.make_request(url.clone(), &query).await
    }
}

fn is_unauthorized(error: &anyhow::Error) -> bool {
    matches!(
        error.downcast_ref::<StatusError>(),
        Some(StatusError { status, .. }) if *status == StatusCode::UNAUTHORIZED
    )
}

/// Yahoo spells share classes with a dash (BRK-B, not BRK.B)
pub fn yahoo_symbol(symbol: &str) -> String {
    symbol.replace('.', "-")
}

#[async_trait::async_trait]
impl MarketDataProvider for YahooClient {
    async fn get_daily_closes(
        &self,
        symbols: &[String],
        lookback_days: u32,
    ) -> Result<HashMap<String, Vec<f64>>> {
        if symbols.is_empty() {
            return Ok(HashMap::new());
        }

        let requested: Vec<String> = symbols.iter().map(|s| yahoo_symbol(s)).collect();
        let url = self.endpoint(&["v7", "finance", "spark"])?;
        let query = [
            ("symbols", requested.join(",")),
            ("range", format!("{}d", lookback_days)),
            ("interval", "1d".to_string()),
        ];

        let data = self.make_request(url, &query).await?;
        let by_yahoo_symbol = parse_spark(&data)?;

        // Re-key by the caller's spelling
        let closes: HashMap<String, Vec<f64>> = symbols
            .iter()
            .zip(requested.iter())
            .filter_map(|(original, yahoo)| {
                by_yahoo_symbol
                    .get(yahoo)
                    .map(|closes| (original.clone(), closes.clone()))
            })
            .collect();

        debug!("Retrieved closes for {} of {} symbols", closes.len(), symbols.len());
        Ok(closes)
    }

    async fn get_quote(&self, symbol: &str) -> Result<QuoteSnapshot> {
        let requested = yahoo_symbol(symbol);
        let url = self.endpoint(&["v10", "finance", "quoteSummary", requested.as_str()])?;
        let data = match self.quote_summary(&url).await {
            Err(e) if is_unauthorized(&e) => {
                // Crumb expired with its cookie, take a fresh pair once
                warn!("⚠️ Yahoo rejected the crumb, refreshing session");
                *self.crumb.lock().await = None;
                self.quote_summary(&url).await?
            }
            result => result?,
        };
        parse_quote_summary(symbol, &data)
    }

    async fn get_price_history(&self, symbol: &str, lookback_days: u32) -> Result<Vec<PriceBar>> {
        let requested = yahoo_symbol(symbol);
        let url = self.endpoint(&["v8", "finance", "chart", requested.as_str()])?;
        let query = [
            ("range", format!("{}d", lookback_days)),
            ("interval", "1d".to_string()),
        ];

        let data = self.make_request(url, &query).await?;
        let bars = parse_chart(&data)?;

        debug!("Retrieved {} price bars for {}", bars.len(), symbol);
        Ok(bars)
    }
}

/// Extract the first entry of a Yahoo `{ result: [...], error: ... }` envelope
fn first_result<'a>(data: &'a Value, root: &str) -> Result<&'a Value> {
    let envelope = data
        .get(root)
        .ok_or_else(|| anyhow!("Response is missing the '{}' object", root))?;

    if let Some(error) = envelope.get("error").filter(|e| !e.is_null()) {
        let description = error
            .get("description")
            .and_then(|d| d.as_str())
            .unwrap_or("unknown error");
        return Err(anyhow!("Provider error: {}", description));
    }

    envelope
        .get("result")
        .and_then(|r| r.as_array())
        .and_then(|r| r.first())
        .ok_or_else(|| anyhow!("Response has no '{}' result", root))
}

fn number_array(value: Option<&Value>) -> Vec<Option<f64>> {
    value
        .and_then(|v| v.as_array())
        .map(|values| values.iter().map(|v| v.as_f64()).collect())
        .unwrap_or_default()
}

fn raw_number(value: Option<&Value>) -> Option<f64> {
    // quoteSummary wraps numbers as {"raw": 1.0, "fmt": "1.00"}
    value.and_then(|v| v.get("raw").and_then(|r| r.as_f64()).or_else(|| v.as_f64()))
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Parse a spark response into closes per symbol, null closes dropped
pub fn parse_spark(data: &Value) -> Result<HashMap<String, Vec<f64>>> {
    let results = data
        .get("spark")
        .and_then(|s| s.get("result"))
        .and_then(|r| r.as_array())
        .ok_or_else(|| anyhow!("Spark response has no result list"))?;

    let mut closes = HashMap::new();
    for entry in results {
        let Some(symbol) = entry.get("symbol").and_then(|s| s.as_str()) else {
            continue;
        };
        let series = entry
            .get("response")
            .and_then(|r| r.as_array())
            .and_then(|r| r.first())
            .and_then(|r| r.get("indicators"))
            .and_then(|i| i.get("quote"))
            .and_then(|q| q.as_array())
            .and_then(|q| q.first())
            .map(|q| number_array(q.get("close")))
            .unwrap_or_default();

        closes.insert(symbol.to_string(), series.into_iter().flatten().collect());
    }

    Ok(closes)
}

/// Parse a chart response into complete OHLC bars, oldest first
pub fn parse_chart(data: &Value) -> Result<Vec<PriceBar>> {
    let result = first_result(data, "chart")?;

    let timestamps: Vec<i64> = result
        .get("timestamp")
        .and_then(|t| t.as_array())
        .map(|t| t.iter().map(|v| v.as_i64().unwrap_or(0)).collect())
        .unwrap_or_default();

    let quote = result
        .get("indicators")
        .and_then(|i| i.get("quote"))
        .and_then(|q| q.as_array())
        .and_then(|q| q.first());

    let Some(quote) = quote else {
        return Ok(Vec::new());
    };

    let opens = number_array(quote.get("open"));
    let highs = number_array(quote.get("high"));
    let lows = number_array(quote.get("low"));
    let closes = number_array(quote.get("close"));

    let bars = timestamps
        .iter()
        .enumerate()
        .filter_map(|(i, &timestamp)| {
            Some(PriceBar {
                timestamp,
                open: (*opens.get(i)?)?,
                high: (*highs.get(i)?)?,
                low: (*lows.get(i)?)?,
                close: (*closes.get(i)?)?,
            })
        })
        .collect();

    Ok(bars)
}

/// Parse a quoteSummary response with the `price` and `summaryProfile` modules
pub fn parse_quote_summary(symbol: &str, data: &Value) -> Result<QuoteSnapshot> {
    let result = first_result(data, "quoteSummary")?;
    let price = result.get("price");
    let profile = result.get("summaryProfile");

    Ok(QuoteSnapshot {
        symbol: symbol.to_string(),
        last_price: raw_number(price.and_then(|p| p.get("regularMarketPrice"))),
        previous_close: raw_number(price.and_then(|p| p.get("regularMarketPreviousClose"))),
        market_cap: raw_number(price.and_then(|p| p.get("marketCap"))),
        sector: non_empty_str(profile.and_then(|p| p.get("sector"))),
        industry: non_empty_str(profile.and_then(|p| p.get("industry"))),
    })
}

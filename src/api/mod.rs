use anyhow::Result;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::collections::HashMap;
use std::num::NonZeroU32;

use crate::models::{PriceBar, QuoteSnapshot};

pub mod roster;
pub mod yahoo_client;
pub use roster::{GithubRosterSource, RosterSource};
pub use yahoo_client::YahooClient;

/// Request pacing shared by the HTTP clients
pub struct ApiRateLimiter {
    limiter: Option<DefaultDirectRateLimiter>,
}

impl ApiRateLimiter {
    /// `0` disables pacing
    pub fn new(requests_per_minute: u32) -> Self {
        let limiter = NonZeroU32::new(requests_per_minute)
            .map(|rpm| RateLimiter::direct(Quota::per_minute(rpm)));

        Self { limiter }
    }

    pub async fn wait(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}

/// Source of end-of-day prices and quote metadata
#[async_trait::async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Daily closes for several symbols in one request, keyed by the requested
    /// symbol. Symbols the provider could not resolve are absent from the map.
    async fn get_daily_closes(
        &self,
        symbols: &[String],
        lookback_days: u32,
    ) -> Result<HashMap<String, Vec<f64>>>;

    /// Current quote metadata for one symbol
    async fn get_quote(&self, symbol: &str) -> Result<QuoteSnapshot>;

    /// Daily OHLC bars covering the last `lookback_days` calendar days, oldest first
    async fn get_price_history(&self, symbol: &str, lookback_days: u32) -> Result<Vec<PriceBar>>;
}

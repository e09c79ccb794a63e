//! Builds the universe table: roster plus extras, one quote and one history
//! lookup per symbol, processed sequentially.

use anyhow::Result;
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info};

use crate::analysis::{adr_percent, average_daily_range, percent_change, ADR_PERIOD};
use crate::api::{MarketDataProvider, RosterSource};
use crate::models::{PriceBar, QuoteSnapshot, StockRecord, NOT_AVAILABLE};
use crate::utils::round2;

/// Calendar days of daily history requested per symbol
pub const HISTORY_LOOKBACK_DAYS: u32 = 15;

/// Why a symbol was left out of the universe
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("insufficient history: {bars} bars, need {required}")]
    InsufficientHistory { bars: usize, required: usize },

    #[error("quote is missing {0}")]
    MissingField(&'static str),

    #[error("previous close is zero")]
    ZeroPreviousClose,

    #[error("provider error: {0}")]
    Provider(#[from] anyhow::Error),
}

/// Per-symbol result of a universe lookup
#[derive(Debug)]
pub enum LookupOutcome {
    Loaded(StockRecord),
    Skipped(SkippedSymbol),
}

#[derive(Debug)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub reason: LookupError,
}

/// Universe table plus the symbols that could not be loaded
#[derive(Debug, Default)]
pub struct Universe {
    pub records: Vec<StockRecord>,
    pub skipped: Vec<SkippedSymbol>,
}

impl Universe {
    pub fn skipped_symbols(&self) -> Vec<&str> {
        self.skipped.iter().map(|s| s.symbol.as_str()).collect()
    }
}

/// Union of roster and extra symbols, deduplicated. Order is unspecified.
pub fn candidate_symbols(roster: &[String], extras: &[String]) -> Vec<String> {
    let unique: HashSet<String> = roster
        .iter()
        .chain(extras.iter())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    unique.into_iter().collect()
}

/// Derive a stock record from its quote and recent history
pub fn build_record(quote: &QuoteSnapshot, bars: &[PriceBar]) -> Result<StockRecord, LookupError> {
    if bars.len() < ADR_PERIOD {
        return Err(LookupError::InsufficientHistory {
            bars: bars.len(),
            required: ADR_PERIOD,
        });
    }

    let price = quote.last_price.ok_or(LookupError::MissingField("last price"))?;
    let prev_close = quote
        .previous_close
        .ok_or(LookupError::MissingField("previous close"))?;

    let change_pct = percent_change(price, prev_close).ok_or(LookupError::ZeroPreviousClose)?;

    let average_range = average_daily_range(bars, ADR_PERIOD).ok_or(LookupError::InsufficientHistory {
        bars: bars.len(),
        required: ADR_PERIOD,
    })?;

    Ok(StockRecord {
        ticker: quote.symbol.clone(),
        price: round2(price),
        prev_close: round2(prev_close),
        change_pct,
        adr_pct: adr_percent(average_range, price),
        market_cap: quote.market_cap,
        sector: quote.sector.clone().unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        industry: quote.industry.clone().unwrap_or_else(|| NOT_AVAILABLE.to_string()),
    })
}

async fn lookup_symbol(provider: &dyn MarketDataProvider, symbol: &str) -> Result<StockRecord, LookupError> {
    let mut quote = provider.get_quote(symbol).await?;
    quote.symbol = symbol.to_string();
    let bars = provider.get_price_history(symbol, HISTORY_LOOKBACK_DAYS).await?;
    build_record(&quote, &bars)
}

/// Look up one symbol. Errors never escape; they become a skip.
pub async fn load_symbol(provider: &dyn MarketDataProvider, symbol: &str) -> LookupOutcome {
    match lookup_symbol(provider, symbol).await {
        Ok(record) => LookupOutcome::Loaded(record),
        Err(reason) => {
            debug!("⚪ Skipping {}: {}", symbol, reason);
            LookupOutcome::Skipped(SkippedSymbol {
                symbol: symbol.to_string(),
                reason,
            })
        }
    }
}

/// Load every candidate symbol one at a time
pub async fn load_universe_from_symbols(provider: &dyn MarketDataProvider, symbols: &[String]) -> Universe {
    let total = symbols.len();
    info!("📊 Loading {} symbols...", total);

    let mut universe = Universe::default();

    for (index, symbol) in symbols.iter().enumerate() {
        match load_symbol(provider, symbol).await {
            LookupOutcome::Loaded(record) => universe.records.push(record),
            LookupOutcome::Skipped(skipped) => universe.skipped.push(skipped),
        }

        let processed = index + 1;
        if processed % 50 == 0 {
            info!(
                "📊 Progress: {}/{} symbols processed, {} loaded, {} skipped",
                processed,
                total,
                universe.records.len(),
                universe.skipped.len()
            );
        }
    }

    info!(
        "✅ Universe loaded: {} records, {} skipped",
        universe.records.len(),
        universe.skipped.len()
    );

    universe
}

/// Fetch the roster, union it with the extras and load every symbol.
///
/// A roster failure is fatal; per-symbol failures are collected as skips.
pub async fn load_universe(
    roster: &dyn RosterSource,
    provider: &dyn MarketDataProvider,
    extra_symbols: &[String],
) -> Result<Universe> {
    let constituents = roster.get_constituents().await?;
    let symbols = candidate_symbols(&constituents, extra_symbols);

    let universe = load_universe_from_symbols(provider, &symbols).await;

    if !universe.skipped.is_empty() {
        println!("Skipped tickers (data issues): {}", universe.skipped_symbols().join(","));
    }

    Ok(universe)
}

//! Day-over-day moves for the broad market indicators

use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use crate::analysis::percent_change;
use crate::api::MarketDataProvider;
use crate::models::IndicatorSnapshot;

/// Calendar days requested so a weekend still leaves two sessions
pub const INDICATOR_LOOKBACK_DAYS: u32 = 5;

/// Normalized key for an indicator symbol (`^VIX` -> `VIX`)
pub fn indicator_key(symbol: &str) -> String {
    symbol.trim_matches('^').to_string()
}

/// Percent move between the last two closes
pub fn indicator_move(closes: &[f64]) -> Option<f64> {
    match closes {
        [.., previous, last] => percent_change(*last, *previous),
        _ => None,
    }
}

/// Build the snapshot from batched closes. Every symbol gets a key, missing
/// or uncomputable ones map to `None`. When two symbols share a key the first
/// one is kept.
pub fn build_snapshot(symbols: &[String], closes: &HashMap<String, Vec<f64>>) -> IndicatorSnapshot {
    let mut seen = HashSet::new();

    symbols
        .iter()
        .filter_map(|symbol| {
            let key = indicator_key(symbol);
            if !seen.insert(key.clone()) {
                warn!("⚠️ Market symbol {} duplicates indicator key {}, ignoring it", symbol, key);
                return None;
            }

            let value = closes.get(symbol).and_then(|series| indicator_move(series));
            if value.is_none() {
                debug!("No indicator move for {}", symbol);
            }
            Some((key, value))
        })
        .collect()
}

/// Fetch all indicator closes in one call and compute the moves
pub async fn fetch_market_indicators(
    provider: &dyn MarketDataProvider,
    symbols: &[String],
) -> IndicatorSnapshot {
    match provider.get_daily_closes(symbols, INDICATOR_LOOKBACK_DAYS).await {
        Ok(closes) => build_snapshot(symbols, &closes),
        Err(e) => {
            warn!("⚠️ Market indicator download failed: {}", e);
            build_snapshot(symbols, &HashMap::new())
        }
    }
}

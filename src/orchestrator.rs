//! One end-of-day screening run, start to finish

use anyhow::Result;
use chrono::NaiveDate;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::analysis::{apply_filters, FilteredTable};
use crate::api::{MarketDataProvider, RosterSource};
use crate::market_indicators::{fetch_market_indicators, indicator_key};
use crate::models::{Config, IndicatorSnapshot};
use crate::notifier::{build_summary, deliver, DeliveryStatus, Notifier};
use crate::report::write_report;
use crate::universe_loader::load_universe;

/// What a completed run produced
#[derive(Debug)]
pub struct RunSummary {
    pub indicators: IndicatorSnapshot,
    pub filtered: FilteredTable,
    pub universe_size: usize,
    pub skipped: Vec<String>,
    pub report_path: PathBuf,
    /// `None` when notifications are not configured
    pub delivery: Option<DeliveryStatus>,
}

/// Sequences indicators, universe, filters, report and delivery
pub struct Orchestrator<'a> {
    config: &'a Config,
    provider: &'a dyn MarketDataProvider,
    roster: &'a dyn RosterSource,
    notifier: Option<&'a dyn Notifier>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        config: &'a Config,
        provider: &'a dyn MarketDataProvider,
        roster: &'a dyn RosterSource,
        notifier: Option<&'a dyn Notifier>,
    ) -> Self {
        Self {
            config,
            provider,
            roster,
            notifier,
        }
    }

    /// Run once for `date`. Roster and report failures are returned; everything
    /// else degrades in place.
    pub async fn run(&self, date: NaiveDate) -> Result<RunSummary> {
        info!("🚀 Starting screening run for {}", date);

        let indicators = fetch_market_indicators(self.provider, &self.config.market_symbols).await;
        println!("Market moves: {}", indicators);

        let benchmark_key = indicator_key(&self.config.benchmark_key);
        if !indicators.contains_key(&benchmark_key) {
            warn!(
                "⚠️ Benchmark key {} is not among the market symbols, relative filter disabled",
                benchmark_key
            );
        }
        let benchmark = indicators.get(&benchmark_key);

        let universe = load_universe(self.roster, self.provider, &self.config.extra_symbols).await?;
        if universe.records.is_empty() && !universe.skipped.is_empty() {
            warn!(
                "⚠️ All {} symbol lookups failed, the report will be empty. Check market data access",
                universe.skipped.len()
            );
        }

        let filtered = apply_filters(&universe.records, benchmark, &self.config.thresholds);
        info!(
            "🔍 {} of {} stocks passed all filters (benchmark move: {:?})",
            filtered.len(),
            universe.records.len(),
            benchmark
        );

        let report_path = write_report(&filtered, &indicators, &self.config.output_dir, date)?;

        let delivery = match self.notifier {
            Some(notifier) => {
                let summary = build_summary(&indicators, &filtered);
                Some(deliver(notifier, &summary, &report_path).await)
            }
            None => {
                warn!("⚠️ Telegram credentials not configured, skipping notification");
                None
            }
        };

        println!("✅ All done!");

        Ok(RunSummary {
            universe_size: universe.records.len(),
            skipped: universe.skipped.iter().map(|s| s.symbol.clone()).collect(),
            indicators,
            filtered,
            report_path,
            delivery,
        })
    }
}

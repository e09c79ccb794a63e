//! Threshold and market-relative filtering of the universe table

use crate::models::{FilterThresholds, StockRecord};

/// Universe rows that passed every filter, strongest move first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilteredTable {
    rows: Vec<StockRecord>,
}

impl FilteredTable {
    pub fn rows(&self) -> &[StockRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First `n` rows (fewer if the table is shorter)
    pub fn top(&self, n: usize) -> &[StockRecord] {
        &self.rows[..n.min(self.rows.len())]
    }
}

/// Base thresholds: all three must hold. A missing market cap never passes.
pub fn passes_thresholds(record: &StockRecord, thresholds: &FilterThresholds) -> bool {
    let cap_ok = record
        .market_cap
        .map(|cap| cap > thresholds.min_market_cap)
        .unwrap_or(false);

    cap_ok && record.price > thresholds.min_price && record.adr_pct > thresholds.min_adr_pct
}

/// Relative comparison against the benchmark move.
///
/// Up days keep stocks that beat the benchmark, down days keep stocks that fell
/// harder. An absent or zero benchmark lets every row through.
pub fn beats_benchmark(record: &StockRecord, benchmark: Option<f64>) -> bool {
    match benchmark {
        Some(b) if b > 0.0 => record.change_pct > b,
        Some(b) if b < 0.0 => record.change_pct < b,
        _ => true,
    }
}

/// Run the full pipeline: thresholds, benchmark comparison, then sort by
/// percent change descending. The input is left untouched.
pub fn apply_filters(
    universe: &[StockRecord],
    benchmark: Option<f64>,
    thresholds: &FilterThresholds,
) -> FilteredTable {
    let mut rows: Vec<StockRecord> = universe
        .iter()
        .filter(|record| passes_thresholds(record, thresholds))
        .filter(|record| beats_benchmark(record, benchmark))
        .cloned()
        .collect();

    rows.sort_by(|a, b| b.change_pct.total_cmp(&a.change_pct));

    FilteredTable { rows }
}

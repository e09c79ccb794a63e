use crate::models::PriceBar;
use crate::utils::round2;

/// Number of trailing bars in the average daily range window
pub const ADR_PERIOD: usize = 14;

/// Percentage change from `previous` to `current`, rounded to 2 decimals.
///
/// Returns `None` when `previous` is zero or the result is not finite.
pub fn percent_change(current: f64, previous: f64) -> Option<f64> {
    if previous == 0.0 {
        return None;
    }
    let change = (current - previous) / previous * 100.0;
    change.is_finite().then(|| round2(change))
}

/// Mean of `high - low` over the last `period` bars.
///
/// Only the final point of the rolling window is computed; `None` when fewer
/// than `period` bars are available.
pub fn average_daily_range(bars: &[PriceBar], period: usize) -> Option<f64> {
    if period == 0 || bars.len() < period {
        return None;
    }
    let window = &bars[bars.len() - period..];
    let total: f64 = window.iter().map(|bar| bar.high - bar.low).sum();
    Some(total / period as f64)
}

/// Average daily range as a percentage of price, rounded to 2 decimals.
/// A zero price yields 0.
pub fn adr_percent(average_range: f64, price: f64) -> f64 {
    if price == 0.0 || !price.is_finite() {
        return 0.0;
    }
    let pct = average_range / price * 100.0;
    if pct.is_finite() {
        round2(pct)
    } else {
        0.0
    }
}

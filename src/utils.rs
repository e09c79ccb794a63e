use chrono::NaiveDate;

/// Round to two decimal places, ties to even (0.125 -> 0.12, 0.375 -> 0.38)
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// Today's date on the local calendar
pub fn today_local() -> NaiveDate {
    chrono::Local::now().date_naive()
}

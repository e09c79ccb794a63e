//! Spreadsheet report: a market summary sheet and the filtered stock list.
//!
//! The cell layout is built first as a plain [`SheetModel`] so it can be checked
//! without decoding the xlsx file; [`write_report`] then encodes it.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rust_xlsxwriter::{Format, Workbook};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::analysis::FilteredTable;
use crate::models::IndicatorSnapshot;

pub const MARKET_SUMMARY_SHEET: &str = "Market Summary";
pub const FILTERED_STOCKS_SHEET: &str = "Filtered Stocks";

/// Excel built-in number format 10
pub const PERCENT_FORMAT: &str = "0.00%";

pub const FILTERED_COLUMNS: [&str; 8] = [
    "Ticker",
    "Price",
    "Prev Close",
    "% Change",
    "ADR%",
    "Market Cap",
    "Sector",
    "Industry",
];

/// A single cell of the report
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    /// Number displayed with [`PERCENT_FORMAT`]
    Percent(f64),
    Empty,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Number(n) | CellValue::Percent(n) => write!(f, "{}", n),
            CellValue::Empty => Ok(()),
        }
    }
}

impl From<Option<f64>> for CellValue {
    fn from(value: Option<f64>) -> Self {
        value.map(CellValue::Number).unwrap_or(CellValue::Empty)
    }
}

/// Named grid of cells, row-major
#[derive(Debug, Clone, PartialEq)]
pub struct SheetModel {
    pub name: String,
    pub rows: Vec<Vec<CellValue>>,
}

/// Abbreviate a market cap: T / B / M with two decimals, raw below a million
pub fn format_market_cap(value: f64) -> CellValue {
    if value >= 1_000_000_000_000.0 {
        CellValue::Text(format!("{:.2}T", value / 1e12))
    } else if value >= 1_000_000_000.0 {
        CellValue::Text(format!("{:.2}B", value / 1e9))
    } else if value >= 1_000_000.0 {
        CellValue::Text(format!("{:.2}M", value / 1e6))
    } else {
        CellValue::Number(value)
    }
}

/// File name for a given run date
pub fn report_file_name(date: NaiveDate) -> String {
    format!("filtered_stocks_{}.xlsx", date.format("%Y-%m-%d"))
}

pub fn market_summary_sheet(indicators: &IndicatorSnapshot) -> SheetModel {
    let header = indicators
        .keys()
        .map(|key| CellValue::Text(key.to_string()))
        .collect();
    let values = indicators.iter().map(|(_, value)| CellValue::from(value)).collect();

    SheetModel {
        name: MARKET_SUMMARY_SHEET.to_string(),
        rows: vec![header, values],
    }
}

pub fn filtered_stocks_sheet(filtered: &FilteredTable) -> SheetModel {
    let mut rows = Vec::with_capacity(filtered.len() + 1);
    rows.push(
        FILTERED_COLUMNS
            .iter()
            .map(|name| CellValue::Text(name.to_string()))
            .collect(),
    );

    for record in filtered.rows() {
        rows.push(vec![
            CellValue::Text(record.ticker.clone()),
            CellValue::Number(record.price),
            CellValue::Number(record.prev_close),
            CellValue::Percent(record.change_pct),
            CellValue::Percent(record.adr_pct),
            record.market_cap.map(format_market_cap).unwrap_or(CellValue::Empty),
            CellValue::Text(record.sector.clone()),
            CellValue::Text(record.industry.clone()),
        ]);
    }

    SheetModel {
        name: FILTERED_STOCKS_SHEET.to_string(),
        rows,
    }
}

/// Both sheets, in workbook order
pub fn build_report(filtered: &FilteredTable, indicators: &IndicatorSnapshot) -> Vec<SheetModel> {
    vec![market_summary_sheet(indicators), filtered_stocks_sheet(filtered)]
}

/// Encode sheets into an xlsx file at `path`, replacing any existing file
pub fn save_workbook(sheets: &[SheetModel], path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let percent = Format::new().set_num_format(PERCENT_FORMAT);

    for sheet in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&sheet.name)?;

        for (r, row) in sheet.rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                let (r, c) = (r as u32, c as u16);
                match cell {
                    CellValue::Text(s) => {
                        worksheet.write_string(r, c, s)?;
                    }
                    CellValue::Number(n) => {
                        worksheet.write_number(r, c, *n)?;
                    }
                    CellValue::Percent(n) => {
                        worksheet.write_number_with_format(r, c, *n, &percent)?;
                    }
                    CellValue::Empty => {}
                }
            }
        }
    }

    workbook
        .save(path)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;
    Ok(())
}

/// Write the dated report into `output_dir` and return its path
pub fn write_report(
    filtered: &FilteredTable,
    indicators: &IndicatorSnapshot,
    output_dir: &Path,
    date: NaiveDate,
) -> Result<PathBuf> {
    let path = output_dir.join(report_file_name(date));
    let sheets = build_report(filtered, indicators);

    save_workbook(&sheets, &path)?;

    info!("💾 Report written to {}", path.display());
    Ok(path)
}

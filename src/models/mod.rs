use indexmap::IndexMap;
use std::fmt;
use std::path::PathBuf;

/// Placeholder for sector/industry when the quote does not carry one
pub const NOT_AVAILABLE: &str = "N/A";

/// Day-over-day percentage moves for the market indicators, in configured order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorSnapshot {
    moves: IndexMap<String, Option<f64>>,
}

impl IndicatorSnapshot {
    /// Move for a normalized key, `None` when missing or not computable
    pub fn get(&self, key: &str) -> Option<f64> {
        self.moves.get(key).copied().flatten()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.moves.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<f64>)> {
        self.moves.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.moves.keys().map(|k| k.as_str())
    }
}

impl FromIterator<(String, Option<f64>)> for IndicatorSnapshot {
    fn from_iter<I: IntoIterator<Item = (String, Option<f64>)>>(iter: I) -> Self {
        Self {
            moves: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for IndicatorSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (key, value)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match value {
                Some(v) => write!(f, "{}: {}", key, v)?,
                None => write!(f, "{}: None", key)?,
            }
        }
        write!(f, "}}")
    }
}

/// Daily OHLC bar
#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub timestamp: i64, // Unix timestamp (seconds)
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// Lightweight quote metadata for a single symbol
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuoteSnapshot {
    pub symbol: String,
    pub last_price: Option<f64>,
    pub previous_close: Option<f64>,
    pub market_cap: Option<f64>,
    pub sector: Option<String>,
    pub industry: Option<String>,
}

/// One row of the universe table
#[derive(Debug, Clone, PartialEq)]
pub struct StockRecord {
    pub ticker: String,
    pub price: f64,
    pub prev_close: f64,
    pub change_pct: f64,
    pub adr_pct: f64,
    pub market_cap: Option<f64>,
    pub sector: String,
    pub industry: String,
}

/// Threshold filters applied before the benchmark comparison
#[derive(Debug, Clone, PartialEq)]
pub struct FilterThresholds {
    pub min_market_cap: f64,
    pub min_price: f64,
    pub min_adr_pct: f64,
}

impl Default for FilterThresholds {
    fn default() -> Self {
        Self {
            min_market_cap: 300_000_000.0,
            min_price: 1.0,
            min_adr_pct: 3.0,
        }
    }
}

/// Telegram bot credentials
#[derive(Debug, Clone, PartialEq)]
pub struct TelegramConfig {
    pub token: String,
    pub chat_id: String,
}

pub const DEFAULT_MARKET_SYMBOLS: &[&str] = &["SPY", "^VIX", "^TNX"];
pub const DEFAULT_EXTRA_SYMBOLS: &[&str] = &["TSLA", "NVDA", "AMD", "SHOP", "PLTR", "BABA", "F", "GM"];
pub const DEFAULT_ROSTER_URL: &str =
    "https://raw.githubusercontent.com/datasets/s-and-p-500-companies/main/data/constituents.csv";
pub const DEFAULT_MARKET_DATA_BASE_URL: &str = "https://query1.finance.yahoo.com";
/// Host that hands out the session cookie the crumb is bound to
pub const DEFAULT_MARKET_DATA_COOKIE_URL: &str = "https://fc.yahoo.com";
pub const DEFAULT_TELEGRAM_API_BASE_URL: &str = "https://api.telegram.org";

/// Configuration for the application
#[derive(Debug, Clone)]
pub struct Config {
    pub telegram: Option<TelegramConfig>,
    pub thresholds: FilterThresholds,
    pub market_symbols: Vec<String>,
    pub benchmark_key: String,
    pub extra_symbols: Vec<String>,
    pub roster_url: String,
    pub market_data_base_url: String,
    pub market_data_cookie_url: String,
    pub telegram_api_base_url: String,
    pub output_dir: PathBuf,
    pub rate_limit_per_minute: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            telegram: None,
            thresholds: FilterThresholds::default(),
            market_symbols: to_strings(DEFAULT_MARKET_SYMBOLS),
            benchmark_key: "SPY".to_string(),
            extra_symbols: to_strings(DEFAULT_EXTRA_SYMBOLS),
            roster_url: DEFAULT_ROSTER_URL.to_string(),
            market_data_base_url: DEFAULT_MARKET_DATA_BASE_URL.to_string(),
            market_data_cookie_url: DEFAULT_MARKET_DATA_COOKIE_URL.to_string(),
            telegram_api_base_url: DEFAULT_TELEGRAM_API_BASE_URL.to_string(),
            output_dir: PathBuf::from("."),
            rate_limit_per_minute: 300,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_vars<F>(var: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let telegram = match (non_empty(var("TELEGRAM_TOKEN")), non_empty(var("TELEGRAM_CHAT_ID"))) {
            (Some(token), Some(chat_id)) => Some(TelegramConfig { token, chat_id }),
            (Some(_), None) => {
                return Err(anyhow::anyhow!(
                    "TELEGRAM_CHAT_ID environment variable required when TELEGRAM_TOKEN is set"
                ))
            }
            (None, Some(_)) => {
                return Err(anyhow::anyhow!(
                    "TELEGRAM_TOKEN environment variable required when TELEGRAM_CHAT_ID is set"
                ))
            }
            (None, None) => None,
        };

        let market_symbols = var("MARKET_SYMBOLS")
            .map(|v| split_list(&v))
            .unwrap_or(defaults.market_symbols);
        if market_symbols.is_empty() {
            return Err(anyhow::anyhow!("MARKET_SYMBOLS must name at least one symbol"));
        }

        Ok(Config {
            telegram,
            thresholds: FilterThresholds {
                min_market_cap: parse_or(var("MIN_MARKET_CAP"), defaults.thresholds.min_market_cap),
                min_price: parse_or(var("MIN_PRICE"), defaults.thresholds.min_price),
                min_adr_pct: parse_or(var("MIN_ADR_PCT"), defaults.thresholds.min_adr_pct),
            },
            market_symbols,
            benchmark_key: non_empty(var("BENCHMARK_KEY")).unwrap_or(defaults.benchmark_key),
            extra_symbols: var("EXTRA_SYMBOLS")
                .map(|v| split_list(&v))
                .unwrap_or(defaults.extra_symbols),
            roster_url: non_empty(var("ROSTER_URL")).unwrap_or(defaults.roster_url),
            market_data_base_url: non_empty(var("MARKET_DATA_BASE_URL"))
                .unwrap_or(defaults.market_data_base_url),
            market_data_cookie_url: non_empty(var("MARKET_DATA_COOKIE_URL"))
                .unwrap_or(defaults.market_data_cookie_url),
            telegram_api_base_url: non_empty(var("TELEGRAM_API_BASE_URL"))
                .unwrap_or(defaults.telegram_api_base_url),
            output_dir: non_empty(var("OUTPUT_DIR"))
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            rate_limit_per_minute: parse_or(var("RATE_LIMIT_PER_MINUTE"), defaults.rate_limit_per_minute),
        })
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

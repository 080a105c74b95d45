//! Configuration types and CLI options.
//!
//! Every option can also be set through the environment (or a `.env` file),
//! under the variable names listed with each option.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::constants::{
    DEFAULT_BLOCKED_ALERT_STREAK, DEFAULT_CATALOG_PATH, DEFAULT_CHECK_TIMEOUT_MS,
    DEFAULT_CONCURRENCY_LIMIT, DEFAULT_USER_AGENT,
};

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Command-line options.
///
/// Raw, unvalidated input. `MonitorConfig::from_opt` turns it into the
/// configuration the monitor runs with.
///
/// # Examples
///
/// ```bash
/// # Watch two stores with their own delays, re-announce every 10 minutes
/// STORES=bestbuy:8000:15000,newegg RENOTIFY_INTERVAL=600 stock_watch catalog.json
///
/// # Only RTX 3080s below 800
/// stock_watch catalog.json --renotify-interval 0 \
///     --show-only-series 3080 --max-price-series 3080:800
/// ```
#[derive(Debug, Parser)]
#[command(
    name = "stock_watch",
    about = "Polls product pages and notifies when they come back in stock."
)]
pub struct Opt {
    /// Catalog file (targets, links and notification channels)
    #[arg(value_parser, env = "CATALOG_FILE", default_value = DEFAULT_CATALOG_PATH)]
    pub catalog: PathBuf,

    /// Log level: error|warn|info|debug|trace
    #[arg(long, value_enum, env = "LOG_LEVEL", default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Log format: plain|json
    #[arg(long, value_enum, env = "LOG_FORMAT", default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    /// Targets to monitor, as `name[:min_delay_ms[:max_delay_ms]]`.
    /// Empty means every target in the catalog.
    #[arg(long, env = "STORES", value_delimiter = ',')]
    pub stores: Vec<String>,

    /// Lower bound of the delay between checks, in milliseconds
    #[arg(long, env = "PAGE_SLEEP_MIN")]
    pub page_sleep_min: Option<u64>,

    /// Upper bound of the delay between checks, in milliseconds
    #[arg(long, env = "PAGE_SLEEP_MAX")]
    pub page_sleep_max: Option<u64>,

    /// First backoff after a failure, in milliseconds
    #[arg(long, env = "PAGE_BACKOFF_MIN")]
    pub page_backoff_min: Option<u64>,

    /// Backoff ceiling, in milliseconds
    #[arg(long, env = "PAGE_BACKOFF_MAX")]
    pub page_backoff_max: Option<u64>,

    /// Maximum duration of one check, in milliseconds
    #[arg(long, env = "PAGE_TIMEOUT", default_value_t = DEFAULT_CHECK_TIMEOUT_MS)]
    pub page_timeout: u64,

    /// Concurrent checks allowed per target
    #[arg(long, env = "CONCURRENCY_LIMIT", default_value_t = DEFAULT_CONCURRENCY_LIMIT)]
    pub concurrency_limit: usize,

    /// Brands to alert on. Empty means all brands.
    #[arg(long, env = "SHOW_ONLY_BRANDS", value_delimiter = ',')]
    pub show_only_brands: Vec<String>,

    /// Series to alert on. Empty means all series.
    #[arg(long, env = "SHOW_ONLY_SERIES", value_delimiter = ',')]
    pub show_only_series: Vec<String>,

    /// Models to alert on, as `name[:series]`. Empty means all models.
    #[arg(long, env = "SHOW_ONLY_MODELS", value_delimiter = ',')]
    pub show_only_models: Vec<String>,

    /// Price ceilings per series, as `series:amount`
    #[arg(long, env = "MAX_PRICE_SERIES", value_delimiter = ',')]
    pub max_price_series: Vec<String>,

    /// Seconds between repeated alerts for a link that stays in stock.
    /// 0 disables re-notification.
    #[arg(long, env = "RENOTIFY_INTERVAL")]
    pub renotify_interval: u64,

    /// Consecutive blocked checks on one link before the operator is alerted
    #[arg(long, env = "BLOCKED_ALERT_STREAK", default_value_t = DEFAULT_BLOCKED_ALERT_STREAK)]
    pub blocked_alert_streak: u32,

    /// Stop polling a link after this many consecutive CAPTCHA pages
    #[arg(long, env = "CAPTCHA_DISABLE_AFTER")]
    pub captcha_disable_after: Option<u32>,

    /// Log a line when a link that was in stock goes out of stock
    #[arg(long, env = "RESTOCK_ENDED_LOG")]
    pub restock_ended_log: bool,

    /// Directory holding `<target>.proxies` and `global.proxies`
    #[arg(long, env = "PROXY_DIR", default_value = ".")]
    pub proxy_dir: PathBuf,

    /// HTTP User-Agent header value for product page requests
    #[arg(long, env = "USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,
}

//! Validated monitor configuration.
//!
//! `Opt` is merged with the defaults once at startup through the pure
//! functions below. Nothing downstream parses strings or reads the
//! environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::catalog::{FilterSet, ModelFilter, PriceCeilings};
use crate::config::constants::{
    DEFAULT_MAX_BACKOFF_MS, DEFAULT_MAX_DELAY_MS, DEFAULT_MIN_BACKOFF_MS, DEFAULT_MIN_DELAY_MS,
    GLOBAL_PROXY_LIST, PROXY_FILE_SUFFIX,
};
use crate::config::types::Opt;
use crate::error_handling::ConfigurationError;

/// Per-target timing policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingConfig {
    /// Lower bound of the randomized delay after a successful check
    pub min_delay: Duration,
    /// Upper bound of the randomized delay after a successful check
    pub max_delay: Duration,
    /// Backoff applied after the first failure
    pub min_backoff: Duration,
    /// Backoff ceiling
    pub max_backoff: Duration,
}

impl TimingConfig {
    /// Builds a timing policy from millisecond bounds, rejecting inverted pairs.
    pub fn from_millis(
        name: &str,
        min_delay_ms: u64,
        max_delay_ms: u64,
        min_backoff_ms: u64,
        max_backoff_ms: u64,
    ) -> Result<Self, ConfigurationError> {
        if min_delay_ms > max_delay_ms {
            return Err(ConfigurationError::InvalidRange {
                what: "delay",
                name: name.to_string(),
                min_ms: min_delay_ms,
                max_ms: max_delay_ms,
            });
        }
        if min_backoff_ms > max_backoff_ms {
            return Err(ConfigurationError::InvalidRange {
                what: "backoff",
                name: name.to_string(),
                min_ms: min_backoff_ms,
                max_ms: max_backoff_ms,
            });
        }
        Ok(TimingConfig {
            min_delay: Duration::from_millis(min_delay_ms),
            max_delay: Duration::from_millis(max_delay_ms),
            min_backoff: Duration::from_millis(min_backoff_ms),
            max_backoff: Duration::from_millis(max_backoff_ms),
        })
    }

    /// Same backoff, different delay window.
    pub fn with_delays(&self, min_delay: Duration, max_delay: Duration) -> Self {
        TimingConfig {
            min_delay,
            max_delay,
            ..*self
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig {
            min_delay: Duration::from_millis(DEFAULT_MIN_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
            min_backoff: Duration::from_millis(DEFAULT_MIN_BACKOFF_MS),
            max_backoff: Duration::from_millis(DEFAULT_MAX_BACKOFF_MS),
        }
    }
}

/// One entry of the `STORES` selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSelection {
    /// Lowercased target name
    pub name: String,
    /// Minimum delay override from `name:min:max`
    pub min_delay_ms: Option<u64>,
    /// Maximum delay override from `name:min:max`
    pub max_delay_ms: Option<u64>,
}

/// Everything the monitor needs, validated.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Catalog file to load targets and channels from
    pub catalog_path: PathBuf,
    /// Selected targets; empty selects every catalog target
    pub stores: Vec<StoreSelection>,
    /// Timing applied to targets without their own delay overrides
    pub default_timing: TimingConfig,
    /// Maximum duration of one check
    pub check_timeout: Duration,
    /// Concurrent checks per target
    pub concurrency_limit: usize,
    /// Brand/series/model allow-lists
    pub filters: FilterSet,
    /// Price ceiling per series
    pub price_ceilings: PriceCeilings,
    /// Cooldown between alerts for a link that stays available; `None` never re-notifies
    pub renotify_interval: Option<Duration>,
    /// Consecutive blocked checks before the operator is alerted
    pub blocked_alert_streak: u32,
    /// Consecutive CAPTCHA pages after which a link stops being polled
    pub captcha_disable_after: Option<u32>,
    /// Log a line when an in-stock streak ends
    pub restock_ended_log: bool,
    /// Directory holding proxy list files
    pub proxy_dir: PathBuf,
    /// User-Agent for product page requests
    pub user_agent: String,
}

impl MonitorConfig {
    /// Merges CLI/env options with defaults and validates the result.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` for malformed list entries, inverted
    /// ranges after repair, or out-of-domain values.
    pub fn from_opt(opt: &Opt) -> Result<Self, ConfigurationError> {
        let min_delay = resolve_min(opt.page_sleep_min, opt.page_sleep_max, DEFAULT_MIN_DELAY_MS);
        let max_delay = resolve_max(opt.page_sleep_min, opt.page_sleep_max, DEFAULT_MAX_DELAY_MS);
        let min_backoff = resolve_min(
            opt.page_backoff_min,
            opt.page_backoff_max,
            DEFAULT_MIN_BACKOFF_MS,
        );
        let max_backoff = resolve_max(
            opt.page_backoff_min,
            opt.page_backoff_max,
            DEFAULT_MAX_BACKOFF_MS,
        );
        let default_timing =
            TimingConfig::from_millis("default", min_delay, max_delay, min_backoff, max_backoff)?;

        if opt.concurrency_limit == 0 {
            return Err(ConfigurationError::InvalidValue {
                field: "CONCURRENCY_LIMIT",
                reason: "must be at least 1".to_string(),
            });
        }
        if opt.page_timeout == 0 {
            return Err(ConfigurationError::InvalidValue {
                field: "PAGE_TIMEOUT",
                reason: "must be greater than 0".to_string(),
            });
        }

        let stores = non_empty(&opt.stores)
            .map(parse_store_entry)
            .collect::<Result<Vec<_>, _>>()?;
        let models = non_empty(&opt.show_only_models)
            .map(parse_model_entry)
            .collect::<Result<Vec<_>, _>>()?;
        let ceilings = non_empty(&opt.max_price_series)
            .map(parse_price_entry)
            .collect::<Result<Vec<_>, _>>()?;

        let filters = FilterSet::new(
            non_empty(&opt.show_only_brands).map(str::to_string).collect(),
            non_empty(&opt.show_only_series).map(str::to_string).collect(),
            models,
        );

        Ok(MonitorConfig {
            catalog_path: opt.catalog.clone(),
            stores,
            default_timing,
            check_timeout: Duration::from_millis(opt.page_timeout),
            concurrency_limit: opt.concurrency_limit,
            filters,
            price_ceilings: PriceCeilings::from_entries(ceilings),
            renotify_interval: match opt.renotify_interval {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
            blocked_alert_streak: opt.blocked_alert_streak.max(1),
            captcha_disable_after: opt.captcha_disable_after.filter(|n| *n > 0),
            restock_ended_log: opt.restock_ended_log,
            proxy_dir: opt.proxy_dir.clone(),
            user_agent: opt.user_agent.clone(),
        })
    }

    /// Timing for one selected store: its own delay overrides repaired
    /// against the defaults, the default backoff otherwise.
    pub fn timing_for(&self, selection: &StoreSelection) -> Result<TimingConfig, ConfigurationError> {
        let defaults = self.default_timing;
        let min_ms = resolve_min(
            selection.min_delay_ms,
            selection.max_delay_ms,
            defaults.min_delay.as_millis() as u64,
        );
        let max_ms = resolve_max(
            selection.min_delay_ms,
            selection.max_delay_ms,
            defaults.max_delay.as_millis() as u64,
        );
        TimingConfig::from_millis(
            &selection.name,
            min_ms,
            max_ms,
            defaults.min_backoff.as_millis() as u64,
            defaults.max_backoff.as_millis() as u64,
        )
    }
}

fn non_empty(entries: &[String]) -> impl Iterator<Item = &str> {
    entries.iter().map(|s| s.trim()).filter(|s| !s.is_empty())
}

/// Lower bound of a min/max pair.
///
/// A swapped pair is reordered, and a lone max smaller than the default min
/// pulls the min down with it.
pub fn resolve_min(min: Option<u64>, max: Option<u64>, default_min: u64) -> u64 {
    match (min, max) {
        (Some(min), Some(max)) => min.min(max),
        (None, Some(max)) => max.min(default_min),
        (Some(min), None) => min,
        (None, None) => default_min,
    }
}

/// Upper bound of a min/max pair.
///
/// A swapped pair is reordered, and a lone min larger than the default max
/// pushes the max up with it.
pub fn resolve_max(min: Option<u64>, max: Option<u64>, default_max: u64) -> u64 {
    match (min, max) {
        (Some(min), Some(max)) => min.max(max),
        (Some(min), None) => min.max(default_max),
        (None, Some(max)) => max,
        (None, None) => default_max,
    }
}

/// Parses `name[:min_delay_ms[:max_delay_ms]]`.
pub fn parse_store_entry(entry: &str) -> Result<StoreSelection, ConfigurationError> {
    let mut parts = entry.split(':').map(str::trim);
    let name = parts.next().unwrap_or_default();
    if name.is_empty() {
        return Err(malformed("STORES", entry, "empty store name"));
    }

    let mut parse_ms = |label: &str| -> Result<Option<u64>, ConfigurationError> {
        match parts.next() {
            None | Some("") => Ok(None),
            Some(raw) => raw
                .parse::<u64>()
                .map(Some)
                .map_err(|e| malformed("STORES", entry, &format!("{label}: {e}"))),
        }
    };
    let min_delay_ms = parse_ms("min delay")?;
    let max_delay_ms = parse_ms("max delay")?;

    if parts.next().is_some() {
        return Err(malformed("STORES", entry, "too many ':' separated fields"));
    }

    Ok(StoreSelection {
        name: name.to_lowercase(),
        min_delay_ms,
        max_delay_ms,
    })
}

/// Parses `name[:series]`.
pub fn parse_model_entry(entry: &str) -> Result<ModelFilter, ConfigurationError> {
    let (name, series) = match entry.split_once(':') {
        Some((name, series)) => (name.trim(), Some(series.trim())),
        None => (entry.trim(), None),
    };
    if name.is_empty() {
        return Err(malformed("SHOW_ONLY_MODELS", entry, "empty model name"));
    }
    Ok(ModelFilter::new(name, series.filter(|s| !s.is_empty())))
}

/// Parses `series:amount`.
pub fn parse_price_entry(entry: &str) -> Result<(String, f64), ConfigurationError> {
    let Some((series, amount)) = entry.split_once(':') else {
        return Err(malformed("MAX_PRICE_SERIES", entry, "expected series:amount"));
    };
    let series = series.trim();
    if series.is_empty() {
        return Err(malformed("MAX_PRICE_SERIES", entry, "empty series"));
    }
    let amount: f64 = amount
        .trim()
        .parse()
        .map_err(|e| malformed("MAX_PRICE_SERIES", entry, &format!("{e}")))?;
    if !amount.is_finite() || amount < 0.0 {
        return Err(malformed(
            "MAX_PRICE_SERIES",
            entry,
            "amount must be a non-negative number",
        ));
    }
    Ok((series.to_string(), amount))
}

fn malformed(kind: &'static str, entry: &str, reason: &str) -> ConfigurationError {
    ConfigurationError::MalformedEntry {
        kind,
        entry: entry.to_string(),
        reason: reason.to_string(),
    }
}

/// Loads the proxy list for a target: `<dir>/<target>.proxies`, else
/// `<dir>/global.proxies`, else none.
pub fn load_proxy_list(dir: &Path, target: &str) -> Option<Vec<String>> {
    read_proxy_file(dir, target).or_else(|| read_proxy_file(dir, GLOBAL_PROXY_LIST))
}

fn read_proxy_file(dir: &Path, name: &str) -> Option<Vec<String>> {
    let path = dir.join(format!("{name}.{PROXY_FILE_SUFFIX}"));
    let contents = std::fs::read_to_string(&path).ok()?;
    let proxies: Vec<String> = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect();
    if proxies.is_empty() {
        None
    } else {
        log::debug!("Loaded {} proxies from {}", proxies.len(), path.display());
        Some(proxies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    fn opt(args: &[&str]) -> Opt {
        let mut full = vec!["stock_watch", "catalog.json", "--renotify-interval", "600"];
        full.extend_from_slice(args);
        Opt::try_parse_from(full).unwrap()
    }

    #[test]
    fn test_resolve_pair_defaults() {
        assert_eq!(resolve_min(None, None, 5000), 5000);
        assert_eq!(resolve_max(None, None, 10000), 10000);
    }

    #[test]
    fn test_resolve_pair_swapped() {
        assert_eq!(resolve_min(Some(9000), Some(3000), 5000), 3000);
        assert_eq!(resolve_max(Some(9000), Some(3000), 10000), 9000);
    }

    #[test]
    fn test_resolve_lone_min_above_default_max() {
        // min 20000 with default max 10000: max follows the min up
        assert_eq!(resolve_min(Some(20000), None, 5000), 20000);
        assert_eq!(resolve_max(Some(20000), None, 10000), 20000);
    }

    #[test]
    fn test_resolve_lone_max_below_default_min() {
        // max 2000 with default min 5000: min follows the max down
        assert_eq!(resolve_min(None, Some(2000), 5000), 2000);
        assert_eq!(resolve_max(None, Some(2000), 10000), 2000);
    }

    #[test]
    fn test_parse_store_entry() {
        let entry = parse_store_entry("BestBuy:8000:15000").unwrap();
        assert_eq!(entry.name, "bestbuy");
        assert_eq!(entry.min_delay_ms, Some(8000));
        assert_eq!(entry.max_delay_ms, Some(15000));

        let entry = parse_store_entry("newegg").unwrap();
        assert_eq!(entry.min_delay_ms, None);
        assert_eq!(entry.max_delay_ms, None);

        let entry = parse_store_entry("amazon::20000").unwrap();
        assert_eq!(entry.min_delay_ms, None);
        assert_eq!(entry.max_delay_ms, Some(20000));
    }

    #[test]
    fn test_parse_store_entry_malformed() {
        assert!(parse_store_entry(":5000").is_err());
        assert!(parse_store_entry("amazon:fast").is_err());
        assert!(parse_store_entry("amazon:1:2:3").is_err());
    }

    #[test]
    fn test_parse_model_entry() {
        let model = parse_model_entry("founders edition:3080").unwrap();
        assert_eq!(model, ModelFilter::new("founders edition", Some("3080")));

        let model = parse_model_entry("tuf").unwrap();
        assert_eq!(model, ModelFilter::new("tuf", None));

        assert!(parse_model_entry(":3080").is_err());
    }

    #[test]
    fn test_parse_price_entry() {
        assert_eq!(
            parse_price_entry("3080:799.99").unwrap(),
            ("3080".to_string(), 799.99)
        );
        assert!(parse_price_entry("3080").is_err());
        assert!(parse_price_entry("3080:cheap").is_err());
        assert!(parse_price_entry("3080:-1").is_err());
        assert!(parse_price_entry(":100").is_err());
    }

    #[test]
    fn test_from_opt_defaults() {
        let config = MonitorConfig::from_opt(&opt(&[])).unwrap();
        assert_eq!(config.default_timing, TimingConfig::default());
        assert_eq!(config.concurrency_limit, 1);
        assert_eq!(config.renotify_interval, Some(Duration::from_secs(600)));
        assert!(config.stores.is_empty());
        assert!(config.filters.is_unrestricted());
    }

    #[test]
    fn test_from_opt_zero_renotify_disables() {
        let opt = Opt::try_parse_from(["stock_watch", "c.json", "--renotify-interval", "0"]).unwrap();
        let config = MonitorConfig::from_opt(&opt).unwrap();
        assert_eq!(config.renotify_interval, None);
    }

    #[test]
    fn test_from_opt_rejects_zero_concurrency() {
        let result = MonitorConfig::from_opt(&opt(&["--concurrency-limit", "0"]));
        assert!(matches!(
            result,
            Err(ConfigurationError::InvalidValue { field: "CONCURRENCY_LIMIT", .. })
        ));
    }

    #[test]
    fn test_from_opt_rejects_malformed_model() {
        let result = MonitorConfig::from_opt(&opt(&["--show-only-models", ":3080"]));
        assert!(matches!(
            result,
            Err(ConfigurationError::MalformedEntry { kind: "SHOW_ONLY_MODELS", .. })
        ));
    }

    #[test]
    fn test_timing_for_store_override() {
        let config = MonitorConfig::from_opt(&opt(&[])).unwrap();
        let selection = parse_store_entry("bestbuy:20000").unwrap();
        let timing = config.timing_for(&selection).unwrap();
        assert_eq!(timing.min_delay, Duration::from_millis(20000));
        assert_eq!(timing.max_delay, Duration::from_millis(20000));
        assert_eq!(timing.min_backoff, config.default_timing.min_backoff);
    }

    #[test]
    fn test_timing_from_millis_rejects_inverted_backoff() {
        assert!(TimingConfig::from_millis("x", 1, 2, 10, 5).is_err());
        assert!(TimingConfig::from_millis("x", 3, 2, 1, 5).is_err());
    }

    #[test]
    fn test_load_proxy_list_prefers_target_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut global = std::fs::File::create(dir.path().join("global.proxies")).unwrap();
        writeln!(global, "http://global:8080").unwrap();
        let mut own = std::fs::File::create(dir.path().join("bestbuy.proxies")).unwrap();
        writeln!(own, "http://a:1\n\n  http://b:2  \n# comment").unwrap();

        assert_eq!(
            load_proxy_list(dir.path(), "bestbuy"),
            Some(vec!["http://a:1".to_string(), "http://b:2".to_string()])
        );
        assert_eq!(
            load_proxy_list(dir.path(), "newegg"),
            Some(vec!["http://global:8080".to_string()])
        );
    }

    #[test]
    fn test_load_proxy_list_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_proxy_list(dir.path(), "bestbuy"), None);
    }
}

//! Link catalog: every (target, product link) pair monitored during a run.
//!
//! A `Catalog` is built once from the catalog file and the validated
//! `MonitorConfig`, then handed to the supervisor. It holds no global state;
//! a reload builds a fresh `Catalog` and diffs it against the running one.

mod file;
mod filters;

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use url::Url;

use crate::config::{load_proxy_list, MonitorConfig, StoreSelection, TimingConfig, DEPRECATED_TARGETS};
use crate::error_handling::ConfigurationError;

pub use file::{CatalogFile, LinkSpec, PageLabel, SelectorLabels, TargetSpec};
pub use filters::{within_ceiling, FilterSet, ModelFilter, PriceCeilings};

/// One monitored product URL. Immutable after load.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    /// Name of the target the link belongs to
    pub target: String,
    /// Product brand
    pub brand: String,
    /// Product series
    pub series: String,
    /// Product model
    pub model: String,
    /// Product page URL
    pub url: String,
    /// Maximum acceptable price, from the series ceiling
    pub price_ceiling: Option<f64>,
}

impl Link {
    /// Identity of this link
    pub fn key(&self) -> LinkKey {
        LinkKey {
            target: self.target.clone(),
            url: self.url.clone(),
        }
    }

    /// `brand model (series)`, for log lines and messages.
    pub fn label(&self) -> String {
        format!("{} {} ({})", self.brand, self.model, self.series)
    }
}

/// Identity of a link across reloads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkKey {
    /// Target name
    pub target: String,
    /// Product page URL
    pub url: String,
}

impl std::fmt::Display for LinkKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.target, self.url)
    }
}

/// A retail site with its timing, concurrency and proxy policy.
#[derive(Debug, Clone)]
pub struct Target {
    /// Lowercased target name
    pub name: String,
    /// Pacing and backoff bounds
    pub timing: TimingConfig,
    /// Checks allowed in flight at once
    pub concurrency_limit: usize,
    /// Upper bound on a single check
    pub check_timeout: Duration,
    /// Proxies to rotate through, if any
    pub proxies: Option<Vec<String>>,
    /// Markers for the built-in selector adapter
    pub selectors: Option<SelectorLabels>,
    /// Links to monitor
    pub links: Vec<Arc<Link>>,
}

/// The set of targets selected for this run.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    targets: Vec<Target>,
}

impl Catalog {
    /// Builds the catalog from a parsed file, applying store selection,
    /// timing overrides, proxy lists and price ceilings.
    ///
    /// Timing layers, lowest precedence first: `MonitorConfig` defaults, the
    /// target's own catalog values, then the `STORES` entry for the target.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` for duplicate target names, invalid URLs,
    /// inverted timing ranges, or when no target remains selected.
    pub fn build(file: &CatalogFile, config: &MonitorConfig) -> Result<Self, ConfigurationError> {
        let mut seen = HashSet::new();
        for spec in &file.targets {
            if !seen.insert(spec.name.to_lowercase()) {
                return Err(ConfigurationError::DuplicateTarget(spec.name.clone()));
            }
        }

        for selection in &config.stores {
            if !seen.contains(&selection.name) {
                warn!("No store named {}, skipping.", selection.name);
            }
        }

        let mut targets = Vec::new();
        for spec in &file.targets {
            let name = spec.name.to_lowercase();
            let selection = if config.stores.is_empty() {
                None
            } else {
                match config.stores.iter().find(|s| s.name == name) {
                    Some(selection) => Some(selection),
                    None => continue,
                }
            };

            if let Some((_, reason)) = DEPRECATED_TARGETS.iter().find(|(n, _)| *n == name) {
                warn!("{} is {}.", name, reason);
            }

            targets.push(build_target(spec, selection, config)?);
        }

        if targets.is_empty() {
            return Err(ConfigurationError::NoTargets);
        }

        Ok(Catalog { targets })
    }

    /// Assembles a catalog from ready-made targets.
    pub fn from_targets(targets: Vec<Target>) -> Self {
        Catalog { targets }
    }

    /// Selected targets, in catalog order
    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    /// Looks up a target by its lowercased name.
    pub fn target(&self, name: &str) -> Option<&Target> {
        self.targets.iter().find(|t| t.name == name)
    }

    /// All links with the target they belong to.
    pub fn links(&self) -> impl Iterator<Item = (&Target, &Arc<Link>)> {
        self.targets
            .iter()
            .flat_map(|t| t.links.iter().map(move |l| (t, l)))
    }

    /// Number of links across all targets
    pub fn link_count(&self) -> usize {
        self.targets.iter().map(|t| t.links.len()).sum()
    }

    /// Logs what this run watches and what it filters on.
    pub fn log_summary(&self, filters: &FilterSet) {
        info!("ℹ selected stores: {}", self.join_targets());

        let brands: BTreeSet<&str> = self.links().map(|(_, l)| l.brand.as_str()).collect();
        let series: BTreeSet<&str> = self.links().map(|(_, l)| l.series.as_str()).collect();
        info!(
            "ℹ watching {} links ({} brands, {} series)",
            self.link_count(),
            brands.len(),
            series.len()
        );

        if !filters.brands().is_empty() {
            info!("ℹ selected brands: {}", filters.brands().join(", "));
        }
        if !filters.models().is_empty() {
            let models: Vec<String> = filters.models().iter().map(|m| m.to_string()).collect();
            info!("ℹ selected models: {}", models.join(", "));
        }
        if !filters.series().is_empty() {
            info!("ℹ selected series: {}", filters.series().join(", "));
        }
    }

    fn join_targets(&self) -> String {
        self.targets
            .iter()
            .map(|t| t.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn build_target(
    spec: &TargetSpec,
    selection: Option<&StoreSelection>,
    config: &MonitorConfig,
) -> Result<Target, ConfigurationError> {
    let name = spec.name.to_lowercase();
    let defaults = config.default_timing;

    let base = TimingConfig::from_millis(
        &name,
        spec.min_delay_ms.unwrap_or(defaults.min_delay.as_millis() as u64),
        spec.max_delay_ms.unwrap_or(defaults.max_delay.as_millis() as u64),
        spec.min_backoff_ms.unwrap_or(defaults.min_backoff.as_millis() as u64),
        spec.max_backoff_ms.unwrap_or(defaults.max_backoff.as_millis() as u64),
    )?;
    let timing = match selection {
        Some(selection) if selection.min_delay_ms.is_some() || selection.max_delay_ms.is_some() => {
            let delays = config.timing_for(selection)?;
            base.with_delays(delays.min_delay, delays.max_delay)
        }
        _ => base,
    };

    let concurrency_limit = spec.concurrency_limit.unwrap_or(config.concurrency_limit);
    if concurrency_limit == 0 {
        return Err(ConfigurationError::InvalidValue {
            field: "concurrency_limit",
            reason: format!("target {name} must allow at least one check"),
        });
    }

    let check_timeout = spec
        .check_timeout_ms
        .map(Duration::from_millis)
        .unwrap_or(config.check_timeout);

    let mut links = Vec::with_capacity(spec.links.len());
    let mut urls = HashSet::new();
    for link in &spec.links {
        let url = validate_link_url(&link.url)?;
        if !urls.insert(url.clone()) {
            warn!("Duplicate link {} in {}, skipping.", url, name);
            continue;
        }
        links.push(Arc::new(Link {
            target: name.clone(),
            brand: link.brand.trim().to_string(),
            series: link.series.trim().to_string(),
            model: link.model.trim().to_string(),
            url,
            price_ceiling: config.price_ceilings.for_series(&link.series),
        }));
    }

    let proxies = spec
        .proxies
        .clone()
        .filter(|p| !p.is_empty())
        .or_else(|| load_proxy_list(&config.proxy_dir, &name));
    if let Some(proxies) = &proxies {
        validate_proxies(&name, proxies)?;
    }

    Ok(Target {
        name,
        timing,
        concurrency_limit,
        check_timeout,
        proxies,
        selectors: spec.selectors.clone(),
        links,
    })
}

/// Rejects proxies the HTTP client would refuse on every check.
fn validate_proxies(target: &str, proxies: &[String]) -> Result<(), ConfigurationError> {
    for proxy in proxies {
        reqwest::Proxy::all(proxy.as_str()).map_err(|e| ConfigurationError::InvalidProxy {
            target: target.to_string(),
            proxy: proxy.clone(),
            reason: e.to_string(),
        })?;
    }
    Ok(())
}

fn validate_link_url(raw: &str) -> Result<String, ConfigurationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ConfigurationError::InvalidUrl {
            url: raw.to_string(),
            reason: "empty URL".to_string(),
        });
    }
    let url = Url::parse(trimmed).map_err(|e| ConfigurationError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigurationError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme {}", url.scheme()),
        });
    }
    Ok(url.to_string())
}

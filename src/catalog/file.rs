//! On-disk catalog format.
//!
//! ```json
//! {
//!   "targets": [
//!     {
//!       "name": "bestbuy",
//!       "min_delay_ms": 8000,
//!       "selectors": {
//!         "in_stock": { "container": ".add-to-cart", "text": ["add to cart"] },
//!         "price": ".price"
//!       },
//!       "links": [
//!         { "brand": "nvidia", "series": "3080", "model": "founders edition",
//!           "url": "https://www.bestbuy.com/site/6429440.p" }
//!       ]
//!     }
//!   ],
//!   "channels": [
//!     { "type": "log" },
//!     { "type": "discord", "url": "https://discord.com/api/webhooks/...",
//!       "routing": { "default": ["<@&123>"], "by_series": { "3090": ["<@&456>"] } } },
//!     { "type": "webhook", "url": "https://ops.example.com/hook", "operator": true }
//!   ]
//! }
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::error_handling::ConfigurationError;
use crate::notification::ChannelEntry;

/// Top-level catalog document.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogFile {
    /// Retail sites to watch
    pub targets: Vec<TargetSpec>,
    /// Notification channels; optional
    #[serde(default)]
    pub channels: Vec<ChannelEntry>,
}

impl CatalogFile {
    /// Reads and parses a catalog file.
    pub fn read(path: &Path) -> Result<Self, ConfigurationError> {
        let contents =
            std::fs::read_to_string(path).map_err(|source| ConfigurationError::CatalogRead {
                path: path.to_path_buf(),
                source,
            })?;
        Self::parse(&contents)
    }

    /// Parses catalog JSON.
    pub fn parse(contents: &str) -> Result<Self, ConfigurationError> {
        Ok(serde_json::from_str(contents)?)
    }
}

/// One retail site as written in the catalog.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetSpec {
    /// Target name, matched case-insensitively against `STORES`
    pub name: String,
    /// Overrides the global minimum delay between checks
    pub min_delay_ms: Option<u64>,
    /// Overrides the global maximum delay between checks
    pub max_delay_ms: Option<u64>,
    /// Overrides the global minimum backoff
    pub min_backoff_ms: Option<u64>,
    /// Overrides the global maximum backoff
    pub max_backoff_ms: Option<u64>,
    /// Checks allowed in flight at once for this target
    pub concurrency_limit: Option<usize>,
    /// Per-check timeout
    pub check_timeout_ms: Option<u64>,
    /// Inline proxy list; takes precedence over proxy files
    pub proxies: Option<Vec<String>>,
    /// Page markers for the built-in selector adapter. Targets without them
    /// need an adapter registered under their name.
    pub selectors: Option<SelectorLabels>,
    /// Product pages of this target
    pub links: Vec<LinkSpec>,
}

/// One product page as written in the catalog.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinkSpec {
    /// Product brand
    #[serde(default)]
    pub brand: String,
    /// Product series
    #[serde(default)]
    pub series: String,
    /// Product model
    #[serde(default)]
    pub model: String,
    /// Page URL
    pub url: String,
}

/// An element that signals a page state, optionally only when its text
/// contains one of the given fragments.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PageLabel {
    /// CSS selector of the element
    pub container: String,
    /// Text fragments, matched case-insensitively; empty means presence is enough
    #[serde(default)]
    pub text: Vec<String>,
}

/// Page markers used by the selector adapter.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelectorLabels {
    /// Marks a page as in stock
    pub in_stock: Option<PageLabel>,
    /// Marks a page as out of stock; wins over `in_stock`
    pub out_of_stock: Option<PageLabel>,
    /// Marks a CAPTCHA page
    pub captcha: Option<PageLabel>,
    /// Element holding the displayed price
    pub price: Option<String>,
}

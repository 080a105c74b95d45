//! Adapter seam: site-specific fetch and extraction behind one trait.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use log::debug;

use crate::catalog::Catalog;
use crate::checker::SelectorAdapter;
use crate::error_handling::AdapterError;

/// Raw result of reading one product page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extraction {
    /// Whether the page offers the product for sale
    pub in_stock: bool,
    /// Displayed price, when one could be parsed
    pub price: Option<f64>,
}

/// Fetches a product page and extracts availability and price.
///
/// Implementations map every failure onto one of the `AdapterError` kinds.
#[async_trait::async_trait]
pub trait Adapter: Send + Sync {
    /// Fetches `url`, through `proxy` when given, and reads the page.
    ///
    /// `timeout` is a hint for the underlying request; the checker enforces
    /// it independently.
    async fn fetch_and_extract(
        &self,
        url: &str,
        proxy: Option<&str>,
        timeout: Duration,
    ) -> Result<Extraction, AdapterError>;
}

/// Adapters keyed by target name, built once at startup.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<String, Arc<dyn Adapter>>,
}

impl AdapterRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `adapter` for `target`, replacing any previous one.
    pub fn register(&mut self, target: &str, adapter: Arc<dyn Adapter>) {
        self.adapters.insert(target.to_lowercase(), adapter);
    }

    /// Adapter for `target`, matched case-insensitively
    pub fn get(&self, target: &str) -> Option<Arc<dyn Adapter>> {
        self.adapters.get(&target.to_lowercase()).cloned()
    }

    /// Whether `target` has an adapter
    pub fn contains(&self, target: &str) -> bool {
        self.adapters.contains_key(&target.to_lowercase())
    }

    /// Registers a `SelectorAdapter` for every catalog target that declares
    /// selectors and has no adapter yet. Returns how many were added.
    pub fn register_selectors(
        &mut self,
        catalog: &Catalog,
        client: &Arc<reqwest::Client>,
        user_agent: &str,
    ) -> usize {
        let mut added = 0;
        for target in catalog.targets() {
            let Some(labels) = &target.selectors else {
                continue;
            };
            if self.contains(&target.name) {
                continue;
            }
            debug!("Registering selector adapter for {}", target.name);
            let adapter = SelectorAdapter::new(&target.name, labels, Arc::clone(client), user_agent);
            self.register(&target.name, Arc::new(adapter));
            added += 1;
        }
        added
    }

    /// Number of registered adapters
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    /// True when nothing is registered
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.adapters.keys().collect();
        names.sort();
        f.debug_struct("AdapterRegistry")
            .field("targets", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed;

    #[async_trait::async_trait]
    impl Adapter for Fixed {
        async fn fetch_and_extract(
            &self,
            _url: &str,
            _proxy: Option<&str>,
            _timeout: Duration,
        ) -> Result<Extraction, AdapterError> {
            Ok(Extraction {
                in_stock: true,
                price: None,
            })
        }
    }

    #[test]
    fn test_registry_lookup_is_by_lowercase_name() {
        let mut registry = AdapterRegistry::new();
        registry.register("BestBuy", Arc::new(Fixed));
        assert!(registry.contains("bestbuy"));
        assert!(registry.get("bestbuy").is_some());
        assert!(registry.get("newegg").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_selectors_skips_known_and_unlabelled_targets() {
        use crate::catalog::CatalogFile;
        use crate::config::{MonitorConfig, Opt};
        use clap::Parser;

        let file = CatalogFile::parse(
            r#"{"targets":[
                {"name":"bestbuy","selectors":{"in_stock":{"container":".add-to-cart"}},"links":[{"url":"https://a.example/1"}]},
                {"name":"newegg","selectors":{"out_of_stock":{"container":".sold-out"}},"links":[{"url":"https://b.example/1"}]},
                {"name":"custom","links":[{"url":"https://c.example/1"}]}
            ]}"#,
        )
        .unwrap();
        let opt = Opt::try_parse_from(["stock_watch", "catalog.json", "--renotify-interval", "0", "--proxy-dir", "/nonexistent"]).unwrap();
        let catalog = Catalog::build(&file, &MonitorConfig::from_opt(&opt).unwrap()).unwrap();

        let mut registry = AdapterRegistry::new();
        registry.register("newegg", Arc::new(Fixed));
        let added = registry.register_selectors(&catalog, &Arc::new(reqwest::Client::new()), "test-agent");

        assert_eq!(added, 1);
        assert!(registry.contains("bestbuy"));
        assert!(!registry.contains("custom"));
        assert_eq!(registry.len(), 2);
    }
}

//! Stock checking: one adapter call turned into one `Observation`.
//!
//! `StockChecker::check` never fails. Timeouts and adapter errors come back as
//! the observation's outcome.

mod adapter;
mod selector;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::catalog::{within_ceiling, FilterSet, Link};
use crate::error_handling::{categorize_adapter_error, AdapterError};
use crate::models::Observation;

pub use adapter::{Adapter, AdapterRegistry, Extraction};
pub use selector::SelectorAdapter;

/// Runs checks for the links of one target.
#[derive(Clone)]
pub struct StockChecker {
    adapter: Arc<dyn Adapter>,
    filters: Arc<FilterSet>,
    timeout: Duration,
}

impl StockChecker {
    /// Creates a checker that applies `filters` and bounds each check by `timeout`.
    pub fn new(adapter: Arc<dyn Adapter>, filters: Arc<FilterSet>, timeout: Duration) -> Self {
        StockChecker {
            adapter,
            filters,
            timeout,
        }
    }

    /// Checks one link, optionally through a proxy.
    ///
    /// The adapter call is bounded by the checker timeout; exceeding it
    /// yields `TransientError`.
    pub async fn check(&self, link: &Link, proxy: Option<&str>) -> Observation {
        let fetch = self.adapter.fetch_and_extract(&link.url, proxy, self.timeout);
        let result = match tokio::time::timeout(self.timeout, fetch).await {
            Ok(result) => result,
            Err(_) => Err(AdapterError::NetworkFailure(format!(
                "check timed out after {}ms",
                self.timeout.as_millis()
            ))),
        };

        let timestamp = Utc::now();
        match result {
            Ok(extraction) => Observation::success(
                timestamp,
                extraction.in_stock,
                extraction.price,
                self.passes_filters(link, extraction.price),
            ),
            Err(error) => {
                let outcome = categorize_adapter_error(&error);
                log::debug!("{} check failed ({}): {}", link.url, outcome, error);
                Observation::failed(timestamp, outcome)
            }
        }
    }

    /// Brand, series and model allow-lists plus the link's price ceiling.
    pub fn passes_filters(&self, link: &Link, price: Option<f64>) -> bool {
        self.filters.matches(link) && within_ceiling(link.price_ceiling, price)
    }
}

impl std::fmt::Debug for StockChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StockChecker")
            .field("filters", &self.filters)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ModelFilter;
    use crate::models::CheckOutcome;
    use std::sync::Mutex;

    struct Scripted(Mutex<Vec<Result<Extraction, AdapterError>>>);

    #[async_trait::async_trait]
    impl Adapter for Scripted {
        async fn fetch_and_extract(
            &self,
            _url: &str,
            _proxy: Option<&str>,
            _timeout: Duration,
        ) -> Result<Extraction, AdapterError> {
            self.0.lock().unwrap().remove(0)
        }
    }

    struct Hanging;

    #[async_trait::async_trait]
    impl Adapter for Hanging {
        async fn fetch_and_extract(
            &self,
            _url: &str,
            _proxy: Option<&str>,
            _timeout: Duration,
        ) -> Result<Extraction, AdapterError> {
            std::future::pending::<Result<Extraction, AdapterError>>().await
        }
    }

    fn link(ceiling: Option<f64>) -> Link {
        Link {
            target: "bestbuy".into(),
            brand: "nvidia".into(),
            series: "3080".into(),
            model: "founders edition".into(),
            url: "https://example.com/p".into(),
            price_ceiling: ceiling,
        }
    }

    fn checker(adapter: Arc<dyn Adapter>, filters: FilterSet) -> StockChecker {
        StockChecker::new(adapter, Arc::new(filters), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_check_success_in_stock() {
        let adapter = Arc::new(Scripted(Mutex::new(vec![Ok(Extraction {
            in_stock: true,
            price: Some(699.0),
        })])));
        let obs = checker(adapter, FilterSet::default()).check(&link(None), None).await;
        assert_eq!(obs.outcome, CheckOutcome::Success);
        assert!(obs.in_stock);
        assert!(obs.passes_filters);
        assert_eq!(obs.price, Some(699.0));
    }

    #[tokio::test]
    async fn test_check_maps_adapter_errors() {
        let adapter = Arc::new(Scripted(Mutex::new(vec![
            Err(AdapterError::HttpBlocked(429)),
            Err(AdapterError::CaptchaPage),
            Err(AdapterError::ParseAmbiguous("no markers".into())),
            Err(AdapterError::NetworkFailure("reset".into())),
        ])));
        let checker = checker(adapter, FilterSet::default());
        let link = link(None);
        let outcomes = [
            checker.check(&link, None).await.outcome,
            checker.check(&link, None).await.outcome,
            checker.check(&link, None).await.outcome,
            checker.check(&link, None).await.outcome,
        ];
        assert_eq!(
            outcomes,
            [
                CheckOutcome::Blocked,
                CheckOutcome::CaptchaDetected,
                CheckOutcome::TransientError,
                CheckOutcome::TransientError
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_timeout_is_transient() {
        let obs = checker(Arc::new(Hanging), FilterSet::default())
            .check(&link(None), None)
            .await;
        assert_eq!(obs.outcome, CheckOutcome::TransientError);
        assert!(!obs.in_stock);
    }

    #[tokio::test]
    async fn test_price_above_ceiling_fails_filters() {
        let adapter = Arc::new(Scripted(Mutex::new(vec![Ok(Extraction {
            in_stock: true,
            price: Some(1200.0),
        })])));
        let obs = checker(adapter, FilterSet::default())
            .check(&link(Some(800.0)), None)
            .await;
        assert_eq!(obs.outcome, CheckOutcome::Success);
        assert!(obs.in_stock);
        assert!(!obs.passes_filters);
    }

    #[test]
    fn test_passes_filters_with_allow_lists() {
        let adapter: Arc<dyn Adapter> = Arc::new(Hanging);
        let allowed = checker(
            adapter.clone(),
            FilterSet::new(vec!["nvidia".into()], vec![], vec![ModelFilter::new("founders edition", Some("3080"))]),
        );
        assert!(allowed.passes_filters(&link(None), None));

        let excluded = checker(adapter, FilterSet::new(vec!["asus".into()], vec![], vec![]));
        assert!(!excluded.passes_filters(&link(None), None));
    }
}

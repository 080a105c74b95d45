//! stock_watch library: polls retail product pages and announces restocks
//!
//! This library watches a catalog of product links across retail sites. Each
//! link gets its own long-running task that respects the site's pacing and
//! backoff rules, tracks in-stock transitions, and fans restock notifications
//! out to the configured channels.
//!
//! # Example
//!
//! ```no_run
//! use clap::Parser;
//! use stock_watch::{run_monitor, Opt};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let opt = Opt::parse_from(["stock_watch", "catalog.json", "--renotify-interval", "600"]);
//!
//! // Runs until Ctrl+C or SIGTERM
//! let report = run_monitor(opt).await?;
//! println!("{} checks, {} restocks", report.checks, report.restocks);
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your application
//! or ensure you're calling library functions within an async context.

#![warn(missing_docs)]

mod app;
pub mod catalog;
pub mod checker;
pub mod config;
pub mod error_handling;
pub mod initialization;
pub mod models;
pub mod notification;
pub mod rate_controller;
pub mod scheduler;
pub mod state;

// Re-export public API
pub use catalog::{Catalog, CatalogFile, Link, LinkKey, Target};
pub use checker::{Adapter, AdapterRegistry, Extraction, StockChecker};
pub use config::{LogFormat, LogLevel, MonitorConfig, Opt};
pub use error_handling::MonitorStats;
pub use models::{CheckOutcome, Observation};
pub use notification::{Channel, NotificationDispatcher, NotificationEvent};
pub use run::{run_monitor, run_monitor_with, MonitorReport};
pub use scheduler::{SchedulerSettings, Supervisor};

// Internal run module (wires the components together and owns the signal loop)
mod run {
    use anyhow::{Context, Result};
    use std::sync::Arc;
    use std::time::Duration;

    use log::{error, info, warn};
    use tokio_util::sync::CancellationToken;

    use crate::app::{log_progress, print_final_statistics, shutdown_gracefully};
    use crate::catalog::{Catalog, CatalogFile};
    use crate::checker::AdapterRegistry;
    use crate::config::{MonitorConfig, Opt, LOGGING_INTERVAL};
    use crate::error_handling::{EventType, InitializationError, MonitorStats};
    use crate::initialization::init_client;
    use crate::notification::{
        build_channels, DeliveryStatus, LogChannel, NotificationDispatcher, RecipientRouting,
        RegisteredChannel,
    };
    use crate::scheduler::{SchedulerSettings, Supervisor};

    /// Summary of a monitoring session, returned after shutdown.
    #[derive(Debug, Clone)]
    pub struct MonitorReport {
        /// Checks performed across all links
        pub checks: usize,
        /// Checks that did not end in `Success`
        pub failed_checks: usize,
        /// Links that went from unavailable to available
        pub restocks: usize,
        /// Notifications delivered successfully
        pub delivered: usize,
        /// Notification deliveries that failed
        pub failed_deliveries: usize,
        /// Wall-clock duration of the session in seconds
        pub elapsed_seconds: f64,
    }

    impl MonitorReport {
        fn from_stats(stats: &MonitorStats, elapsed_seconds: f64) -> Self {
            MonitorReport {
                checks: stats.total_checks(),
                failed_checks: stats.total_failed_checks(),
                restocks: stats.get_event_count(EventType::BecameAvailable),
                delivered: stats.get_delivery_count(DeliveryStatus::Delivered),
                failed_deliveries: stats.get_delivery_count(DeliveryStatus::Failed),
                elapsed_seconds,
            }
        }
    }

    /// Runs the monitor until Ctrl+C or SIGTERM, using the selector adapter
    /// for every target.
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - The options do not form a valid configuration
    /// - The catalog file cannot be read or selects no target
    /// - A target has no adapter (no selectors declared)
    /// - The HTTP client cannot be built
    pub async fn run_monitor(opt: Opt) -> Result<MonitorReport> {
        run_monitor_with(opt, AdapterRegistry::new()).await
    }

    /// Like [`run_monitor`], with caller-provided adapters.
    ///
    /// Targets without an entry in `adapters` fall back to a selector adapter
    /// built from their catalog labels.
    pub async fn run_monitor_with(opt: Opt, mut adapters: AdapterRegistry) -> Result<MonitorReport> {
        let config = MonitorConfig::from_opt(&opt).context("Invalid configuration")?;
        let file = CatalogFile::read(&config.catalog_path).context("Failed to load catalog")?;
        let catalog = Catalog::build(&file, &config).context("Failed to build catalog")?;
        catalog.log_summary(&config.filters);

        let client = init_client(&config)
            .map_err(InitializationError::from)
            .context("Failed to initialize HTTP client")?;
        adapters.register_selectors(&catalog, &client, &config.user_agent);

        let mut channels =
            build_channels(&file.channels, &client).context("Failed to configure channels")?;
        if !channels.iter().any(|c| !c.operator) {
            warn!("No notification channel configured; restocks will only be logged");
            channels.push(RegisteredChannel::new(
                Arc::new(LogChannel::default()),
                RecipientRouting::default(),
            ));
        }

        let stats = Arc::new(MonitorStats::new());
        let dispatcher = Arc::new(NotificationDispatcher::new(channels, Arc::clone(&stats)));

        let cancel = CancellationToken::new();
        let mut supervisor = Supervisor::new(
            SchedulerSettings::from_config(&config),
            Arc::new(config.filters.clone()),
            adapters,
            dispatcher,
            Arc::clone(&stats),
            cancel.child_token(),
        );
        supervisor
            .start(&catalog)
            .context("Failed to start link tasks")?;

        let start_time = std::time::Instant::now();
        let cancel_logging = cancel.child_token();
        let stats_for_logging = Arc::clone(&stats);
        let logging_task = Some(tokio::task::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(LOGGING_INTERVAL));
            // The first tick fires immediately
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = interval.tick() => log_progress(start_time, &stats_for_logging),
                    _ = cancel_logging.cancelled() => break,
                }
            }
        }));

        wait_for_shutdown(&mut supervisor, &config, &client).await?;
        info!("Shutdown requested, stopping link tasks");

        shutdown_gracefully(cancel, logging_task, supervisor).await;

        let elapsed_seconds = start_time.elapsed().as_secs_f64();
        log_progress(start_time, &stats);
        print_final_statistics(&stats, elapsed_seconds);

        Ok(MonitorReport::from_stats(&stats, elapsed_seconds))
    }

    /// Blocks until Ctrl+C or SIGTERM. SIGHUP re-reads the catalog and
    /// reloads the supervisor; a bad catalog is logged and ignored.
    #[cfg(unix)]
    async fn wait_for_shutdown(
        supervisor: &mut Supervisor,
        config: &MonitorConfig,
        client: &Arc<reqwest::Client>,
    ) -> Result<()> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate =
            signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
        let mut hangup = signal(SignalKind::hangup()).context("Failed to install SIGHUP handler")?;

        loop {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    result.context("Failed to listen for Ctrl+C")?;
                    return Ok(());
                }
                _ = terminate.recv() => return Ok(()),
                _ = hangup.recv() => {
                    info!("SIGHUP received, reloading {}", config.catalog_path.display());
                    if let Err(e) = reload_catalog(supervisor, config, client) {
                        error!("Catalog reload failed, keeping current links: {e:#}");
                    }
                }
            }
        }
    }

    #[cfg(not(unix))]
    async fn wait_for_shutdown(
        _supervisor: &mut Supervisor,
        _config: &MonitorConfig,
        _client: &Arc<reqwest::Client>,
    ) -> Result<()> {
        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl+C")
    }

    #[cfg_attr(not(unix), allow(dead_code))]
    fn reload_catalog(
        supervisor: &mut Supervisor,
        config: &MonitorConfig,
        client: &Arc<reqwest::Client>,
    ) -> Result<()> {
        let file = CatalogFile::read(&config.catalog_path).context("Failed to load catalog")?;
        let catalog = Catalog::build(&file, config).context("Failed to build catalog")?;
        supervisor
            .adapters_mut()
            .register_selectors(&catalog, client, &config.user_agent);
        supervisor.reload(&catalog).context("Failed to apply catalog")?;
        catalog.log_summary(&config.filters);
        Ok(())
    }
}

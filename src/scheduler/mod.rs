//! Scheduler: one task per (target, link), supervised as a group.
//!
//! The `Supervisor` owns every link task. Tasks stop when the shared
//! cancellation token fires, when their link disappears on reload, or when
//! the captcha policy disables them.

mod task;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::catalog::{Catalog, FilterSet, LinkKey, Target};
use crate::checker::{AdapterRegistry, StockChecker};
use crate::config::MonitorConfig;
use crate::error_handling::{ConfigurationError, MonitorStats};
use crate::notification::NotificationDispatcher;
use crate::rate_controller::{captcha_policy_from, ProxyPool, RateController};

use task::{LinkTask, TargetRuntime};

/// Run-wide settings every link task needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerSettings {
    /// Cooldown before a still-available link is announced again
    pub renotify_interval: Option<Duration>,
    /// Operator alert every this many consecutive blocks
    pub blocked_alert_streak: u32,
    /// Consecutive CAPTCHA pages after which a link stops
    pub captcha_disable_after: Option<u32>,
    /// Log a line when an in-stock streak ends
    pub restock_ended_log: bool,
}

impl SchedulerSettings {
    /// Picks the scheduler settings out of the run configuration.
    pub fn from_config(config: &MonitorConfig) -> Self {
        SchedulerSettings {
            renotify_interval: config.renotify_interval,
            blocked_alert_streak: config.blocked_alert_streak,
            captcha_disable_after: config.captcha_disable_after,
            restock_ended_log: config.restock_ended_log,
        }
    }
}

/// Links started and stopped by a reload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReloadSummary {
    /// Links spawned
    pub added: usize,
    /// Links cancelled
    pub removed: usize,
    /// Links left running with their state
    pub kept: usize,
}

#[derive(Debug)]
struct RunningLink {
    /// Distinguishes a respawned link from the task it replaced
    generation: u64,
    token: CancellationToken,
}

/// Owns the lifecycle of all link tasks.
pub struct Supervisor {
    settings: SchedulerSettings,
    filters: Arc<FilterSet>,
    adapters: AdapterRegistry,
    dispatcher: Arc<NotificationDispatcher>,
    stats: Arc<MonitorStats>,
    cancel: CancellationToken,
    tasks: JoinSet<(LinkKey, u64)>,
    links: HashMap<LinkKey, RunningLink>,
    targets: HashMap<String, Arc<TargetRuntime>>,
    next_generation: u64,
}

impl Supervisor {
    /// Creates a supervisor whose tasks all stop when `cancel` fires.
    pub fn new(
        settings: SchedulerSettings,
        filters: Arc<FilterSet>,
        adapters: AdapterRegistry,
        dispatcher: Arc<NotificationDispatcher>,
        stats: Arc<MonitorStats>,
        cancel: CancellationToken,
    ) -> Self {
        Supervisor {
            settings,
            filters,
            adapters,
            dispatcher,
            stats,
            cancel,
            tasks: JoinSet::new(),
            links: HashMap::new(),
            targets: HashMap::new(),
            next_generation: 0,
        }
    }

    /// Adapter registry, e.g. to register adapters for targets a reload adds.
    pub fn adapters_mut(&mut self) -> &mut AdapterRegistry {
        &mut self.adapters
    }

    /// Spawns a task for every link of the catalog.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::MissingAdapter` if a target has no
    /// registered adapter. Nothing is spawned in that case.
    pub fn start(&mut self, catalog: &Catalog) -> Result<usize, ConfigurationError> {
        let summary = self.reload(catalog)?;
        info!(
            "Started {} link task(s) across {} target(s)",
            summary.added,
            self.targets.len()
        );
        Ok(summary.added)
    }

    /// Brings the running tasks in line with `catalog`.
    ///
    /// Links no longer present are cancelled; new links are spawned; links
    /// present in both keep running with their state. A target that is kept
    /// keeps its timing and proxy pool; changing those needs a restart.
    /// Links disabled by the captcha policy are started again.
    pub fn reload(&mut self, catalog: &Catalog) -> Result<ReloadSummary, ConfigurationError> {
        for target in catalog.targets() {
            if !self.adapters.contains(&target.name) {
                return Err(ConfigurationError::MissingAdapter(target.name.clone()));
            }
        }

        self.reap_finished();

        let wanted: HashMap<LinkKey, (&Target, _)> = catalog
            .links()
            .map(|(target, link)| (link.key(), (target, link)))
            .collect();

        let mut summary = ReloadSummary::default();
        self.links.retain(|key, running| {
            if wanted.contains_key(key) {
                summary.kept += 1;
                true
            } else {
                running.token.cancel();
                summary.removed += 1;
                false
            }
        });

        let live_targets: std::collections::HashSet<&str> =
            catalog.targets().iter().map(|t| t.name.as_str()).collect();
        self.targets
            .retain(|name, _| live_targets.contains(name.as_str()));

        for (key, (target, link)) in wanted {
            if self.links.contains_key(&key) {
                continue;
            }
            let runtime = match self.targets.get(&target.name) {
                Some(runtime) => Arc::clone(runtime),
                None => {
                    let runtime = Arc::new(self.build_runtime(target)?);
                    self.targets.insert(target.name.clone(), Arc::clone(&runtime));
                    runtime
                }
            };

            let token = self.cancel.child_token();
            let task = LinkTask::new(
                Arc::clone(link),
                runtime,
                Arc::clone(&self.dispatcher),
                Arc::clone(&self.stats),
                self.settings,
            );
            let generation = self.next_generation;
            self.next_generation += 1;
            let task_token = token.clone();
            let task_key = key.clone();
            self.tasks.spawn(async move {
                task.run(task_token).await;
                (task_key, generation)
            });
            self.links.insert(key, RunningLink { generation, token });
            summary.added += 1;
        }

        if summary.removed > 0 || summary.added > 0 {
            info!(
                "Catalog applied: {} added, {} removed, {} kept",
                summary.added, summary.removed, summary.kept
            );
        }
        Ok(summary)
    }

    /// Number of link tasks currently tracked.
    pub fn running_links(&mut self) -> usize {
        self.reap_finished();
        self.links.len()
    }

    /// Keys of the tracked links, sorted.
    pub fn link_keys(&mut self) -> Vec<LinkKey> {
        self.reap_finished();
        let mut keys: Vec<LinkKey> = self.links.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Cancels every task and waits for all of them to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        while let Some(result) = self.tasks.join_next().await {
            if let Err(e) = result {
                if e.is_panic() {
                    warn!("Link task panicked: {e}");
                }
            }
        }
        self.links.clear();
        info!("All link tasks stopped");
    }

    fn reap_finished(&mut self) {
        while let Some(result) = self.tasks.try_join_next() {
            match result {
                Ok((key, generation)) => {
                    if self
                        .links
                        .get(&key)
                        .is_some_and(|running| running.generation == generation)
                    {
                        self.links.remove(&key);
                    }
                }
                Err(e) if e.is_panic() => warn!("Link task panicked: {e}"),
                Err(_) => {}
            }
        }
    }

    fn build_runtime(&self, target: &Target) -> Result<TargetRuntime, ConfigurationError> {
        let adapter = self
            .adapters
            .get(&target.name)
            .ok_or_else(|| ConfigurationError::MissingAdapter(target.name.clone()))?;
        let proxies = target.proxies.clone().and_then(ProxyPool::new);
        if let Some(pool) = &proxies {
            info!("{}: rotating through {} proxies", target.name, pool.len());
        }
        Ok(TargetRuntime {
            name: target.name.clone(),
            rate: RateController::new(
                target.timing,
                captcha_policy_from(self.settings.captcha_disable_after),
            ),
            checker: StockChecker::new(adapter, Arc::clone(&self.filters), target.check_timeout),
            proxies,
            gate: Arc::new(Semaphore::new(target.concurrency_limit)),
        })
    }
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("settings", &self.settings)
            .field("links", &self.links.len())
            .field("targets", &self.targets.len())
            .finish()
    }
}

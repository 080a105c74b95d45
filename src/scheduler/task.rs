//! The long-running loop of one link.

use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::catalog::Link;
use crate::checker::StockChecker;
use crate::error_handling::{EventType, MonitorStats};
use crate::models::{CheckOutcome, Observation};
use crate::notification::{AlertKind, NotificationDispatcher, NotificationEvent, NotifyReason, OperatorAlert};
use crate::rate_controller::{ProxyPool, RateController, RateState};
use crate::scheduler::SchedulerSettings;
use crate::state::{StateTracker, TransitionDecision};

/// Everything the links of one target share.
#[derive(Debug)]
pub(crate) struct TargetRuntime {
    pub name: String,
    pub rate: RateController,
    pub checker: StockChecker,
    pub proxies: Option<ProxyPool>,
    /// Admission gate sized to the target's concurrency limit
    pub gate: Arc<Semaphore>,
}

/// State and collaborators of one link's loop.
///
/// `RateState` and the tracker's `LinkState` are owned here and touched by
/// nothing else.
pub(crate) struct LinkTask {
    link: Arc<Link>,
    runtime: Arc<TargetRuntime>,
    dispatcher: Arc<NotificationDispatcher>,
    stats: Arc<MonitorStats>,
    settings: SchedulerSettings,
    rate_state: RateState,
    tracker: StateTracker,
}

impl LinkTask {
    pub fn new(
        link: Arc<Link>,
        runtime: Arc<TargetRuntime>,
        dispatcher: Arc<NotificationDispatcher>,
        stats: Arc<MonitorStats>,
        settings: SchedulerSettings,
    ) -> Self {
        let rate_state = runtime.rate.initial_state(Instant::now());
        LinkTask {
            link,
            runtime,
            dispatcher,
            stats,
            settings,
            rate_state,
            tracker: StateTracker::new(settings.renotify_interval),
        }
    }

    /// Polls until cancelled or disabled by the captcha policy.
    pub async fn run(mut self, cancel: CancellationToken) {
        debug!("Starting {} {}", self.runtime.name, self.link.url);
        while self.iterate(&cancel).await {}
        debug!("Stopped {} {}", self.runtime.name, self.link.url);
    }

    /// One wait-check-update-dispatch cycle. Returns false when the loop
    /// should end.
    async fn iterate(&mut self, cancel: &CancellationToken) -> bool {
        while !self.runtime.rate.is_eligible(&self.rate_state, Instant::now()) {
            let wake_at = self.runtime.rate.next_eligible_at(&self.rate_state);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return false,
                _ = tokio::time::sleep_until(wake_at) => {}
            }
        }

        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => return false,
            permit = Arc::clone(&self.runtime.gate).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => return false,
            },
        };

        let proxy = self
            .runtime
            .proxies
            .as_ref()
            .map(|pool| pool.select(Instant::now()));

        // Abandoning the check here commits nothing
        let observation = tokio::select! {
            biased;
            _ = cancel.cancelled() => return false,
            observation = self.runtime.checker.check(&self.link, proxy.as_deref()) => observation,
        };
        drop(permit);

        let now = Instant::now();
        if let (Some(pool), Some(proxy)) = (&self.runtime.proxies, proxy.as_deref()) {
            pool.record(proxy, observation.outcome, now);
        }
        let delay = self
            .runtime
            .rate
            .record_outcome(&mut self.rate_state, observation.outcome, now);
        let decision = self.tracker.evaluate(&observation);
        self.stats.record_check(observation.outcome);
        self.log_check(&observation, decision, delay.as_millis());

        if let Some(event) = self.handle_decision(&observation, decision) {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return false,
                _ = self.dispatcher.dispatch(event) => {}
            }
        }

        let disable = self.runtime.rate.should_disable(&self.rate_state);
        if let Some(alert) = self.escalation(&observation, disable) {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return false,
                _ = self.dispatcher.alert_operator(alert) => {}
            }
        }

        if disable {
            warn!(
                "Disabling {} {} after {} consecutive CAPTCHA pages",
                self.runtime.name, self.link.url, self.rate_state.captcha_streak
            );
            self.stats.record_event(EventType::LinkDisabled);
            return false;
        }
        true
    }

    fn handle_decision(&self, observation: &Observation, decision: TransitionDecision) -> Option<NotificationEvent> {
        match decision {
            TransitionDecision::BecameAvailable => {
                self.stats.record_event(EventType::BecameAvailable);
                Some(NotificationEvent::new(&self.link, observation, NotifyReason::BecameAvailable))
            }
            TransitionDecision::RemainsAvailableRenotify => {
                self.stats.record_event(EventType::Renotified);
                Some(NotificationEvent::new(&self.link, observation, NotifyReason::StillAvailable))
            }
            TransitionDecision::BecameUnavailable => {
                self.stats.record_event(EventType::BecameUnavailable);
                if self.settings.restock_ended_log {
                    info!(
                        "✖ restock ended: {} at {} {}",
                        self.link.label(),
                        self.runtime.name,
                        self.link.url
                    );
                }
                None
            }
            TransitionDecision::NoChange | TransitionDecision::Ignore => None,
        }
    }

    /// Operator alert for this check, if any: every `blocked_alert_streak`
    /// consecutive blocks, every CAPTCHA, or a disabled link.
    fn escalation(&self, observation: &Observation, disable: bool) -> Option<OperatorAlert> {
        let kind = match observation.outcome {
            CheckOutcome::CaptchaDetected if disable => AlertKind::LinkDisabled {
                captcha_streak: self.rate_state.captcha_streak,
            },
            CheckOutcome::CaptchaDetected => AlertKind::Captcha {
                streak: self.rate_state.captcha_streak,
            },
            CheckOutcome::Blocked
                if self.rate_state.blocked_streak > 0
                    && self.rate_state.blocked_streak % self.settings.blocked_alert_streak.max(1) == 0 =>
            {
                AlertKind::BlockedStreak {
                    streak: self.rate_state.blocked_streak,
                }
            }
            _ => return None,
        };
        Some(OperatorAlert::new(&self.link, kind, observation.timestamp))
    }

    fn log_check(&self, observation: &Observation, decision: TransitionDecision, next_in_ms: u128) {
        let price = observation
            .price
            .map(|p| format!("{p:.2}"))
            .unwrap_or_else(|| "-".to_string());
        match observation.outcome {
            CheckOutcome::Success | CheckOutcome::TransientError => info!(
                "check target={} link={} outcome={} in_stock={} price={} decision={} next_in_ms={}",
                self.runtime.name,
                self.link.url,
                observation.outcome,
                observation.in_stock,
                price,
                decision,
                next_in_ms
            ),
            CheckOutcome::Blocked | CheckOutcome::CaptchaDetected => warn!(
                "check target={} link={} outcome={} in_stock={} price={} decision={} next_in_ms={} failures={}",
                self.runtime.name,
                self.link.url,
                observation.outcome,
                observation.in_stock,
                price,
                decision,
                next_in_ms,
                self.rate_state.consecutive_failures
            ),
        }
    }
}

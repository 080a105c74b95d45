//! Stock-state machine of one link.
//!
//! Decides whether an observation is a transition worth alerting on. Failed
//! checks never change the committed state.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::models::{CheckOutcome, Observation};

/// What an observation means for a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionDecision {
    /// Nothing to report.
    NoChange,
    /// The link was not available and now is. Notify.
    BecameAvailable,
    /// The link was available and no longer is (out of stock or filtered out).
    BecameUnavailable,
    /// Still available and the re-notify cooldown has elapsed. Notify.
    RemainsAvailableRenotify,
    /// In a state nobody asked about (filtered out and not previously available).
    Ignore,
}

impl TransitionDecision {
    /// Snake-case tag used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionDecision::NoChange => "no_change",
            TransitionDecision::BecameAvailable => "became_available",
            TransitionDecision::BecameUnavailable => "became_unavailable",
            TransitionDecision::RemainsAvailableRenotify => "remains_available_renotify",
            TransitionDecision::Ignore => "ignore",
        }
    }

    /// Only these two produce a notification event.
    pub fn requires_notification(&self) -> bool {
        matches!(
            self,
            TransitionDecision::BecameAvailable | TransitionDecision::RemainsAvailableRenotify
        )
    }
}

impl std::fmt::Display for TransitionDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last committed state of one link.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkState {
    /// Last successful observation
    pub last: Observation,
    /// In stock and passing filters at the last successful check
    pub available: bool,
    /// When the current in-stock streak was last announced. Set only while
    /// `available` is true.
    pub notified_at: Option<DateTime<Utc>>,
}

/// Transition rules plus the state of the link they apply to.
///
/// One tracker per link task. The `LinkState` is created on the first
/// successful check.
#[derive(Debug, Clone)]
pub struct StateTracker {
    renotify_interval: Option<Duration>,
    state: Option<LinkState>,
}

impl StateTracker {
    /// `renotify_interval` of `None` never re-announces a link that stays
    /// available.
    pub fn new(renotify_interval: Option<Duration>) -> Self {
        StateTracker {
            renotify_interval,
            state: None,
        }
    }

    /// Committed state; `None` until the first successful check
    pub fn state(&self) -> Option<&LinkState> {
        self.state.as_ref()
    }

    /// Whether the link is currently considered available
    pub fn is_available(&self) -> bool {
        self.state.as_ref().is_some_and(|s| s.available)
    }

    /// Applies an observation. The observation's timestamp is "now".
    pub fn evaluate(&mut self, observation: &Observation) -> TransitionDecision {
        if observation.outcome != CheckOutcome::Success {
            return TransitionDecision::NoChange;
        }

        let now = observation.timestamp;
        let was_available = self.is_available();
        let previous_notified_at = self.state.as_ref().and_then(|s| s.notified_at);

        let (decision, available, notified_at) = if !observation.passes_filters {
            if was_available {
                (TransitionDecision::BecameUnavailable, false, None)
            } else {
                (TransitionDecision::Ignore, false, None)
            }
        } else if !observation.in_stock {
            if was_available {
                (TransitionDecision::BecameUnavailable, false, None)
            } else {
                (TransitionDecision::NoChange, false, None)
            }
        } else if !was_available {
            (TransitionDecision::BecameAvailable, true, Some(now))
        } else if self.renotify_due(previous_notified_at, now) {
            (TransitionDecision::RemainsAvailableRenotify, true, Some(now))
        } else {
            (TransitionDecision::NoChange, true, previous_notified_at)
        };

        self.state = Some(LinkState {
            last: observation.clone(),
            available,
            notified_at,
        });
        decision
    }

    fn renotify_due(&self, notified_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        let Some(interval) = self.renotify_interval else {
            return false;
        };
        let Some(notified_at) = notified_at else {
            return true;
        };
        match chrono::Duration::from_std(interval) {
            Ok(interval) => now - notified_at >= interval,
            Err(_) => false,
        }
    }
}

//! Monitoring statistics tracking.
//!
//! Thread-safe counters for check outcomes, notification deliveries and a few
//! notable events, shared by every link task.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use strum::IntoEnumIterator;
use strum_macros::EnumIter as EnumIterMacro;

use crate::models::CheckOutcome;
use crate::notification::DeliveryStatus;

/// Notable events that are neither check outcomes nor deliveries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum EventType {
    /// A link went from unavailable to available.
    BecameAvailable,
    /// A link that was available stopped being so.
    BecameUnavailable,
    /// A still-available link was re-announced after the cooldown.
    Renotified,
    /// An operator alert was sent (blocked streak or CAPTCHA).
    OperatorAlert,
    /// A link task stopped polling because of the CAPTCHA policy.
    LinkDisabled,
}

impl EventType {
    /// Human-readable label used in the final statistics
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::BecameAvailable => "Became available",
            EventType::BecameUnavailable => "Became unavailable",
            EventType::Renotified => "Re-notified",
            EventType::OperatorAlert => "Operator alert",
            EventType::LinkDisabled => "Link disabled",
        }
    }
}

/// Thread-safe monitoring statistics tracker.
///
/// Every enum variant is initialized to zero on creation, so lookups never
/// miss. Share it across tasks with `Arc`.
pub struct MonitorStats {
    checks: HashMap<CheckOutcome, AtomicUsize>,
    deliveries: HashMap<DeliveryStatus, AtomicUsize>,
    events: HashMap<EventType, AtomicUsize>,
}

impl MonitorStats {
    /// Creates a tracker with every counter at zero.
    pub fn new() -> Self {
        let mut checks = HashMap::new();
        for outcome in CheckOutcome::iter() {
            checks.insert(outcome, AtomicUsize::new(0));
        }

        let mut deliveries = HashMap::new();
        for status in DeliveryStatus::iter() {
            deliveries.insert(status, AtomicUsize::new(0));
        }

        let mut events = HashMap::new();
        for event in EventType::iter() {
            events.insert(event, AtomicUsize::new(0));
        }

        MonitorStats {
            checks,
            deliveries,
            events,
        }
    }

    /// Counts one check outcome.
    pub fn record_check(&self, outcome: CheckOutcome) {
        if let Some(counter) = self.checks.get(&outcome) {
            counter.fetch_add(1, Ordering::Relaxed);
        } else {
            log::error!(
                "Attempted to increment check counter for {:?} which is not in the map",
                outcome
            );
        }
    }

    /// Counts one channel delivery.
    pub fn record_delivery(&self, status: DeliveryStatus) {
        if let Some(counter) = self.deliveries.get(&status) {
            counter.fetch_add(1, Ordering::Relaxed);
        } else {
            log::error!(
                "Attempted to increment delivery counter for {:?} which is not in the map",
                status
            );
        }
    }

    /// Counts one notable event.
    pub fn record_event(&self, event: EventType) {
        if let Some(counter) = self.events.get(&event) {
            counter.fetch_add(1, Ordering::Relaxed);
        } else {
            log::error!(
                "Attempted to increment event counter for {:?} which is not in the map",
                event
            );
        }
    }

    /// Checks recorded with `outcome`.
    pub fn get_check_count(&self, outcome: CheckOutcome) -> usize {
        self.checks
            .get(&outcome)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Deliveries recorded with `status`.
    pub fn get_delivery_count(&self, status: DeliveryStatus) -> usize {
        self.deliveries
            .get(&status)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Occurrences of `event`.
    pub fn get_event_count(&self, event: EventType) -> usize {
        self.events
            .get(&event)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Total checks across all outcomes.
    pub fn total_checks(&self) -> usize {
        CheckOutcome::iter().map(|o| self.get_check_count(o)).sum()
    }

    /// Checks that did not end in `Success`.
    pub fn total_failed_checks(&self) -> usize {
        CheckOutcome::iter()
            .filter(|o| o.is_failure())
            .map(|o| self.get_check_count(o))
            .sum()
    }

    /// Total delivery attempts across all channels.
    pub fn total_deliveries(&self) -> usize {
        DeliveryStatus::iter()
            .map(|s| self.get_delivery_count(s))
            .sum()
    }
}

impl Default for MonitorStats {
    fn default() -> Self {
        Self::new()
    }
}

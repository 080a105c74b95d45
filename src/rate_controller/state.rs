//! Per-link timing state.

use std::time::Duration;

use tokio::time::Instant;

use crate::config::TimingConfig;

/// Mutable timing record of one link.
///
/// Owned by the link's task and mutated only through
/// `RateController::record_outcome`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateState {
    /// Earliest instant the next check may start
    pub next_eligible_at: Instant,
    /// Backoff the next failure will wait
    pub current_backoff: Duration,
    /// Failures of any kind since the last success
    pub consecutive_failures: u32,
    /// `Blocked` outcomes in a row
    pub blocked_streak: u32,
    /// `CaptchaDetected` outcomes in a row
    pub captcha_streak: u32,
    /// Set by a CAPTCHA, cleared by the next success. While set, every
    /// failure waits the maximum backoff.
    pub reduced_priority: bool,
}

impl RateState {
    /// Fresh state: eligible immediately, backoff at the target minimum.
    pub fn new(timing: &TimingConfig, now: Instant) -> Self {
        RateState {
            next_eligible_at: now,
            current_backoff: timing.min_backoff,
            consecutive_failures: 0,
            blocked_streak: 0,
            captcha_streak: 0,
            reduced_priority: false,
        }
    }
}

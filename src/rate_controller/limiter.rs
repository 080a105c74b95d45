//! Eligibility and backoff decisions for one target.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;

use crate::config::TimingConfig;
use crate::models::CheckOutcome;
use crate::rate_controller::policy::{CaptchaPolicy, KeepPolling};
use crate::rate_controller::RateState;

/// Timing policy of one target applied to its links' `RateState`s.
///
/// Stateless apart from configuration: every link owns its own `RateState`
/// and passes it in, so links never contend on the controller.
#[derive(Debug, Clone)]
pub struct RateController {
    timing: TimingConfig,
    captcha_policy: Arc<dyn CaptchaPolicy>,
}

impl RateController {
    /// Creates a controller for one target.
    pub fn new(timing: TimingConfig, captcha_policy: Arc<dyn CaptchaPolicy>) -> Self {
        RateController {
            timing,
            captcha_policy,
        }
    }

    /// Pacing and backoff bounds
    pub fn timing(&self) -> &TimingConfig {
        &self.timing
    }

    /// State of a link that has not been checked yet; eligible at `now`.
    pub fn initial_state(&self, now: Instant) -> RateState {
        RateState::new(&self.timing, now)
    }

    /// Whether the link may be checked at `now`.
    pub fn is_eligible(&self, state: &RateState, now: Instant) -> bool {
        now >= state.next_eligible_at
    }

    /// Earliest instant the link may be checked again.
    pub fn next_eligible_at(&self, state: &RateState) -> Instant {
        state.next_eligible_at
    }

    /// Applies one check outcome and schedules the next check.
    ///
    /// Returns the delay until the link is eligible again.
    ///
    /// - `Success` picks a uniformly random delay in `[min_delay, max_delay]`
    ///   and resets the backoff to `min_backoff`.
    /// - `TransientError`/`Blocked` wait the current backoff, then double it
    ///   for the next failure, capped at `max_backoff`.
    /// - `CaptchaDetected` waits `max_backoff` and marks the link as reduced
    ///   priority until its next success.
    pub fn record_outcome(&self, state: &mut RateState, outcome: CheckOutcome, now: Instant) -> Duration {
        let delay = match outcome {
            CheckOutcome::Success => {
                state.current_backoff = self.timing.min_backoff;
                state.consecutive_failures = 0;
                state.blocked_streak = 0;
                state.captcha_streak = 0;
                state.reduced_priority = false;
                self.success_delay()
            }
            CheckOutcome::TransientError | CheckOutcome::Blocked => {
                state.consecutive_failures = state.consecutive_failures.saturating_add(1);
                state.captcha_streak = 0;
                if outcome == CheckOutcome::Blocked {
                    state.blocked_streak = state.blocked_streak.saturating_add(1);
                } else {
                    state.blocked_streak = 0;
                }

                if state.reduced_priority {
                    state.current_backoff = self.timing.max_backoff;
                    self.timing.max_backoff
                } else {
                    let delay = state.current_backoff.min(self.timing.max_backoff);
                    state.current_backoff = delay.saturating_mul(2).min(self.timing.max_backoff);
                    delay
                }
            }
            CheckOutcome::CaptchaDetected => {
                state.consecutive_failures = state.consecutive_failures.saturating_add(1);
                state.blocked_streak = 0;
                state.captcha_streak = state.captcha_streak.saturating_add(1);
                state.reduced_priority = true;
                state.current_backoff = self.timing.max_backoff;
                self.timing.max_backoff
            }
        };

        state.next_eligible_at = now + delay;
        delay
    }

    /// Whether the captcha policy wants this link stopped.
    pub fn should_disable(&self, state: &RateState) -> bool {
        state.captcha_streak > 0 && self.captcha_policy.should_disable(state.captcha_streak)
    }

    fn success_delay(&self) -> Duration {
        let min = self.timing.min_delay.as_millis() as u64;
        let max = self.timing.max_delay.as_millis() as u64;
        if min >= max {
            return self.timing.min_delay;
        }
        Duration::from_millis(rand::rng().random_range(min..=max))
    }
}

impl Default for RateController {
    fn default() -> Self {
        RateController::new(TimingConfig::default(), Arc::new(KeepPolling))
    }
}

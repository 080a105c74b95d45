//! What to do with a link that keeps getting CAPTCHA pages.

use std::fmt::Debug;
use std::sync::Arc;

/// Decides whether a link should stop being polled after a CAPTCHA streak.
pub trait CaptchaPolicy: Debug + Send + Sync {
    /// `streak` is the number of consecutive `CaptchaDetected` outcomes,
    /// including the one just recorded.
    fn should_disable(&self, streak: u32) -> bool;
}

/// Never disables a link; CAPTCHAs only push the backoff to its maximum.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepPolling;

impl CaptchaPolicy for KeepPolling {
    fn should_disable(&self, _streak: u32) -> bool {
        false
    }
}

/// Disables a link after `n` consecutive CAPTCHA pages.
#[derive(Debug, Clone, Copy)]
pub struct DisableAfter(pub u32);

impl CaptchaPolicy for DisableAfter {
    fn should_disable(&self, streak: u32) -> bool {
        streak >= self.0
    }
}

/// Policy for the `CAPTCHA_DISABLE_AFTER` setting.
pub fn captcha_policy_from(disable_after: Option<u32>) -> Arc<dyn CaptchaPolicy> {
    match disable_after {
        Some(n) if n > 0 => Arc::new(DisableAfter(n)),
        _ => Arc::new(KeepPolling),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keep_polling_never_disables() {
        assert!(!KeepPolling.should_disable(u32::MAX));
    }

    #[test]
    fn test_disable_after_threshold() {
        let policy = DisableAfter(3);
        assert!(!policy.should_disable(2));
        assert!(policy.should_disable(3));
        assert!(policy.should_disable(4));
    }

    #[test]
    fn test_policy_from_setting() {
        assert!(!captcha_policy_from(None).should_disable(100));
        assert!(!captcha_policy_from(Some(0)).should_disable(100));
        assert!(captcha_policy_from(Some(2)).should_disable(2));
    }
}

//! Per-link scheduling: when a link may be checked again, and through which
//! proxy.
//!
//! This module provides:
//! - `RateState`, the timing record each link task owns
//! - `RateController`, the target's eligibility and backoff rules
//! - `ProxyPool`, round-robin rotation with cooldown for blocked proxies
//! - `CaptchaPolicy`, the pluggable rule for giving up on a link

mod limiter;
mod policy;
mod proxy;
mod state;

// Re-export public API
pub use limiter::RateController;
pub use policy::{captcha_policy_from, CaptchaPolicy, DisableAfter, KeepPolling};
pub use proxy::ProxyPool;
pub use state::RateState;

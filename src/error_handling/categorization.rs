//! Error categorization and retry strategy.
//!
//! Maps adapter failures onto check outcomes and HTTP responses onto adapter
//! failures, and builds the exponential backoff used by HTTP channels.

use std::time::Duration;
use tokio_retry::strategy::ExponentialBackoff;

use super::types::{AdapterError, ChannelError};
use crate::config::BLOCKING_STATUS_CODES;
use crate::models::CheckOutcome;

/// Creates the exponential backoff retry strategy used by HTTP channels.
///
/// Returns a retry strategy configured with:
/// - Initial delay: `CHANNEL_RETRY_INITIAL_DELAY_MS` milliseconds, doubling
/// - Maximum delay: `CHANNEL_RETRY_MAX_DELAY_SECS` seconds
/// - Maximum attempts: `CHANNEL_RETRY_MAX_ATTEMPTS`
pub fn get_retry_strategy() -> impl Iterator<Item = Duration> {
    // tokio-retry yields factor * base^n, starting at n = 1
    ExponentialBackoff::from_millis(2)
        .factor(crate::config::CHANNEL_RETRY_INITIAL_DELAY_MS / 2)
        .max_delay(Duration::from_secs(
            crate::config::CHANNEL_RETRY_MAX_DELAY_SECS,
        ))
        .take(crate::config::CHANNEL_RETRY_MAX_ATTEMPTS)
}

/// Folds an adapter error into the outcome the rate controller acts on.
pub fn categorize_adapter_error(error: &AdapterError) -> CheckOutcome {
    match error {
        AdapterError::NetworkFailure(_) => CheckOutcome::TransientError,
        AdapterError::ParseAmbiguous(_) => CheckOutcome::TransientError,
        AdapterError::HttpBlocked(_) => CheckOutcome::Blocked,
        AdapterError::CaptchaPage => CheckOutcome::CaptchaDetected,
    }
}

/// Classifies an HTTP status returned for a product page.
///
/// Blocking codes become `HttpBlocked`, any other non-success code is a
/// network-level failure, and 2xx/3xx yield `None`.
pub fn categorize_status(status: u16) -> Option<AdapterError> {
    if BLOCKING_STATUS_CODES.contains(&status) {
        return Some(AdapterError::HttpBlocked(status));
    }
    if (400..600).contains(&status) {
        return Some(AdapterError::NetworkFailure(format!("HTTP status {status}")));
    }
    None
}

/// Categorizes a `reqwest::Error` raised while fetching a product page.
pub fn categorize_reqwest_error(error: &reqwest::Error) -> AdapterError {
    if let Some(status) = error.status() {
        if let Some(categorized) = categorize_status(status.as_u16()) {
            return categorized;
        }
    }

    if error.is_timeout() {
        AdapterError::NetworkFailure("request timed out".to_string())
    } else if error.is_connect() {
        AdapterError::NetworkFailure(format!("connect error: {error}"))
    } else if error.is_decode() || error.is_body() {
        AdapterError::NetworkFailure(format!("body error: {error}"))
    } else {
        AdapterError::NetworkFailure(error.to_string())
    }
}

/// Whether a channel send is worth retrying.
///
/// Transport failures, 429 and 5xx are retried; other statuses and payload
/// errors are permanent.
pub fn is_retriable_channel_error(error: &ChannelError) -> bool {
    match error {
        ChannelError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
        ChannelError::Status(status) => *status == 429 || (500..600).contains(status),
        ChannelError::Payload(_) => false,
    }
}

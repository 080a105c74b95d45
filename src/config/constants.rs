//! Configuration constants.
//!
//! Defaults for timing, backoff, proxy bookkeeping and channel retries.

use std::time::Duration;

/// Default catalog file path
pub const DEFAULT_CATALOG_PATH: &str = "./catalog.json";

// Inter-check delay after a successful check
/// Lower bound of the randomized delay between two checks of the same link
pub const DEFAULT_MIN_DELAY_MS: u64 = 5_000;
/// Upper bound of the randomized delay between two checks of the same link
pub const DEFAULT_MAX_DELAY_MS: u64 = 10_000;

// Failure backoff
/// First backoff applied after a failure; also the value restored after a success
pub const DEFAULT_MIN_BACKOFF_MS: u64 = 10_000;
/// Backoff ceiling (1 hour)
pub const DEFAULT_MAX_BACKOFF_MS: u64 = 3_600_000;

/// Maximum duration of one check, adapter fetch included
pub const DEFAULT_CHECK_TIMEOUT_MS: u64 = 30_000;

/// Concurrent checks per target. One request at a time avoids parallel-request
/// fingerprinting by anti-bot systems.
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 1;

/// Consecutive `Blocked` outcomes on one link before an operator alert is sent
pub const DEFAULT_BLOCKED_ALERT_STREAK: u32 = 5;

/// HTTP status codes that mean the site is rejecting us
pub const BLOCKING_STATUS_CODES: [u16; 3] = [403, 429, 503];

// Proxy pool bookkeeping
/// Consecutive `Blocked` outcomes through one proxy before it is benched
pub const PROXY_BLOCKED_THRESHOLD: u32 = 3;
/// How long a benched proxy is skipped
pub const PROXY_COOLDOWN: Duration = Duration::from_secs(300);
/// Suffix of per-target proxy list files (`<target>.proxies`)
pub const PROXY_FILE_SUFFIX: &str = "proxies";
/// Proxy list used when a target has no file of its own
pub const GLOBAL_PROXY_LIST: &str = "global";

/// Targets that still work but are known to be unreliable
pub const DEPRECATED_TARGETS: &[(&str, &str)] =
    &[("evga", "deprecated since they only support queuing")];

/// Progress log interval in seconds
pub const LOGGING_INTERVAL: u64 = 60;

// Channel retry strategy
/// First delay before a channel retries a failed send
pub const CHANNEL_RETRY_INITIAL_DELAY_MS: u64 = 500;
/// Maximum delay between channel retries in seconds
pub const CHANNEL_RETRY_MAX_DELAY_SECS: u64 = 5;
/// Maximum number of retries per send
pub const CHANNEL_RETRY_MAX_ATTEMPTS: usize = 3;
/// Per-request timeout for notification endpoints
pub const CHANNEL_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum product page size read by the selector adapter (5MB)
pub const MAX_PAGE_BODY_SIZE: usize = 5 * 1024 * 1024;

/// Default User-Agent string for product page requests.
///
/// Users can override this via the `--user-agent` CLI flag.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

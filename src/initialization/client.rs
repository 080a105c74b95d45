//! HTTP client initialization.

use std::sync::Arc;

use crate::config::MonitorConfig;
use reqwest::ClientBuilder;

/// Initializes the HTTP client shared by adapters and channels.
///
/// Creates a `reqwest::Client` configured with:
/// - User-Agent header from the configuration
/// - The check timeout as the default request timeout
/// - Redirect following (up to 10 hops, reqwest's default)
///
/// Proxied requests get their own clients, built by the adapter on demand.
///
/// # Errors
///
/// Returns a `reqwest::Error` if client creation fails.
pub fn init_client(config: &MonitorConfig) -> Result<Arc<reqwest::Client>, reqwest::Error> {
    let client = ClientBuilder::new()
        .timeout(config.check_timeout)
        .user_agent(config.user_agent.clone())
        .build()?;
    Ok(Arc::new(client))
}

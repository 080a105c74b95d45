//! Error type definitions.
//!
//! Only configuration and initialization errors are allowed to abort the
//! process. Adapter and channel errors are absorbed where they happen.

use std::path::PathBuf;

use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing the HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),
}

/// Startup-time configuration problems. Never produced during polling.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    /// The catalog file could not be read.
    #[error("Failed to read catalog file {path}: {source}")]
    CatalogRead {
        /// Path that was attempted
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The catalog file is not valid JSON for the expected schema.
    #[error("Failed to parse catalog file: {0}")]
    CatalogParse(#[from] serde_json::Error),

    /// Two targets share a name.
    #[error("Duplicate target '{0}' in catalog")]
    DuplicateTarget(String),

    /// No target survived selection.
    #[error("No targets selected; check STORES and the catalog file")]
    NoTargets,

    /// A filter or selection entry could not be parsed.
    #[error("Malformed {kind} entry '{entry}': {reason}")]
    MalformedEntry {
        /// Which list the entry came from (e.g. "SHOW_ONLY_MODELS")
        kind: &'static str,
        /// The raw entry
        entry: String,
        /// Why it was rejected
        reason: String,
    },

    /// A min/max pair is unusable even after repair.
    #[error("Invalid {what} range for '{name}': min {min_ms}ms > max {max_ms}ms")]
    InvalidRange {
        /// Which pair ("delay", "backoff")
        what: &'static str,
        /// Target name, or "default"
        name: String,
        /// Minimum in milliseconds
        min_ms: u64,
        /// Maximum in milliseconds
        max_ms: u64,
    },

    /// A link or channel URL does not parse.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// The raw URL
        url: String,
        /// Parse error text
        reason: String,
    },

    /// A proxy entry cannot be used by the HTTP client.
    #[error("Invalid proxy '{proxy}' for target '{target}': {reason}")]
    InvalidProxy {
        /// Target the proxy list belongs to
        target: String,
        /// The raw proxy entry
        proxy: String,
        /// Why the client rejected it
        reason: String,
    },

    /// A target references an adapter that is not registered.
    #[error("No adapter registered for target '{0}'")]
    MissingAdapter(String),

    /// A value is outside its allowed domain.
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue {
        /// Option name
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },
}

/// Errors surfaced by a scraping adapter for one fetch.
///
/// These are the four kinds the checker knows how to interpret; adapters map
/// their own failures onto them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdapterError {
    /// Connection, DNS, TLS or body read failure.
    #[error("Network failure: {0}")]
    NetworkFailure(String),

    /// The site answered with a blocking status code.
    #[error("Blocked with HTTP status {0}")]
    HttpBlocked(u16),

    /// The site served a CAPTCHA page.
    #[error("CAPTCHA page served")]
    CaptchaPage,

    /// The page could not be read as either in or out of stock.
    #[error("Ambiguous page: {0}")]
    ParseAmbiguous(String),
}

/// Failure to deliver through one notification channel.
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Transport-level failure.
    #[error("HTTP error: {0}")]
    Http(#[from] ReqwestError),

    /// The remote endpoint answered with a non-success status.
    #[error("Endpoint returned HTTP status {0}")]
    Status(u16),

    /// The payload could not be built.
    #[error("Payload error: {0}")]
    Payload(String),
}

//! Application configuration and constants.
//!
//! This module provides:
//! - Configuration constants (delays, backoff, timeouts, etc.)
//! - CLI option types and parsing
//! - The validated `MonitorConfig` assembled once at startup

mod constants;
mod settings;
mod types;

// Re-export all constants
pub use constants::*;
pub use settings::{
    load_proxy_list, parse_model_entry, parse_price_entry, parse_store_entry, resolve_max,
    resolve_min, MonitorConfig, StoreSelection, TimingConfig,
};
pub use types::{LogFormat, LogLevel, Opt};

//! Error handling and monitoring statistics.
//!
//! This module provides:
//! - Error type definitions (configuration, adapter, channel, initialization)
//! - Normalization of adapter failures into check outcomes
//! - Retry strategy for notification channels
//! - Monitoring statistics (check outcomes, deliveries, notable events)

mod categorization;
mod stats;
mod types;

// Re-export public API
pub use categorization::{
    categorize_adapter_error, categorize_reqwest_error, categorize_status, get_retry_strategy,
    is_retriable_channel_error,
};
pub use stats::{EventType, MonitorStats};
pub use types::{AdapterError, ChannelError, ConfigurationError, InitializationError};

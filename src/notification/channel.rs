//! Channel capability and per-channel delivery reporting.

use serde::Serialize;
use strum_macros::EnumIter as EnumIterMacro;

use crate::error_handling::ChannelError;
use crate::notification::Notification;

/// A notification transport.
///
/// Retrying a failed send is the channel's own business; the dispatcher
/// calls `send` once per notification.
#[async_trait::async_trait]
pub trait Channel: Send + Sync {
    /// Stable name used in logs and reports.
    fn name(&self) -> &str;

    /// Delivers one notification to the resolved recipients.
    async fn send(&self, notification: &Notification, recipients: &[String]) -> Result<(), ChannelError>;
}

/// Result of one delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, EnumIterMacro)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// `send` returned success
    Delivered,
    /// Routing resolved no recipients; nothing was sent
    Suppressed,
    /// `send` returned an error
    Failed,
}

impl DeliveryStatus {
    /// Tag used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Suppressed => "suppressed",
            DeliveryStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-channel outcome of a dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    /// Channel name
    pub channel: String,
    /// What happened
    pub status: DeliveryStatus,
    /// Number of resolved recipients
    pub recipients: usize,
    /// Error text when `status` is `Failed`
    pub error: Option<String>,
}

impl DeliveryReport {
    /// Whether the channel accepted the notification
    pub fn is_delivered(&self) -> bool {
        self.status == DeliveryStatus::Delivered
    }
}

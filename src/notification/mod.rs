//! Notification dispatch.
//!
//! This module provides:
//! - `NotificationEvent` and `OperatorAlert`, the values channels deliver
//! - The `Channel` capability and the shipped channels (log, webhook, discord)
//! - Series-based recipient routing
//! - `NotificationDispatcher`, which fans one notification out to every
//!   channel independently

mod channel;
mod channels;
mod event;
mod routing;

use std::sync::Arc;

use futures::future::join_all;
use log::{info, warn};

use crate::error_handling::{EventType, MonitorStats};

pub use channel::{Channel, DeliveryReport, DeliveryStatus};
pub use channels::{
    build_channels, ChannelConfig, ChannelEntry, DiscordChannel, LogChannel, RegisteredChannel,
    WebhookChannel,
};
pub use event::{AlertKind, Notification, NotificationEvent, NotifyReason, OperatorAlert};
pub use routing::RecipientRouting;

/// Fans notifications out to channels.
///
/// Restock events go to regular channels, operator alerts to channels flagged
/// `operator`. Channels are sent to concurrently; one failing or slow channel
/// does not affect the reports of the others, and nothing is retried here.
pub struct NotificationDispatcher {
    channels: Vec<RegisteredChannel>,
    stats: Arc<MonitorStats>,
}

impl NotificationDispatcher {
    /// Creates a dispatcher over `channels`, counting deliveries in `stats`.
    pub fn new(channels: Vec<RegisteredChannel>, stats: Arc<MonitorStats>) -> Self {
        let operator = channels.iter().filter(|c| c.operator).count();
        info!(
            "Notification dispatcher ready: {} channel(s), {} for operator alerts",
            channels.len() - operator,
            operator
        );
        NotificationDispatcher { channels, stats }
    }

    /// Number of registered channels, operator channels included
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Delivers a restock event to every regular channel.
    pub async fn dispatch(&self, event: NotificationEvent) -> Vec<DeliveryReport> {
        self.fan_out(&Notification::Restock(event), false).await
    }

    /// Delivers an operator alert to the reserved operator channels.
    pub async fn alert_operator(&self, alert: OperatorAlert) -> Vec<DeliveryReport> {
        let notification = Notification::Operator(alert);
        if !self.channels.iter().any(|c| c.operator) {
            warn!("No operator channel configured: {}", notification.summary());
            return Vec::new();
        }
        self.stats.record_event(EventType::OperatorAlert);
        self.fan_out(&notification, true).await
    }

    async fn fan_out(&self, notification: &Notification, operator: bool) -> Vec<DeliveryReport> {
        let deliveries = self
            .channels
            .iter()
            .filter(|registered| registered.operator == operator)
            .map(|registered| self.deliver(registered, notification));
        join_all(deliveries).await
    }

    async fn deliver(&self, registered: &RegisteredChannel, notification: &Notification) -> DeliveryReport {
        let name = registered.channel.name().to_string();

        let report = match registered.routing.resolve(notification.series()) {
            None => DeliveryReport {
                channel: name,
                status: DeliveryStatus::Suppressed,
                recipients: 0,
                error: None,
            },
            Some(recipients) => match registered.channel.send(notification, recipients).await {
                Ok(()) => DeliveryReport {
                    channel: name,
                    status: DeliveryStatus::Delivered,
                    recipients: recipients.len(),
                    error: None,
                },
                Err(e) => DeliveryReport {
                    channel: name,
                    status: DeliveryStatus::Failed,
                    recipients: recipients.len(),
                    error: Some(e.to_string()),
                },
            },
        };

        self.stats.record_delivery(report.status);
        match &report.error {
            Some(error) => warn!(
                "dispatch channel={} link={} reason={} outcome={} recipients={} error={}",
                report.channel,
                notification.link_url(),
                notification.reason(),
                report.status,
                report.recipients,
                error
            ),
            None => info!(
                "dispatch channel={} link={} reason={} outcome={} recipients={}",
                report.channel,
                notification.link_url(),
                notification.reason(),
                report.status,
                report.recipients
            ),
        }
        report
    }
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("channels", &self.channels)
            .finish()
    }
}

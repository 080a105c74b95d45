//! Values handed to notification channels.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::catalog::Link;
use crate::models::Observation;

/// Why a restock notification is being sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyReason {
    /// First in-stock observation of a streak
    BecameAvailable,
    /// Re-announcement after the cooldown
    StillAvailable,
}

impl NotifyReason {
    /// Tag used in logs and payloads
    pub fn as_str(&self) -> &'static str {
        match self {
            NotifyReason::BecameAvailable => "became_available",
            NotifyReason::StillAvailable => "still_available",
        }
    }
}

/// A product that is worth buying now.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationEvent {
    /// Target (store) name
    pub target: String,
    /// Product page that was observed in stock
    pub link_url: String,
    /// Product brand
    pub brand: String,
    /// Product series, used for recipient routing
    pub series: String,
    /// Product model
    pub model: String,
    /// Price extracted from the page, if any
    pub price: Option<f64>,
    /// When the in-stock observation was made
    pub timestamp: DateTime<Utc>,
    /// First announcement or re-announcement
    pub reason: NotifyReason,
}

impl NotificationEvent {
    /// Builds the event for `link` from the observation that triggered it.
    pub fn new(link: &Link, observation: &Observation, reason: NotifyReason) -> Self {
        NotificationEvent {
            target: link.target.clone(),
            link_url: link.url.clone(),
            brand: link.brand.clone(),
            series: link.series.clone(),
            model: link.model.clone(),
            price: observation.price,
            timestamp: observation.timestamp,
            reason,
        }
    }
}

/// Why an operator alert is being sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlertKind {
    /// `streak` consecutive `Blocked` outcomes
    BlockedStreak {
        /// Consecutive blocks so far
        streak: u32,
    },
    /// A CAPTCHA page was served
    Captcha {
        /// Consecutive CAPTCHA pages so far
        streak: u32,
    },
    /// The link stopped being polled
    LinkDisabled {
        /// Consecutive CAPTCHA pages that led to disabling
        captcha_streak: u32,
    },
}

/// A condition the operator should look at (rotate proxies, slow down).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperatorAlert {
    /// Target (store) name
    pub target: String,
    /// Link that triggered the alert
    pub link_url: String,
    /// Time of the triggering check
    pub timestamp: DateTime<Utc>,
    /// What happened
    #[serde(flatten)]
    pub kind: AlertKind,
}

impl OperatorAlert {
    /// Builds an alert about `link`.
    pub fn new(link: &Link, kind: AlertKind, timestamp: DateTime<Utc>) -> Self {
        OperatorAlert {
            target: link.target.clone(),
            link_url: link.url.clone(),
            timestamp,
            kind,
        }
    }
}

/// Anything a channel can deliver.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// Restock event for regular channels
    Restock(NotificationEvent),
    /// Alert for operator channels
    Operator(OperatorAlert),
}

impl Notification {
    /// Series used for recipient routing. Operator alerts are not routed by
    /// series.
    pub fn series(&self) -> Option<&str> {
        match self {
            Notification::Restock(event) => Some(&event.series),
            Notification::Operator(_) => None,
        }
    }

    /// Link the notification is about
    pub fn link_url(&self) -> &str {
        match self {
            Notification::Restock(event) => &event.link_url,
            Notification::Operator(alert) => &alert.link_url,
        }
    }

    /// Short reason tag for logs.
    pub fn reason(&self) -> &'static str {
        match self {
            Notification::Restock(event) => event.reason.as_str(),
            Notification::Operator(alert) => match alert.kind {
                AlertKind::BlockedStreak { .. } => "blocked_streak",
                AlertKind::Captcha { .. } => "captcha",
                AlertKind::LinkDisabled { .. } => "link_disabled",
            },
        }
    }

    /// One-line title for human-facing channels.
    pub fn title(&self) -> String {
        match self {
            Notification::Restock(event) => {
                let verb = match event.reason {
                    NotifyReason::BecameAvailable => "IN STOCK",
                    NotifyReason::StillAvailable => "STILL IN STOCK",
                };
                format!(
                    "🚀 {verb}: {} {} ({}) at {}",
                    event.brand, event.model, event.series, event.target
                )
            }
            Notification::Operator(alert) => match alert.kind {
                AlertKind::BlockedStreak { streak } => {
                    format!("⚠️ {} blocked {streak} times in a row", alert.target)
                }
                AlertKind::Captcha { streak } => {
                    format!("⚠️ {} served a CAPTCHA ({streak} in a row)", alert.target)
                }
                AlertKind::LinkDisabled { captcha_streak } => format!(
                    "⛔ {} link disabled after {captcha_streak} CAPTCHAs",
                    alert.target
                ),
            },
        }
    }

    /// Title plus price and URL.
    pub fn summary(&self) -> String {
        match self {
            Notification::Restock(event) => match event.price {
                Some(price) => format!("{} for {:.2}: {}", self.title(), price, event.link_url),
                None => format!("{}: {}", self.title(), event.link_url),
            },
            Notification::Operator(alert) => format!("{}: {}", self.title(), alert.link_url),
        }
    }
}

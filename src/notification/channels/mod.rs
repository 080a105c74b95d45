//! Concrete channels and their construction from the catalog file.

mod discord;
mod logging;
mod webhook;

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tokio_retry::RetryIf;
use url::Url;

use crate::config::CHANNEL_REQUEST_TIMEOUT;
use crate::error_handling::{get_retry_strategy, is_retriable_channel_error, ChannelError, ConfigurationError};
use crate::notification::{Channel, RecipientRouting};

pub use discord::DiscordChannel;
pub use logging::LogChannel;
pub use webhook::WebhookChannel;

/// Transport of a configured channel.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelConfig {
    /// Application log
    Log,
    /// Generic JSON webhook
    Webhook {
        /// Endpoint receiving the POST
        url: String,
    },
    /// Discord webhook
    Discord {
        /// Discord webhook URL
        url: String,
    },
}

impl ChannelConfig {
    fn kind(&self) -> &'static str {
        match self {
            ChannelConfig::Log => "log",
            ChannelConfig::Webhook { .. } => "webhook",
            ChannelConfig::Discord { .. } => "discord",
        }
    }
}

/// One `channels` entry of the catalog file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChannelEntry {
    /// Name used in logs; defaults to `<type>-<position>`
    #[serde(default)]
    pub name: Option<String>,
    /// Transport and its endpoint
    #[serde(flatten)]
    pub config: ChannelConfig,
    /// Reserved for operator alerts instead of restock notifications
    #[serde(default)]
    pub operator: bool,
    /// Recipients per series
    #[serde(default)]
    pub routing: RecipientRouting,
}

/// A channel ready for the dispatcher.
#[derive(Clone)]
pub struct RegisteredChannel {
    /// The transport
    pub channel: Arc<dyn Channel>,
    /// Recipient routing applied before each send
    pub routing: RecipientRouting,
    /// Receives operator alerts instead of restock events
    pub operator: bool,
}

impl RegisteredChannel {
    /// Registers a channel for restock events.
    pub fn new(channel: Arc<dyn Channel>, routing: RecipientRouting) -> Self {
        RegisteredChannel {
            channel,
            routing,
            operator: false,
        }
    }

    /// Same channel, reserved for operator alerts.
    pub fn operator(channel: Arc<dyn Channel>) -> Self {
        RegisteredChannel {
            channel,
            routing: RecipientRouting::default(),
            operator: true,
        }
    }
}

impl std::fmt::Debug for RegisteredChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredChannel")
            .field("name", &self.channel.name())
            .field("operator", &self.operator)
            .field("routing", &self.routing)
            .finish()
    }
}

/// Builds channels from catalog entries.
///
/// # Errors
///
/// Returns `ConfigurationError::InvalidUrl` for an endpoint that does not
/// parse as an http(s) URL.
pub fn build_channels(
    entries: &[ChannelEntry],
    client: &Arc<reqwest::Client>,
) -> Result<Vec<RegisteredChannel>, ConfigurationError> {
    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let name = entry
                .name
                .clone()
                .unwrap_or_else(|| format!("{}-{}", entry.config.kind(), index));
            let channel: Arc<dyn Channel> = match &entry.config {
                ChannelConfig::Log => Arc::new(LogChannel::new(name)),
                ChannelConfig::Webhook { url } => {
                    Arc::new(WebhookChannel::new(name, endpoint(url)?, Arc::clone(client)))
                }
                ChannelConfig::Discord { url } => {
                    Arc::new(DiscordChannel::new(name, endpoint(url)?, Arc::clone(client)))
                }
            };
            Ok(RegisteredChannel {
                channel,
                routing: entry.routing.clone(),
                operator: entry.operator,
            })
        })
        .collect()
}

fn endpoint(raw: &str) -> Result<Url, ConfigurationError> {
    let url = Url::parse(raw).map_err(|e| ConfigurationError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigurationError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme {}", url.scheme()),
        });
    }
    Ok(url)
}

/// POSTs a JSON payload, retrying transient failures with exponential backoff.
pub(crate) async fn post_json(
    client: &reqwest::Client,
    url: &Url,
    payload: &Value,
) -> Result<(), ChannelError> {
    RetryIf::spawn(
        get_retry_strategy(),
        move || async move {
            let response = client
                .post(url.clone())
                .timeout(CHANNEL_REQUEST_TIMEOUT)
                .json(payload)
                .send()
                .await?;
            let status = response.status();
            if status.is_success() {
                Ok(())
            } else {
                Err(ChannelError::Status(status.as_u16()))
            }
        },
        is_retriable_channel_error,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(json: &str) -> Vec<ChannelEntry> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_parse_channel_entries() {
        let parsed = entries(
            r#"[{"type":"log"},
                {"type":"webhook","url":"https://ops.example.com/hook","operator":true},
                {"type":"discord","name":"gpu-drops","url":"https://discord.com/api/webhooks/1/x",
                 "routing":{"default":["<@&1>"],"by_series":{"3090":["<@&2>"]}}}]"#,
        );
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[0].config, ChannelConfig::Log);
        assert!(parsed[1].operator);
        assert_eq!(parsed[2].name.as_deref(), Some("gpu-drops"));
        assert_eq!(parsed[2].routing.default, vec!["<@&1>"]);
    }

    #[test]
    fn test_unknown_channel_type_rejected() {
        let result: Result<Vec<ChannelEntry>, _> = serde_json::from_str(r#"[{"type":"carrier-pigeon"}]"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_build_channels_names_and_flags() {
        let client = Arc::new(reqwest::Client::new());
        let built = build_channels(
            &entries(r#"[{"type":"log"},{"type":"webhook","url":"https://x.example/h","operator":true}]"#),
            &client,
        )
        .unwrap();
        assert_eq!(built[0].channel.name(), "log-0");
        assert!(!built[0].operator);
        assert_eq!(built[1].channel.name(), "webhook-1");
        assert!(built[1].operator);
    }

    #[test]
    fn test_build_channels_rejects_bad_url() {
        let client = Arc::new(reqwest::Client::new());
        for url in ["not a url", "mailto:ops@example.com"] {
            let result = build_channels(
                &entries(&format!(r#"[{{"type":"webhook","url":"{url}"}}]"#)),
                &client,
            );
            assert!(matches!(result, Err(ConfigurationError::InvalidUrl { .. })));
        }
    }
}

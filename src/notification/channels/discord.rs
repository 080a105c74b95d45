use std::sync::Arc;

use serde_json::{json, Value};
use url::Url;

use crate::error_handling::ChannelError;
use crate::notification::channels::post_json;
use crate::notification::{Channel, Notification};

const COLOR_IN_STOCK: u32 = 0x36_a6_4f;
const COLOR_ALERT: u32 = 0xe0_9b_1c;

/// Discord webhook with role/user mentions taken from the routing groups.
pub struct DiscordChannel {
    name: String,
    url: Url,
    client: Arc<reqwest::Client>,
}

impl DiscordChannel {
    /// Creates a channel posting to the Discord webhook at `url`.
    pub fn new(name: impl Into<String>, url: Url, client: Arc<reqwest::Client>) -> Self {
        DiscordChannel {
            name: name.into(),
            url,
            client,
        }
    }
}

/// Embed plus mentions in the message content.
fn build_payload(notification: &Notification, recipients: &[String]) -> Value {
    let mut fields = Vec::new();
    let (color, url) = match notification {
        Notification::Restock(event) => {
            fields.push(json!({"name": "Store", "value": event.target, "inline": true}));
            fields.push(json!({"name": "Brand", "value": event.brand, "inline": true}));
            fields.push(json!({"name": "Series", "value": event.series, "inline": true}));
            fields.push(json!({"name": "Model", "value": event.model, "inline": true}));
            if let Some(price) = event.price {
                fields.push(json!({"name": "Price", "value": format!("{price:.2}"), "inline": true}));
            }
            (COLOR_IN_STOCK, event.link_url.as_str())
        }
        Notification::Operator(alert) => {
            fields.push(json!({"name": "Store", "value": alert.target, "inline": true}));
            (COLOR_ALERT, alert.link_url.as_str())
        }
    };

    let timestamp = match notification {
        Notification::Restock(event) => event.timestamp,
        Notification::Operator(alert) => alert.timestamp,
    };

    json!({
        "content": recipients.join(" "),
        "username": "stock_watch",
        "embeds": [{
            "title": notification.title(),
            "url": url,
            "color": color,
            "fields": fields,
            "timestamp": timestamp.to_rfc3339(),
        }],
    })
}

#[async_trait::async_trait]
impl Channel for DiscordChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, notification: &Notification, recipients: &[String]) -> Result<(), ChannelError> {
        let payload = build_payload(notification, recipients);
        post_json(&self.client, &self.url, &payload).await
    }
}

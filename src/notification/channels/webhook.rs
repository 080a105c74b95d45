use std::sync::Arc;

use serde::Serialize;
use url::Url;

use crate::error_handling::ChannelError;
use crate::notification::channels::post_json;
use crate::notification::{Channel, Notification};

#[derive(Serialize)]
struct WebhookPayload<'a> {
    #[serde(flatten)]
    notification: &'a Notification,
    text: String,
    recipients: &'a [String],
}

/// POSTs the notification as JSON to a generic endpoint.
pub struct WebhookChannel {
    name: String,
    url: Url,
    client: Arc<reqwest::Client>,
}

impl WebhookChannel {
    /// Creates a channel posting to `url`.
    pub fn new(name: impl Into<String>, url: Url, client: Arc<reqwest::Client>) -> Self {
        WebhookChannel {
            name: name.into(),
            url,
            client,
        }
    }
}

#[async_trait::async_trait]
impl Channel for WebhookChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, notification: &Notification, recipients: &[String]) -> Result<(), ChannelError> {
        let payload = serde_json::to_value(WebhookPayload {
            notification,
            text: notification.summary(),
            recipients,
        })
        .map_err(|e| ChannelError::Payload(e.to_string()))?;
        post_json(&self.client, &self.url, &payload).await
    }
}

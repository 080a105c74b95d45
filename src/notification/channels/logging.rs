use crate::error_handling::ChannelError;
use crate::notification::{Channel, Notification};

/// Writes notifications to the application log.
#[derive(Debug, Clone)]
pub struct LogChannel {
    name: String,
}

impl LogChannel {
    /// Creates a log channel named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        LogChannel { name: name.into() }
    }
}

impl Default for LogChannel {
    fn default() -> Self {
        LogChannel::new("log")
    }
}

#[async_trait::async_trait]
impl Channel for LogChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, notification: &Notification, recipients: &[String]) -> Result<(), ChannelError> {
        match notification {
            Notification::Restock(_) if recipients.is_empty() => {
                log::info!("{}", notification.summary())
            }
            Notification::Restock(_) => {
                log::info!("{} [{}]", notification.summary(), recipients.join(", "))
            }
            Notification::Operator(_) => log::warn!("{}", notification.summary()),
        }
        Ok(())
    }
}

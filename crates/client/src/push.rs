//! Push messages turned into user notifications.

use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_core::Error;

/// Payload of a push signal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PushPayload {
    /// Text body of the push message, if any.
    #[serde(default)]
    pub text: Option<String>,
}

/// A notification ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Notification {
    pub title: String,
    pub icon: String,
    /// Constant across pushes, so a new notification replaces the previous one.
    pub tag: String,
}

/// The collaborator that actually shows notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn show(&self, notification: &Notification) -> Result<(), Error>;
}

/// Notifier that only records notifications in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn show(&self, notification: &Notification) -> Result<(), Error> {
        tracing::info!(
            title = %notification.title,
            icon = %notification.icon,
            tag = %notification.tag,
            "showing notification"
        );
        Ok(())
    }
}

/// Builds notifications with a fixed icon and tag and hands them to the notifier.
pub struct PushHandler {
    notifier: Arc<dyn Notifier>,
    icon: String,
    tag: String,
}

impl PushHandler {
    pub fn new(notifier: Arc<dyn Notifier>, icon: impl Into<String>, tag: impl Into<String>) -> Self {
        Self { notifier, icon: icon.into(), tag: tag.into() }
    }

    pub fn notification_for(&self, payload: &PushPayload) -> Notification {
        Notification { title: payload.text.clone().unwrap_or_default(), icon: self.icon.clone(), tag: self.tag.clone() }
    }

    /// Show a notification for the payload. Notifier failures are logged, not returned.
    pub async fn handle(&self, payload: &PushPayload) -> Notification {
        let notification = self.notification_for(payload);
        if let Err(e) = self.notifier.show(&notification).await {
            tracing::warn!(tag = %notification.tag, error = %e, "failed to show notification");
        }
        notification
    }
}

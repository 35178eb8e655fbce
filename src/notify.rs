//! Outbound notifications
//! Mission: Hand contact-form messages to whoever delivers them, fire-and-forget

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Deserialize)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub message: String,
}

/// Delivery abstraction for contact-form notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &ContactMessage) -> Result<()>;
}

/// Local dev notifier that logs instead of sending email.
#[derive(Clone, Debug)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &ContactMessage) -> Result<()> {
        info!(
            from_name = %message.name,
            from_email = %message.email,
            length = message.message.len(),
            "Contact notification"
        );
        Ok(())
    }
}

/// Deliver on a background task. Failures are logged, never surfaced.
pub fn dispatch(notifier: Arc<dyn Notifier>, message: ContactMessage) {
    tokio::spawn(async move {
        if let Err(e) = notifier.send(&message).await {
            warn!(error = %e, "Contact notification failed");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    struct ChannelNotifier(mpsc::UnboundedSender<String>);

    #[async_trait]
    impl Notifier for ChannelNotifier {
        async fn send(&self, message: &ContactMessage) -> Result<()> {
            self.0.send(message.email.clone())?;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_dispatch_delivers_in_background() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        dispatch(
            Arc::new(ChannelNotifier(tx)),
            ContactMessage {
                name: "Priya".to_string(),
                email: "priya@example.com".to_string(),
                message: "Do you cater weddings?".to_string(),
            },
        );

        assert_eq!(rx.recv().await.unwrap(), "priya@example.com");
    }
}

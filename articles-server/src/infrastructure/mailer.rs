use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> anyhow::Result<()>;
}

/// Transport that only records deliveries in the log after a fixed latency.
#[derive(Debug, Clone)]
pub struct LogMailer {
    delay: Duration,
}

impl LogMailer {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> anyhow::Result<()> {
        info!(to = %message.to, "sending email notification");
        tokio::time::sleep(self.delay).await;
        info!(
            to = %message.to,
            subject = %message.subject,
            body_len = message.body.len(),
            "email sent"
        );
        Ok(())
    }
}

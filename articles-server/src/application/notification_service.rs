use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::domain::error::DomainError;
use crate::infrastructure::mailer::{EmailMessage, Mailer};

#[derive(Clone)]
pub struct NotificationService {
    mailer: Arc<dyn Mailer>,
}

impl NotificationService {
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        Self { mailer }
    }

    /// Queues delivery on the runtime and returns without waiting for it.
    /// Transport failures are logged; the caller never sees them.
    pub fn send_email(
        &self,
        to: String,
        subject: String,
        body: String,
    ) -> Result<JoinHandle<()>, DomainError> {
        if !to.contains('@') {
            return Err(DomainError::InvalidInput(
                "Recipient must be a valid email address".into(),
            ));
        }

        let message = EmailMessage { to, subject, body };
        let mailer = Arc::clone(&self.mailer);
        info!(to = %message.to, "email notification queued");

        Ok(tokio::spawn(async move {
            if let Err(err) = mailer.send(&message).await {
                error!(to = %message.to, error = %err, "email delivery failed");
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::*;
    use crate::infrastructure::mailer::LogMailer;

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<EmailMessage>>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, message: &EmailMessage) -> anyhow::Result<()> {
            self.sent.lock().push(message.clone());
            Ok(())
        }
    }

    struct FailingMailer;

    #[async_trait]
    impl Mailer for FailingMailer {
        async fn send(&self, _message: &EmailMessage) -> anyhow::Result<()> {
            anyhow::bail!("smtp unavailable")
        }
    }

    #[tokio::test]
    async fn delivers_in_background() {
        let mailer = Arc::new(RecordingMailer::default());
        let service = NotificationService::new(mailer.clone());

        let handle = service
            .send_email("to@example.com".into(), "Hi".into(), "Body".into())
            .unwrap();
        handle.await.unwrap();

        let sent = mailer.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Hi");
    }

    #[tokio::test(start_paused = true)]
    async fn returns_before_slow_transport_finishes() {
        let service = NotificationService::new(Arc::new(LogMailer::new(Duration::from_secs(3))));

        let handle = service
            .send_email("to@example.com".into(), "Hi".into(), "Body".into())
            .unwrap();
        assert!(!handle.is_finished());

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(handle.is_finished());
    }

    #[tokio::test]
    async fn transport_failure_is_swallowed() {
        let service = NotificationService::new(Arc::new(FailingMailer));
        let handle = service
            .send_email("to@example.com".into(), "Hi".into(), "Body".into())
            .unwrap();
        assert!(handle.await.is_ok());
    }

    #[tokio::test]
    async fn rejects_recipient_without_at_sign() {
        let service = NotificationService::new(Arc::new(RecordingMailer::default()));
        let err = service
            .send_email("nobody".into(), "Hi".into(), "Body".into())
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }
}

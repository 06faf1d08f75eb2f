use crate::domain::repository::Mailer;
use crate::domain::types::EmailMessage;

/// Mailer that emits each message as a structured log event instead of
/// talking to an SMTP server.
#[derive(Clone)]
pub struct LogMailer {
    pub from: String,
}

impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> anyhow::Result<()> {
        tracing::info!(
            from = %self.from,
            to = %message.to,
            subject = %message.subject,
            body_len = message.body.len(),
            "email dispatched"
        );
        Ok(())
    }
}

//! Delivers outbox events to the email transport.

use chrono::Utc;

use crate::domain::repository::{Mailer, OutboxRepository};
use crate::domain::types::{
    EmailMessage, OUTBOX_BATCH_SIZE, StoredOutboxEvent, VERIFICATION_EMAIL_EVENT,
};
use crate::error::AuthServiceError;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RelayReport {
    pub delivered: usize,
    pub failed: usize,
}

/// One pass over undelivered events. Each event gets exactly one attempt:
/// a failure is recorded on the row and the event is not picked up again.
pub struct OutboxRelay<O: OutboxRepository, M: Mailer> {
    pub outbox: O,
    pub mailer: M,
}

impl<O: OutboxRepository, M: Mailer> OutboxRelay<O, M> {
    pub async fn run_once(&self) -> Result<RelayReport, AuthServiceError> {
        let events = self.outbox.fetch_undelivered(OUTBOX_BATCH_SIZE).await?;
        let mut report = RelayReport::default();

        for event in events {
            match self.deliver(&event).await {
                Ok(()) => {
                    self.outbox.mark_processed(event.id, Utc::now()).await?;
                    report.delivered += 1;
                }
                Err(e) => {
                    let error = format!("{e:#}");
                    tracing::warn!(event_id = %event.id, kind = %event.kind, error = %error, "outbox delivery failed");
                    self.outbox.mark_failed(event.id, &error, Utc::now()).await?;
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }

    async fn deliver(&self, event: &StoredOutboxEvent) -> anyhow::Result<()> {
        if event.kind != VERIFICATION_EMAIL_EVENT {
            anyhow::bail!("unknown outbox event kind: {}", event.kind);
        }
        let message: EmailMessage = serde_json::from_value(event.payload.clone())?;
        self.mailer.send(&message).await
    }
}

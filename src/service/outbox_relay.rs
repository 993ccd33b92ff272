use crate::repo::outbox_repo::OutboxRepo;
use crate::service::alert_dispatcher::AlertDispatcher;
use chrono::{Duration, Utc};

/// Background delivery loop: drains PENDING outbox rows and hands each to
/// the alert dispatcher, retrying with capped exponential backoff.
#[derive(Clone)]
pub struct OutboxRelay {
    pub outbox_repo: OutboxRepo,
    pub dispatcher: AlertDispatcher,
}

impl OutboxRelay {
    pub async fn run(self) {
        loop {
            if let Err(err) = self.tick().await {
                tracing::error!("outbox relay error: {}", err);
            }
            tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        }
    }

    async fn tick(&self) -> Result<(), crate::errors::ReconError> {
        let batch = self.outbox_repo.lock_pending(100).await?;
        for item in batch {
            match self.dispatcher.emit(&item.event_type, &item.payload_json).await {
                Ok(()) => {
                    self.outbox_repo.mark_published(item.id).await?;
                }
                Err(e) => {
                    let attempts = item.attempts + 1;
                    let backoff = i64::min(300, 2_i64.pow((attempts.min(8)) as u32));
                    let next_attempt_at = Utc::now() + Duration::seconds(backoff);
                    self.outbox_repo.mark_retry(item.id, attempts, next_attempt_at).await?;
                    tracing::warn!("alert delivery failed for outbox id {}: {}", item.id, e);
                }
            }
        }

        Ok(())
    }
}

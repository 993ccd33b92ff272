use crate::errors::ReconError;
use crate::repo::alerts_repo::{AlertChannel, AlertChannelsRepo};
use crate::signing::{sign, SaltPlacement};

/// Delivers outbox events to the registered operator alert channels.
/// Bodies are signed with the channel secret so receivers can authenticate
/// the origin with the same keyed-hash scheme the gateways use.
#[derive(Clone)]
pub struct AlertDispatcher {
    pub channels_repo: AlertChannelsRepo,
    pub client: reqwest::Client,
}

impl AlertDispatcher {
    pub async fn emit(&self, event_type: &str, payload: &serde_json::Value) -> Result<(), ReconError> {
        let channels = self.channels_repo.list_enabled_for_event(event_type).await?;
        self.emit_to(channels, event_type, payload).await
    }

    /// Every channel gets an attempt even when an earlier one fails; the
    /// event is only handed back for retry after the full pass.
    pub async fn emit_to(
        &self,
        channels: Vec<AlertChannel>,
        event_type: &str,
        payload: &serde_json::Value,
    ) -> Result<(), ReconError> {
        let body = payload.to_string();
        let mut failed = 0usize;

        for channel in channels {
            let mut req = self
                .client
                .post(&channel.target_url)
                .header("Content-Type", "application/json")
                .header("X-Event-Type", event_type)
                .body(body.clone());
            if let Some(secret) = &channel.secret {
                let signature = sign(&[event_type, &body], secret, SaltPlacement::Trailing);
                req = req.header("X-Alert-Signature", signature);
            }
            match req.send().await {
                Ok(resp) if resp.status().is_success() => {}
                Ok(resp) => {
                    tracing::warn!(event_type, target = %channel.target_url, "alert delivery returned {}", resp.status());
                    failed += 1;
                }
                Err(e) => {
                    tracing::warn!(event_type, target = %channel.target_url, "alert delivery failed: {}", e);
                    failed += 1;
                }
            }
        }

        if failed > 0 {
            return Err(ReconError::Gateway(format!(
                "{} alert deliveries failed for {}",
                failed, event_type
            )));
        }
        Ok(())
    }
}

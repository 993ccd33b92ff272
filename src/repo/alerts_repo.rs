use crate::errors::ReconError;
use sqlx::{PgPool, Row};

#[derive(Clone)]
pub struct AlertChannelsRepo {
    pub pool: PgPool,
}

#[derive(Debug, Clone)]
pub struct AlertChannel {
    pub event_type: String,
    pub target_url: String,
    pub secret: Option<String>,
}

impl AlertChannelsRepo {
    pub async fn list_enabled_for_event(
        &self,
        event_type: &str,
    ) -> Result<Vec<AlertChannel>, ReconError> {
        let rows = sqlx::query(
            "SELECT event_type, target_url, secret FROM alert_channels WHERE is_enabled=true AND event_type=$1",
        )
        .bind(event_type)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| AlertChannel {
                event_type: row.get("event_type"),
                target_url: row.get("target_url"),
                secret: row.get("secret"),
            })
            .collect())
    }
}

use anyhow::Result;
use payments_recon::config::AppConfig;
use payments_recon::repo::intents_repo::{IntentStore, IntentsRepo};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

// Expires orphaned PENDING intents (abandoned checkouts) to FAILED after
// the configured TTL. The expiry is the same row-atomic conditional update
// the coordinator uses, so a late genuine callback can never be clobbered.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&cfg.database_url)
        .await?;

    let repo = IntentsRepo { pool };

    loop {
        let cutoff = chrono::Utc::now() - chrono::Duration::hours(cfg.pending_ttl_hours);
        match repo.expire_stale_pending(cutoff, 500).await {
            Ok(expired) if !expired.is_empty() => {
                tracing::info!("expired {} stale pending intents", expired.len());
            }
            Ok(_) => {}
            Err(e) => tracing::error!("sweep failed: {}", e),
        }

        tokio::time::sleep(std::time::Duration::from_secs(60)).await;
    }
}

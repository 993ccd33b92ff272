use crate::domain::intent::{
    can_transition, IntentStatus, LinkedObject, NewIntent, PaymentIntent, PaymentMethod,
};
use crate::errors::ReconError;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// Durable store for payment intents. The `transition` compare-and-set is
/// the sole synchronization primitive across concurrent callback handlers;
/// implementations must perform it as a single atomic conditional update,
/// never a read-then-write pair.
#[async_trait::async_trait]
pub trait IntentStore: Send + Sync {
    async fn create(&self, new: NewIntent) -> Result<PaymentIntent, ReconError>;

    async fn get(&self, id: Uuid) -> Result<PaymentIntent, ReconError>;

    async fn find_by_external_reference(
        &self,
        reference: &str,
    ) -> Result<Option<PaymentIntent>, ReconError>;

    /// Idempotent when the same reference is attached twice; `Conflict`
    /// when a different reference is already present.
    async fn attach_external_reference(&self, id: Uuid, reference: &str)
        -> Result<(), ReconError>;

    /// Atomic compare-and-set on status. `Conflict` when the stored status
    /// no longer matches `from`.
    async fn transition(
        &self,
        id: Uuid,
        from: IntentStatus,
        to: IntentStatus,
        metadata_patch: serde_json::Value,
    ) -> Result<PaymentIntent, ReconError>;

    /// Expires orphaned PENDING intents older than the cutoff to FAILED.
    /// Row-atomic on status, so a callback racing the sweep loses or wins
    /// cleanly and never gets overwritten. Returns the expired ids.
    async fn expire_stale_pending(
        &self,
        cutoff: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Uuid>, ReconError>;
}

#[derive(Clone)]
pub struct IntentsRepo {
    pub pool: PgPool,
}

const INTENT_COLUMNS: &str = "id, user_id, amount_minor, currency, payment_method, status, external_reference, linked_object, metadata, created_at, updated_at";

fn row_to_intent(row: &PgRow) -> Result<PaymentIntent, ReconError> {
    let method_raw: String = row.get("payment_method");
    let status_raw: String = row.get("status");
    let linked_raw: serde_json::Value = row.get("linked_object");

    let method = PaymentMethod::parse(&method_raw)
        .ok_or_else(|| ReconError::Internal(format!("unknown payment_method {}", method_raw)))?;
    let status = IntentStatus::parse(&status_raw)
        .ok_or_else(|| ReconError::Internal(format!("unknown status {}", status_raw)))?;
    let linked_object: LinkedObject = serde_json::from_value(linked_raw)
        .map_err(|e| ReconError::Internal(format!("bad linked_object: {}", e)))?;

    Ok(PaymentIntent {
        id: row.get("id"),
        user_id: row.get("user_id"),
        amount_minor: row.get("amount_minor"),
        currency: row.get("currency"),
        method,
        status,
        external_reference: row.get("external_reference"),
        linked_object,
        metadata: row.get("metadata"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[async_trait::async_trait]
impl IntentStore for IntentsRepo {
    async fn create(&self, new: NewIntent) -> Result<PaymentIntent, ReconError> {
        new.validate()?;

        let id = Uuid::new_v4();
        let linked = serde_json::to_value(&new.linked_object)
            .map_err(|e| ReconError::Internal(e.to_string()))?;
        let metadata = new.initial_metadata();

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO payment_intents
                (id, user_id, amount_minor, currency, payment_method, status, linked_object, metadata)
            VALUES ($1, $2, $3, $4, $5, 'PENDING', $6, $7)
            RETURNING {INTENT_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(new.user_id)
        .bind(new.amount_minor)
        .bind(&new.currency)
        .bind(new.method.as_str())
        .bind(linked)
        .bind(metadata)
        .fetch_one(&self.pool)
        .await?;

        row_to_intent(&row)
    }

    async fn get(&self, id: Uuid) -> Result<PaymentIntent, ReconError> {
        let row = sqlx::query(&format!(
            "SELECT {INTENT_COLUMNS} FROM payment_intents WHERE id = $1",
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ReconError::NotFound(format!("intent {}", id)))?;

        row_to_intent(&row)
    }

    async fn find_by_external_reference(
        &self,
        reference: &str,
    ) -> Result<Option<PaymentIntent>, ReconError> {
        let row = sqlx::query(&format!(
            "SELECT {INTENT_COLUMNS} FROM payment_intents WHERE external_reference = $1",
        ))
        .bind(reference)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_intent).transpose()
    }

    async fn attach_external_reference(
        &self,
        id: Uuid,
        reference: &str,
    ) -> Result<(), ReconError> {
        let result = sqlx::query(
            r#"
            UPDATE payment_intents
            SET external_reference = $2, updated_at = now()
            WHERE id = $1 AND (external_reference IS NULL OR external_reference = $2)
            "#,
        )
        .bind(id)
        .bind(reference)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        // Zero rows: either the intent is missing or a different reference
        // is already attached.
        let existing = self.get(id).await?;
        Err(ReconError::Conflict(format!(
            "intent {} already has external reference {:?}",
            id, existing.external_reference
        )))
    }

    async fn transition(
        &self,
        id: Uuid,
        from: IntentStatus,
        to: IntentStatus,
        metadata_patch: serde_json::Value,
    ) -> Result<PaymentIntent, ReconError> {
        if !can_transition(from, to) {
            return Err(ReconError::Validation(format!(
                "illegal transition {} -> {}",
                from.as_str(),
                to.as_str()
            )));
        }

        let row = sqlx::query(&format!(
            r#"
            UPDATE payment_intents
            SET status = $3, metadata = metadata || $4, updated_at = now()
            WHERE id = $1 AND status = $2
            RETURNING {INTENT_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(metadata_patch)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row_to_intent(&row),
            None => {
                let current = self.get(id).await?;
                Err(ReconError::Conflict(format!(
                    "intent {} is {} (expected {})",
                    id,
                    current.status.as_str(),
                    from.as_str()
                )))
            }
        }
    }

    async fn expire_stale_pending(
        &self,
        cutoff: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Uuid>, ReconError> {
        let rows = sqlx::query(
            r#"
            UPDATE payment_intents
            SET status = 'FAILED',
                metadata = metadata || '{"expired": true}'::jsonb,
                updated_at = now()
            WHERE id IN (
                SELECT id FROM payment_intents
                WHERE status = 'PENDING' AND created_at < $1
                ORDER BY created_at ASC
                LIMIT $2
            ) AND status = 'PENDING'
            RETURNING id
            "#,
        )
        .bind(cutoff)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|r| r.get("id")).collect())
    }
}

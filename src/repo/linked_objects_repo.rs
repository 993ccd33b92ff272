use crate::domain::intent::{LinkedObject, PaymentIntent};
use crate::errors::ReconError;
use sqlx::PgPool;

/// The single business-side mutation applied after a successful claim:
/// approve the paid booking, or activate/extend the paid subscription.
#[async_trait::async_trait]
pub trait BusinessEffects: Send + Sync {
    async fn apply(&self, intent: &PaymentIntent) -> Result<(), ReconError>;
}

#[derive(Clone)]
pub struct LinkedObjectsRepo {
    pub pool: PgPool,
}

fn plan_duration_days(plan_id: &str) -> i64 {
    match plan_id {
        "yearly" => 365,
        "quarterly" => 90,
        _ => 30,
    }
}

#[async_trait::async_trait]
impl BusinessEffects for LinkedObjectsRepo {
    async fn apply(&self, intent: &PaymentIntent) -> Result<(), ReconError> {
        match &intent.linked_object {
            LinkedObject::Booking { booking_id } => {
                let result = sqlx::query(
                    "UPDATE bookings SET status = 'APPROVED', updated_at = now() WHERE id = $1",
                )
                .bind(booking_id)
                .execute(&self.pool)
                .await?;

                if result.rows_affected() == 0 {
                    return Err(ReconError::NotFound(format!("booking {}", booking_id)));
                }
                Ok(())
            }
            LinkedObject::Subscription { plan_id } => {
                // Extends from the current window end when still active,
                // from now when lapsed.
                sqlx::query(
                    r#"
                    INSERT INTO subscriptions (user_id, plan_id, status, expires_at, updated_at)
                    VALUES ($1, $2, 'ACTIVE', now() + make_interval(days => $3::int), now())
                    ON CONFLICT (user_id) DO UPDATE SET
                        plan_id = EXCLUDED.plan_id,
                        status = 'ACTIVE',
                        expires_at = GREATEST(subscriptions.expires_at, now())
                            + make_interval(days => $3::int),
                        updated_at = now()
                    "#,
                )
                .bind(intent.user_id)
                .bind(plan_id)
                .bind(plan_duration_days(plan_id) as i32)
                .execute(&self.pool)
                .await?;

                Ok(())
            }
        }
    }
}

use crate::domain::intent::{
    IntentStatus, NewIntent, PaymentIntent, PaymentMethod, StartPaymentRequest,
    StartPaymentResponse,
};
use crate::errors::ReconError;
use crate::gateways::cashfree::CashfreeAdapter;
use crate::gateways::manual::ManualAdapter;
use crate::gateways::payu::PayuAdapter;
use crate::gateways::{GatewayAdapter, ReturnUrls, VerifiedOutcome};
use crate::repo::intents_repo::IntentStore;
use crate::repo::linked_objects_repo::BusinessEffects;
use crate::repo::outbox_repo::OutboxStore;
use std::sync::Arc;
use uuid::Uuid;

/// Gateway-visible verdict for one callback delivery. Duplicates and
/// replays land on `AlreadyProcessed`; the transport layer answers 200 for
/// all three so providers stop retrying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    Accepted,
    Rejected { reason: String },
    AlreadyProcessed,
}

impl CallbackOutcome {
    pub fn status_label(&self) -> &'static str {
        match self {
            CallbackOutcome::Accepted => "accepted",
            CallbackOutcome::Rejected { .. } => "rejected",
            CallbackOutcome::AlreadyProcessed => "alreadyProcessed",
        }
    }
}

/// Drives a payment intent from creation through gateway redirect to a
/// terminal state, and applies the linked business transition exactly once.
/// All cross-invocation coordination happens through the store's
/// compare-and-set transition; there are no in-process locks.
#[derive(Clone)]
pub struct ReconciliationCoordinator {
    pub store: Arc<dyn IntentStore>,
    pub effects: Arc<dyn BusinessEffects>,
    pub outbox: Arc<dyn OutboxStore>,
    pub payu: Arc<PayuAdapter>,
    pub cashfree: Arc<CashfreeAdapter>,
    pub manual: Arc<ManualAdapter>,
    pub return_base_url: String,
}

impl ReconciliationCoordinator {
    fn adapter_for(&self, method: PaymentMethod) -> &dyn GatewayAdapter {
        match method {
            PaymentMethod::Payu | PaymentMethod::Upi => self.payu.as_ref(),
            PaymentMethod::Cashfree => self.cashfree.as_ref(),
            PaymentMethod::Bank => self.manual.as_ref(),
        }
    }

    pub fn adapter_by_name(&self, provider: &str) -> Option<&dyn GatewayAdapter> {
        match provider {
            "payu" => Some(self.payu.as_ref()),
            "cashfree" => Some(self.cashfree.as_ref()),
            "manual" => Some(self.manual.as_ref()),
            _ => None,
        }
    }

    fn return_urls(&self, provider: &'static str) -> ReturnUrls {
        ReturnUrls {
            success: format!("{}/payments/return/{}", self.return_base_url, provider),
            failure: format!("{}/payments/return/{}", self.return_base_url, provider),
        }
    }

    async fn record_event(&self, intent_id: Uuid, event_type: &str, payload: serde_json::Value) {
        if let Err(e) = self.outbox.record(intent_id, event_type, payload).await {
            tracing::warn!(intent_id = %intent_id, event_type, "outbox record failed: {}", e);
        }
    }

    pub async fn start_payment(
        &self,
        user_id: Uuid,
        req: StartPaymentRequest,
    ) -> Result<StartPaymentResponse, ReconError> {
        let intent = self
            .store
            .create(NewIntent {
                user_id,
                amount_minor: req.amount_minor,
                currency: req.currency,
                method: req.method,
                linked_object: req.linked_object,
                payer_name: req.payer_name,
                payer_email: req.payer_email,
            })
            .await?;

        let adapter = self.adapter_for(intent.method);
        // A gateway failure here leaves the intent PENDING; the user
        // retries with a fresh intent.
        let session = adapter
            .build_redirect(&intent, &self.return_urls(adapter.name()))
            .await?;

        self.store
            .attach_external_reference(intent.id, &session.external_reference)
            .await?;

        self.record_event(
            intent.id,
            "payment.created",
            serde_json::json!({
                "intent_id": intent.id,
                "method": intent.method.as_str(),
                "amount_minor": intent.amount_minor,
                "currency": intent.currency,
                "external_reference": session.external_reference,
            }),
        )
        .await;

        Ok(StartPaymentResponse {
            intent_id: intent.id,
            status: intent.status,
            external_reference: session.external_reference,
            redirect: session.payload,
        })
    }

    pub async fn handle_callback(
        &self,
        provider: &str,
        raw: &serde_json::Value,
    ) -> Result<CallbackOutcome, ReconError> {
        let adapter = self
            .adapter_by_name(provider)
            .ok_or_else(|| ReconError::Validation(format!("unknown provider {}", provider)))?;

        let outcome = match adapter.parse_callback(raw).await {
            Ok(outcome) => outcome,
            // No confirmation is not proof of failure; leave the intent
            // retryable and let the provider redeliver.
            Err(ReconError::Gateway(reason)) | Err(ReconError::GatewayConfig(reason)) => {
                tracing::warn!(provider, "callback verification unavailable: {}", reason);
                return Ok(CallbackOutcome::Rejected { reason });
            }
            Err(e) => return Err(e),
        };

        let intent = match self
            .store
            .find_by_external_reference(&outcome.external_reference)
            .await?
        {
            Some(intent) => intent,
            None => {
                tracing::warn!(
                    provider,
                    reference = %outcome.external_reference,
                    "callback for unknown external reference"
                );
                return Ok(CallbackOutcome::Rejected {
                    reason: "unknown external reference".to_string(),
                });
            }
        };

        let amount_mismatch = outcome
            .amount_minor
            .is_some_and(|a| a != intent.amount_minor);
        if amount_mismatch {
            tracing::error!(
                intent_id = %intent.id,
                provider,
                expected = intent.amount_minor,
                reported = ?outcome.amount_minor,
                "callback amount mismatch"
            );
        }

        let patch = serde_json::json!({ "callback": { "provider": provider, "fields": outcome.raw_fields } });

        if outcome.integrity_failed || amount_mismatch || !outcome.succeeded {
            let reason = if outcome.integrity_failed || amount_mismatch {
                "integrity check failed"
            } else {
                "provider reported failure"
            };
            return match self
                .store
                .transition(intent.id, IntentStatus::Pending, IntentStatus::Failed, patch)
                .await
            {
                Ok(_) => {
                    self.record_event(
                        intent.id,
                        "payment.failed",
                        serde_json::json!({ "intent_id": intent.id, "reason": reason }),
                    )
                    .await;
                    Ok(CallbackOutcome::Rejected {
                        reason: reason.to_string(),
                    })
                }
                // Lost the compare-and-set: a terminal state is already
                // recorded, so this delivery is a harmless duplicate.
                Err(ReconError::Conflict(_)) => Ok(CallbackOutcome::AlreadyProcessed),
                Err(e) => Err(e),
            };
        }

        self.apply_success(&intent, provider, patch, &outcome).await
    }

    /// The PENDING -> SUCCEEDED compare-and-set is the replay guard: the
    /// intent's own status row is the idempotency token, and only the
    /// caller whose update wins applies the business effect.
    async fn apply_success(
        &self,
        intent: &PaymentIntent,
        provider: &str,
        patch: serde_json::Value,
        outcome: &VerifiedOutcome,
    ) -> Result<CallbackOutcome, ReconError> {
        let claimed = match self
            .store
            .transition(
                intent.id,
                IntentStatus::Pending,
                IntentStatus::Succeeded,
                patch,
            )
            .await
        {
            Ok(updated) => updated,
            Err(ReconError::Conflict(_)) => return Ok(CallbackOutcome::AlreadyProcessed),
            Err(e) => return Err(e),
        };

        if let Err(e) = self.effects.apply(&claimed).await {
            // The payment genuinely succeeded; never roll the intent back.
            // The gap goes to the operator alert channel for manual or
            // scheduled reconciliation.
            tracing::error!(
                intent_id = %claimed.id,
                provider,
                "business effect failed after successful claim: {}",
                e
            );
            self.record_event(
                claimed.id,
                "payment.reconciliation_gap",
                serde_json::json!({
                    "intent_id": claimed.id,
                    "linked_object": claimed.linked_object,
                    "error": e.to_string(),
                }),
            )
            .await;
        } else {
            self.record_event(
                claimed.id,
                "payment.succeeded",
                serde_json::json!({
                    "intent_id": claimed.id,
                    "external_reference": outcome.external_reference,
                    "amount_minor": claimed.amount_minor,
                }),
            )
            .await;
        }

        Ok(CallbackOutcome::Accepted)
    }

    pub async fn cancel_payment(
        &self,
        user_id: Uuid,
        intent_id: Uuid,
    ) -> Result<PaymentIntent, ReconError> {
        let intent = self.store.get(intent_id).await?;
        if intent.user_id != user_id {
            return Err(ReconError::NotFound(format!("intent {}", intent_id)));
        }

        self.store
            .transition(
                intent_id,
                IntentStatus::Pending,
                IntentStatus::Canceled,
                serde_json::json!({ "canceled_by": "user" }),
            )
            .await
    }
}

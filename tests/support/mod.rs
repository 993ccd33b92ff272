#![allow(dead_code)]

use payments_recon::config::{CashfreeConfig, PayuConfig};
use payments_recon::domain::intent::{
    can_transition, IntentStatus, NewIntent, PaymentIntent,
};
use payments_recon::errors::ReconError;
use payments_recon::gateways::cashfree::CashfreeAdapter;
use payments_recon::gateways::manual::ManualAdapter;
use payments_recon::gateways::payu::{PayuAdapter, RESERVED_SLOTS};
use payments_recon::repo::intents_repo::IntentStore;
use payments_recon::repo::linked_objects_repo::BusinessEffects;
use payments_recon::repo::outbox_repo::OutboxStore;
use payments_recon::service::coordinator::ReconciliationCoordinator;
use payments_recon::signing::{sign, SaltPlacement};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub const PAYU_KEY: &str = "test_key";
pub const PAYU_SALT: &str = "test_salt";
pub const MANUAL_SECRET: &str = "test_manual_secret";

/// In-memory `IntentStore` with the same compare-and-set semantics as the
/// Postgres repo, for exercising the coordinator without a database.
#[derive(Default)]
pub struct MemoryIntentStore {
    intents: Mutex<HashMap<Uuid, PaymentIntent>>,
}

impl MemoryIntentStore {
    pub fn status_of(&self, id: Uuid) -> Option<IntentStatus> {
        self.intents.lock().unwrap().get(&id).map(|i| i.status)
    }

    pub fn snapshot(&self, id: Uuid) -> Option<PaymentIntent> {
        self.intents.lock().unwrap().get(&id).cloned()
    }
}

fn merge_metadata(base: &mut serde_json::Value, patch: serde_json::Value) {
    if let (Some(base_map), Some(patch_map)) = (base.as_object_mut(), patch.as_object()) {
        for (k, v) in patch_map {
            base_map.insert(k.clone(), v.clone());
        }
    }
}

#[async_trait::async_trait]
impl IntentStore for MemoryIntentStore {
    async fn create(&self, new: NewIntent) -> Result<PaymentIntent, ReconError> {
        new.validate()?;
        let now = chrono::Utc::now();
        let intent = PaymentIntent {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            amount_minor: new.amount_minor,
            currency: new.currency.clone(),
            method: new.method,
            status: IntentStatus::Pending,
            external_reference: None,
            linked_object: new.linked_object.clone(),
            metadata: new.initial_metadata(),
            created_at: now,
            updated_at: now,
        };
        self.intents.lock().unwrap().insert(intent.id, intent.clone());
        Ok(intent)
    }

    async fn get(&self, id: Uuid) -> Result<PaymentIntent, ReconError> {
        self.intents
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| ReconError::NotFound(format!("intent {}", id)))
    }

    async fn find_by_external_reference(
        &self,
        reference: &str,
    ) -> Result<Option<PaymentIntent>, ReconError> {
        Ok(self
            .intents
            .lock()
            .unwrap()
            .values()
            .find(|i| i.external_reference.as_deref() == Some(reference))
            .cloned())
    }

    async fn attach_external_reference(
        &self,
        id: Uuid,
        reference: &str,
    ) -> Result<(), ReconError> {
        let mut intents = self.intents.lock().unwrap();
        let intent = intents
            .get_mut(&id)
            .ok_or_else(|| ReconError::NotFound(format!("intent {}", id)))?;
        match &intent.external_reference {
            None => {
                intent.external_reference = Some(reference.to_string());
                Ok(())
            }
            Some(existing) if existing == reference => Ok(()),
            Some(existing) => Err(ReconError::Conflict(format!(
                "intent {} already has external reference {:?}",
                id, existing
            ))),
        }
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

        let mut intents = self.intents.lock().unwrap();
        let intent = intents
            .get_mut(&id)
            .ok_or_else(|| ReconError::NotFound(format!("intent {}", id)))?;
        if intent.status != from {
            return Err(ReconError::Conflict(format!(
                "intent {} is {} (expected {})",
                id,
                intent.status.as_str(),
                from.as_str()
            )));
        }

        intent.status = to;
        merge_metadata(&mut intent.metadata, metadata_patch);
        intent.updated_at = chrono::Utc::now();
        Ok(intent.clone())
    }

    async fn expire_stale_pending(
        &self,
        cutoff: chrono::DateTime<chrono::Utc>,
        limit: i64,
    ) -> Result<Vec<Uuid>, ReconError> {
        let mut intents = self.intents.lock().unwrap();
        let mut stale: Vec<Uuid> = intents
            .values()
            .filter(|i| i.status == IntentStatus::Pending && i.created_at < cutoff)
            .map(|i| i.id)
            .collect();
        stale.sort_by_key(|id| intents[id].created_at);
        stale.truncate(limit as usize);

        for id in &stale {
            let intent = intents.get_mut(id).unwrap();
            intent.status = IntentStatus::Failed;
            merge_metadata(&mut intent.metadata, serde_json::json!({ "expired": true }));
            intent.updated_at = chrono::Utc::now();
        }
        Ok(stale)
    }
}

/// Counts business-effect applications; the idempotence and race tests
/// assert this never exceeds one per intent.
#[derive(Default)]
pub struct RecordingEffects {
    pub applied: AtomicUsize,
    pub fail: AtomicBool,
}

#[async_trait::async_trait]
impl BusinessEffects for RecordingEffects {
    async fn apply(&self, _intent: &PaymentIntent) -> Result<(), ReconError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ReconError::Gateway("downstream write failed".to_string()));
        }
        self.applied.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryOutbox {
    pub events: Mutex<Vec<(Uuid, String)>>,
}

impl MemoryOutbox {
    pub fn event_types(&self) -> Vec<String> {
        self.events.lock().unwrap().iter().map(|(_, t)| t.clone()).collect()
    }
}

#[async_trait::async_trait]
impl OutboxStore for MemoryOutbox {
    async fn record(
        &self,
        intent_id: Uuid,
        event_type: &str,
        _payload: serde_json::Value,
    ) -> Result<(), ReconError> {
        self.events
            .lock()
            .unwrap()
            .push((intent_id, event_type.to_string()));
        Ok(())
    }
}

pub struct Harness {
    pub coordinator: ReconciliationCoordinator,
    pub store: Arc<MemoryIntentStore>,
    pub effects: Arc<RecordingEffects>,
    pub outbox: Arc<MemoryOutbox>,
}

pub fn harness() -> Harness {
    let store = Arc::new(MemoryIntentStore::default());
    let effects = Arc::new(RecordingEffects::default());
    let outbox = Arc::new(MemoryOutbox::default());

    let coordinator = ReconciliationCoordinator {
        store: store.clone(),
        effects: effects.clone(),
        outbox: outbox.clone(),
        payu: Arc::new(PayuAdapter {
            config: payu_config(),
        }),
        cashfree: Arc::new(CashfreeAdapter {
            config: CashfreeConfig {
                base_url: "http://127.0.0.1:1".to_string(),
                app_id: "unused".to_string(),
                secret_key: "unused".to_string(),
                api_version: "2023-08-01".to_string(),
                timeout_ms: 100,
            },
            client: reqwest::Client::new(),
        }),
        manual: Arc::new(ManualAdapter {
            secret: MANUAL_SECRET.to_string(),
        }),
        return_base_url: "http://localhost:3000".to_string(),
    };

    Harness {
        coordinator,
        store,
        effects,
        outbox,
    }
}

pub fn payu_config() -> PayuConfig {
    PayuConfig {
        payment_url: "https://secure.payu.in/_payment".to_string(),
        merchant_key: PAYU_KEY.to_string(),
        salt: PAYU_SALT.to_string(),
    }
}

/// A provider-shaped PayU echo with a response hash valid for the test
/// credentials (reverse field order, salt leading).
pub fn payu_callback(
    txnid: &str,
    status: &str,
    amount: &str,
    productinfo: &str,
    firstname: &str,
    email: &str,
) -> serde_json::Value {
    let mut fields: Vec<&str> = vec![status];
    fields.extend(std::iter::repeat("").take(RESERVED_SLOTS));
    fields.extend([email, firstname, productinfo, amount, txnid, PAYU_KEY]);
    let hash = sign(&fields, PAYU_SALT, SaltPlacement::Leading);

    serde_json::json!({
        "txnid": txnid,
        "status": status,
        "amount": amount,
        "productinfo": productinfo,
        "firstname": firstname,
        "email": email,
        "hash": hash,
    })
}

/// An operator bank-transfer confirmation signed with the internal secret.
pub fn manual_confirmation(reference: &str, amount_minor: i64, status: &str) -> serde_json::Value {
    let amount = amount_minor.to_string();
    let signature = sign(
        &[reference, &amount, status],
        MANUAL_SECRET,
        SaltPlacement::Trailing,
    );
    serde_json::json!({
        "reference": reference,
        "amount_minor": amount,
        "status": status,
        "signature": signature,
    })
}

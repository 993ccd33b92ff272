use crate::domain::intent::PaymentIntent;
use crate::errors::ReconError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod cashfree;
pub mod manual;
pub mod payu;

/// Merchant-side pages the provider sends the payer back to after the
/// hosted checkout. Both pages funnel their echo into `handle_callback`;
/// neither is trusted as the source of truth.
#[derive(Debug, Clone)]
pub struct ReturnUrls {
    pub success: String,
    pub failure: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RedirectPayload {
    /// Auto-submitted form POST to the provider's hosted payment page.
    Form {
        action_url: String,
        fields: BTreeMap<String, String>,
    },
    /// Browser navigation driven by a provider-created session.
    Redirect { url: String, session_id: String },
    /// Out-of-band settlement; the payer quotes the reference.
    Instructions { reference: String, note: String },
}

#[derive(Debug, Clone)]
pub struct RedirectSession {
    pub external_reference: String,
    pub payload: RedirectPayload,
}

/// Authenticated interpretation of a provider callback. `integrity_failed`
/// marks a hash/amount mismatch that must be logged and rejected, never
/// silently trusted.
#[derive(Debug, Clone)]
pub struct VerifiedOutcome {
    pub external_reference: String,
    pub succeeded: bool,
    pub amount_minor: Option<i64>,
    pub integrity_failed: bool,
    pub raw_fields: serde_json::Value,
}

#[async_trait::async_trait]
pub trait GatewayAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    async fn build_redirect(
        &self,
        intent: &PaymentIntent,
        return_urls: &ReturnUrls,
    ) -> Result<RedirectSession, ReconError>;

    async fn parse_callback(
        &self,
        raw: &serde_json::Value,
    ) -> Result<VerifiedOutcome, ReconError>;
}

pub(crate) fn field<'a>(raw: &'a serde_json::Value, name: &str) -> &'a str {
    raw.get(name).and_then(|v| v.as_str()).unwrap_or("")
}

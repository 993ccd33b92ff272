use crate::domain::intent::PaymentIntent;
use crate::errors::ReconError;
use crate::gateways::{
    field, GatewayAdapter, RedirectPayload, RedirectSession, ReturnUrls, VerifiedOutcome,
};
use crate::signing::{verify, SaltPlacement};

/// Bank-transfer settlement. There is no hosted checkout; the payer quotes
/// the intent id as the transfer reference, and an operator confirms the
/// credit through `/webhooks/manual` with a confirmation signed by the
/// internal secret over `[reference, amount_minor, status]`.
pub struct ManualAdapter {
    pub secret: String,
}

#[async_trait::async_trait]
impl GatewayAdapter for ManualAdapter {
    fn name(&self) -> &'static str {
        "manual"
    }

    async fn build_redirect(
        &self,
        intent: &PaymentIntent,
        _return_urls: &ReturnUrls,
    ) -> Result<RedirectSession, ReconError> {
        let reference = intent.id.simple().to_string();
        Ok(RedirectSession {
            external_reference: reference.clone(),
            payload: RedirectPayload::Instructions {
                reference,
                note: format!(
                    "Transfer {} {} and quote the reference; the payment is confirmed once the credit is reconciled.",
                    intent.amount_decimal(),
                    intent.currency
                ),
            },
        })
    }

    async fn parse_callback(&self, raw: &serde_json::Value) -> Result<VerifiedOutcome, ReconError> {
        let reference = field(raw, "reference").to_string();
        if reference.is_empty() {
            return Err(ReconError::Validation("missing reference".to_string()));
        }

        let amount_minor = field(raw, "amount_minor").to_string();
        let status = field(raw, "status").to_string();
        let signature = field(raw, "signature");

        let signature_ok = verify(
            &[&reference, &amount_minor, &status],
            &self.secret,
            SaltPlacement::Trailing,
            signature,
        );
        if !signature_ok {
            tracing::error!(reference = %reference, "manual confirmation signature mismatch");
        }

        Ok(VerifiedOutcome {
            external_reference: reference,
            succeeded: signature_ok && status == "RECEIVED",
            amount_minor: amount_minor.parse::<i64>().ok(),
            integrity_failed: !signature_ok,
            raw_fields: raw.clone(),
        })
    }
}

use crate::config::PayuConfig;
use crate::domain::intent::PaymentIntent;
use crate::errors::ReconError;
use crate::gateways::{
    field, GatewayAdapter, RedirectPayload, RedirectSession, ReturnUrls, VerifiedOutcome,
};
use crate::signing::{sign, verify, SaltPlacement};
use std::collections::BTreeMap;

/// Hash-signed redirect integration. The request hash covers
/// key|txnid|amount|productinfo|firstname|email followed by eleven
/// reserved empty slots with the salt appended; the response hash uses
/// the reverse field order with the salt leading, per PayU convention.
pub struct PayuAdapter {
    pub config: PayuConfig,
}

/// Five udf slots plus six reserved pipes in the request hash string.
pub const RESERVED_SLOTS: usize = 11;

impl PayuAdapter {
    fn credentials(&self) -> Result<(&str, &str), ReconError> {
        if self.config.merchant_key.is_empty() || self.config.salt.is_empty() {
            return Err(ReconError::GatewayConfig(
                "PAYU_MERCHANT_KEY / PAYU_SALT not configured".to_string(),
            ));
        }
        Ok((&self.config.merchant_key, &self.config.salt))
    }

    fn product_info(intent: &PaymentIntent) -> String {
        match &intent.linked_object {
            crate::domain::intent::LinkedObject::Booking { booking_id } => {
                format!("booking:{}", booking_id)
            }
            crate::domain::intent::LinkedObject::Subscription { plan_id } => {
                format!("subscription:{}", plan_id)
            }
        }
    }

    pub fn request_hash(
        &self,
        txnid: &str,
        amount: &str,
        productinfo: &str,
        firstname: &str,
        email: &str,
    ) -> Result<String, ReconError> {
        let (key, salt) = self.credentials()?;
        let mut fields: Vec<&str> = vec![key, txnid, amount, productinfo, firstname, email];
        fields.extend(std::iter::repeat("").take(RESERVED_SLOTS));
        Ok(sign(&fields, salt, SaltPlacement::Trailing))
    }

    fn verify_response_hash(&self, raw: &serde_json::Value) -> Result<bool, ReconError> {
        let (key, salt) = self.credentials()?;
        let status = field(raw, "status");
        let email = field(raw, "email");
        let firstname = field(raw, "firstname");
        let productinfo = field(raw, "productinfo");
        let amount = field(raw, "amount");
        let txnid = field(raw, "txnid");
        let candidate = field(raw, "hash");

        let mut fields: Vec<&str> = vec![status];
        fields.extend(std::iter::repeat("").take(RESERVED_SLOTS));
        fields.extend([email, firstname, productinfo, amount, txnid, key]);
        Ok(verify(&fields, salt, SaltPlacement::Leading, candidate))
    }
}

fn parse_amount_minor(amount: &str) -> Option<i64> {
    let (rupees, paise) = match amount.split_once('.') {
        Some((r, p)) => (r, p),
        None => (amount, "0"),
    };
    let rupees: i64 = rupees.parse().ok()?;
    let paise: i64 = format!("{:0<2}", paise).get(..2)?.parse().ok()?;
    Some(rupees * 100 + paise)
}

#[async_trait::async_trait]
impl GatewayAdapter for PayuAdapter {
    fn name(&self) -> &'static str {
        "payu"
    }

    async fn build_redirect(
        &self,
        intent: &PaymentIntent,
        return_urls: &ReturnUrls,
    ) -> Result<RedirectSession, ReconError> {
        let (key, _) = self.credentials()?;

        let txnid = intent.id.simple().to_string();
        let amount = intent.amount_decimal();
        let productinfo = Self::product_info(intent);
        let firstname = intent.payer_name().to_string();
        let email = intent.payer_email().to_string();

        let hash = self.request_hash(&txnid, &amount, &productinfo, &firstname, &email)?;

        let mut fields = BTreeMap::new();
        fields.insert("key".to_string(), key.to_string());
        fields.insert("txnid".to_string(), txnid.clone());
        fields.insert("amount".to_string(), amount);
        fields.insert("productinfo".to_string(), productinfo);
        fields.insert("firstname".to_string(), firstname);
        fields.insert("email".to_string(), email);
        fields.insert("surl".to_string(), return_urls.success.clone());
        fields.insert("furl".to_string(), return_urls.failure.clone());
        fields.insert("hash".to_string(), hash);

        Ok(RedirectSession {
            external_reference: txnid,
            payload: RedirectPayload::Form {
                action_url: self.config.payment_url.clone(),
                fields,
            },
        })
    }

    async fn parse_callback(&self, raw: &serde_json::Value) -> Result<VerifiedOutcome, ReconError> {
        let txnid = field(raw, "txnid").to_string();
        if txnid.is_empty() {
            return Err(ReconError::Validation("missing txnid".to_string()));
        }

        let hash_ok = self.verify_response_hash(raw)?;
        let status_success = field(raw, "status").eq_ignore_ascii_case("success");

        if !hash_ok {
            tracing::error!(txnid = %txnid, "payu response hash mismatch");
        }

        Ok(VerifiedOutcome {
            external_reference: txnid,
            succeeded: status_success && hash_ok,
            amount_minor: parse_amount_minor(field(raw, "amount")),
            integrity_failed: !hash_ok,
            raw_fields: raw.clone(),
        })
    }
}

use crate::config::CashfreeConfig;
use crate::domain::intent::PaymentIntent;
use crate::errors::ReconError;
use crate::gateways::{
    field, GatewayAdapter, RedirectPayload, RedirectSession, ReturnUrls, VerifiedOutcome,
};
use serde_json::json;

/// Session-based integration: order creation over the provider API, payer
/// redirect with the returned session id, and server-to-server order-status
/// lookup on every callback. The client-supplied status is never trusted.
pub struct CashfreeAdapter {
    pub config: CashfreeConfig,
    pub client: reqwest::Client,
}

impl CashfreeAdapter {
    fn credentials(&self) -> Result<(&str, &str), ReconError> {
        if self.config.app_id.is_empty() || self.config.secret_key.is_empty() {
            return Err(ReconError::GatewayConfig(
                "CASHFREE_APP_ID / CASHFREE_SECRET_KEY not configured".to_string(),
            ));
        }
        Ok((&self.config.app_id, &self.config.secret_key))
    }

    async fn fetch_order_status(&self, order_id: &str) -> Result<serde_json::Value, ReconError> {
        let (app_id, secret_key) = self.credentials()?;
        let url = format!("{}/pg/orders/{}", self.config.base_url, order_id);

        let resp = self
            .client
            .get(url)
            .header("x-client-id", app_id)
            .header("x-client-secret", secret_key)
            .header("x-api-version", &self.config.api_version)
            .timeout(std::time::Duration::from_millis(self.config.timeout_ms))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ReconError::Gateway("cashfree order lookup timed out".to_string())
                } else {
                    ReconError::Gateway(format!("cashfree order lookup failed: {}", e))
                }
            })?;

        if !resp.status().is_success() {
            return Err(ReconError::Gateway(format!(
                "cashfree order lookup returned HTTP {}",
                resp.status().as_u16()
            )));
        }

        resp.json::<serde_json::Value>()
            .await
            .map_err(|e| ReconError::Gateway(format!("cashfree order lookup body: {}", e)))
    }
}

#[async_trait::async_trait]
impl GatewayAdapter for CashfreeAdapter {
    fn name(&self) -> &'static str {
        "cashfree"
    }

    async fn build_redirect(
        &self,
        intent: &PaymentIntent,
        return_urls: &ReturnUrls,
    ) -> Result<RedirectSession, ReconError> {
        let (app_id, secret_key) = self.credentials()?;

        let order_id = format!("order_{}", intent.id.simple());
        let body = json!({
            "order_id": order_id,
            "order_amount": intent.amount_minor as f64 / 100.0,
            "order_currency": intent.currency,
            "customer_details": {
                "customer_id": intent.user_id.simple().to_string(),
                "customer_name": intent.payer_name(),
                "customer_email": intent.payer_email(),
            },
            "order_meta": {
                "return_url": return_urls.success,
            },
        });

        let resp = self
            .client
            .post(format!("{}/pg/orders", self.config.base_url))
            .header("x-client-id", app_id)
            .header("x-client-secret", secret_key)
            .header("x-api-version", &self.config.api_version)
            .json(&body)
            .timeout(std::time::Duration::from_millis(self.config.timeout_ms))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ReconError::Gateway("cashfree order creation timed out".to_string())
                } else {
                    ReconError::Gateway(format!("cashfree order creation failed: {}", e))
                }
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(ReconError::Gateway(format!(
                "cashfree order creation returned HTTP {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let v: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| ReconError::Gateway(format!("cashfree order creation body: {}", e)))?;

        let session_id = v
            .get("payment_session_id")
            .and_then(|s| s.as_str())
            .ok_or_else(|| {
                ReconError::Gateway("cashfree response missing payment_session_id".to_string())
            })?
            .to_string();

        Ok(RedirectSession {
            external_reference: order_id,
            payload: RedirectPayload::Redirect {
                url: format!("{}/pg/view/checkout?session_id={}", self.config.base_url, session_id),
                session_id,
            },
        })
    }

    async fn parse_callback(&self, raw: &serde_json::Value) -> Result<VerifiedOutcome, ReconError> {
        // Webhooks nest the order under data.order; return-URL echoes carry
        // order_id at the top level.
        let order_id = raw
            .pointer("/data/order/order_id")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| field(raw, "order_id").to_string());

        if order_id.is_empty() {
            return Err(ReconError::Validation("missing order_id".to_string()));
        }

        // Absence of confirmation is failure, not success; only the
        // synchronous server-to-server answer counts.
        let order = self.fetch_order_status(&order_id).await?;
        let order_status = order
            .get("order_status")
            .and_then(|v| v.as_str())
            .unwrap_or("");
        let succeeded = order_status == "PAID";

        let amount_minor = order
            .get("order_amount")
            .and_then(|v| v.as_f64())
            .map(|a| (a * 100.0).round() as i64);

        Ok(VerifiedOutcome {
            external_reference: order_id,
            succeeded,
            amount_minor,
            integrity_failed: false,
            raw_fields: order,
        })
    }
}

use crate::errors::ReconError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const SUPPORTED_CURRENCIES: &[&str] = &["INR", "USD"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Payu,
    Cashfree,
    Upi,
    Bank,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Payu => "PAYU",
            PaymentMethod::Cashfree => "CASHFREE",
            PaymentMethod::Upi => "UPI",
            PaymentMethod::Bank => "BANK",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PAYU" => Some(PaymentMethod::Payu),
            "CASHFREE" => Some(PaymentMethod::Cashfree),
            "UPI" => Some(PaymentMethod::Upi),
            "BANK" => Some(PaymentMethod::Bank),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntentStatus {
    Pending,
    Processing,
    Succeeded,
    Failed,
    Canceled,
}

impl IntentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentStatus::Pending => "PENDING",
            IntentStatus::Processing => "PROCESSING",
            IntentStatus::Succeeded => "SUCCEEDED",
            IntentStatus::Failed => "FAILED",
            IntentStatus::Canceled => "CANCELED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(IntentStatus::Pending),
            "PROCESSING" => Some(IntentStatus::Processing),
            "SUCCEEDED" => Some(IntentStatus::Succeeded),
            "FAILED" => Some(IntentStatus::Failed),
            "CANCELED" => Some(IntentStatus::Canceled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            IntentStatus::Succeeded | IntentStatus::Failed | IntentStatus::Canceled
        )
    }
}

/// Status legality: monotonic, terminal states absorb, nothing ever
/// returns to PENDING.
pub fn can_transition(from: IntentStatus, to: IntentStatus) -> bool {
    if from == to || from.is_terminal() || to == IntentStatus::Pending {
        return false;
    }
    match from {
        IntentStatus::Pending => true,
        IntentStatus::Processing => to.is_terminal(),
        _ => false,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LinkedObject {
    Booking { booking_id: Uuid },
    Subscription { plan_id: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentIntent {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount_minor: i64,
    pub currency: String,
    pub method: PaymentMethod,
    pub status: IntentStatus,
    pub external_reference: Option<String>,
    pub linked_object: LinkedObject,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentIntent {
    pub fn payer_name(&self) -> &str {
        self.metadata
            .get("payer_name")
            .and_then(|v| v.as_str())
            .unwrap_or("")
    }

    pub fn payer_email(&self) -> &str {
        self.metadata
            .get("payer_email")
            .and_then(|v| v.as_str())
            .unwrap_or("")
    }

    /// Exactly-two-decimals rendering for providers that sign over a
    /// formatted amount string.
    pub fn amount_decimal(&self) -> String {
        format!("{}.{:02}", self.amount_minor / 100, self.amount_minor % 100)
    }
}

#[derive(Debug, Clone)]
pub struct NewIntent {
    pub user_id: Uuid,
    pub amount_minor: i64,
    pub currency: String,
    pub method: PaymentMethod,
    pub linked_object: LinkedObject,
    pub payer_name: String,
    pub payer_email: String,
}

impl NewIntent {
    pub fn validate(&self) -> Result<(), ReconError> {
        if self.amount_minor <= 0 {
            return Err(ReconError::Validation("amount_minor must be > 0".to_string()));
        }
        if !SUPPORTED_CURRENCIES.contains(&self.currency.as_str()) {
            return Err(ReconError::Validation(format!(
                "unrecognized currency {}",
                self.currency
            )));
        }
        if self.payer_name.trim().is_empty() || self.payer_email.trim().is_empty() {
            return Err(ReconError::Validation(
                "payer_name and payer_email are required".to_string(),
            ));
        }
        Ok(())
    }

    pub fn initial_metadata(&self) -> serde_json::Value {
        serde_json::json!({
            "payer_name": self.payer_name,
            "payer_email": self.payer_email,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartPaymentRequest {
    pub amount_minor: i64,
    pub currency: String,
    pub method: PaymentMethod,
    pub linked_object: LinkedObject,
    pub payer_name: String,
    pub payer_email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StartPaymentResponse {
    pub intent_id: Uuid,
    pub status: IntentStatus,
    pub external_reference: String,
    pub redirect: crate::gateways::RedirectPayload,
}

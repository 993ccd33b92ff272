mod support;

use payments_recon::domain::intent::{
    IntentStatus, LinkedObject, PaymentIntent, PaymentMethod,
};
use payments_recon::gateways::payu::{PayuAdapter, RESERVED_SLOTS};
use payments_recon::gateways::{GatewayAdapter, RedirectPayload, ReturnUrls};
use payments_recon::signing::{sign, verify, SaltPlacement};
use support::{payu_callback, payu_config, PAYU_KEY, PAYU_SALT};
use uuid::Uuid;

fn intent(amount_minor: i64) -> PaymentIntent {
    let now = chrono::Utc::now();
    PaymentIntent {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        amount_minor,
        currency: "INR".to_string(),
        method: PaymentMethod::Payu,
        status: IntentStatus::Pending,
        external_reference: None,
        linked_object: LinkedObject::Subscription {
            plan_id: "monthly".to_string(),
        },
        metadata: serde_json::json!({
            "payer_name": "Asha",
            "payer_email": "asha@example.com",
        }),
        created_at: now,
        updated_at: now,
    }
}

fn return_urls() -> ReturnUrls {
    ReturnUrls {
        success: "http://localhost:3000/payments/return/payu".to_string(),
        failure: "http://localhost:3000/payments/return/payu".to_string(),
    }
}

#[tokio::test]
async fn redirect_hash_covers_the_mandated_field_order() {
    let adapter = PayuAdapter {
        config: payu_config(),
    };
    let intent = intent(50_000);

    let session = adapter.build_redirect(&intent, &return_urls()).await.unwrap();
    let fields = match session.payload {
        RedirectPayload::Form { action_url, fields } => {
            assert_eq!(action_url, "https://secure.payu.in/_payment");
            fields
        }
        other => panic!("expected form payload, got {:?}", other),
    };

    assert_eq!(fields["amount"], "500.00");
    assert_eq!(fields["key"], PAYU_KEY);
    assert_eq!(session.external_reference, fields["txnid"]);

    let mut expected: Vec<&str> = vec![
        PAYU_KEY,
        &fields["txnid"],
        "500.00",
        &fields["productinfo"],
        "Asha",
        "asha@example.com",
    ];
    expected.extend(std::iter::repeat("").take(RESERVED_SLOTS));
    assert_eq!(fields["hash"], sign(&expected, PAYU_SALT, SaltPlacement::Trailing));

    // Any single altered field must break verification.
    let mut altered = expected.clone();
    altered[2] = "500.01";
    assert!(!verify(&altered, PAYU_SALT, SaltPlacement::Trailing, &fields["hash"]));
}

#[tokio::test]
async fn missing_credentials_is_a_config_error() {
    let mut config = payu_config();
    config.salt = String::new();
    let adapter = PayuAdapter { config };

    let err = adapter
        .build_redirect(&intent(50_000), &return_urls())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "GATEWAY_CONFIG_ERROR");
}

#[tokio::test]
async fn valid_response_hash_yields_success() {
    let adapter = PayuAdapter {
        config: payu_config(),
    };

    let raw = payu_callback("txn42", "success", "500.00", "subscription:monthly", "Asha", "asha@example.com");
    let outcome = adapter.parse_callback(&raw).await.unwrap();

    assert_eq!(outcome.external_reference, "txn42");
    assert!(outcome.succeeded);
    assert!(!outcome.integrity_failed);
    assert_eq!(outcome.amount_minor, Some(50_000));
}

#[tokio::test]
async fn tampered_response_is_flagged_not_trusted() {
    let adapter = PayuAdapter {
        config: payu_config(),
    };

    let mut raw = payu_callback("txn42", "success", "500.00", "subscription:monthly", "Asha", "asha@example.com");
    raw["amount"] = serde_json::json!("1.00");

    let outcome = adapter.parse_callback(&raw).await.unwrap();
    assert!(!outcome.succeeded);
    assert!(outcome.integrity_failed);
}

#[tokio::test]
async fn failure_status_with_valid_hash_is_a_clean_failure() {
    let adapter = PayuAdapter {
        config: payu_config(),
    };

    let raw = payu_callback("txn42", "failure", "500.00", "subscription:monthly", "Asha", "asha@example.com");
    let outcome = adapter.parse_callback(&raw).await.unwrap();

    assert!(!outcome.succeeded);
    assert!(!outcome.integrity_failed);
}

#[tokio::test]
async fn callback_without_txnid_is_malformed() {
    let adapter = PayuAdapter {
        config: payu_config(),
    };

    let err = adapter
        .parse_callback(&serde_json::json!({ "status": "success" }))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");
}

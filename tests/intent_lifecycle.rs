use payments_recon::domain::intent::{
    can_transition, IntentStatus, LinkedObject, NewIntent, PaymentMethod,
};
use uuid::Uuid;

use IntentStatus::{Canceled, Failed, Pending, Processing, Succeeded};

#[test]
fn pending_moves_forward_only() {
    assert!(can_transition(Pending, Processing));
    assert!(can_transition(Pending, Succeeded));
    assert!(can_transition(Pending, Failed));
    assert!(can_transition(Pending, Canceled));
    assert!(!can_transition(Pending, Pending));
}

#[test]
fn processing_only_reaches_terminal_states() {
    assert!(can_transition(Processing, Succeeded));
    assert!(can_transition(Processing, Failed));
    assert!(can_transition(Processing, Canceled));
    assert!(!can_transition(Processing, Pending));
    assert!(!can_transition(Processing, Processing));
}

#[test]
fn terminal_states_absorb() {
    for terminal in [Succeeded, Failed, Canceled] {
        for to in [Pending, Processing, Succeeded, Failed, Canceled] {
            assert!(
                !can_transition(terminal, to),
                "{} -> {} must be illegal",
                terminal.as_str(),
                to.as_str()
            );
        }
    }
}

fn new_intent(amount_minor: i64, currency: &str) -> NewIntent {
    NewIntent {
        user_id: Uuid::new_v4(),
        amount_minor,
        currency: currency.to_string(),
        method: PaymentMethod::Payu,
        linked_object: LinkedObject::Booking {
            booking_id: Uuid::new_v4(),
        },
        payer_name: "Asha".to_string(),
        payer_email: "asha@example.com".to_string(),
    }
}

#[test]
fn validation_enforces_amount_and_currency() {
    assert!(new_intent(50_000, "INR").validate().is_ok());
    assert!(new_intent(0, "INR").validate().is_err());
    assert!(new_intent(-1, "INR").validate().is_err());
    assert!(new_intent(50_000, "EUR").validate().is_err());
}

#[test]
fn validation_requires_payer_identity() {
    let mut intent = new_intent(50_000, "INR");
    intent.payer_email = "  ".to_string();
    assert!(intent.validate().is_err());
}

#[test]
fn status_labels_round_trip() {
    for status in [Pending, Processing, Succeeded, Failed, Canceled] {
        assert_eq!(IntentStatus::parse(status.as_str()), Some(status));
    }
    assert_eq!(IntentStatus::parse("REFUNDED"), None);
}

use crate::service::coordinator::CallbackOutcome;
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::{Form, Json};
use std::collections::HashMap;

fn ack(outcome: CallbackOutcome) -> axum::response::Response {
    let body = match &outcome {
        CallbackOutcome::Rejected { reason } => serde_json::json!({
            "status": outcome.status_label(),
            "reason": reason,
        }),
        _ => serde_json::json!({ "status": outcome.status_label() }),
    };
    // Always 200 for processed callbacks, even rejections, so the provider
    // does not retry-storm what it cannot fix.
    (axum::http::StatusCode::OK, Json(body)).into_response()
}

/// Server-to-server webhook delivery, provider-native JSON body.
pub async fn gateway_callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Json(raw): Json<serde_json::Value>,
) -> impl IntoResponse {
    match state.coordinator.handle_callback(&provider, &raw).await {
        Ok(outcome) => ack(outcome),
        Err(e) => e.into_response(),
    }
}

fn map_to_value(fields: HashMap<String, String>) -> serde_json::Value {
    serde_json::Value::Object(
        fields
            .into_iter()
            .map(|(k, v)| (k, serde_json::Value::String(v)))
            .collect(),
    )
}

/// Browser-carried return from the hosted checkout (PayU posts the signed
/// echo as a form). Best-effort re-verification funneling into the same
/// callback path; the replay guard makes the redundancy with the webhook
/// safe.
pub async fn payment_return_form(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Form(fields): Form<HashMap<String, String>>,
) -> impl IntoResponse {
    let raw = map_to_value(fields);
    match state.coordinator.handle_callback(&provider, &raw).await {
        Ok(outcome) => ack(outcome),
        Err(e) => e.into_response(),
    }
}

/// Query-string variant of the return funnel (Cashfree redirects with
/// `order_id` in the query).
pub async fn payment_return_query(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(fields): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let raw = map_to_value(fields);
    match state.coordinator.handle_callback(&provider, &raw).await {
        Ok(outcome) => ack(outcome),
        Err(e) => e.into_response(),
    }
}

use crate::domain::intent::StartPaymentRequest;
use crate::errors::ReconError;
use crate::AppState;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use uuid::Uuid;

fn user_id_from_headers(headers: &HeaderMap) -> Result<Uuid, ReconError> {
    // Authentication is the collaborator's job; the session-resolved user
    // id is propagated on this header.
    headers
        .get("X-User-Id")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| ReconError::Validation("X-User-Id header is required".to_string()))
}

pub async fn create_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<StartPaymentRequest>,
) -> impl IntoResponse {
    let user_id = match user_id_from_headers(&headers) {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    match state.coordinator.start_payment(user_id, req).await {
        Ok(resp) => (axum::http::StatusCode::CREATED, Json(resp)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn cancel_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(intent_id): Path<Uuid>,
) -> impl IntoResponse {
    let user_id = match user_id_from_headers(&headers) {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    match state.coordinator.cancel_payment(user_id, intent_id).await {
        Ok(intent) => (axum::http::StatusCode::OK, Json(intent)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn get_payment(
    State(state): State<AppState>,
    Path(intent_id): Path<Uuid>,
) -> impl IntoResponse {
    use crate::repo::intents_repo::IntentStore;

    match state.intents_repo.get(intent_id).await {
        Ok(intent) => (axum::http::StatusCode::OK, Json(intent)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn get_payment_by_reference(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> impl IntoResponse {
    use crate::repo::intents_repo::IntentStore;

    match state.intents_repo.find_by_external_reference(&reference).await {
        Ok(Some(intent)) => (axum::http::StatusCode::OK, Json(intent)).into_response(),
        Ok(None) => ReconError::NotFound(format!("reference {}", reference)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn health() -> impl IntoResponse {
    (axum::http::StatusCode::OK, "ok")
}

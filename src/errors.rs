use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum ReconError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("gateway misconfigured: {0}")]
    GatewayConfig(String),

    #[error("gateway call failed: {0}")]
    Gateway(String),

    #[error("state conflict: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ReconError {
    pub fn code(&self) -> &'static str {
        match self {
            ReconError::Validation(_) => "VALIDATION_ERROR",
            ReconError::GatewayConfig(_) => "GATEWAY_CONFIG_ERROR",
            ReconError::Gateway(_) => "GATEWAY_ERROR",
            ReconError::Conflict(_) => "CONFLICT",
            ReconError::NotFound(_) => "NOT_FOUND",
            ReconError::Database(_) | ReconError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            ReconError::Validation(_) => StatusCode::BAD_REQUEST,
            ReconError::GatewayConfig(_) | ReconError::Gateway(_) => StatusCode::BAD_GATEWAY,
            ReconError::Conflict(_) => StatusCode::CONFLICT,
            ReconError::NotFound(_) => StatusCode::NOT_FOUND,
            ReconError::Database(_) | ReconError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorPayload,
}

#[derive(Debug, Serialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}

impl ErrorEnvelope {
    pub fn from_error(e: &ReconError) -> Self {
        // Database details stay server-side.
        let message = match e {
            ReconError::Database(_) | ReconError::Internal(_) => "internal error".to_string(),
            other => other.to_string(),
        };
        ErrorEnvelope {
            error: ErrorPayload {
                code: e.code().to_string(),
                message,
                details: None,
            },
        }
    }
}

impl axum::response::IntoResponse for ReconError {
    fn into_response(self) -> axum::response::Response {
        let body = ErrorEnvelope::from_error(&self);
        (self.status_code(), axum::Json(body)).into_response()
    }
}

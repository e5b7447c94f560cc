use axum::{response::IntoResponse, Json};
use http::StatusCode;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Errors surfaced by the access core to facade operations.
///
/// Transient conditions (rate limiting, network failures, a single expired
/// credential) are absorbed by the dispatcher and only show up here once the
/// retry budget is spent.
#[derive(Debug, Clone, Error)]
pub enum FacadeError {
    /// Token exchange failed, or upstream rejected a freshly issued credential.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Transient failures outlived the retry budget.
    #[error("retries exhausted after {attempts} attempts: {last_failure}")]
    RetryExhausted { attempts: u32, last_failure: String },

    /// Non-retryable upstream response, passed through as is.
    #[error("upstream responded with {status}")]
    Upstream { status: StatusCode, body: Value },

    /// Upstream answered 2xx but the payload lacks what the operation needs.
    #[error("invalid upstream payload: {0}")]
    InvalidPayload(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}

pub type FacadeResult<T> = std::result::Result<T, FacadeError>;

impl FacadeError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            FacadeError::Authentication(_) => StatusCode::UNAUTHORIZED,
            FacadeError::RetryExhausted { .. } => StatusCode::SERVICE_UNAVAILABLE,
            FacadeError::Upstream { status, .. } => *status,
            FacadeError::InvalidPayload(_) => StatusCode::BAD_GATEWAY,
            FacadeError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            FacadeError::Authentication(_) => "upstream_auth_failure",
            FacadeError::RetryExhausted { .. } => "upstream_unavailable",
            FacadeError::Upstream { .. } => "upstream_error",
            FacadeError::InvalidPayload(_) => "invalid_upstream_payload",
            FacadeError::Configuration(_) => "configuration_error",
        }
    }
}

#[derive(Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<Value>,
}

impl IntoResponse for FacadeError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let message = self.to_string();
        let code = self.error_code();
        let detail = match self {
            FacadeError::Upstream { body, .. } => Some(body),
            _ => None,
        };
        let body = ErrorEnvelope {
            error: ErrorBody {
                code,
                message,
                detail,
            },
        };
        (status, Json(body)).into_response()
    }
}

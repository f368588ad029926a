use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PsError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Invalid identity")]
    InvalidIdentity,

    #[error("No session")]
    NoSession,

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Upstream error ({status}): {detail}")]
    Upstream { status: u16, detail: String },

    #[error("Missing configuration: {0}")]
    MissingConfig(&'static str),

    #[error("Internal server error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for PsError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            PsError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            PsError::Forbidden => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                "Invalid trusted-channel credential".to_string(),
            ),
            PsError::InvalidIdentity => (
                StatusCode::UNAUTHORIZED,
                "INVALID_IDENTITY",
                "Identity could not be verified".to_string(),
            ),
            PsError::NoSession => (
                StatusCode::UNAUTHORIZED,
                "NO_SESSION",
                "No staged session to claim".to_string(),
            ),
            PsError::RateLimitExceeded => (
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMIT_EXCEEDED",
                "Too many requests. Please try again later.".to_string(),
            ),
            PsError::Upstream { status, detail } => (
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY),
                "UPSTREAM_ERROR",
                detail.clone(),
            ),
            PsError::MissingConfig(what) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIG_MISSING",
                format!("Service is not configured for this operation: {what}"),
            ),
            PsError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            ),
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(error_response)).into_response()
    }
}

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use crate::core::call::CallError;
use crate::core::telephony::TelephonyError;

/// Application error type
#[derive(Debug)]
pub enum AppError {
    InternalServerError(String),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Unauthorized(String),
    ServiceUnavailable(String),
    /// The telephony provider rejected or failed a request.
    BadGateway(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::BadGateway(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_message = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal server error: {}", msg);
                "Internal server error".to_string()
            }
            AppError::BadRequest(msg) => {
                tracing::warn!("Bad request: {}", msg);
                msg
            }
            AppError::NotFound(msg) => {
                tracing::debug!("Not found: {}", msg);
                msg
            }
            AppError::Conflict(msg) => {
                tracing::warn!("Conflict: {}", msg);
                msg
            }
            AppError::Unauthorized(msg) => {
                tracing::warn!("Unauthorized: {}", msg);
                "Unauthorized".to_string()
            }
            AppError::ServiceUnavailable(msg) => {
                tracing::warn!("Service unavailable: {}", msg);
                msg
            }
            AppError::BadGateway(msg) => {
                tracing::warn!("Upstream provider error: {}", msg);
                "Telephony provider error".to_string()
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::InternalServerError(msg) => write!(f, "Internal server error: {msg}"),
            AppError::BadRequest(msg) => write!(f, "Bad request: {msg}"),
            AppError::NotFound(msg) => write!(f, "Not found: {msg}"),
            AppError::Conflict(msg) => write!(f, "Conflict: {msg}"),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {msg}"),
            AppError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {msg}"),
            AppError::BadGateway(msg) => write!(f, "Bad gateway: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<CallError> for AppError {
    fn from(err: CallError) -> Self {
        match err {
            CallError::DuplicateCall(_) => AppError::Conflict(err.to_string()),
            CallError::NotFound(_) => AppError::NotFound(err.to_string()),
            CallError::TelephonyUnavailable => AppError::ServiceUnavailable(err.to_string()),
            CallError::Telephony(e) => e.into(),
            CallError::NavigationFinished(_) | CallError::InvalidTransition { .. } => {
                AppError::Conflict(err.to_string())
            }
        }
    }
}

impl From<TelephonyError> for AppError {
    fn from(err: TelephonyError) -> Self {
        match err {
            TelephonyError::Configuration(msg) => AppError::InternalServerError(msg),
            other => AppError::BadGateway(other.to_string()),
        }
    }
}

// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_error_mapping() {
        let conflict: AppError = CallError::DuplicateCall("CA1".to_string()).into();
        assert_eq!(conflict.status_code(), StatusCode::CONFLICT);

        let missing: AppError = CallError::NotFound("CA1".to_string()).into();
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);

        let unavailable: AppError = CallError::TelephonyUnavailable.into();
        assert_eq!(unavailable.status_code(), StatusCode::SERVICE_UNAVAILABLE);

        let upstream: AppError = CallError::Telephony(TelephonyError::Provider {
            status: 400,
            message: "bad number".to_string(),
        })
        .into();
        assert_eq!(upstream.status_code(), StatusCode::BAD_GATEWAY);
    }
}

use crate::errors::app_error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

fn api_secret_matches(token: &str, secret: &str) -> bool {
    bool::from(token.as_bytes().ct_eq(secret.as_bytes()))
}

/// Bearer-secret authentication for the REST API
///
/// Passes every request through when `AUTH_REQUIRED` is off. Otherwise the
/// `Authorization: Bearer <secret>` header must match `AUTH_API_SECRET`,
/// compared in constant time.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !state.config.auth_required {
        return Ok(next.run(request).await);
    }

    let request_method = request.method().to_string();
    let request_path = request.uri().path().to_string();

    let token = request
        .headers()
        .get("authorization")
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".to_string()))?
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid Authorization header".to_string()))?
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Invalid Authorization header".to_string()))?
        .to_string();

    let Some(secret) = state.config.auth_api_secret.as_deref() else {
        return Err(AppError::InternalServerError(
            "AUTH_REQUIRED is set without AUTH_API_SECRET".to_string(),
        ));
    };

    if api_secret_matches(&token, secret) {
        tracing::debug!(method = %request_method, path = %request_path, "API secret authentication successful");
        Ok(next.run(request).await)
    } else {
        tracing::warn!(method = %request_method, path = %request_path, "API secret authentication failed: token mismatch");
        Err(AppError::Unauthorized("Invalid API secret".to_string()))
    }
}

use axum::{Router, routing::post};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::handlers::twilio;
use crate::state::AppState;

/// Create the webhook router for unauthenticated webhook endpoints
///
/// These routes are called by the telephony provider and must be merged
/// without the auth middleware.
pub fn create_webhook_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/webhooks/twilio/status",
            post(twilio::handle_status_callback),
        )
        .layer(TraceLayer::new_for_http())
}

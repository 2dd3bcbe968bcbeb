use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers::calls;
use crate::state::AppState;
use std::sync::Arc;

/// Call management API. Protected by the auth middleware when enabled.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/calls", post(calls::create_call))
        .route(
            "/calls/{call_id}",
            get(calls::get_call).delete(calls::delete_call),
        )
        .layer(TraceLayer::new_for_http())
}

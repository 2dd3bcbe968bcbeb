pub mod api;
pub mod media;
pub mod webhooks;

use axum::{Router, middleware, routing::get};
use std::sync::Arc;

use crate::handlers::api::health_check;
use crate::middleware::auth::auth_middleware;
use crate::state::AppState;

/// Assemble the full application router.
pub fn create_app(state: Arc<AppState>) -> Router {
    let protected_routes = api::create_api_router().layer(middleware::from_fn_with_state(
        state.clone(),
        auth_middleware,
    ));

    let public_routes = Router::new().route("/", get(health_check));

    public_routes
        .merge(protected_routes)
        .merge(webhooks::create_webhook_router())
        .merge(media::create_media_router())
        .with_state(state)
}

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::media;
use crate::state::AppState;
use std::sync::Arc;

/// Create the media stream router
///
/// The provider opens this socket itself and cannot send bearer tokens, so
/// it is merged without the auth middleware.
pub fn create_media_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/media", get(media::media_stream_handler))
        .layer(TraceLayer::new_for_http())
}

//! Twilio status callback webhook.

use axum::{
    extract::{Form, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::core::telephony::map_provider_status;
use crate::state::AppState;

/// The subset of Twilio's status callback parameters that drives the call.
#[derive(Debug, Clone, Deserialize)]
pub struct TwilioStatusCallback {
    #[serde(rename = "CallSid")]
    pub call_sid: String,
    #[serde(rename = "CallStatus")]
    pub call_status: String,
    #[serde(rename = "CallDuration", default)]
    pub call_duration: Option<String>,
}

/// Apply a provider status change to the matching call.
///
/// Always acknowledges with 200 so Twilio does not retry; unknown calls and
/// unknown statuses are only logged. Terminal statuses release the call.
pub async fn handle_status_callback(
    State(state): State<Arc<AppState>>,
    Form(callback): Form<TwilioStatusCallback>,
) -> StatusCode {
    let call_id = callback.call_sid.as_str();

    let Some(status) = map_provider_status(&callback.call_status) else {
        warn!(call_id, provider_status = %callback.call_status, "Unknown provider call status");
        return StatusCode::OK;
    };

    let Some(session) = state.registry().lookup(call_id) else {
        debug!(call_id, status = %status, "Status callback for unknown call");
        return StatusCode::OK;
    };

    let changed = session.apply_provider_status(status).await;
    debug!(call_id, provider_status = %callback.call_status, changed, "Applied provider status");

    if status.is_terminal() {
        info!(call_id, status = %status, duration = ?callback.call_duration, "Call ended");
        state.registry().cleanup(call_id).await;
    }

    StatusCode::OK
}

//! REST API for placing, inspecting and releasing calls.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::core::call::{CallContext, CallPurpose, CallRecord, CallSnapshot, CallStatus};
use crate::core::telephony::{OutboundCall, map_provider_status};
use crate::errors::app_error::{AppError, AppResult};
use crate::state::AppState;
use crate::utils::validate_phone_number;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCallRequest {
    pub to_phone_number: String,
    pub correlation_id: String,
    #[serde(default = "default_purpose")]
    pub purpose: CallPurpose,
    #[serde(default)]
    pub provider_npi: Option<String>,
    #[serde(default)]
    pub member_id: Option<String>,
    #[serde(default)]
    pub reference_number: Option<String>,
    /// Where to bridge the call once a human operator answers.
    #[serde(default)]
    pub handoff_number: Option<String>,
}

fn default_purpose() -> CallPurpose {
    CallPurpose::General
}

impl CreateCallRequest {
    fn context(&self) -> CallContext {
        CallContext {
            purpose: self.purpose,
            provider_npi: self.provider_npi.clone(),
            member_id: self.member_id.clone(),
            reference_number: self.reference_number.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCallResponse {
    pub call_id: String,
    pub correlation_id: String,
    pub status: CallStatus,
}

/// Dial out and register the new call.
pub async fn create_call(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateCallRequest>,
) -> AppResult<(StatusCode, Json<CreateCallResponse>)> {
    if request.correlation_id.trim().is_empty() {
        return Err(AppError::BadRequest(
            "correlation_id cannot be empty".to_string(),
        ));
    }

    let to = validate_phone_number(&request.to_phone_number)
        .map_err(|e| AppError::BadRequest(format!("Invalid to_phone_number: {e}")))?;
    let handoff_number = request
        .handoff_number
        .as_deref()
        .map(validate_phone_number)
        .transpose()
        .map_err(|e| AppError::BadRequest(format!("Invalid handoff_number: {e}")))?;

    let services = state.core_state.services.clone();
    let telephony = services
        .telephony
        .clone()
        .ok_or_else(|| AppError::ServiceUnavailable("Telephony is not configured".to_string()))?;

    let placed = telephony
        .place_call(&OutboundCall {
            to,
            correlation_id: request.correlation_id.clone(),
        })
        .await?;

    let mut record = CallRecord::new(
        placed.call_id.clone(),
        request.correlation_id.clone(),
        request.context(),
    );
    if let Some(number) = handoff_number {
        record = record.with_handoff_number(number);
    }

    let session = state.registry().register(record, services)?;
    if let Some(status) = map_provider_status(&placed.provider_status) {
        session.apply_provider_status(status).await;
    }

    info!(
        call_id = %placed.call_id,
        correlation_id = %request.correlation_id,
        purpose = %request.purpose,
        provider = telephony.provider_name(),
        "Outbound call placed"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateCallResponse {
            call_id: placed.call_id,
            correlation_id: request.correlation_id,
            status: session.status(),
        }),
    ))
}

pub async fn get_call(
    State(state): State<Arc<AppState>>,
    Path(call_id): Path<String>,
) -> AppResult<Json<CallSnapshot>> {
    let session = state
        .registry()
        .lookup(&call_id)
        .ok_or_else(|| AppError::NotFound(format!("Call {call_id} not found")))?;
    Ok(Json(session.snapshot()))
}

/// Release a call. Live calls are hung up first; unknown ids succeed.
pub async fn delete_call(
    State(state): State<Arc<AppState>>,
    Path(call_id): Path<String>,
) -> Json<serde_json::Value> {
    let session = state.registry().lookup(&call_id);

    if let (Some(session), Some(telephony)) = (&session, &state.core_state.services.telephony) {
        if !session.status().is_terminal() {
            if let Err(e) = telephony.hangup(&call_id).await {
                warn!(call_id = %call_id, error = %e, "Failed to hang up call during cleanup");
            }
        }
    }

    let removed = state.registry().cleanup(&call_id).await;
    Json(serde_json::json!({
        "call_id": call_id,
        "removed": removed
    }))
}

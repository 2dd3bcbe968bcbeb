use std::sync::Arc;

use serde::Serialize;
use tokio::time::Instant;

use super::{CallContext, CallPurpose, CallStatus};
use crate::core::navigator::{ActionRecord, unix_millis};

/// Lifecycle record of one call. Mutated only by its owning session.
#[derive(Debug, Clone)]
pub struct CallRecord {
    pub call_id: String,
    pub correlation_id: String,
    pub context: Arc<CallContext>,
    /// Number to bridge the call to once an operator answers.
    pub handoff_number: Option<String>,
    pub status: CallStatus,
    pub created_at: Instant,
    pub created_at_ms: u64,
    pub hold_started_at: Option<Instant>,
    pub hold_started_at_ms: Option<u64>,
}

impl CallRecord {
    pub fn new(
        call_id: impl Into<String>,
        correlation_id: impl Into<String>,
        context: CallContext,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            correlation_id: correlation_id.into(),
            context: Arc::new(context),
            handoff_number: None,
            status: CallStatus::Initiating,
            created_at: Instant::now(),
            created_at_ms: unix_millis(),
            hold_started_at: None,
            hold_started_at_ms: None,
        }
    }

    pub fn with_handoff_number(mut self, number: impl Into<String>) -> Self {
        self.handoff_number = Some(number.into());
        self
    }

    /// Record the first time the call went on hold. Later calls are ignored.
    pub(crate) fn mark_hold_started(&mut self) {
        if self.hold_started_at.is_none() {
            self.hold_started_at = Some(Instant::now());
            self.hold_started_at_ms = Some(unix_millis());
        }
    }

    pub fn hold_seconds(&self) -> Option<u64> {
        self.hold_started_at
            .map(|started| Instant::now().duration_since(started).as_secs())
    }
}

/// Read-only view of a call for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct CallSnapshot {
    pub call_id: String,
    pub correlation_id: String,
    pub purpose: CallPurpose,
    pub status: CallStatus,
    pub created_at_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hold_started_at_ms: Option<u64>,
    pub operator_detected: bool,
    pub navigation_enabled: bool,
    pub action_history: Vec<ActionRecord>,
}

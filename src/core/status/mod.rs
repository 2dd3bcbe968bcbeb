//! Downstream status updates.
//!
//! Every status change of a call is published to a [`StatusSink`]. Delivery
//! failures are the sink caller's to log; they never affect the call.

mod webhook;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use crate::core::call::CallStatus;

pub use webhook::WebhookStatusSink;

/// Optional detail attached to a status update.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    /// Seconds since the call first went on hold.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hold_seconds: Option<u64>,
    /// Which loop detected the operator: `navigator` or `backup`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detector: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusUpdate {
    pub call_id: String,
    pub correlation_id: String,
    pub status: CallStatus,
    pub timestamp_ms: u64,
    pub metadata: StatusMetadata,
}

#[derive(Debug, thiserror::Error)]
pub enum StatusSinkError {
    #[error("Status delivery failed: {0}")]
    Delivery(String),
    #[error("Status consumer returned {0}")]
    Rejected(u16),
    #[error("Status signing failed: {0}")]
    Signing(String),
}

#[async_trait]
pub trait StatusSink: Send + Sync {
    async fn publish(&self, update: &StatusUpdate) -> Result<(), StatusSinkError>;
}

/// Used when no downstream consumer is configured.
#[derive(Debug, Default)]
pub struct NoopStatusSink;

#[async_trait]
impl StatusSink for NoopStatusSink {
    async fn publish(&self, update: &StatusUpdate) -> Result<(), StatusSinkError> {
        debug!(call_id = %update.call_id, status = %update.status, "No status consumer configured");
        Ok(())
    }
}

/// Keeps every update in memory. Useful for tests and local runs.
#[derive(Debug, Default)]
pub struct RecordingStatusSink {
    updates: Mutex<Vec<StatusUpdate>>,
}

impl RecordingStatusSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates(&self) -> Vec<StatusUpdate> {
        self.updates.lock().clone()
    }

    pub fn statuses(&self) -> Vec<CallStatus> {
        self.updates.lock().iter().map(|u| u.status).collect()
    }
}

#[async_trait]
impl StatusSink for RecordingStatusSink {
    async fn publish(&self, update: &StatusUpdate) -> Result<(), StatusSinkError> {
        self.updates.lock().push(update.clone());
        Ok(())
    }
}

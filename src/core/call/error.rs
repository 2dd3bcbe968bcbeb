use super::CallStatus;
use crate::core::telephony::TelephonyError;

#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error("Call {0} is already registered")]
    DuplicateCall(String),
    #[error("Call {0} not found")]
    NotFound(String),
    #[error("No telephony provider is configured")]
    TelephonyUnavailable,
    #[error(transparent)]
    Telephony(#[from] TelephonyError),
    #[error("Call {0} is no longer navigating")]
    NavigationFinished(String),
    #[error("Invalid status transition {from} -> {to}")]
    InvalidTransition { from: CallStatus, to: CallStatus },
}

//! Boundary to the outbound call control plane.

mod twilio;

use async_trait::async_trait;

use crate::core::call::CallStatus;

pub use twilio::{TwilioConfig, TwilioTelephony};

#[derive(Debug, thiserror::Error)]
pub enum TelephonyError {
    #[error("Telephony request failed: {0}")]
    Request(String),
    #[error("Telephony provider returned {status}: {message}")]
    Provider { status: u16, message: String },
    #[error("Unexpected telephony response: {0}")]
    InvalidResponse(String),
    #[error("Telephony configuration error: {0}")]
    Configuration(String),
}

/// An outbound call to place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundCall {
    pub to: String,
    /// Carried through for log correlation.
    pub correlation_id: String,
}

/// Provider acknowledgement of a placed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedCall {
    /// Provider call identifier; the registry key.
    pub call_id: String,
    /// Raw provider status at creation time.
    pub provider_status: String,
}

#[async_trait]
pub trait TelephonyProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn place_call(&self, call: &OutboundCall) -> Result<PlacedCall, TelephonyError>;

    /// Play DTMF digits into the live call. This interrupts the media stream,
    /// which the provider re-establishes afterwards.
    async fn send_digits(&self, call_id: &str, digits: &str) -> Result<(), TelephonyError>;

    /// Bridge the live call to a human.
    async fn transfer(&self, call_id: &str, to: &str) -> Result<(), TelephonyError>;

    async fn hangup(&self, call_id: &str) -> Result<(), TelephonyError>;
}

/// Map the provider's call status vocabulary into [`CallStatus`].
///
/// `in-progress` means the far end answered and maps to `on_hold`; the call
/// session treats that as the start of navigation. Unknown values map to `None`.
pub fn map_provider_status(status: &str) -> Option<CallStatus> {
    match status.trim().to_ascii_lowercase().as_str() {
        "queued" | "initiated" => Some(CallStatus::Initiating),
        "ringing" => Some(CallStatus::Dialing),
        "in-progress" | "answered" => Some(CallStatus::OnHold),
        "completed" => Some(CallStatus::Completed),
        "busy" | "failed" | "no-answer" => Some(CallStatus::Failed),
        "canceled" | "cancelled" => Some(CallStatus::Cancelled),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_provider_vocabulary() {
        let cases = [
            ("queued", CallStatus::Initiating),
            ("initiated", CallStatus::Initiating),
            ("ringing", CallStatus::Dialing),
            ("in-progress", CallStatus::OnHold),
            ("completed", CallStatus::Completed),
            ("busy", CallStatus::Failed),
            ("failed", CallStatus::Failed),
            ("no-answer", CallStatus::Failed),
            ("canceled", CallStatus::Cancelled),
        ];
        for (raw, expected) in cases {
            assert_eq!(map_provider_status(raw), Some(expected), "{raw}");
        }
    }

    #[test]
    fn test_unknown_status_is_not_mapped() {
        assert_eq!(map_provider_status("paused"), None);
        assert_eq!(map_provider_status(""), None);
        assert_eq!(map_provider_status(" Ringing "), Some(CallStatus::Dialing));
    }
}

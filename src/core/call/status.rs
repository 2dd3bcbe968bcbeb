use serde::{Deserialize, Serialize};

/// Lifecycle status of one outbound call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    Initiating,
    Dialing,
    IvrNavigation,
    OnHold,
    OperatorDetected,
    UserConnected,
    Completed,
    Failed,
    Cancelled,
}

impl CallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallStatus::Initiating => "initiating",
            CallStatus::Dialing => "dialing",
            CallStatus::IvrNavigation => "ivr_navigation",
            CallStatus::OnHold => "on_hold",
            CallStatus::OperatorDetected => "operator_detected",
            CallStatus::UserConnected => "user_connected",
            CallStatus::Completed => "completed",
            CallStatus::Failed => "failed",
            CallStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CallStatus::Completed | CallStatus::Failed | CallStatus::Cancelled
        )
    }

    /// True while the navigator is still working the IVR.
    pub fn is_navigating(&self) -> bool {
        matches!(
            self,
            CallStatus::Initiating
                | CallStatus::Dialing
                | CallStatus::IvrNavigation
                | CallStatus::OnHold
        )
    }

    fn rank(&self) -> u8 {
        match self {
            CallStatus::Initiating => 0,
            CallStatus::Dialing => 1,
            CallStatus::IvrNavigation | CallStatus::OnHold => 2,
            CallStatus::OperatorDetected => 3,
            CallStatus::UserConnected => 4,
            CallStatus::Completed | CallStatus::Failed | CallStatus::Cancelled => 5,
        }
    }

    /// Whether `next` is a legal transition from `self`.
    ///
    /// Progress only moves forward, except the `ivr_navigation`/`on_hold`
    /// pair which may alternate. `failed`, `cancelled` and `completed` are
    /// reachable from every non-terminal status. Nothing leaves a terminal
    /// status.
    pub fn can_transition_to(&self, next: CallStatus) -> bool {
        if self.is_terminal() || *self == next {
            return false;
        }
        if next.is_terminal() {
            return true;
        }
        match (self, next) {
            (CallStatus::IvrNavigation, CallStatus::OnHold)
            | (CallStatus::OnHold, CallStatus::IvrNavigation) => true,
            (CallStatus::Initiating | CallStatus::Dialing, CallStatus::OperatorDetected) => false,
            (CallStatus::OperatorDetected, CallStatus::UserConnected) => true,
            (_, CallStatus::UserConnected) => false,
            _ => next.rank() > self.rank(),
        }
    }
}

impl std::fmt::Display for CallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

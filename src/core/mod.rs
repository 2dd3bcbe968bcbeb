pub mod audio_bridge;
pub mod call;
pub mod decision;
pub mod detector;
pub mod navigator;
pub mod registry;
pub mod state;
pub mod status;
pub mod stt;
pub mod telephony;
pub mod transcript;

// Re-export commonly used types for convenience
pub use audio_bridge::{AudioBridge, SttFactory};
pub use call::{
    CallContext, CallError, CallPurpose, CallRecord, CallServices, CallSession, CallSnapshot,
    CallStatus, DetectionSource, IdentifierKind,
};
pub use decision::{
    Action, ActionKind, DecisionError, DecisionFunction, DecisionRequest, DecisionResponse,
    LlmDecisionClient, LlmDecisionConfig, OperatorAssessment, OperatorClassifier,
};
pub use detector::{BackupDetector, DetectorConfig, DetectorOutcome};
pub use navigator::{
    ActionHistory, ActionRecord, DecisionEngine, LoopControl, LoopPhase, NavigatorConfig,
    SkipReason, TickOutcome,
};
pub use registry::CallRegistry;
pub use status::{
    NoopStatusSink, RecordingStatusSink, StatusMetadata, StatusSink, StatusSinkError,
    StatusUpdate, WebhookStatusSink,
};
pub use stt::{
    BaseSTT, DeepgramSTT, DeepgramSTTConfig, STTConfig, STTConnectionState, STTError, STTResult,
    STTResultCallback, create_stt_provider,
};
pub use telephony::{
    OutboundCall, PlacedCall, TelephonyError, TelephonyProvider, TwilioConfig, TwilioTelephony,
    map_provider_status,
};
pub use transcript::{TranscriptBuffer, TranscriptFanout, TranscriptSink};

pub use state::CoreState;

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::control::{Commit, LoopControl};
use super::history::{ActionHistory, ActionRecord};
use super::NavigatorConfig;
use crate::core::call::{CallContext, IdentifierKind};
use crate::core::decision::{Action, ActionKind, DecisionFunction, DecisionRequest};
use crate::core::transcript::{TranscriptBuffer, TranscriptSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Paused, detected or stopped.
    Inactive,
    TranscriptTooShort,
    Debounced,
    Cooldown,
}

/// Result of one navigator tick.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Skipped(SkipReason),
    Waited,
    /// Hold or queue language. Not dispatched, not recorded.
    Hold,
    /// Recorded and buffer cleared; the caller must send `digits`.
    Dispatched { action: Action, digits: String },
    OperatorDetected { confidence: f32 },
    BelowThreshold { confidence: f32 },
    MissingIdentifier(IdentifierKind),
    /// The loop was paused or stopped while the decision was in flight.
    Discarded,
}

#[derive(Debug, Default)]
struct Pacing {
    last_analysis: Option<Instant>,
    last_dispatch: Option<Instant>,
}

pub struct DecisionEngine {
    call_id: String,
    context: Arc<CallContext>,
    config: NavigatorConfig,
    decider: Arc<dyn DecisionFunction>,
    control: Arc<LoopControl>,
    buffer: Mutex<TranscriptBuffer>,
    history: Mutex<ActionHistory>,
    pacing: Mutex<Pacing>,
}

impl DecisionEngine {
    /// Create a paused engine.
    pub fn new(
        call_id: impl Into<String>,
        context: Arc<CallContext>,
        config: NavigatorConfig,
        decider: Arc<dyn DecisionFunction>,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            context,
            buffer: Mutex::new(TranscriptBuffer::new(config.buffer_horizon)),
            history: Mutex::new(ActionHistory::new(config.history_limit)),
            config,
            decider,
            control: Arc::new(LoopControl::paused()),
            pacing: Mutex::new(Pacing::default()),
        }
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    pub fn config(&self) -> &NavigatorConfig {
        &self.config
    }

    pub fn control(&self) -> &Arc<LoopControl> {
        &self.control
    }

    pub fn pause(&self) -> bool {
        self.control.pause()
    }

    pub fn resume(&self) -> bool {
        self.control.resume()
    }

    pub fn stop(&self) {
        self.control.stop();
    }

    pub fn is_operator_detected(&self) -> bool {
        self.control.is_detected()
    }

    /// Latch operator detection from another source. True on the first call only.
    pub fn mark_operator_detected(&self) -> bool {
        self.control.mark_detected()
    }

    pub fn history(&self) -> Vec<ActionRecord> {
        self.history.lock().snapshot()
    }

    pub fn clear_history(&self) {
        self.history.lock().clear();
    }

    pub fn transcript(&self) -> String {
        self.buffer.lock().snapshot()
    }

    /// Run one analysis.
    pub async fn tick(&self) -> TickOutcome {
        let Some(ticket) = self.control.ticket() else {
            return TickOutcome::Skipped(SkipReason::Inactive);
        };

        let transcript = self.buffer.lock().snapshot();
        if transcript.chars().count() < self.config.min_transcript_chars {
            return TickOutcome::Skipped(SkipReason::TranscriptTooShort);
        }

        {
            let mut pacing = self.pacing.lock();
            let now = Instant::now();
            if pacing
                .last_analysis
                .is_some_and(|last| now.duration_since(last) < self.config.debounce)
            {
                return TickOutcome::Skipped(SkipReason::Debounced);
            }
            pacing.last_analysis = Some(now);
        }

        let request = DecisionRequest {
            transcript,
            context: self.context.clone(),
            recent_actions: self.history.lock().recent(self.config.context_actions),
        };

        let action = match self.decider.decide(&request).await {
            Ok(action) => action,
            Err(e) => {
                warn!(call_id = %self.call_id, error = %e, "Decision function failed, treating as wait");
                Action::wait(e.to_string())
            }
        };

        let name = action.name();
        match self
            .control
            .commit(&ticket, |commit| self.apply(commit, action))
        {
            Some(outcome) => outcome,
            None => {
                debug!(call_id = %self.call_id, action = name, "Discarding decision from a paused or stopped loop");
                TickOutcome::Discarded
            }
        }
    }

    fn apply(&self, commit: &mut Commit<'_>, action: Action) -> TickOutcome {
        match action.kind.clone() {
            ActionKind::OperatorDetected { confidence } => {
                if confidence >= self.config.operator_threshold {
                    commit.mark_detected();
                    info!(call_id = %self.call_id, confidence, reason = %action.reason, "Operator detected");
                    TickOutcome::OperatorDetected { confidence }
                } else {
                    debug!(call_id = %self.call_id, confidence, "Operator confidence below threshold");
                    TickOutcome::BelowThreshold { confidence }
                }
            }
            ActionKind::Hold => TickOutcome::Hold,
            ActionKind::Wait => {
                debug!(call_id = %self.call_id, reason = %action.reason, "Waiting for more prompt");
                TickOutcome::Waited
            }
            ActionKind::PressDigit { digits } => self.dispatch(action, digits),
            ActionKind::EnterIdentifier { identifier } => {
                match self.context.keypad_digits(identifier) {
                    Some(digits) => self.dispatch(action, digits),
                    None => {
                        warn!(
                            call_id = %self.call_id,
                            identifier = %identifier,
                            "Identifier requested but not available for this call, skipping"
                        );
                        TickOutcome::MissingIdentifier(identifier)
                    }
                }
            }
        }
    }

    fn dispatch(&self, action: Action, digits: String) -> TickOutcome {
        let now = Instant::now();
        {
            let mut pacing = self.pacing.lock();
            if pacing
                .last_dispatch
                .is_some_and(|last| now.duration_since(last) < self.config.action_cooldown)
            {
                debug!(call_id = %self.call_id, action = action.name(), "Action cooldown active, skipping");
                return TickOutcome::Skipped(SkipReason::Cooldown);
            }
            pacing.last_dispatch = Some(now);
        }

        self.history.lock().push(ActionRecord::new(action.clone()));
        self.buffer.lock().clear();

        info!(call_id = %self.call_id, action = action.name(), reason = %action.reason, "Dispatching action");
        TickOutcome::Dispatched { action, digits }
    }
}

impl TranscriptSink for DecisionEngine {
    fn push_transcript(&self, text: &str) {
        self.buffer.lock().append(text);
    }
}

impl std::fmt::Debug for DecisionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecisionEngine")
            .field("call_id", &self.call_id)
            .field("phase", &self.control.phase())
            .field("history_len", &self.history.lock().len())
            .finish()
    }
}

//! Backup operator detector.
//!
//! Runs beside the primary navigator with a longer transcript window and a
//! coarser cadence, asking only whether a human is on the line. It never
//! signals once the primary navigator has already detected an operator.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::core::call::CallContext;
use crate::core::decision::OperatorClassifier;
use crate::core::navigator::{LoopControl, SkipReason};
use crate::core::transcript::{TranscriptBuffer, TranscriptSink};

#[derive(Debug, Clone, PartialEq)]
pub struct DetectorConfig {
    pub tick_interval: Duration,
    pub buffer_horizon: Duration,
    pub min_transcript_chars: usize,
    /// Confidence must be strictly above this value.
    pub threshold: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(5),
            buffer_horizon: Duration::from_secs(30),
            min_transcript_chars: 20,
            threshold: 0.7,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DetectorOutcome {
    Skipped(SkipReason),
    NotOperator,
    BelowThreshold { confidence: f32 },
    /// The primary navigator got there first; nothing to signal.
    PrimaryAlreadyDetected,
    OperatorDetected { confidence: f32 },
    Discarded,
}

pub struct BackupDetector {
    call_id: String,
    context: Arc<CallContext>,
    config: DetectorConfig,
    classifier: Arc<dyn OperatorClassifier>,
    control: Arc<LoopControl>,
    primary: Arc<LoopControl>,
    buffer: Mutex<TranscriptBuffer>,
}

impl BackupDetector {
    /// Create a paused detector that defers to `primary`.
    pub fn new(
        call_id: impl Into<String>,
        context: Arc<CallContext>,
        config: DetectorConfig,
        classifier: Arc<dyn OperatorClassifier>,
        primary: Arc<LoopControl>,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            context,
            buffer: Mutex::new(TranscriptBuffer::new(config.buffer_horizon)),
            config,
            classifier,
            control: Arc::new(LoopControl::paused()),
            primary,
        }
    }

    pub fn config(&self) -> &DetectorConfig {
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

    pub async fn tick(&self) -> DetectorOutcome {
        let Some(ticket) = self.control.ticket() else {
            return DetectorOutcome::Skipped(SkipReason::Inactive);
        };

        if self.primary.is_detected() {
            return DetectorOutcome::PrimaryAlreadyDetected;
        }

        let transcript = self.buffer.lock().snapshot();
        if transcript.chars().count() < self.config.min_transcript_chars {
            return DetectorOutcome::Skipped(SkipReason::TranscriptTooShort);
        }

        let assessment = match self.classifier.classify(&transcript, &self.context).await {
            Ok(assessment) => assessment,
            Err(e) => {
                warn!(call_id = %self.call_id, error = %e, "Operator classifier failed, assuming no operator");
                return DetectorOutcome::NotOperator;
            }
        };

        if !assessment.is_operator {
            return DetectorOutcome::NotOperator;
        }

        let confidence = assessment.confidence;
        if confidence <= self.config.threshold {
            debug!(call_id = %self.call_id, confidence, "Backup operator confidence below threshold");
            return DetectorOutcome::BelowThreshold { confidence };
        }

        let outcome = self.control.commit(&ticket, |commit| {
            if self.primary.is_detected() {
                DetectorOutcome::PrimaryAlreadyDetected
            } else {
                commit.mark_detected();
                DetectorOutcome::OperatorDetected { confidence }
            }
        });

        match outcome {
            Some(DetectorOutcome::OperatorDetected { confidence }) => {
                info!(call_id = %self.call_id, confidence, reason = %assessment.reason, "Backup detector found an operator");
                DetectorOutcome::OperatorDetected { confidence }
            }
            Some(other) => other,
            None => DetectorOutcome::Discarded,
        }
    }
}

impl TranscriptSink for BackupDetector {
    fn push_transcript(&self, text: &str) {
        self.buffer.lock().append(text);
    }
}

impl std::fmt::Debug for BackupDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackupDetector")
            .field("call_id", &self.call_id)
            .field("phase", &self.control.phase())
            .finish()
    }
}

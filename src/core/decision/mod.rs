//! Boundary to the external decision function.
//!
//! The navigator asks a [`DecisionFunction`] what to do with the buffered
//! transcript; the backup detector asks an [`OperatorClassifier`] whether a
//! human is on the line. [`LlmDecisionClient`] implements both against an
//! OpenAI-compatible chat completions endpoint.

mod action;
mod client;
mod prompts;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::call::CallContext;
use crate::core::navigator::ActionRecord;

pub use action::{Action, ActionKind, DecisionResponse, parse_decision};
pub use client::{LlmDecisionClient, LlmDecisionConfig};

/// Everything the decision function gets to see for one analysis.
#[derive(Debug, Clone)]
pub struct DecisionRequest {
    pub transcript: String,
    pub context: Arc<CallContext>,
    /// Most recent actions, oldest first.
    pub recent_actions: Vec<ActionRecord>,
}

/// Verdict of the conservative operator-presence classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorAssessment {
    pub is_operator: bool,
    pub confidence: f32,
    #[serde(default)]
    pub reason: String,
}

impl OperatorAssessment {
    pub fn not_operator(reason: impl Into<String>) -> Self {
        Self {
            is_operator: false,
            confidence: 0.0,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DecisionError {
    #[error("Decision request failed: {0}")]
    Request(String),
    #[error("Decision service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Malformed decision response: {0}")]
    Malformed(String),
}

/// Chooses one action for the buffered transcript.
#[async_trait]
pub trait DecisionFunction: Send + Sync {
    async fn decide(&self, request: &DecisionRequest) -> Result<Action, DecisionError>;
}

/// Scores how likely it is that a human operator is speaking.
#[async_trait]
pub trait OperatorClassifier: Send + Sync {
    async fn classify(
        &self,
        transcript: &str,
        context: &CallContext,
    ) -> Result<OperatorAssessment, DecisionError>;
}

//! Primary IVR navigator.
//!
//! A [`DecisionEngine`] owns one call's primary transcript buffer and action
//! history. Each tick it asks the decision function what to do and applies
//! the navigation policy to the answer; the owning call session performs the
//! resulting side effects.

mod control;
mod engine;
mod history;

use std::time::Duration;

pub use control::{Commit, LoopControl, LoopPhase, TickTicket};
pub use engine::{DecisionEngine, SkipReason, TickOutcome};
pub use history::{ActionHistory, ActionRecord};

pub(crate) use history::unix_millis;

/// Tuning for the primary navigator.
#[derive(Debug, Clone, PartialEq)]
pub struct NavigatorConfig {
    pub tick_interval: Duration,
    pub buffer_horizon: Duration,
    /// Shorter transcripts are not analyzed.
    pub min_transcript_chars: usize,
    /// Minimum spacing between two analyses.
    pub debounce: Duration,
    /// Minimum spacing between two dispatched actions.
    pub action_cooldown: Duration,
    /// Operator confidence required to hand off (inclusive).
    pub operator_threshold: f32,
    pub history_limit: usize,
    /// How many recent actions are sent with each decision request.
    pub context_actions: usize,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(3),
            buffer_horizon: Duration::from_secs(15),
            min_transcript_chars: 10,
            debounce: Duration::from_secs(2),
            action_cooldown: Duration::from_secs(2),
            operator_threshold: 0.85,
            history_limit: 10,
            context_actions: 5,
        }
    }
}

//! Periodic analysis tasks, one per loop per call.
//!
//! Each task sleeps while its loop is paused and exits once the loop is
//! detected or stopped, or when its session has been dropped.

use std::sync::{Arc, Weak};

use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::debug;

use super::session::CallSession;
use crate::core::detector::BackupDetector;
use crate::core::navigator::DecisionEngine;

/// Spawn the primary navigator loop.
///
/// The session is held weakly so the task never keeps a dead call alive.
pub(super) fn spawn_navigator_task(
    session: Weak<CallSession>,
    engine: Arc<DecisionEngine>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(engine.config().tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if !engine.control().wait_runnable().await {
                break;
            }
            ticker.tick().await;

            let outcome = engine.tick().await;
            let Some(session) = session.upgrade() else {
                break;
            };
            session.handle_navigator_outcome(outcome).await;
        }

        debug!(call_id = %engine.call_id(), "Navigator loop finished");
    })
}

/// Spawn the backup operator detector loop.
pub(super) fn spawn_detector_task(
    session: Weak<CallSession>,
    detector: Arc<BackupDetector>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(detector.config().tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if !detector.control().wait_runnable().await {
                break;
            }
            ticker.tick().await;

            let outcome = detector.tick().await;
            let Some(session) = session.upgrade() else {
                break;
            };
            session.handle_detector_outcome(outcome).await;
        }

        debug!("Backup detector loop finished");
    })
}

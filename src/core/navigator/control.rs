//! Run state shared by an analysis loop and the call session that owns it.
//!
//! Each loop is `Active`, `Paused`, `Detected` or `Stopped`. Every pause or
//! detection bumps an epoch; a tick captures the epoch when it starts and may
//! only commit its result if the epoch is unchanged and the loop is still
//! active. An in-flight decision that straddles a pause is therefore
//! discarded.

use parking_lot::Mutex;
use tokio::sync::Notify;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    Active,
    Paused,
    /// Operator found. Terminal.
    Detected,
    /// Torn down. Terminal.
    Stopped,
}

impl LoopPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoopPhase::Detected | LoopPhase::Stopped)
    }
}

#[derive(Debug)]
struct ControlState {
    phase: LoopPhase,
    epoch: u64,
}

/// Proof that a tick started while the loop was active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickTicket {
    epoch: u64,
}

/// Mutable view handed to a commit closure while the control lock is held.
pub struct Commit<'a> {
    state: &'a mut ControlState,
    detected: bool,
}

impl Commit<'_> {
    /// Latch the loop into `Detected`.
    pub fn mark_detected(&mut self) {
        self.state.phase = LoopPhase::Detected;
        self.state.epoch += 1;
        self.detected = true;
    }
}

#[derive(Debug)]
pub struct LoopControl {
    state: Mutex<ControlState>,
    changed: Notify,
}

impl LoopControl {
    pub fn new(phase: LoopPhase) -> Self {
        Self {
            state: Mutex::new(ControlState { phase, epoch: 0 }),
            changed: Notify::new(),
        }
    }

    /// Loops start paused and begin ticking once audio is attached.
    pub fn paused() -> Self {
        Self::new(LoopPhase::Paused)
    }

    pub fn phase(&self) -> LoopPhase {
        self.state.lock().phase
    }

    pub fn is_detected(&self) -> bool {
        self.phase() == LoopPhase::Detected
    }

    /// Returns a ticket when the loop is active.
    pub fn ticket(&self) -> Option<TickTicket> {
        let state = self.state.lock();
        (state.phase == LoopPhase::Active).then_some(TickTicket { epoch: state.epoch })
    }

    /// Run `f` only if the ticket is still current. Returns `None` for a stale ticket.
    pub fn commit<R>(&self, ticket: &TickTicket, f: impl FnOnce(&mut Commit<'_>) -> R) -> Option<R> {
        let (result, detected) = {
            let mut state = self.state.lock();
            if state.phase != LoopPhase::Active || state.epoch != ticket.epoch {
                return None;
            }
            let mut commit = Commit {
                state: &mut *state,
                detected: false,
            };
            let result = f(&mut commit);
            (result, commit.detected)
        };

        if detected {
            self.changed.notify_waiters();
        }
        Some(result)
    }

    /// Suspend ticking. Returns false when the loop was not active.
    pub fn pause(&self) -> bool {
        let mut state = self.state.lock();
        if state.phase != LoopPhase::Active {
            return false;
        }
        state.phase = LoopPhase::Paused;
        state.epoch += 1;
        true
    }

    /// Resume ticking. Returns false when the loop was not paused.
    pub fn resume(&self) -> bool {
        {
            let mut state = self.state.lock();
            if state.phase != LoopPhase::Paused {
                return false;
            }
            state.phase = LoopPhase::Active;
        }
        self.changed.notify_waiters();
        true
    }

    /// Latch `Detected` from outside a tick. Returns true on the first call only.
    pub fn mark_detected(&self) -> bool {
        {
            let mut state = self.state.lock();
            if state.phase.is_terminal() {
                return false;
            }
            state.phase = LoopPhase::Detected;
            state.epoch += 1;
        }
        self.changed.notify_waiters();
        true
    }

    /// Stop for good. A detected loop stays detected.
    pub fn stop(&self) {
        {
            let mut state = self.state.lock();
            if state.phase.is_terminal() {
                return;
            }
            state.phase = LoopPhase::Stopped;
            state.epoch += 1;
        }
        self.changed.notify_waiters();
    }

    /// Wait until the loop may tick. Returns false once the loop is terminal.
    pub async fn wait_runnable(&self) -> bool {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            match self.phase() {
                LoopPhase::Active => return true,
                LoopPhase::Detected | LoopPhase::Stopped => return false,
                LoopPhase::Paused => notified.await,
            }
        }
    }
}

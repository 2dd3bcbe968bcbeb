use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::record::{CallRecord, CallSnapshot};
use super::tasks::{spawn_detector_task, spawn_navigator_task};
use super::{CallContext, CallError, CallStatus};
use crate::core::audio_bridge::{AudioBridge, SttFactory};
use crate::core::decision::{DecisionFunction, OperatorClassifier};
use crate::core::detector::{BackupDetector, DetectorConfig, DetectorOutcome};
use crate::core::navigator::{DecisionEngine, NavigatorConfig, TickOutcome, unix_millis};
use crate::core::status::{StatusMetadata, StatusSink, StatusUpdate};
use crate::core::telephony::TelephonyProvider;
use crate::core::transcript::{TranscriptFanout, TranscriptSink};

/// Which loop reported an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionSource {
    Navigator,
    Backup,
}

impl DetectionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionSource::Navigator => "navigator",
            DetectionSource::Backup => "backup",
        }
    }
}

/// Collaborators shared by every call. Any of the optional ones may be
/// absent; the affected feature is then disabled for the call.
#[derive(Clone)]
pub struct CallServices {
    pub telephony: Option<Arc<dyn TelephonyProvider>>,
    pub decider: Option<Arc<dyn DecisionFunction>>,
    pub classifier: Option<Arc<dyn OperatorClassifier>>,
    pub stt_factory: Option<SttFactory>,
    pub status_sink: Arc<dyn StatusSink>,
    pub navigator: NavigatorConfig,
    pub detector: DetectorConfig,
}

/// Owns one call: its record, analysis loops, and the current audio bridge.
///
/// The navigator, detector and their action history live as long as the
/// session. Audio bridges come and go with media streams.
pub struct CallSession {
    call_id: String,
    record: RwLock<CallRecord>,
    navigator: Option<Arc<DecisionEngine>>,
    detector: Option<Arc<BackupDetector>>,
    fanout: TranscriptFanout,
    bridge: tokio::sync::Mutex<Option<AudioBridge>>,
    services: CallServices,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    handoff_started: AtomicBool,
    closed: AtomicBool,
}

impl CallSession {
    /// Build the session and spawn its (paused) analysis loops.
    pub fn start(record: CallRecord, services: CallServices) -> Arc<Self> {
        let call_id = record.call_id.clone();
        let context = record.context.clone();

        let navigator = services.decider.clone().map(|decider| {
            Arc::new(DecisionEngine::new(
                call_id.clone(),
                context.clone(),
                services.navigator.clone(),
                decider,
            ))
        });

        let detector = match (&navigator, services.classifier.clone()) {
            (Some(navigator), Some(classifier)) => Some(Arc::new(BackupDetector::new(
                call_id.clone(),
                context,
                services.detector.clone(),
                classifier,
                navigator.control().clone(),
            ))),
            _ => None,
        };

        let mut sinks: Vec<Arc<dyn TranscriptSink>> = Vec::new();
        if let Some(navigator) = &navigator {
            sinks.push(navigator.clone());
        }
        if let Some(detector) = &detector {
            sinks.push(detector.clone());
        }

        if navigator.is_none() {
            warn!(call_id = %call_id, "Decision function not configured, navigation disabled for this call");
        }
        if services.stt_factory.is_none() {
            warn!(call_id = %call_id, "Speech backend not configured, navigation disabled for this call");
        }

        let session = Arc::new(Self {
            call_id,
            record: RwLock::new(record),
            navigator,
            detector,
            fanout: TranscriptFanout::new(sinks),
            bridge: tokio::sync::Mutex::new(None),
            services,
            tasks: Mutex::new(Vec::new()),
            handoff_started: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        });

        {
            let mut tasks = session.tasks.lock();
            if let Some(navigator) = &session.navigator {
                tasks.push(spawn_navigator_task(
                    Arc::downgrade(&session),
                    navigator.clone(),
                ));
            }
            if let Some(detector) = &session.detector {
                tasks.push(spawn_detector_task(
                    Arc::downgrade(&session),
                    detector.clone(),
                ));
            }
        }

        session
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    pub fn status(&self) -> CallStatus {
        self.record.read().status
    }

    pub fn record(&self) -> CallRecord {
        self.record.read().clone()
    }

    pub fn context(&self) -> Arc<CallContext> {
        self.record.read().context.clone()
    }

    pub fn age(&self) -> Duration {
        Instant::now().duration_since(self.record.read().created_at)
    }

    pub fn navigation_enabled(&self) -> bool {
        self.navigator.is_some() && self.services.stt_factory.is_some()
    }

    pub fn is_operator_detected(&self) -> bool {
        self.handoff_started.load(Ordering::SeqCst)
            || self
                .navigator
                .as_ref()
                .is_some_and(|navigator| navigator.is_operator_detected())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn navigator(&self) -> Option<&Arc<DecisionEngine>> {
        self.navigator.as_ref()
    }

    pub fn detector(&self) -> Option<&Arc<BackupDetector>> {
        self.detector.as_ref()
    }

    pub async fn has_audio_bridge(&self) -> bool {
        self.bridge.lock().await.is_some()
    }

    pub fn snapshot(&self) -> CallSnapshot {
        let record = self.record.read().clone();
        CallSnapshot {
            call_id: record.call_id,
            correlation_id: record.correlation_id,
            purpose: record.context.purpose,
            status: record.status,
            created_at_ms: record.created_at_ms,
            hold_started_at_ms: record.hold_started_at_ms,
            operator_detected: self.is_operator_detected(),
            navigation_enabled: self.navigation_enabled(),
            action_history: self
                .navigator
                .as_ref()
                .map(|navigator| navigator.history())
                .unwrap_or_default(),
        }
    }

    // ---- status ----

    fn apply_transition(&self, next: CallStatus) -> Result<Option<StatusUpdate>, CallError> {
        let mut record = self.record.write();
        let current = record.status;
        if current == next {
            return Ok(None);
        }
        if !current.can_transition_to(next) {
            return Err(CallError::InvalidTransition {
                from: current,
                to: next,
            });
        }

        record.status = next;
        if next == CallStatus::OnHold {
            record.mark_hold_started();
        }

        info!(call_id = %self.call_id, from = %current, to = %next, "Call status changed");

        Ok(Some(StatusUpdate {
            call_id: record.call_id.clone(),
            correlation_id: record.correlation_id.clone(),
            status: next,
            timestamp_ms: unix_millis(),
            metadata: StatusMetadata {
                hold_seconds: record.hold_seconds(),
                ..StatusMetadata::default()
            },
        }))
    }

    /// Move to `next` and notify the status consumer. Returns false when
    /// the call was already in `next`.
    pub async fn transition(
        &self,
        next: CallStatus,
        metadata: StatusMetadata,
    ) -> Result<bool, CallError> {
        let Some(mut update) = self.apply_transition(next)? else {
            return Ok(false);
        };
        update.metadata.confidence = metadata.confidence;
        update.metadata.detector = metadata.detector;
        if metadata.hold_seconds.is_some() {
            update.metadata.hold_seconds = metadata.hold_seconds;
        }
        self.publish(update).await;
        Ok(true)
    }

    async fn publish(&self, update: StatusUpdate) {
        if let Err(e) = self.services.status_sink.publish(&update).await {
            warn!(call_id = %self.call_id, status = %update.status, error = %e, "Failed to deliver status update");
        }
    }

    /// Apply a status reported by the telephony provider.
    ///
    /// Provider callbacks can arrive late or out of order, so transitions
    /// that would move the call backwards are ignored rather than rejected.
    /// An answered call (`on_hold` in the provider mapping) starts IVR
    /// navigation; only the navigator decides that the call is on hold.
    pub async fn apply_provider_status(&self, reported: CallStatus) -> bool {
        let current = self.status();
        let next = match reported {
            CallStatus::OnHold | CallStatus::IvrNavigation => {
                if !matches!(current, CallStatus::Initiating | CallStatus::Dialing) {
                    return false;
                }
                CallStatus::IvrNavigation
            }
            other => other,
        };

        if !current.can_transition_to(next) {
            debug!(call_id = %self.call_id, from = %current, to = %next, "Ignoring provider status");
            return false;
        }

        let changed = match self.transition(next, StatusMetadata::default()).await {
            Ok(changed) => changed,
            Err(e) => {
                debug!(call_id = %self.call_id, error = %e, "Provider status lost a race");
                false
            }
        };

        if next.is_terminal() {
            self.stop_navigation().await;
        }
        changed
    }

    // ---- analysis loops ----

    pub fn pause_analysis(&self) {
        if let Some(navigator) = &self.navigator {
            navigator.pause();
        }
        if let Some(detector) = &self.detector {
            detector.pause();
        }
    }

    pub fn resume_analysis(&self) {
        if let Some(navigator) = &self.navigator {
            navigator.resume();
        }
        if let Some(detector) = &self.detector {
            detector.resume();
        }
    }

    /// Stop both loops and drop the audio bridge. History is kept.
    async fn stop_navigation(&self) {
        if let Some(navigator) = &self.navigator {
            navigator.stop();
        }
        if let Some(detector) = &self.detector {
            detector.stop();
        }
        self.close_bridge().await;
    }

    pub(super) async fn handle_navigator_outcome(&self, outcome: TickOutcome) {
        match outcome {
            TickOutcome::Dispatched { action, digits } => {
                if let Err(e) = self.send_digits(&digits).await {
                    warn!(call_id = %self.call_id, action = action.name(), error = %e, "Failed to dispatch action");
                }
            }
            TickOutcome::Hold => self.enter_hold().await,
            TickOutcome::OperatorDetected { confidence } => {
                self.signal_operator(confidence, DetectionSource::Navigator)
                    .await;
            }
            TickOutcome::Skipped(reason) => {
                debug!(call_id = %self.call_id, reason = ?reason, "Navigator tick skipped");
            }
            _ => {}
        }
    }

    pub(super) async fn handle_detector_outcome(&self, outcome: DetectorOutcome) {
        if let DetectorOutcome::OperatorDetected { confidence } = outcome {
            self.signal_operator(confidence, DetectionSource::Backup)
                .await;
        }
    }

    async fn enter_hold(&self) {
        let current = self.status();
        if current == CallStatus::OnHold || !current.is_navigating() {
            return;
        }
        if let Err(e) = self
            .transition(CallStatus::OnHold, StatusMetadata::default())
            .await
        {
            debug!(call_id = %self.call_id, error = %e, "Could not enter hold");
        }
    }

    /// Latch operator detection, stop analysis, and hand the call off.
    ///
    /// Only the first signal for a call has any effect.
    pub async fn signal_operator(&self, confidence: f32, source: DetectionSource) {
        if self.handoff_started.swap(true, Ordering::SeqCst) {
            debug!(call_id = %self.call_id, source = source.as_str(), "Operator already signaled");
            return;
        }

        if let Some(navigator) = &self.navigator {
            navigator.mark_operator_detected();
        }
        if let Some(detector) = &self.detector {
            detector.stop();
        }
        self.close_bridge().await;

        let metadata = StatusMetadata {
            confidence: Some(confidence),
            hold_seconds: self.record.read().hold_seconds(),
            detector: Some(source.as_str().to_string()),
        };
        match self.transition(CallStatus::OperatorDetected, metadata).await {
            Ok(_) => {}
            Err(e) => {
                warn!(call_id = %self.call_id, error = %e, "Operator detected outside of navigation");
                return;
            }
        }

        let handoff_number = self.record.read().handoff_number.clone();
        let (Some(telephony), Some(number)) = (&self.services.telephony, handoff_number) else {
            info!(call_id = %self.call_id, "Operator detected, no handoff number configured");
            return;
        };

        match telephony.transfer(&self.call_id, &number).await {
            Ok(()) => {
                if let Err(e) = self
                    .transition(CallStatus::UserConnected, StatusMetadata::default())
                    .await
                {
                    debug!(call_id = %self.call_id, error = %e, "Could not mark user connected");
                }
            }
            Err(e) => {
                warn!(call_id = %self.call_id, error = %e, "Failed to transfer call to user");
            }
        }
    }

    // ---- media stream / reconnect protocol ----

    /// A media stream started: attach a new audio bridge and resume analysis.
    ///
    /// Returns false when no bridge was attached (navigation finished or
    /// disabled, or the speech backend failed to connect).
    pub async fn attach_stream(&self, stream_id: &str) -> bool {
        if self.is_closed() {
            return false;
        }

        let current = self.status();
        if matches!(current, CallStatus::Initiating | CallStatus::Dialing) {
            if let Err(e) = self
                .transition(CallStatus::IvrNavigation, StatusMetadata::default())
                .await
            {
                debug!(call_id = %self.call_id, error = %e, "Stream started in unexpected status");
            }
        }
        if !self.status().is_navigating() || self.is_operator_detected() {
            debug!(call_id = %self.call_id, stream_id, "Navigation finished, not attaching audio");
            return false;
        }

        let Some(factory) = self.services.stt_factory.as_ref() else {
            return false;
        };
        if self.fanout.subscriber_count() == 0 {
            return false;
        }

        let stt = match factory() {
            Ok(stt) => stt,
            Err(e) => {
                warn!(call_id = %self.call_id, error = %e, "Failed to create speech backend");
                return false;
            }
        };

        let bridge =
            match AudioBridge::start(self.call_id.clone(), stream_id, stt, self.fanout.clone())
                .await
            {
                Ok(bridge) => bridge,
                Err(e) => {
                    warn!(call_id = %self.call_id, error = %e, "Failed to start audio bridge");
                    return false;
                }
            };

        let previous = {
            let mut slot = self.bridge.lock().await;
            if self.is_closed() || self.is_operator_detected() {
                drop(slot);
                bridge.close().await;
                return false;
            }
            slot.replace(bridge)
        };
        if let Some(previous) = previous {
            previous.close().await;
        }

        self.resume_analysis();
        info!(call_id = %self.call_id, stream_id, "Media stream attached, analysis resumed");
        true
    }

    /// A media stream stopped: pause analysis and discard its bridge.
    ///
    /// Stops for a stream other than the one currently attached are ignored.
    pub async fn detach_stream(&self, stream_id: &str) {
        let bridge = {
            let mut slot = self.bridge.lock().await;
            match slot.as_ref() {
                Some(current) if current.stream_id() != stream_id => {
                    debug!(call_id = %self.call_id, stream_id, "Ignoring stop for a superseded stream");
                    return;
                }
                _ => {
                    self.pause_analysis();
                    slot.take()
                }
            }
        };

        if let Some(bridge) = bridge {
            bridge.close().await;
            info!(call_id = %self.call_id, stream_id, "Media stream detached, analysis paused");
        }
    }

    /// Forward caller audio from `stream_id` to the current bridge.
    pub async fn ingest_audio(&self, stream_id: &str, audio: Vec<u8>) {
        let mut slot = self.bridge.lock().await;
        let Some(bridge) = slot.as_mut() else {
            return;
        };
        if bridge.stream_id() != stream_id {
            return;
        }
        if let Err(e) = bridge.forward(audio).await {
            debug!(call_id = %self.call_id, error = %e, "Dropped audio chunk");
        }
    }

    async fn close_bridge(&self) {
        let bridge = self.bridge.lock().await.take();
        if let Some(bridge) = bridge {
            bridge.close().await;
        }
    }

    fn accepts_actions(&self) -> bool {
        !self.is_closed() && !self.is_operator_detected() && self.status().is_navigating()
    }

    /// Inject DTMF into the call.
    ///
    /// Injection interrupts the media stream, so analysis is paused and the
    /// bridge dropped first; the provider's new stream resumes it. When the
    /// provider rejects the request the previous stream is still live, so a
    /// fresh bridge is attached to it and analysis resumes.
    ///
    /// Nothing is sent once the call was handed off or shut down. Handoff and
    /// shutdown latch before taking the bridge lock, which is held here until
    /// the provider answers.
    pub async fn send_digits(&self, digits: &str) -> Result<(), CallError> {
        let telephony = self
            .services
            .telephony
            .clone()
            .ok_or(CallError::TelephonyUnavailable)?;
        if !self.accepts_actions() {
            return Err(CallError::NavigationFinished(self.call_id.clone()));
        }

        self.pause_analysis();
        let mut slot = self.bridge.lock().await;
        if !self.accepts_actions() {
            return Err(CallError::NavigationFinished(self.call_id.clone()));
        }

        let stream_id = match slot.take() {
            Some(bridge) => {
                let stream_id = bridge.stream_id().to_string();
                bridge.close().await;
                Some(stream_id)
            }
            None => None,
        };

        if self.status() == CallStatus::OnHold {
            if let Err(e) = self
                .transition(CallStatus::IvrNavigation, StatusMetadata::default())
                .await
            {
                debug!(call_id = %self.call_id, error = %e, "Could not leave hold");
            }
        }

        let sent = telephony.send_digits(&self.call_id, digits).await;
        drop(slot);

        match sent {
            Ok(()) => {
                info!(call_id = %self.call_id, digit_count = digits.len(), "Digits sent, waiting for media stream");
                Ok(())
            }
            Err(e) => {
                match stream_id {
                    Some(stream_id) => {
                        self.attach_stream(&stream_id).await;
                    }
                    None => self.resume_analysis(),
                }
                Err(e.into())
            }
        }
    }

    /// Tear everything down. Safe to call more than once.
    pub async fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        if let Some(navigator) = &self.navigator {
            navigator.stop();
        }
        if let Some(detector) = &self.detector {
            detector.stop();
        }

        let tasks: Vec<_> = self.tasks.lock().drain(..).collect();
        for task in tasks {
            task.abort();
        }

        self.close_bridge().await;

        if let Some(navigator) = &self.navigator {
            navigator.clear_history();
        }

        info!(call_id = %self.call_id, status = %self.status(), "Call session closed");
    }
}

impl std::fmt::Debug for CallSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallSession")
            .field("call_id", &self.call_id)
            .field("status", &self.status())
            .field("closed", &self.is_closed())
            .finish()
    }
}

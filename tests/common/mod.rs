#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use callpilot::core::audio_bridge::SttFactory;
use callpilot::core::call::{CallContext, CallServices};
use callpilot::core::decision::{
    Action, DecisionError, DecisionFunction, DecisionRequest, OperatorAssessment,
    OperatorClassifier,
};
use callpilot::core::detector::DetectorConfig;
use callpilot::core::navigator::NavigatorConfig;
use callpilot::core::status::RecordingStatusSink;
use callpilot::core::stt::{BaseSTT, STTConfig, STTError, STTResult, STTResultCallback};
use callpilot::core::telephony::{OutboundCall, PlacedCall, TelephonyError, TelephonyProvider};

/// Records every telephony request. Digit injection can be made to fail
/// or to take a while.
#[derive(Default)]
pub struct FakeTelephony {
    pub placed: Mutex<Vec<OutboundCall>>,
    pub digits: Mutex<Vec<(String, String)>>,
    pub transfers: Mutex<Vec<(String, String)>>,
    pub hangups: Mutex<Vec<String>>,
    pub fail_digits: Mutex<bool>,
    pub digit_latency: Mutex<Option<Duration>>,
    /// Digit and transfer requests in the order they completed.
    pub timeline: Mutex<Vec<String>>,
    next_id: AtomicUsize,
}

impl FakeTelephony {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent_digits(&self) -> Vec<String> {
        self.digits.lock().iter().map(|(_, d)| d.clone()).collect()
    }
}

#[async_trait]
impl TelephonyProvider for FakeTelephony {
    fn provider_name(&self) -> &'static str {
        "fake"
    }

    async fn place_call(&self, call: &OutboundCall) -> Result<PlacedCall, TelephonyError> {
        self.placed.lock().push(call.clone());
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(PlacedCall {
            call_id: format!("CA{n:04}"),
            provider_status: "queued".to_string(),
        })
    }

    async fn send_digits(&self, call_id: &str, digits: &str) -> Result<(), TelephonyError> {
        let latency = *self.digit_latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if *self.fail_digits.lock() {
            return Err(TelephonyError::Provider {
                status: 500,
                message: "digits rejected".to_string(),
            });
        }
        self.digits
            .lock()
            .push((call_id.to_string(), digits.to_string()));
        self.timeline.lock().push(format!("digits {digits}"));
        Ok(())
    }

    async fn transfer(&self, call_id: &str, to: &str) -> Result<(), TelephonyError> {
        self.transfers
            .lock()
            .push((call_id.to_string(), to.to_string()));
        self.timeline.lock().push(format!("transfer {to}"));
        Ok(())
    }

    async fn hangup(&self, call_id: &str) -> Result<(), TelephonyError> {
        self.hangups.lock().push(call_id.to_string());
        Ok(())
    }
}

/// Decision function returning a fixed script, then `wait` forever.
pub struct ScriptedDecider {
    script: Mutex<VecDeque<Action>>,
    pub requests: Mutex<Vec<DecisionRequest>>,
}

impl ScriptedDecider {
    pub fn new(actions: Vec<Action>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(actions.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn push(&self, action: Action) {
        self.script.lock().push_back(action);
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl DecisionFunction for ScriptedDecider {
    async fn decide(&self, request: &DecisionRequest) -> Result<Action, DecisionError> {
        self.requests.lock().push(request.clone());
        Ok(self
            .script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Action::wait("script exhausted")))
    }
}

/// Classifier with a settable answer.
pub struct FakeClassifier {
    pub answer: Mutex<OperatorAssessment>,
    pub calls: AtomicUsize,
}

impl FakeClassifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            answer: Mutex::new(OperatorAssessment::not_operator("scripted")),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn set(&self, is_operator: bool, confidence: f32) {
        *self.answer.lock() = OperatorAssessment {
            is_operator,
            confidence,
            reason: String::new(),
        };
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OperatorClassifier for FakeClassifier {
    async fn classify(
        &self,
        _transcript: &str,
        _context: &CallContext,
    ) -> Result<OperatorAssessment, DecisionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.answer.lock().clone())
    }
}

/// Speech backend that never touches the network. Tests speak into the
/// most recently connected instance through [`SpeechHandle`].
pub struct FakeStt {
    config: STTConfig,
    handle: SpeechHandle,
    connected: bool,
    generation: usize,
}

#[async_trait]
impl BaseSTT for FakeStt {
    fn new(config: STTConfig) -> Result<Self, STTError> {
        Ok(Self {
            config,
            handle: SpeechHandle::default(),
            connected: false,
            generation: 0,
        })
    }

    async fn connect(&mut self) -> Result<(), STTError> {
        self.connected = true;
        self.handle.connections.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), STTError> {
        self.connected = false;
        let mut slot = self.handle.callback.lock();
        if slot.as_ref().is_some_and(|(generation, _)| *generation == self.generation) {
            *slot = None;
        }
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.connected
    }

    async fn send_audio(&mut self, audio_data: Vec<u8>) -> Result<(), STTError> {
        self.handle.audio_bytes.fetch_add(audio_data.len(), Ordering::SeqCst);
        Ok(())
    }

    async fn on_result(&mut self, callback: STTResultCallback) -> Result<(), STTError> {
        self.generation = self.handle.generations.fetch_add(1, Ordering::SeqCst) + 1;
        *self.handle.callback.lock() = Some((self.generation, callback));
        Ok(())
    }

    fn get_config(&self) -> Option<&STTConfig> {
        Some(&self.config)
    }

    fn get_provider_info(&self) -> &'static str {
        "fake"
    }
}

#[derive(Clone, Default)]
pub struct SpeechHandle {
    callback: Arc<Mutex<Option<(usize, STTResultCallback)>>>,
    generations: Arc<AtomicUsize>,
    pub connections: Arc<AtomicUsize>,
    pub audio_bytes: Arc<AtomicUsize>,
}

impl SpeechHandle {
    /// Deliver a final transcript through the live bridge, if any.
    pub async fn say(&self, text: &str) -> bool {
        let callback = self.callback.lock().as_ref().map(|(_, cb)| cb.clone());
        match callback {
            Some(callback) => {
                callback(STTResult::new(text.to_string(), true, true, 0.95)).await;
                true
            }
            None => false,
        }
    }

    pub fn is_live(&self) -> bool {
        self.callback.lock().is_some()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Factory whose backends all report through this handle.
    pub fn factory(&self) -> SttFactory {
        let handle = self.clone();
        Arc::new(move || {
            let stt = FakeStt {
                config: STTConfig::default(),
                handle: handle.clone(),
                connected: false,
                generation: 0,
            };
            Ok(Box::new(stt) as Box<dyn BaseSTT>)
        })
    }
}

pub struct Harness {
    pub telephony: Arc<FakeTelephony>,
    pub decider: Arc<ScriptedDecider>,
    pub classifier: Arc<FakeClassifier>,
    pub speech: SpeechHandle,
    pub sink: Arc<RecordingStatusSink>,
}

impl Harness {
    pub fn new(actions: Vec<Action>) -> Self {
        Self {
            telephony: FakeTelephony::new(),
            decider: ScriptedDecider::new(actions),
            classifier: FakeClassifier::new(),
            speech: SpeechHandle::default(),
            sink: Arc::new(RecordingStatusSink::new()),
        }
    }

    pub fn services(&self) -> CallServices {
        CallServices {
            telephony: Some(self.telephony.clone()),
            decider: Some(self.decider.clone()),
            classifier: Some(self.classifier.clone()),
            stt_factory: Some(self.speech.factory()),
            status_sink: self.sink.clone(),
            navigator: NavigatorConfig::default(),
            detector: DetectorConfig::default(),
        }
    }
}

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::core::audio_bridge::SttFactory;
use crate::core::call::CallServices;
use crate::core::decision::{DecisionFunction, LlmDecisionClient, LlmDecisionConfig, OperatorClassifier};
use crate::core::registry::CallRegistry;
use crate::core::status::{NoopStatusSink, StatusSink, WebhookStatusSink};
use crate::core::stt::{STTConfig, create_stt_provider};
use crate::core::telephony::{TelephonyProvider, TwilioConfig, TwilioTelephony};

/// How often stale calls are swept from the registry.
pub const STALE_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Core-specific shared state for the application.
///
/// Holds the call registry and the collaborators every call session is
/// built with. Integrations that are not configured are absent and the
/// features depending on them are disabled.
#[derive(Clone)]
pub struct CoreState {
    pub registry: Arc<CallRegistry>,
    pub services: CallServices,
}

impl CoreState {
    /// Build core state from server configuration.
    pub fn new(config: &ServerConfig) -> Arc<Self> {
        let services = CallServices {
            telephony: Self::initialize_telephony(config),
            decider: None,
            classifier: None,
            stt_factory: Self::initialize_stt_factory(config),
            status_sink: Self::initialize_status_sink(config),
            navigator: config.navigator.clone(),
            detector: config.detector.clone(),
        };

        let services = match Self::initialize_decision_client(config) {
            Some(client) => CallServices {
                decider: Some(client.clone() as Arc<dyn DecisionFunction>),
                classifier: Some(client as Arc<dyn OperatorClassifier>),
                ..services
            },
            None => services,
        };

        Self::with_services(services)
    }

    /// Build core state around explicit collaborators.
    pub fn with_services(services: CallServices) -> Arc<Self> {
        Arc::new(Self {
            registry: Arc::new(CallRegistry::new()),
            services,
        })
    }

    fn initialize_telephony(config: &ServerConfig) -> Option<Arc<dyn TelephonyProvider>> {
        let (Some(sid), Some(token), Some(from)) = (
            &config.twilio_account_sid,
            &config.twilio_auth_token,
            &config.twilio_from_number,
        ) else {
            warn!("Twilio credentials not configured, outbound calls are disabled");
            return None;
        };

        match TwilioTelephony::new(TwilioConfig::new(sid, token, from, &config.public_url)) {
            Ok(telephony) => {
                info!("Initialized Twilio telephony provider");
                Some(Arc::new(telephony))
            }
            Err(e) => {
                warn!(error = %e, "Failed to initialize Twilio telephony provider");
                None
            }
        }
    }

    fn initialize_decision_client(config: &ServerConfig) -> Option<Arc<LlmDecisionClient>> {
        let Some(api_key) = &config.decision_api_key else {
            warn!("DECISION_API_KEY not configured, IVR navigation is disabled");
            return None;
        };

        let client = LlmDecisionClient::new(LlmDecisionConfig {
            api_key: api_key.clone(),
            base_url: config.decision_base_url.clone(),
            model: config.decision_model.clone(),
            timeout: config.decision_timeout(),
        });

        match client {
            Ok(client) => {
                info!(model = %config.decision_model, "Initialized decision client");
                Some(Arc::new(client))
            }
            Err(e) => {
                warn!(error = %e, "Failed to initialize decision client");
                None
            }
        }
    }

    fn initialize_stt_factory(config: &ServerConfig) -> Option<SttFactory> {
        let Some(api_key) = config.deepgram_api_key.clone() else {
            warn!("DEEPGRAM_API_KEY not configured, call audio will not be transcribed");
            return None;
        };

        let factory: SttFactory = Arc::new(move || {
            let stt_config = STTConfig {
                api_key: api_key.clone(),
                ..STTConfig::default()
            };
            create_stt_provider(&stt_config.provider.clone(), stt_config)
        });
        Some(factory)
    }

    fn initialize_status_sink(config: &ServerConfig) -> Arc<dyn StatusSink> {
        let Some(url) = &config.status_webhook_url else {
            debug!("STATUS_WEBHOOK_URL not configured, status updates are not delivered");
            return Arc::new(NoopStatusSink);
        };

        match WebhookStatusSink::new(url.clone(), config.status_webhook_secret.clone()) {
            Ok(sink) => Arc::new(sink),
            Err(e) => {
                warn!(error = %e, "Failed to initialize status webhook, updates are not delivered");
                Arc::new(NoopStatusSink)
            }
        }
    }

    /// Spawn the periodic sweep that removes calls whose terminal status
    /// callback never arrived.
    pub fn spawn_stale_sweep(self: &Arc<Self>, max_age: Duration) -> tokio::task::JoinHandle<()> {
        let registry = self.registry.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(STALE_SWEEP_INTERVAL);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = registry.sweep_stale(max_age).await;
                if removed > 0 {
                    info!(removed, active_calls = registry.len(), "Swept stale calls");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unconfigured_integrations_are_absent() {
        let state = CoreState::new(&ServerConfig::default());
        assert!(state.services.telephony.is_none());
        assert!(state.services.decider.is_none());
        assert!(state.services.classifier.is_none());
        assert!(state.services.stt_factory.is_none());
        assert!(state.registry.is_empty());
    }

    #[test]
    fn test_configured_integrations_are_present() {
        let config = ServerConfig {
            decision_api_key: Some("sk-test".to_string()),
            deepgram_api_key: Some("dg-test".to_string()),
            twilio_account_sid: Some("AC123".to_string()),
            twilio_auth_token: Some("token".to_string()),
            twilio_from_number: Some("+15550001111".to_string()),
            ..ServerConfig::default()
        };

        let state = CoreState::new(&config);
        assert!(state.services.telephony.is_some());
        assert!(state.services.decider.is_some());
        assert!(state.services.classifier.is_some());

        let factory = state.services.stt_factory.as_ref().unwrap();
        let stt = factory().unwrap();
        assert_eq!(stt.get_provider_info(), "Deepgram STT WebSocket v1");
    }
}

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::{RwLock, broadcast, mpsc, oneshot};
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::Message;
use tracing::{debug, error, info, warn};
use url::Url;

use super::base::{BaseSTT, STTConfig, STTConnectionState, STTError, STTResult, STTResultCallback};

const DEFAULT_ENDPOINT: &str = "wss://api.deepgram.com/v1/listen";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration specific to Deepgram STT
#[derive(Debug, Clone)]
pub struct DeepgramSTTConfig {
    pub base: STTConfig,
    /// WebSocket endpoint, overridable for tests and self-hosted deployments
    pub endpoint: String,
    pub interim_results: bool,
    pub smart_format: bool,
    /// Silence in milliseconds before Deepgram finalizes an utterance
    pub endpointing: Option<u32>,
    pub keywords: Vec<String>,
}

impl Default for DeepgramSTTConfig {
    fn default() -> Self {
        Self {
            base: STTConfig::default(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            interim_results: false,
            smart_format: true,
            endpointing: Some(300),
            keywords: Vec::new(),
        }
    }
}

/// Deepgram streaming response (only the fields used here)
#[derive(Debug, Deserialize)]
struct DeepgramResponse {
    #[serde(rename = "type")]
    response_type: String,
    channel: Option<DeepgramChannel>,
    is_final: Option<bool>,
    speech_final: Option<bool>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeepgramChannel {
    alternatives: Vec<DeepgramAlternative>,
}

#[derive(Debug, Deserialize)]
struct DeepgramAlternative {
    transcript: String,
    #[serde(default)]
    confidence: f32,
}

/// Deepgram streaming WebSocket client
pub struct DeepgramSTT {
    config: DeepgramSTTConfig,
    state: Arc<RwLock<STTConnectionState>>,
    ws_sender: Option<mpsc::UnboundedSender<Message>>,
    shutdown_tx: Option<broadcast::Sender<()>>,
    result_callback: Option<STTResultCallback>,
    connection_handle: Option<tokio::task::JoinHandle<()>>,
}

impl DeepgramSTT {
    pub fn with_config(config: DeepgramSTTConfig) -> Result<Self, STTError> {
        if config.base.api_key.is_empty() {
            return Err(STTError::AuthenticationFailed(
                "API key is required".to_string(),
            ));
        }

        Ok(Self {
            config,
            state: Arc::new(RwLock::new(STTConnectionState::Disconnected)),
            ws_sender: None,
            shutdown_tx: None,
            result_callback: None,
            connection_handle: None,
        })
    }

    pub async fn connection_state(&self) -> STTConnectionState {
        self.state.read().await.clone()
    }

    fn build_websocket_url(config: &DeepgramSTTConfig) -> Result<String, STTError> {
        let mut url = Url::parse(&config.endpoint)
            .map_err(|e| STTError::ConfigurationError(format!("Invalid WebSocket URL: {e}")))?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("model", &config.base.model);
            query.append_pair("language", &config.base.language);
            query.append_pair("encoding", &config.base.encoding);
            query.append_pair("sample_rate", &config.base.sample_rate.to_string());
            query.append_pair("channels", &config.base.channels.to_string());
            query.append_pair("punctuate", &config.base.punctuation.to_string());
            query.append_pair("interim_results", &config.interim_results.to_string());
            query.append_pair("smart_format", &config.smart_format.to_string());

            if let Some(endpointing) = config.endpointing {
                query.append_pair("endpointing", &endpointing.to_string());
            }
            for keyword in &config.keywords {
                query.append_pair("keywords", keyword);
            }
        }

        Ok(url.to_string())
    }
}

/// Handle one inbound frame. Returns false when the stream should end.
async fn handle_websocket_message(
    message: Message,
    callback: Option<&STTResultCallback>,
) -> Result<bool, STTError> {
    match message {
        Message::Text(text) => {
            let response: DeepgramResponse = serde_json::from_str(&text)
                .map_err(|e| STTError::ProviderError(format!("Failed to parse response: {e}")))?;

            match response.response_type.as_str() {
                "Results" => {
                    let alternative = response
                        .channel
                        .and_then(|channel| channel.alternatives.into_iter().next());
                    if let (Some(alternative), Some(callback)) = (alternative, callback) {
                        let result = STTResult::new(
                            alternative.transcript,
                            response.is_final.unwrap_or(false),
                            response.speech_final.unwrap_or(false),
                            alternative.confidence,
                        );
                        callback(result).await;
                    }
                }
                "Metadata" | "SpeechStarted" | "UtteranceEnd" => {
                    debug!(kind = %response.response_type, "Deepgram event");
                }
                "Error" => {
                    return Err(STTError::ProviderError(
                        response
                            .description
                            .unwrap_or_else(|| "Unknown error from Deepgram".to_string()),
                    ));
                }
                other => warn!("Unknown Deepgram response type: {}", other),
            }
            Ok(true)
        }
        Message::Close(frame) => {
            info!("Deepgram closed the connection: {:?}", frame);
            Ok(false)
        }
        _ => Ok(true),
    }
}

#[async_trait::async_trait]
impl BaseSTT for DeepgramSTT {
    fn new(config: STTConfig) -> Result<Self, STTError> {
        Self::with_config(DeepgramSTTConfig {
            base: config,
            ..Default::default()
        })
    }

    async fn connect(&mut self) -> Result<(), STTError> {
        let ws_url = Self::build_websocket_url(&self.config)?;
        let mut request = ws_url
            .as_str()
            .into_client_request()
            .map_err(|e| STTError::ConfigurationError(format!("Invalid request: {e}")))?;
        let auth = HeaderValue::from_str(&format!("Token {}", self.config.base.api_key))
            .map_err(|e| STTError::ConfigurationError(format!("Invalid API key: {e}")))?;
        request.headers_mut().insert("Authorization", auth);

        let (ws_tx, mut ws_rx) = mpsc::unbounded_channel::<Message>();
        let (shutdown_tx, mut shutdown_rx) = broadcast::channel::<()>(1);
        let (ready_tx, ready_rx) = oneshot::channel::<Result<(), String>>();

        let state = self.state.clone();
        let callback = self.result_callback.clone();
        *state.write().await = STTConnectionState::Connecting;

        let connection_handle = tokio::spawn(async move {
            let ws_stream = match connect_async(request).await {
                Ok((stream, _)) => stream,
                Err(e) => {
                    error!("Failed to connect to Deepgram: {}", e);
                    *state.write().await = STTConnectionState::Error(e.to_string());
                    let _ = ready_tx.send(Err(e.to_string()));
                    return;
                }
            };

            *state.write().await = STTConnectionState::Connected;
            let _ = ready_tx.send(Ok(()));
            info!("Connected to Deepgram WebSocket");

            let (mut ws_sink, mut ws_stream) = ws_stream.split();

            loop {
                tokio::select! {
                    Some(message) = ws_rx.recv() => {
                        if let Err(e) = ws_sink.send(message).await {
                            error!("Failed to send to Deepgram: {}", e);
                            break;
                        }
                    }
                    message = ws_stream.next() => {
                        match message {
                            Some(Ok(msg)) => match handle_websocket_message(msg, callback.as_ref()).await {
                                Ok(true) => {}
                                Ok(false) => break,
                                Err(e) => {
                                    error!("Deepgram stream error: {}", e);
                                    break;
                                }
                            },
                            Some(Err(e)) => {
                                error!("Deepgram WebSocket error: {}", e);
                                break;
                            }
                            None => break,
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        let _ = ws_sink
                            .send(Message::Text(r#"{"type":"CloseStream"}"#.to_string().into()))
                            .await;
                        let _ = ws_sink.close().await;
                        break;
                    }
                }
            }

            *state.write().await = STTConnectionState::Disconnected;
            debug!("Deepgram connection task finished");
        });

        self.ws_sender = Some(ws_tx);
        self.shutdown_tx = Some(shutdown_tx);
        self.connection_handle = Some(connection_handle);

        match timeout(CONNECT_TIMEOUT, ready_rx).await {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(e))) => {
                self.ws_sender = None;
                Err(STTError::ConnectionFailed(e))
            }
            Ok(Err(_)) | Err(_) => {
                self.disconnect().await?;
                Err(STTError::ConnectionFailed("Connection timeout".to_string()))
            }
        }
    }

    async fn disconnect(&mut self) -> Result<(), STTError> {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
        if let Some(handle) = self.connection_handle.take() {
            if timeout(Duration::from_secs(2), handle).await.is_err() {
                warn!("Deepgram connection task did not stop in time");
            }
        }
        self.ws_sender = None;
        *self.state.write().await = STTConnectionState::Disconnected;
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.ws_sender.as_ref().is_some_and(|tx| !tx.is_closed())
    }

    async fn send_audio(&mut self, audio_data: Vec<u8>) -> Result<(), STTError> {
        let sender = self
            .ws_sender
            .as_ref()
            .ok_or_else(|| STTError::ConnectionFailed("Not connected to Deepgram".to_string()))?;

        sender
            .send(Message::Binary(audio_data.into()))
            .map_err(|e| STTError::NetworkError(format!("Failed to send audio data: {e}")))
    }

    async fn on_result(&mut self, callback: STTResultCallback) -> Result<(), STTError> {
        self.result_callback = Some(callback);
        Ok(())
    }

    fn get_config(&self) -> Option<&STTConfig> {
        Some(&self.config.base)
    }

    fn get_provider_info(&self) -> &'static str {
        "Deepgram STT WebSocket v1"
    }
}

impl Drop for DeepgramSTT {
    fn drop(&mut self) {
        if let Some(shutdown_tx) = &self.shutdown_tx {
            let _ = shutdown_tx.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn test_config() -> DeepgramSTTConfig {
        DeepgramSTTConfig {
            base: STTConfig {
                api_key: "test_key".to_string(),
                ..STTConfig::default()
            },
            keywords: vec!["NPI".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_api_key_is_rejected() {
        let result = <DeepgramSTT as BaseSTT>::new(STTConfig::default());
        assert!(matches!(result, Err(STTError::AuthenticationFailed(_))));
    }

    #[test]
    fn test_url_carries_telephony_audio_format() {
        let url = DeepgramSTT::build_websocket_url(&test_config()).unwrap();
        assert!(url.starts_with("wss://api.deepgram.com/v1/listen?"));
        assert!(url.contains("encoding=mulaw"));
        assert!(url.contains("sample_rate=8000"));
        assert!(url.contains("channels=1"));
        assert!(url.contains("model=nova-2-phonecall"));
        assert!(url.contains("interim_results=false"));
        assert!(url.contains("keywords=NPI"));
    }

    #[tokio::test]
    async fn test_results_are_forwarded_to_callback() {
        let seen = Arc::new(Mutex::new(Vec::<STTResult>::new()));
        let sink = seen.clone();
        let callback: STTResultCallback = Arc::new(move |result| {
            let sink = sink.clone();
            Box::pin(async move {
                sink.lock().push(result);
            }) as std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>>
        });

        let json = r#"{
            "type": "Results",
            "channel": {"alternatives": [{"transcript": "for eligibility press 2", "confidence": 0.97}]},
            "is_final": true,
            "speech_final": false
        }"#;
        let keep_going = handle_websocket_message(Message::Text(json.to_string().into()), Some(&callback))
            .await
            .unwrap();

        assert!(keep_going);
        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].transcript, "for eligibility press 2");
        assert!(seen[0].is_final);
    }

    #[tokio::test]
    async fn test_error_frames_end_the_stream() {
        let json = r#"{"type": "Error", "description": "bad audio"}"#;
        let result = handle_websocket_message(Message::Text(json.to_string().into()), None).await;
        assert!(matches!(result, Err(STTError::ProviderError(msg)) if msg == "bad audio"));

        let closed = handle_websocket_message(Message::Close(None), None).await;
        assert!(matches!(closed, Ok(false)));
    }

    #[tokio::test]
    async fn test_send_audio_requires_connection() {
        let mut stt = DeepgramSTT::with_config(test_config()).unwrap();
        assert!(!stt.is_ready());
        assert!(stt.send_audio(vec![0xff; 160]).await.is_err());
        assert!(stt.disconnect().await.is_ok());
    }
}

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A transcription result from a speech backend
#[derive(Debug, Clone, PartialEq)]
pub struct STTResult {
    /// The transcribed text
    pub transcript: String,
    /// Whether the backend will revise this text again
    pub is_final: bool,
    /// Whether this marks the end of an utterance
    pub is_speech_final: bool,
    /// Confidence score (0.0 to 1.0)
    pub confidence: f32,
}

impl STTResult {
    pub fn new(transcript: String, is_final: bool, is_speech_final: bool, confidence: f32) -> Self {
        Self {
            transcript,
            is_final,
            is_speech_final,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

/// Configuration for a streaming speech backend
///
/// Defaults match telephony media streams: 8 kHz mono mu-law.
#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct STTConfig {
    pub provider: String,
    pub api_key: String,
    /// Language code (e.g., "en-US")
    pub language: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub punctuation: bool,
    /// Audio encoding name understood by the backend (e.g., "mulaw", "linear16")
    pub encoding: String,
    pub model: String,
}

impl Default for STTConfig {
    fn default() -> Self {
        Self {
            provider: "deepgram".to_string(),
            api_key: String::new(),
            language: "en-US".to_string(),
            sample_rate: 8000,
            channels: 1,
            punctuation: true,
            encoding: "mulaw".to_string(),
            model: "nova-2-phonecall".to_string(),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum STTError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("Provider error: {0}")]
    ProviderError(String),
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Network error: {0}")]
    NetworkError(String),
}

/// Type alias for STT result callback
pub type STTResultCallback =
    Arc<dyn Fn(STTResult) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Connection state of a streaming backend
#[derive(Debug, Clone, PartialEq)]
pub enum STTConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error(String),
}

/// Streaming speech-to-text backend
#[async_trait::async_trait]
pub trait BaseSTT: Send + Sync {
    /// Create a new, unconnected instance
    fn new(config: STTConfig) -> Result<Self, STTError>
    where
        Self: Sized;

    /// Open the streaming connection
    async fn connect(&mut self) -> Result<(), STTError>;

    /// Close the streaming connection. Safe to call when not connected.
    async fn disconnect(&mut self) -> Result<(), STTError>;

    fn is_ready(&self) -> bool;

    /// Send one chunk of raw audio
    async fn send_audio(&mut self, audio_data: Vec<u8>) -> Result<(), STTError>;

    /// Register the callback that receives transcription results
    async fn on_result(&mut self, callback: STTResultCallback) -> Result<(), STTError>;

    fn get_config(&self) -> Option<&STTConfig>;

    fn get_provider_info(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stt_result_confidence_clamping() {
        let result = STTResult::new("press one".into(), true, false, 1.4);
        assert_eq!(result.confidence, 1.0);
        let result = STTResult::new("press one".into(), true, false, -0.2);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_default_config_targets_telephony_audio() {
        let config = STTConfig::default();
        assert_eq!(config.sample_rate, 8000);
        assert_eq!(config.encoding, "mulaw");
        assert_eq!(config.channels, 1);
    }
}

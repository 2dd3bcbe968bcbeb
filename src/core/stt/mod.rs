mod base;
pub mod deepgram;

pub use base::{BaseSTT, STTConfig, STTConnectionState, STTError, STTResult, STTResultCallback};
pub use deepgram::{DeepgramSTT, DeepgramSTTConfig};

/// Supported STT providers
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum STTProvider {
    /// Deepgram streaming WebSocket API
    Deepgram,
}

impl std::fmt::Display for STTProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            STTProvider::Deepgram => write!(f, "deepgram"),
        }
    }
}

impl std::str::FromStr for STTProvider {
    type Err = STTError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "deepgram" => Ok(STTProvider::Deepgram),
            _ => Err(STTError::ConfigurationError(format!(
                "Unsupported STT provider: {s}. Supported providers: deepgram"
            ))),
        }
    }
}

/// Create an unconnected STT backend by provider name
pub fn create_stt_provider(
    provider: &str,
    config: STTConfig,
) -> Result<Box<dyn BaseSTT>, STTError> {
    match provider.parse::<STTProvider>()? {
        STTProvider::Deepgram => Ok(Box::new(<DeepgramSTT as BaseSTT>::new(config)?)),
    }
}

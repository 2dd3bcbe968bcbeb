//! Per-stream bridge from call audio to the speech backend.
//!
//! One [`AudioBridge`] exists per media stream. It is created when the
//! stream starts, dropped when the stream stops, and publishes final
//! transcripts to the call's [`TranscriptFanout`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::core::stt::{BaseSTT, STTError, STTResult, STTResultCallback};
use crate::core::transcript::TranscriptFanout;

/// Builds a fresh, unconnected speech backend for each new stream.
pub type SttFactory = Arc<dyn Fn() -> Result<Box<dyn BaseSTT>, STTError> + Send + Sync>;

pub struct AudioBridge {
    call_id: String,
    stream_id: String,
    stt: Box<dyn BaseSTT>,
    forwarded_bytes: u64,
}

impl AudioBridge {
    /// Connect `stt` and route its final transcripts into `fanout`.
    pub async fn start(
        call_id: impl Into<String>,
        stream_id: impl Into<String>,
        mut stt: Box<dyn BaseSTT>,
        fanout: TranscriptFanout,
    ) -> Result<Self, STTError> {
        let call_id = call_id.into();
        let stream_id = stream_id.into();

        let log_call_id = call_id.clone();
        let callback: STTResultCallback = Arc::new(move |result: STTResult| {
            let fanout = fanout.clone();
            let call_id = log_call_id.clone();
            Box::pin(async move {
                if !result.is_final {
                    return;
                }
                let text = result.transcript.trim();
                if text.is_empty() {
                    return;
                }
                debug!(call_id = %call_id, transcript = %text, "Transcript received");
                fanout.publish(text);
            }) as Pin<Box<dyn Future<Output = ()> + Send>>
        });

        stt.on_result(callback).await?;
        stt.connect().await?;

        info!(call_id = %call_id, stream_id = %stream_id, provider = stt.get_provider_info(), "Audio bridge started");

        Ok(Self {
            call_id,
            stream_id,
            stt,
            forwarded_bytes: 0,
        })
    }

    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    pub fn forwarded_bytes(&self) -> u64 {
        self.forwarded_bytes
    }

    /// Forward one audio chunk to the speech backend.
    pub async fn forward(&mut self, audio: Vec<u8>) -> Result<(), STTError> {
        let len = audio.len() as u64;
        self.stt.send_audio(audio).await?;
        self.forwarded_bytes += len;
        Ok(())
    }

    /// Disconnect the speech backend and drop the bridge.
    pub async fn close(mut self) {
        if let Err(e) = self.stt.disconnect().await {
            warn!(call_id = %self.call_id, error = %e, "Failed to disconnect speech backend");
        }
        info!(
            call_id = %self.call_id,
            stream_id = %self.stream_id,
            forwarded_bytes = self.forwarded_bytes,
            "Audio bridge closed"
        );
    }
}

impl std::fmt::Debug for AudioBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioBridge")
            .field("call_id", &self.call_id)
            .field("stream_id", &self.stream_id)
            .field("forwarded_bytes", &self.forwarded_bytes)
            .finish()
    }
}

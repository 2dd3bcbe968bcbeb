//! Twilio Media Streams wire messages.
//!
//! Only the inbound direction is modeled; this service never plays audio
//! back into the stream.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum StreamEvent {
    Connected {
        #[serde(default)]
        protocol: Option<String>,
    },
    Start {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        start: StartPayload,
    },
    Media {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        media: MediaPayload,
    },
    Stop {
        #[serde(rename = "streamSid")]
        stream_sid: String,
    },
    Mark {
        #[serde(rename = "streamSid")]
        stream_sid: String,
    },
    Dtmf {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        dtmf: DtmfPayload,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartPayload {
    pub call_sid: String,
    #[serde(default)]
    pub tracks: Vec<String>,
    #[serde(default)]
    pub media_format: Option<MediaFormat>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaFormat {
    pub encoding: String,
    pub sample_rate: u32,
    pub channels: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaPayload {
    #[serde(default)]
    pub track: Option<String>,
    /// Base64 encoded 8 kHz mu-law audio.
    pub payload: String,
}

impl MediaPayload {
    /// Audio from the far end. Frames without a track are treated as inbound.
    pub fn is_inbound(&self) -> bool {
        self.track
            .as_deref()
            .is_none_or(|track| track.starts_with("inbound"))
    }

    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(self.payload.as_bytes())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DtmfPayload {
    pub digit: String,
}

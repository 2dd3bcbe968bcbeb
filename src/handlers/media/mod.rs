//! # Media stream module
//!
//! Receives the call audio the telephony provider forks over a WebSocket
//! (Twilio Media Streams protocol) and routes it to the matching call.
//!
//! **Incoming messages** (JSON text frames, `event` tagged):
//! - `connected` - protocol handshake
//! - `start` - carries `callSid`; binds the stream and resumes analysis
//! - `media` - base64 mu-law 8 kHz audio for the call's audio bridge
//! - `stop` - the stream ended; analysis pauses until the next `start`
//! - `mark`, `dtmf` - logged only
//!
//! Digit injection makes the provider end the current stream and open a new
//! one, so a call normally sees several `start`/`stop` pairs.

pub mod handler;
pub mod messages;

pub use handler::{MediaStreamConnection, media_stream_handler};
pub use messages::StreamEvent;

//! HTTP and WebSocket request handlers
//!
//! - `api` - Health check endpoint
//! - `calls` - Place, inspect and release calls
//! - `twilio` - Telephony status callbacks
//! - `media` - Media stream WebSocket

pub mod api;
pub mod calls;
pub mod media;
pub mod twilio;

pub use media::media_stream_handler;

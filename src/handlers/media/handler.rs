//! Axum WebSocket handler for Twilio Media Streams

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::messages::StreamEvent;
use crate::core::call::CallSession;
use crate::core::registry::CallRegistry;
use crate::state::AppState;

/// Upgrades the provider's media stream connection.
pub async fn media_stream_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    debug!("Media stream upgrade requested");
    ws.on_upgrade(move |socket| handle_media_socket(socket, state))
}

async fn handle_media_socket(mut socket: WebSocket, app_state: Arc<AppState>) {
    let mut connection = MediaStreamConnection::new(app_state.registry().clone());

    while let Some(message) = socket.next().await {
        let keep_going = match message {
            Ok(Message::Text(text)) => match serde_json::from_str::<StreamEvent>(&text) {
                Ok(event) => connection.handle_event(event).await,
                Err(e) => {
                    warn!(error = %e, "Failed to parse media stream message");
                    true
                }
            },
            Ok(Message::Binary(data)) => {
                debug!("Ignoring binary media stream frame: {} bytes", data.len());
                true
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => true,
            Ok(Message::Close(_)) => false,
            Err(e) => {
                warn!(error = %e, "Media stream socket error");
                false
            }
        };

        if !keep_going {
            break;
        }
    }

    connection.close().await;
}

/// One media stream socket bound to at most one call.
///
/// `start` binds the stream and attaches audio, `media` forwards caller
/// audio, and `stop` or the socket closing detaches it again.
pub struct MediaStreamConnection {
    registry: Arc<CallRegistry>,
    bound: Option<BoundStream>,
    frames: u64,
}

struct BoundStream {
    session: Arc<CallSession>,
    stream_sid: String,
}

impl MediaStreamConnection {
    pub fn new(registry: Arc<CallRegistry>) -> Self {
        Self {
            registry,
            bound: None,
            frames: 0,
        }
    }

    pub fn stream_sid(&self) -> Option<&str> {
        self.bound.as_ref().map(|b| b.stream_sid.as_str())
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Handle one event. Returns false when the socket should close.
    pub async fn handle_event(&mut self, event: StreamEvent) -> bool {
        match event {
            StreamEvent::Connected { protocol } => {
                debug!(protocol = ?protocol, "Media stream connected");
                true
            }
            StreamEvent::Start { stream_sid, start } => {
                self.detach().await;

                let Some(session) = self.registry.lookup(&start.call_sid) else {
                    warn!(call_id = %start.call_sid, stream_id = %stream_sid, "Media stream for unknown call");
                    return true;
                };

                info!(call_id = %start.call_sid, stream_id = %stream_sid, tracks = ?start.tracks, "Media stream started");
                let attached = session.attach_stream(&stream_sid).await;
                if !attached {
                    debug!(call_id = %start.call_sid, stream_id = %stream_sid, "Media stream not analyzed");
                }
                self.bound = Some(BoundStream {
                    session,
                    stream_sid,
                });
                true
            }
            StreamEvent::Media { stream_sid, media } => {
                let Some(bound) = &self.bound else {
                    return true;
                };
                if bound.stream_sid != stream_sid || !media.is_inbound() {
                    return true;
                }
                match media.decode() {
                    Ok(audio) => {
                        self.frames += 1;
                        bound.session.ingest_audio(&stream_sid, audio).await;
                    }
                    Err(e) => {
                        debug!(stream_id = %stream_sid, error = %e, "Dropping undecodable media frame");
                    }
                }
                true
            }
            StreamEvent::Stop { stream_sid } => {
                if self.stream_sid() == Some(stream_sid.as_str()) {
                    self.detach().await;
                }
                false
            }
            StreamEvent::Mark { .. } => true,
            StreamEvent::Dtmf { stream_sid, dtmf } => {
                debug!(stream_id = %stream_sid, digit = %dtmf.digit, "DTMF observed on stream");
                true
            }
        }
    }

    async fn detach(&mut self) {
        if let Some(bound) = self.bound.take() {
            bound.session.detach_stream(&bound.stream_sid).await;
            info!(call_id = %bound.session.call_id(), stream_id = %bound.stream_sid, frames = self.frames, "Media stream detached");
        }
    }

    /// Detach whatever is still bound. Called when the socket goes away.
    pub async fn close(&mut self) {
        self.detach().await;
    }
}

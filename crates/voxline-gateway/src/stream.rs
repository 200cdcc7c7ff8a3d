// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Audio-stream WebSocket from the switch.
//!
//! The switch opens `GET /stream/{secretary_uuid}` for every answered call.
//! The first text frame carries the call metadata:
//!
//! ```json
//! {"call_uuid": "...", "caller_id": "5518997752222", "domain_uuid": "..."}
//! ```
//!
//! After that, binary frames carry little-endian PCM16 at the switch rate
//! in both directions. A `{"type": "hangup"}` text frame or a close frame
//! ends the call.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{
        Path, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use voxline_core::{AdapterType, AudioChannel, HealthStatus, PluginAdapter, VoxlineError};
use voxline_session::{SessionRequest, decode_pcm16le, encode_pcm16le};

use crate::server::GatewayState;

/// Caller frames buffered between the socket and the session bridge.
const FRAME_QUEUE: usize = 64;

/// Policy violation.
const CLOSE_POLICY: u16 = 1008;
/// Try again later.
const CLOSE_TRY_AGAIN: u16 = 1013;

/// First text frame of an audio stream.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StreamMetadata {
    pub call_uuid: String,
    #[serde(default)]
    pub caller_id: String,
    pub domain_uuid: String,
}

#[derive(Debug, Deserialize)]
struct ControlFrame {
    #[serde(rename = "type")]
    kind: String,
}

/// One call's audio stream, seen from the session bridge.
pub struct WsAudioChannel {
    call_uuid: String,
    sink: Mutex<SplitSink<WebSocket, Message>>,
    frames: Mutex<mpsc::Receiver<Vec<i16>>>,
    closed: CancellationToken,
}

impl WsAudioChannel {
    fn new(
        call_uuid: String,
        sink: SplitSink<WebSocket, Message>,
        frames: mpsc::Receiver<Vec<i16>>,
    ) -> Self {
        Self {
            call_uuid,
            sink: Mutex::new(sink),
            frames: Mutex::new(frames),
            closed: CancellationToken::new(),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    async fn close_with(&self, frame: Option<CloseFrame>) {
        if self.closed.is_cancelled() {
            return;
        }
        self.closed.cancel();
        let mut sink = self.sink.lock().await;
        if let Err(e) = sink.send(Message::Close(frame)).await {
            debug!(call_uuid = %self.call_uuid, error = %e, "audio stream close frame not sent");
        }
        let _ = sink.close().await;
    }
}

#[async_trait]
impl PluginAdapter for WsAudioChannel {
    fn name(&self) -> &str {
        "ws-audio-stream"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::AudioChannel
    }

    async fn health_check(&self) -> Result<HealthStatus, VoxlineError> {
        if self.is_closed() {
            Ok(HealthStatus::Unhealthy("stream closed".to_string()))
        } else {
            Ok(HealthStatus::Healthy)
        }
    }

    async fn shutdown(&self) -> Result<(), VoxlineError> {
        self.close_with(None).await;
        Ok(())
    }
}

#[async_trait]
impl AudioChannel for WsAudioChannel {
    async fn recv_frame(&self) -> Result<Option<Vec<i16>>, VoxlineError> {
        let mut frames = self.frames.lock().await;
        tokio::select! {
            _ = self.closed.cancelled() => Ok(None),
            frame = frames.recv() => Ok(frame),
        }
    }

    async fn send_frame(&self, samples: &[i16]) -> Result<(), VoxlineError> {
        if self.is_closed() {
            return Err(VoxlineError::Channel {
                message: "audio stream closed".to_string(),
                source: None,
            });
        }
        self.sink
            .lock()
            .await
            .send(Message::Binary(encode_pcm16le(samples).into()))
            .await
            .map_err(|e| VoxlineError::Channel {
                message: format!("audio stream send failed: {e}"),
                source: Some(Box::new(e)),
            })
    }

    async fn close(&self) -> Result<(), VoxlineError> {
        self.close_with(None).await;
        Ok(())
    }
}

/// WebSocket upgrade handler for `GET /stream/{secretary_uuid}`.
pub async fn stream_handler(
    ws: WebSocketUpgrade,
    Path(secretary_uuid): Path<String>,
    State(state): State<GatewayState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_stream(socket, secretary_uuid, state))
}

async fn read_metadata(stream: &mut SplitStream<WebSocket>) -> Option<StreamMetadata> {
    while let Some(Ok(msg)) = stream.next().await {
        match msg {
            Message::Text(text) => match serde_json::from_str::<StreamMetadata>(text.as_str()) {
                Ok(metadata) => return Some(metadata),
                Err(e) => warn!(error = %e, "invalid audio stream metadata"),
            },
            Message::Close(_) => return None,
            // Audio before metadata has no session to go to.
            _ => {}
        }
    }
    None
}

fn is_hangup(text: &str) -> bool {
    serde_json::from_str::<ControlFrame>(text).is_ok_and(|frame| frame.kind == "hangup")
}

async fn handle_stream(socket: WebSocket, secretary_uuid: String, state: GatewayState) {
    let (mut sink, mut stream) = socket.split();

    let metadata = match tokio::time::timeout(
        state.settings.metadata_timeout,
        read_metadata(&mut stream),
    )
    .await
    {
        Ok(Some(metadata)) => metadata,
        Ok(None) => {
            debug!(secretary_uuid = %secretary_uuid, "audio stream ended before metadata");
            return;
        }
        Err(_) => {
            warn!(secretary_uuid = %secretary_uuid, "audio stream sent no metadata");
            let _ = sink
                .send(Message::Close(Some(CloseFrame {
                    code: CLOSE_POLICY,
                    reason: "metadata required".into(),
                })))
                .await;
            return;
        }
    };

    let (frames_tx, frames_rx) = mpsc::channel(FRAME_QUEUE);
    let channel = Arc::new(WsAudioChannel::new(
        metadata.call_uuid.clone(),
        sink,
        frames_rx,
    ));
    let request = SessionRequest {
        call_uuid: metadata.call_uuid.clone(),
        domain_uuid: metadata.domain_uuid.clone(),
        caller_id: metadata.caller_id.clone(),
        secretary_uuid: Some(secretary_uuid.clone()),
    };
    if let Err(e) = state.sessions.create_session(request, channel.clone()).await {
        warn!(
            call_uuid = %metadata.call_uuid,
            domain_uuid = %metadata.domain_uuid,
            error = %e,
            "audio stream rejected"
        );
        channel
            .close_with(Some(CloseFrame {
                code: CLOSE_TRY_AGAIN,
                reason: e.to_string().into(),
            }))
            .await;
        return;
    }
    info!(
        call_uuid = %metadata.call_uuid,
        domain_uuid = %metadata.domain_uuid,
        secretary_uuid = %secretary_uuid,
        "audio stream attached"
    );

    let mut dropped = 0u64;
    loop {
        let msg = tokio::select! {
            _ = channel.closed.cancelled() => break,
            msg = stream.next() => msg,
        };
        match msg {
            Some(Ok(Message::Binary(data))) => {
                match frames_tx.try_send(decode_pcm16le(&data)) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => dropped += 1,
                    Err(mpsc::error::TrySendError::Closed(_)) => break,
                }
            }
            Some(Ok(Message::Text(text))) if is_hangup(text.as_str()) => break,
            Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
            Some(Ok(_)) => {}
        }
    }

    // Dropping the sender reads as hangup on the session side.
    drop(frames_tx);
    debug!(call_uuid = %metadata.call_uuid, dropped, "audio stream detached");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_ignores_extra_fields() {
        let metadata: StreamMetadata = serde_json::from_str(
            r#"{"type": "metadata", "call_uuid": "c1", "domain_uuid": "d1", "caller_id": "1001"}"#,
        )
        .unwrap();
        assert_eq!(metadata.call_uuid, "c1");
        assert_eq!(metadata.caller_id, "1001");
    }

    #[test]
    fn metadata_requires_call_and_domain() {
        assert!(serde_json::from_str::<StreamMetadata>(r#"{"call_uuid": "c1"}"#).is_err());
    }

    #[test]
    fn hangup_control_frame() {
        assert!(is_hangup(r#"{"type": "hangup"}"#));
        assert!(!is_hangup(r#"{"type": "dtmf", "digit": "1"}"#));
        assert!(!is_hangup("not json"));
    }
}

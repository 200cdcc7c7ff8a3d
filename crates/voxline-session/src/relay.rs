// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider connector over a WebSocket relay.
//!
//! The relay speaks a small protocol: after connecting, the client sends a
//! JSON `start` frame describing the call. Audio then flows as binary
//! little-endian PCM16 frames in both directions, and the relay reports
//! conversation events as JSON text frames tagged by `type`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use voxline_config::model::ProviderConfig;
use voxline_core::types::ProviderEvent;
use voxline_core::{
    AdapterType, HealthStatus, PluginAdapter, ProviderConnection, ProviderConnector,
    ProviderSessionParams, TranscriptEntry, TranscriptRole, VoxlineError,
};

use crate::pcm::{decode_pcm16le, encode_pcm16le};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Serialize)]
struct StartFrame<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    call_uuid: &'a str,
    domain_uuid: &'a str,
    caller_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    secretary_uuid: Option<&'a str>,
    input_rate: u32,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RelayEvent {
    Transcript {
        role: TranscriptRole,
        content: String,
    },
    Transfer {
        destination: String,
        #[serde(default)]
        reason: Option<String>,
    },
    Callback {
        #[serde(default)]
        reason: Option<String>,
    },
    Interrupted,
    End,
}

impl From<RelayEvent> for ProviderEvent {
    fn from(event: RelayEvent) -> Self {
        match event {
            RelayEvent::Transcript { role, content } => {
                ProviderEvent::Transcript(TranscriptEntry::new(role, content))
            }
            RelayEvent::Transfer {
                destination,
                reason,
            } => ProviderEvent::TransferRequested {
                destination,
                reason,
            },
            RelayEvent::Callback { reason } => ProviderEvent::CallbackRequested { reason },
            RelayEvent::Interrupted => ProviderEvent::Interrupted,
            RelayEvent::End => ProviderEvent::Ended,
        }
    }
}

fn provider_error(context: &str, e: impl std::error::Error + Send + Sync + 'static) -> VoxlineError {
    VoxlineError::Provider {
        message: format!("{context}: {e}"),
        source: Some(Box::new(e)),
    }
}

#[derive(Debug, Clone)]
pub struct RelayProvider {
    url: String,
    connect_timeout: Duration,
}

impl RelayProvider {
    pub fn new(url: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            url: url.into(),
            connect_timeout,
        }
    }

    /// `None` when no relay URL is configured.
    pub fn from_config(config: &ProviderConfig) -> Option<Self> {
        config
            .url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .map(|url| Self::new(url, Duration::from_secs(config.connect_timeout_secs)))
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl PluginAdapter for RelayProvider {
    fn name(&self) -> &str {
        "ws-relay"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, VoxlineError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), VoxlineError> {
        Ok(())
    }
}

#[async_trait]
impl ProviderConnector for RelayProvider {
    async fn connect(
        &self,
        params: &ProviderSessionParams,
    ) -> Result<Arc<dyn ProviderConnection>, VoxlineError> {
        let (stream, _response) =
            tokio::time::timeout(self.connect_timeout, connect_async(self.url.as_str()))
                .await
                .map_err(|_| VoxlineError::Timeout {
                    duration: self.connect_timeout,
                })?
                .map_err(|e| provider_error("relay connect failed", e))?;

        let (mut writer, reader) = stream.split();
        let start = serde_json::to_string(&StartFrame {
            kind: "start",
            call_uuid: &params.call_uuid,
            domain_uuid: &params.domain_uuid,
            caller_id: &params.caller_id,
            secretary_uuid: params.secretary_uuid.as_deref(),
            input_rate: params.input_rate,
        })
        .map_err(|e| VoxlineError::Internal(format!("start frame encoding failed: {e}")))?;
        writer
            .send(Message::text(start))
            .await
            .map_err(|e| provider_error("relay start failed", e))?;

        info!(call_uuid = %params.call_uuid, url = %self.url, "relay connected");
        Ok(Arc::new(RelayConnection {
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
            closed: CancellationToken::new(),
        }))
    }
}

/// One call's relay socket.
pub struct RelayConnection {
    writer: Mutex<SplitSink<WsStream, Message>>,
    reader: Mutex<SplitStream<WsStream>>,
    closed: CancellationToken,
}

#[async_trait]
impl ProviderConnection for RelayConnection {
    async fn send_audio(&self, samples: &[i16]) -> Result<(), VoxlineError> {
        if self.closed.is_cancelled() {
            return Err(VoxlineError::Provider {
                message: "relay connection closed".to_string(),
                source: None,
            });
        }
        self.writer
            .lock()
            .await
            .send(Message::binary(encode_pcm16le(samples)))
            .await
            .map_err(|e| provider_error("relay send failed", e))
    }

    async fn recv_event(&self) -> Result<Option<ProviderEvent>, VoxlineError> {
        let mut reader = self.reader.lock().await;
        loop {
            let next = tokio::select! {
                _ = self.closed.cancelled() => return Ok(None),
                next = reader.next() => next,
            };
            match next {
                None | Some(Ok(Message::Close(_))) => return Ok(None),
                Some(Err(e)) => return Err(provider_error("relay receive failed", e)),
                Some(Ok(Message::Binary(data))) => {
                    return Ok(Some(ProviderEvent::Audio(decode_pcm16le(&data))));
                }
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<RelayEvent>(text.as_str()) {
                        Ok(event) => return Ok(Some(event.into())),
                        Err(e) => debug!(error = %e, "ignoring unknown relay message"),
                    }
                }
                Some(Ok(_)) => {}
            }
        }
    }

    async fn close(&self) -> Result<(), VoxlineError> {
        if self.closed.is_cancelled() {
            return Ok(());
        }
        self.closed.cancel();
        let mut writer = self.writer.lock().await;
        if let Err(e) = writer.send(Message::Close(None)).await {
            debug!(error = %e, "relay close frame not sent");
        }
        if let Err(e) = writer.close().await {
            debug!(error = %e, "relay socket close failed");
        }
        Ok(())
    }
}

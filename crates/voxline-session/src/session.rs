// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One bridged call: the switch audio channel on one side, the provider
//! connection on the other.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, warn};
use voxline_config::model::SessionConfig;
use voxline_core::types::ProviderEvent;
use voxline_core::{AudioChannel, ProviderConnection, TranscriptEntry};

use crate::buffer::{FrameAssembler, ResamplerPair};
use crate::event::{CallRef, EndReason, SessionEvent, SessionSummary};

/// Audio format on both legs of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSettings {
    pub switch_rate: u32,
    pub provider_input_rate: u32,
    pub provider_output_rate: u32,
    pub output_warmup_ms: u32,
    pub frame_samples: usize,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self::from_config(&SessionConfig::default())
    }
}

impl AudioSettings {
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            switch_rate: config.switch_sample_rate,
            provider_input_rate: config.provider_input_rate,
            provider_output_rate: config.provider_output_rate,
            output_warmup_ms: config.output_warmup_ms,
            frame_samples: config.frame_samples,
        }
    }

    pub fn resampler_pair(&self) -> ResamplerPair {
        ResamplerPair::new(
            self.switch_rate,
            self.provider_input_rate,
            self.provider_output_rate,
            self.output_warmup_ms,
        )
    }
}

pub struct RealtimeSession {
    call: CallRef,
    secretary_uuid: Option<String>,
    started_at: DateTime<Utc>,
    started: Instant,
    closed: AtomicBool,
    end_reason: OnceLock<EndReason>,
    transcript: Mutex<Vec<TranscriptEntry>>,
    channel: Arc<dyn AudioChannel>,
    provider: Arc<dyn ProviderConnection>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for RealtimeSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeSession")
            .field("call", &self.call)
            .field("started_at", &self.started_at)
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

impl RealtimeSession {
    pub(crate) fn new(
        call: CallRef,
        secretary_uuid: Option<String>,
        channel: Arc<dyn AudioChannel>,
        provider: Arc<dyn ProviderConnection>,
    ) -> Self {
        Self {
            call,
            secretary_uuid,
            started_at: Utc::now(),
            started: Instant::now(),
            closed: AtomicBool::new(false),
            end_reason: OnceLock::new(),
            transcript: Mutex::new(Vec::new()),
            channel,
            provider,
            cancel: CancellationToken::new(),
        }
    }

    pub fn call(&self) -> &CallRef {
        &self.call
    }

    pub fn call_uuid(&self) -> &str {
        &self.call.call_uuid
    }

    pub fn domain_uuid(&self) -> &str {
        &self.call.domain_uuid
    }

    pub fn caller_id(&self) -> &str {
        &self.call.caller_id
    }

    pub fn secretary_uuid(&self) -> Option<&str> {
        self.secretary_uuid.as_deref()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// False once the bridge stopped or the session was removed.
    pub fn is_active(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }

    pub async fn transcript(&self) -> Vec<TranscriptEntry> {
        self.transcript.lock().await.clone()
    }

    pub async fn push_transcript(&self, entry: TranscriptEntry) {
        self.transcript.lock().await.push(entry);
    }

    /// Resolves when the session is closed.
    pub async fn closed(&self) {
        self.cancel.cancelled().await;
    }

    /// Stops the bridge and closes both legs. Only the first call has an
    /// effect; close errors are logged and dropped.
    pub(crate) async fn close(&self, reason: EndReason) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.end_reason.set(reason);
        self.cancel.cancel();

        if let Err(e) = self.provider.close().await {
            debug!(call_uuid = %self.call.call_uuid, error = %e, "provider close failed");
        }
        if let Err(e) = self.channel.close().await {
            debug!(call_uuid = %self.call.call_uuid, error = %e, "channel close failed");
        }
        info!(
            call_uuid = %self.call.call_uuid,
            domain_uuid = %self.call.domain_uuid,
            reason = %reason,
            "session closed"
        );
    }

    fn end_reason(&self) -> EndReason {
        self.end_reason.get().copied().unwrap_or(EndReason::Removed)
    }

    async fn summary(&self) -> SessionSummary {
        SessionSummary {
            call: self.call.clone(),
            secretary_uuid: self.secretary_uuid.clone(),
            started_at: self.started_at,
            ended_at: Utc::now(),
            duration_secs: self.elapsed().as_secs(),
            transcript: self.transcript().await,
            reason: self.end_reason(),
        }
    }
}

/// Runs the audio bridge until either side stops or the session is closed,
/// then reports [`SessionEvent::Ended`].
pub(crate) fn spawn_bridge(
    session: Arc<RealtimeSession>,
    audio: AudioSettings,
    events: mpsc::Sender<SessionEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let pair = Mutex::new(audio.resampler_pair());

        let inbound = async {
            if let Some(reason) = pump_inbound(&session, &pair).await {
                session.close(reason).await;
            }
        };
        let outbound = async {
            if let Some(reason) = pump_outbound(&session, &pair, audio.frame_samples, &events).await
            {
                session.close(reason).await;
            }
        };
        tokio::join!(inbound, outbound);

        let summary = session.summary().await;
        info!(
            call_uuid = %summary.call.call_uuid,
            duration_secs = summary.duration_secs,
            turns = summary.transcript.len(),
            reason = %summary.reason,
            "session bridge finished"
        );
        emit(&events, SessionEvent::Ended(summary)).await;
    }
    .in_current_span())
}

/// Switch to provider. `None` when stopped by cancellation.
async fn pump_inbound(
    session: &RealtimeSession,
    pair: &Mutex<ResamplerPair>,
) -> Option<EndReason> {
    loop {
        let frame = tokio::select! {
            _ = session.cancel.cancelled() => return None,
            frame = session.channel.recv_frame() => frame,
        };
        match frame {
            Ok(Some(samples)) => {
                let converted = pair.lock().await.resample_input(&samples);
                if converted.is_empty() {
                    continue;
                }
                if let Err(e) = session.provider.send_audio(&converted).await {
                    warn!(call_uuid = %session.call_uuid(), error = %e, "provider rejected audio");
                    return Some(EndReason::ProviderLost);
                }
            }
            Ok(None) => return Some(EndReason::Hangup),
            Err(e) => {
                warn!(call_uuid = %session.call_uuid(), error = %e, "audio channel failed");
                return Some(EndReason::Hangup);
            }
        }
    }
}

/// Provider to switch, plus the provider's control events.
async fn pump_outbound(
    session: &RealtimeSession,
    pair: &Mutex<ResamplerPair>,
    frame_samples: usize,
    events: &mpsc::Sender<SessionEvent>,
) -> Option<EndReason> {
    let mut frames = FrameAssembler::new(frame_samples);
    loop {
        let event = tokio::select! {
            _ = session.cancel.cancelled() => return None,
            event = session.provider.recv_event() => event,
        };
        match event {
            Ok(Some(ProviderEvent::Audio(samples))) => {
                let ready = pair.lock().await.resample_output(&samples);
                for frame in frames.push(&ready) {
                    if let Err(e) = session.channel.send_frame(&frame).await {
                        warn!(call_uuid = %session.call_uuid(), error = %e, "audio channel rejected frame");
                        return Some(EndReason::Hangup);
                    }
                }
            }
            Ok(Some(ProviderEvent::Transcript(entry))) => {
                debug!(call_uuid = %session.call_uuid(), role = %entry.role, "transcript entry");
                session.push_transcript(entry).await;
            }
            Ok(Some(ProviderEvent::TransferRequested {
                destination,
                reason,
            })) => {
                play_remaining(session, pair, &mut frames).await;
                info!(call_uuid = %session.call_uuid(), destination = %destination, "transfer requested");
                emit_while_open(
                    session,
                    events,
                    SessionEvent::TransferRequested {
                        call: session.call.clone(),
                        destination,
                        reason,
                    },
                )
                .await;
            }
            Ok(Some(ProviderEvent::CallbackRequested { reason })) => {
                play_remaining(session, pair, &mut frames).await;
                info!(call_uuid = %session.call_uuid(), "callback requested");
                emit_while_open(
                    session,
                    events,
                    SessionEvent::CallbackRequested {
                        call: session.call.clone(),
                        reason,
                    },
                )
                .await;
            }
            Ok(Some(ProviderEvent::Interrupted)) => {
                pair.lock().await.reset_output_buffer(None);
                frames.clear();
            }
            Ok(Some(ProviderEvent::Ended)) => {
                play_remaining(session, pair, &mut frames).await;
                return Some(EndReason::ProviderEnded);
            }
            Ok(None) => return Some(EndReason::ProviderLost),
            Err(e) => {
                warn!(call_uuid = %session.call_uuid(), error = %e, "provider stream failed");
                return Some(EndReason::ProviderLost);
            }
        }
    }
}

/// Sends whatever assistant audio is still buffered.
async fn play_remaining(
    session: &RealtimeSession,
    pair: &Mutex<ResamplerPair>,
    frames: &mut FrameAssembler,
) {
    let held = pair.lock().await.flush_output();
    let mut pending = frames.push(&held);
    pending.extend(frames.finish());
    for frame in pending {
        if let Err(e) = session.channel.send_frame(&frame).await {
            debug!(call_uuid = %session.call_uuid(), error = %e, "dropping buffered audio");
            return;
        }
    }
}

async fn emit(events: &mpsc::Sender<SessionEvent>, event: SessionEvent) {
    if events.send(event).await.is_err() {
        debug!("session event receiver dropped");
    }
}

/// Like [`emit`], but gives up if the session is closed while the queue is
/// full.
async fn emit_while_open(
    session: &RealtimeSession,
    events: &mpsc::Sender<SessionEvent>,
    event: SessionEvent,
) {
    tokio::select! {
        _ = session.cancel.cancelled() => {
            debug!(call_uuid = %session.call_uuid(), "session closed, event not queued");
        }
        _ = emit(events, event) => {}
    }
}

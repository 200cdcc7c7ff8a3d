// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reacts to session events: transfers, callbacks and end-of-call hooks.
//!
//! The router drains the shared session event queue and hands each call's
//! events to a [`CallWorker`] task of its own, in arrival order. A worker
//! owns the call's pending [`CallbackHandler`] and the action the call is
//! heading for, and exits after the call's `Ended` event. Retries, ticket
//! submission and webhook delivery for one call never hold up another.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};
use voxline_callback::{CallbackHandler, CallbackSettings};
use voxline_core::TicketSink;
use voxline_routing::PhoneRules;
use voxline_session::{CallRef, SessionEvent, SessionManager, SessionSummary};
use voxline_transfer::{TransferHandler, TransferKind, TransferResult};
use voxline_webhook::{WebhookAction, WebhookNotifier};

/// Collaborators shared by every call worker.
#[derive(Clone)]
struct Services {
    sessions: Arc<SessionManager>,
    transfers: Arc<TransferHandler>,
    tickets: Option<Arc<dyn TicketSink>>,
    webhook: Option<Arc<WebhookNotifier>>,
    phone: PhoneRules,
    callback_settings: CallbackSettings,
}

pub struct Orchestrator {
    services: Services,
}

impl Orchestrator {
    pub fn new(
        sessions: Arc<SessionManager>,
        transfers: Arc<TransferHandler>,
        phone: PhoneRules,
        callback_settings: CallbackSettings,
    ) -> Self {
        Self {
            services: Services {
                sessions,
                transfers,
                tickets: None,
                webhook: None,
                phone,
                callback_settings,
            },
        }
    }

    pub fn with_ticket_sink(mut self, sink: Arc<dyn TicketSink>) -> Self {
        self.services.tickets = Some(sink);
        self
    }

    pub fn with_webhook(mut self, notifier: Arc<WebhookNotifier>) -> Self {
        self.services.webhook = Some(notifier);
        self
    }

    /// A worker for one call, sharing this orchestrator's collaborators.
    pub fn worker(&self) -> CallWorker {
        CallWorker::new(Arc::new(self.services.clone()))
    }

    /// Routes `events` to per-call workers until the queue closes or
    /// `cancel` fires. A closed queue lets busy workers finish; cancellation
    /// aborts them.
    pub async fn run(self, mut events: mpsc::Receiver<SessionEvent>, cancel: CancellationToken) {
        info!("orchestrator started");
        let services = Arc::new(self.services);
        let mut calls: HashMap<String, mpsc::UnboundedSender<SessionEvent>> = HashMap::new();
        let mut workers = JoinSet::new();

        let cancelled = loop {
            tokio::select! {
                _ = cancel.cancelled() => break true,
                Some(joined) = workers.join_next(), if !workers.is_empty() => {
                    if let Err(e) = joined {
                        warn!(error = %e, "call worker failed");
                    }
                }
                event = events.recv() => match event {
                    Some(event) => dispatch(&mut calls, &mut workers, &services, event),
                    None => break false,
                },
            }
        };

        drop(calls);
        info!(in_flight = workers.len(), cancelled, "orchestrator stopped");
        if cancelled {
            workers.shutdown().await;
        } else {
            while let Some(joined) = workers.join_next().await {
                if let Err(e) = joined {
                    warn!(error = %e, "call worker failed");
                }
            }
        }
    }
}

/// Queues `event` on its call's worker, starting one if needed. The sender
/// is dropped after `Ended`, so the worker exits once its queue drains.
fn dispatch(
    calls: &mut HashMap<String, mpsc::UnboundedSender<SessionEvent>>,
    workers: &mut JoinSet<()>,
    services: &Arc<Services>,
    event: SessionEvent,
) {
    let call_uuid = event.call().call_uuid.clone();
    let finished = matches!(event, SessionEvent::Ended(_));

    let tx = calls.entry(call_uuid.clone()).or_insert_with(|| {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = CallWorker::new(services.clone());
        let span = info_span!("call", call_uuid = %call_uuid);
        workers.spawn(worker.run(rx).instrument(span));
        tx
    });
    if tx.send(event).is_err() {
        warn!(call_uuid = %call_uuid, "call worker gone, event dropped");
    }
    if finished {
        calls.remove(&call_uuid);
    }
}

/// Handles the events of a single call, one at a time.
pub struct CallWorker {
    services: Arc<Services>,
    callback: Option<CallbackHandler>,
    action: Option<WebhookAction>,
}

impl CallWorker {
    fn new(services: Arc<Services>) -> Self {
        Self {
            services,
            callback: None,
            action: None,
        }
    }

    /// Pending callback, until the call ends.
    pub fn callback(&self) -> Option<&CallbackHandler> {
        self.callback.as_ref()
    }

    async fn run(mut self, mut events: mpsc::UnboundedReceiver<SessionEvent>) {
        while let Some(event) = events.recv().await {
            self.handle(event).await;
        }
    }

    pub async fn handle(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::TransferRequested {
                call,
                destination,
                reason,
            } => self.on_transfer(call, destination, reason).await,
            SessionEvent::CallbackRequested { call, reason } => self.on_callback(&call, reason),
            SessionEvent::Ended(summary) => self.on_ended(summary).await,
        }
    }

    async fn on_transfer(&mut self, call: CallRef, destination: String, reason: Option<String>) {
        let secretary_uuid = self
            .services
            .sessions
            .get_session(&call.call_uuid)
            .and_then(|session| session.secretary_uuid().map(str::to_string));
        if let Some(webhook) = &self.services.webhook {
            webhook
                .notify_transfer_requested(
                    &call,
                    secretary_uuid.as_deref(),
                    &destination,
                    reason.clone(),
                )
                .await;
        }

        let result = self
            .services
            .transfers
            .transfer_with_retries(
                &call.call_uuid,
                &call.domain_uuid,
                &destination,
                TransferKind::Blind,
            )
            .await;

        if result.success {
            info!(
                call_uuid = %call.call_uuid,
                destination = %destination,
                attempts = result.attempts,
                "call handed over"
            );
            self.action = Some(WebhookAction::transfer(destination, reason));
            return;
        }

        warn!(
            call_uuid = %call.call_uuid,
            destination = %destination,
            failure = ?result.failure,
            error = ?result.error,
            "transfer failed, offering callback"
        );
        let reason = reason.or_else(|| result.error.clone());
        self.attach_callback(&call, reason.as_deref(), Some(&result));
        self.action = Some(WebhookAction::callback(reason));
    }

    fn on_callback(&mut self, call: &CallRef, reason: Option<String>) {
        self.attach_callback(call, reason.as_deref(), None);
        self.action = Some(WebhookAction::callback(reason));
    }

    /// Creates or updates the call's callback, seeded from the caller id.
    fn attach_callback(
        &mut self,
        call: &CallRef,
        reason: Option<&str>,
        failed_transfer: Option<&TransferResult>,
    ) {
        let services = &self.services;
        let handler = self.callback.get_or_insert_with(|| {
            CallbackHandler::new(
                call.domain_uuid.clone(),
                call.call_uuid.clone(),
                call.caller_id.clone(),
                services.phone.clone(),
                services.callback_settings.clone(),
            )
        });

        if handler.data().callback_number.is_none() && !handler.use_caller_id_as_callback() {
            debug!(call_uuid = %call.call_uuid, "caller id unusable, callback number pending");
        }
        if let Some(record) = failed_transfer
            .and_then(|result| result.destination.as_ref())
            .and_then(|destination| destination.record.as_ref())
        {
            handler.set_intended_destination(record);
        }
        if let Some(reason) = reason.filter(|r| !r.trim().is_empty()) {
            handler.set_reason(reason);
        }
    }

    async fn on_ended(&mut self, summary: SessionSummary) {
        let call_uuid = summary.call.call_uuid.clone();
        self.services.sessions.remove_session(&call_uuid).await;

        if let Some(mut handler) = self.callback.take() {
            handler.set_voice_call_data(summary.duration_secs, None, summary.transcript.clone());
            match &self.services.tickets {
                Some(sink) => {
                    if let Err(e) = handler.submit(sink.as_ref(), None).await {
                        warn!(call_uuid = %call_uuid, error = %e, "callback not submitted");
                    }
                }
                None => warn!(
                    call_uuid = %call_uuid,
                    "no ticket sink configured, callback dropped"
                ),
            }
        }

        let action = self.action.take().unwrap_or_else(WebhookAction::hangup);
        if let Some(webhook) = &self.services.webhook {
            webhook.notify_conversation_ended(&summary, action).await;
        }
        debug!(
            call_uuid = %call_uuid,
            reason = %summary.reason,
            duration_secs = summary.duration_secs,
            "call finished"
        );
    }
}

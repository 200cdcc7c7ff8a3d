// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `voxline serve` command implementation.
//!
//! Wires the switch client, tenant routing, transfer and callback handling,
//! the session manager and the HTTP/WebSocket gateway, then runs until
//! SIGINT or SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use voxline_callback::{CallbackSettings, HttpTicketSink};
use voxline_config::model::VoxlineConfig;
use voxline_core::{PluginAdapter, SwitchControl, TicketSink, VoxlineError};
use voxline_gateway::{GatewaySettings, GatewayState, HealthState, start_server};
use voxline_routing::{DestinationLoader, PhoneRules, StaticStore};
use voxline_session::{RelayProvider, SessionManager, SessionSettings, spawn_sweeper};
use voxline_switch::{EslClient, EslConfig};
use voxline_transfer::TransferHandler;
use voxline_webhook::WebhookNotifier;

use crate::orchestrator::Orchestrator;

#[cfg(feature = "prometheus")]
use voxline_prometheus::PrometheusAdapter;

/// Runs the `voxline serve` command.
pub async fn run_serve(config: VoxlineConfig) -> Result<(), VoxlineError> {
    init_tracing(&config.service.log_level);
    info!(name = %config.service.name, tenants = config.domains.len(), "starting voxline serve");

    let prometheus_render = init_prometheus(&config);

    let switch = Arc::new(EslClient::new(EslConfig::from_config(&config.switch)));
    match switch.health_check().await {
        Ok(status) => info!(?status, "switch reachable"),
        Err(e) => warn!(error = %e, "switch not reachable yet, commands will retry the connection"),
    }

    let store = Arc::new(StaticStore::from_config(&config));
    info!(tenants = store.tenant_count(), "tenant store loaded");
    let loader = Arc::new(DestinationLoader::new(
        store,
        Duration::from_secs(config.routing.destination_cache_ttl_secs),
        config.service.default_timezone.clone(),
    ));
    let transfers = Arc::new(TransferHandler::new(
        switch.clone() as Arc<dyn SwitchControl>,
        loader,
        &config.transfer,
    ));

    let Some(relay) = RelayProvider::from_config(&config.provider) else {
        error!("provider.url is not set, sessions cannot be created");
        return Err(VoxlineError::Config(
            "provider.url must be set to serve calls".to_string(),
        ));
    };
    info!(url = relay.url(), "voice provider relay configured");

    let (sessions, events) =
        SessionManager::with_events(Arc::new(relay), SessionSettings::from_config(&config.session));

    let mut orchestrator = Orchestrator::new(
        sessions.clone(),
        transfers,
        PhoneRules::from_config(&config.phone),
        CallbackSettings::from_config(&config.callback),
    );
    match HttpTicketSink::from_config(&config.callback)? {
        Some(sink) => {
            info!("ticket sink configured");
            orchestrator = orchestrator.with_ticket_sink(Arc::new(sink) as Arc<dyn TicketSink>);
        }
        None => info!("callback.ticket_api_url not set, callbacks will not be submitted"),
    }
    match WebhookNotifier::from_config(&config.webhook)? {
        Some(notifier) => {
            info!(url = notifier.url(), "webhook configured");
            orchestrator = orchestrator.with_webhook(Arc::new(notifier));
        }
        None => debug!("webhook disabled"),
    }

    let cancel = install_signal_handler()?;

    let sweeper = spawn_sweeper(
        sessions.clone(),
        sessions.settings().sweep_interval,
        cancel.clone(),
    );
    let orchestrator_task = tokio::spawn(orchestrator.run(events, cancel.clone()));

    let result = if config.gateway.enabled {
        let state = GatewayState {
            switch: switch.clone(),
            sessions: sessions.clone(),
            settings: Arc::new(GatewaySettings::from_config(&config)),
            health: HealthState::new(prometheus_render),
        };
        start_server(state, cancel.clone()).await
    } else {
        info!("gateway disabled, waiting for shutdown signal");
        cancel.cancelled().await;
        Ok(())
    };

    // A gateway failure must still take the background tasks down.
    cancel.cancel();
    let closed = sessions.shutdown().await;
    info!(closed, "sessions drained");
    if let Err(e) = sweeper.await {
        warn!(error = %e, "session sweeper task failed");
    }
    if let Err(e) = orchestrator_task.await {
        warn!(error = %e, "orchestrator task failed");
    }
    if let Err(e) = switch.shutdown().await {
        warn!(error = %e, "switch connection did not close cleanly");
    }

    match &result {
        Ok(()) => info!("voxline serve shutdown complete"),
        Err(e) => error!(error = %e, "voxline serve stopped with an error"),
    }
    result
}

type RenderFn = Arc<dyn Fn() -> String + Send + Sync>;

#[cfg(feature = "prometheus")]
fn init_prometheus(config: &VoxlineConfig) -> Option<RenderFn> {
    if !config.prometheus.enabled {
        debug!("prometheus metrics disabled");
        return None;
    }
    match PrometheusAdapter::new() {
        Ok(adapter) => {
            info!("prometheus metrics recorder installed");
            let adapter = Arc::new(adapter);
            Some(Arc::new(move || adapter.render()))
        }
        Err(e) => {
            warn!(error = %e, "prometheus initialization failed, metrics disabled");
            None
        }
    }
}

#[cfg(not(feature = "prometheus"))]
fn init_prometheus(config: &VoxlineConfig) -> Option<RenderFn> {
    if config.prometheus.enabled {
        warn!("prometheus enabled in config but compiled without the `prometheus` feature");
    }
    None
}

/// Returns a token cancelled on SIGINT or SIGTERM.
fn install_signal_handler() -> Result<CancellationToken, VoxlineError> {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    #[cfg(unix)]
    let mut sigterm = {
        use tokio::signal::unix::{SignalKind, signal};
        signal(SignalKind::terminate())
            .map_err(|e| VoxlineError::Internal(format!("failed to install SIGTERM handler: {e}")))?
    };

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        tokio::select! {
            _ = ctrl_c => info!("received SIGINT (Ctrl+C), initiating shutdown"),
            _ = sigterm.recv() => info!("received SIGTERM, initiating shutdown"),
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, initiating shutdown");
        }

        token_clone.cancel();
        debug!("shutdown signal handler completed");
    });

    Ok(token)
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("voxline={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

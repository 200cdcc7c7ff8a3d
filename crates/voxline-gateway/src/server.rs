// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    routing::{get, post},
};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use voxline_config::VoxlineConfig;
use voxline_core::{SwitchControl, VoxlineError};
use voxline_session::SessionManager;

use crate::handlers;
use crate::stream;

/// Health state for the unauthenticated health/metrics endpoints.
#[derive(Clone)]
pub struct HealthState {
    /// Process start time for uptime calculation.
    pub start_time: std::time::Instant,
    /// Optional Prometheus metrics render function.
    pub prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
}

impl HealthState {
    pub fn new(prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>) -> Self {
        Self {
            start_time: std::time::Instant::now(),
            prometheus_render,
        }
    }
}

/// Settings the handlers read on every request.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub host: String,
    pub port: u16,
    pub min_call_timeout_secs: u32,
    pub max_call_timeout_secs: u32,
    pub default_call_timeout_secs: u32,
    /// Caller id name shown to the agent when none is given.
    pub caller_id_name: String,
    /// How long a new audio stream may take to send its metadata frame.
    pub metadata_timeout: Duration,
    /// SIP domain name per tenant uuid, for originate dial strings.
    pub domain_names: HashMap<String, String>,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self::from_config(&VoxlineConfig::default())
    }
}

impl GatewaySettings {
    pub fn from_config(config: &VoxlineConfig) -> Self {
        let gateway = &config.gateway;
        Self {
            host: gateway.host.clone(),
            port: gateway.port,
            min_call_timeout_secs: gateway.min_call_timeout_secs,
            max_call_timeout_secs: gateway.max_call_timeout_secs,
            default_call_timeout_secs: gateway.default_call_timeout_secs,
            caller_id_name: "Callback".to_string(),
            metadata_timeout: Duration::from_secs(5),
            domain_names: config
                .domains
                .iter()
                .filter(|d| !d.domain_name.trim().is_empty())
                .map(|d| (d.domain_uuid.clone(), d.domain_name.clone()))
                .collect(),
        }
    }

    /// Falls back to an empty name, which makes the dial string use the uuid.
    pub fn domain_name(&self, domain_uuid: &str) -> String {
        self.domain_names
            .get(domain_uuid)
            .cloned()
            .unwrap_or_default()
    }
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub switch: Arc<dyn SwitchControl>,
    pub sessions: Arc<SessionManager>,
    pub settings: Arc<GatewaySettings>,
    pub health: HealthState,
}

/// Builds the application router.
///
/// - `POST /api/callback/originate`
/// - `POST /api/callback/check-availability`
/// - `GET /health`, `GET /metrics`
/// - `GET /stream/{secretary_uuid}` (WebSocket upgrade)
pub fn router(state: GatewayState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .route("/metrics", get(handlers::get_metrics));

    let api_routes = Router::new()
        .route("/api/callback/originate", post(handlers::post_originate))
        .route(
            "/api/callback/check-availability",
            post(handlers::post_check_availability),
        );

    let stream_routes = Router::new().route("/stream/{secretary_uuid}", get(stream::stream_handler));

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .merge(stream_routes)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds `host:port` and serves until `shutdown` fires.
pub async fn start_server(
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), VoxlineError> {
    let addr = format!("{}:{}", state.settings.host, state.settings.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| VoxlineError::Channel {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("Gateway server listening on {addr}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| VoxlineError::Channel {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("Gateway server stopped");
    Ok(())
}

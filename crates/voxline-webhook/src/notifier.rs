// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook delivery.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use tracing::{info, warn};
use voxline_config::model::WebhookConfig;
use voxline_core::{AdapterType, HealthStatus, PluginAdapter, VoxlineError};
use voxline_session::{CallRef, SessionSummary};

use crate::payload::{WebhookAction, WebhookPayload};

/// Result of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered { status: u16 },
    Failed { reason: String },
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }
}

#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, VoxlineError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| VoxlineError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// `Ok(None)` when no webhook URL is configured.
    pub fn from_config(config: &WebhookConfig) -> Result<Option<Self>, VoxlineError> {
        config
            .url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .map(|url| Self::new(url, Duration::from_secs(config.timeout_secs)))
            .transpose()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Posts `payload` once. Never returns an error.
    pub async fn deliver(&self, payload: &WebhookPayload) -> DeliveryOutcome {
        let outcome = match self.client.post(&self.url).json(payload).send().await {
            Ok(response) if response.status().is_success() => DeliveryOutcome::Delivered {
                status: response.status().as_u16(),
            },
            Ok(response) => DeliveryOutcome::Failed {
                reason: format!("webhook returned {}", response.status().as_u16()),
            },
            Err(e) if e.is_timeout() => DeliveryOutcome::Failed {
                reason: "timeout".to_string(),
            },
            Err(e) => DeliveryOutcome::Failed {
                reason: e.to_string(),
            },
        };

        match &outcome {
            DeliveryOutcome::Delivered { status } => {
                info!(
                    event = %payload.event,
                    call_uuid = %payload.call.uuid,
                    status,
                    "webhook delivered"
                );
                metrics::counter!("voxline_webhook_deliveries_total", "outcome" => "delivered")
                    .increment(1);
            }
            DeliveryOutcome::Failed { reason } => {
                warn!(
                    event = %payload.event,
                    call_uuid = %payload.call.uuid,
                    url = %self.url,
                    reason = %reason,
                    "webhook delivery failed"
                );
                metrics::counter!("voxline_webhook_deliveries_total", "outcome" => "failed")
                    .increment(1);
            }
        }
        outcome
    }

    pub async fn notify_conversation_ended(
        &self,
        summary: &SessionSummary,
        action: WebhookAction,
    ) -> DeliveryOutcome {
        self.deliver(&WebhookPayload::conversation_ended(summary, action, None))
            .await
    }

    pub async fn notify_transfer_requested(
        &self,
        call: &CallRef,
        secretary_uuid: Option<&str>,
        destination: &str,
        reason: Option<String>,
    ) -> DeliveryOutcome {
        self.deliver(&WebhookPayload::transfer_requested(
            call,
            secretary_uuid,
            destination,
            reason,
        ))
        .await
    }
}

#[async_trait]
impl PluginAdapter for WebhookNotifier {
    fn name(&self) -> &str {
        "webhook"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Webhook
    }

    async fn health_check(&self) -> Result<HealthStatus, VoxlineError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), VoxlineError> {
        Ok(())
    }
}

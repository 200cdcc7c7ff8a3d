// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP ticket sink for the ticketing API.
//!
//! One submission is one `POST {base}/api/callbacks`. Only `200` and `201`
//! count as persisted; everything else surfaces as
//! [`VoxlineError::SubmissionFailed`] for the caller to decide on.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;
use voxline_config::model::CallbackConfig;
use voxline_core::types::{CallbackTicket, TicketReceipt};
use voxline_core::{AdapterType, HealthStatus, PluginAdapter, TicketSink, VoxlineError};

const SERVICE_NAME: &str = "voxline";

/// Response body of a created ticket. Every field is optional so that an
/// API returning less still counts as success.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedTicket {
    #[serde(default)]
    id: Option<i64>,
    #[serde(default)]
    uuid: Option<String>,
    #[serde(default)]
    whatsapp_sent: bool,
}

#[derive(Debug, Clone)]
pub struct HttpTicketSink {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTicketSink {
    /// Builds a sink for `base_url`. `token` is sent as a bearer token.
    pub fn new(
        base_url: impl Into<String>,
        token: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, VoxlineError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("x-service-name", HeaderValue::from_static(SERVICE_NAME));
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
                    VoxlineError::Config(format!("invalid ticket API token header value: {e}"))
                })?,
            );
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| VoxlineError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// `Ok(None)` when no ticket API is configured.
    pub fn from_config(config: &CallbackConfig) -> Result<Option<Self>, VoxlineError> {
        config
            .ticket_api_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .map(|url| {
                Self::new(
                    url,
                    config.ticket_api_token.as_deref(),
                    Duration::from_secs(config.ticket_timeout_secs),
                )
            })
            .transpose()
    }

    fn endpoint(&self) -> String {
        format!("{}/api/callbacks", self.base_url)
    }
}

#[async_trait]
impl PluginAdapter for HttpTicketSink {
    fn name(&self) -> &str {
        "http-ticket-sink"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::TicketSink
    }

    async fn health_check(&self) -> Result<HealthStatus, VoxlineError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), VoxlineError> {
        Ok(())
    }
}

#[async_trait]
impl TicketSink for HttpTicketSink {
    async fn submit(&self, ticket: &CallbackTicket) -> Result<TicketReceipt, VoxlineError> {
        let response = self
            .client
            .post(self.endpoint())
            .json(ticket)
            .send()
            .await
            .map_err(|e| VoxlineError::SubmissionFailed {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(status = %status, "ticket API response received");

        if status != StatusCode::OK && status != StatusCode::CREATED {
            return Err(VoxlineError::SubmissionFailed {
                message: format!("API error: {}", status.as_u16()),
                source: None,
            });
        }

        let body = response.text().await.unwrap_or_default();
        let created: CreatedTicket = serde_json::from_str(&body).unwrap_or_default();
        Ok(TicketReceipt {
            ticket_id: created.id,
            ticket_uuid: created.uuid,
            whatsapp_sent: created.whatsapp_sent,
        })
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn ticket() -> CallbackTicket {
        CallbackTicket {
            ticket_type: "callback".into(),
            callback_number: "5518997752222".into(),
            callback_extension: None,
            callback_intended_for_name: Some("Jeni".into()),
            callback_department: Some("Financeiro".into()),
            callback_reason: Some("Segunda via".into()),
            callback_scheduled_at: None,
            callback_expires_at: None,
            callback_notify_via_whatsapp: true,
            voice_call_uuid: Some("c1".into()),
            voice_call_duration: Some(42),
            voice_recording_path: None,
            voice_transcript: None,
            voice_summary: None,
            voice_domain_uuid: "d1".into(),
            contact: "5518997752222".into(),
            channel: "voice".into(),
            status: "pending".into(),
        }
    }

    fn sink(server: &MockServer) -> HttpTicketSink {
        HttpTicketSink::new(server.uri(), Some("secret"), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn created_ticket_returns_receipt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/callbacks"))
            .and(header("authorization", "Bearer secret"))
            .and(header("x-service-name", "voxline"))
            .and(body_partial_json(serde_json::json!({
                "callbackNumber": "5518997752222",
                "callbackNotifyViaWhatsApp": true,
                "voiceDomainUuid": "d1"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "id": 77,
                "uuid": "t-77",
                "whatsappSent": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let receipt = sink(&server).submit(&ticket()).await.unwrap();
        assert_eq!(receipt.ticket_id, Some(77));
        assert_eq!(receipt.ticket_uuid.as_deref(), Some("t-77"));
        assert!(receipt.whatsapp_sent);
    }

    #[tokio::test]
    async fn empty_success_body_still_counts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/callbacks"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let receipt = sink(&server).submit(&ticket()).await.unwrap();
        assert_eq!(receipt, TicketReceipt::default());
    }

    #[tokio::test]
    async fn server_error_is_a_submission_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/callbacks"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let err = sink(&server).submit(&ticket()).await.unwrap_err();
        match err {
            VoxlineError::SubmissionFailed { message, .. } => assert_eq!(message, "API error: 503"),
            other => panic!("expected SubmissionFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_api_is_a_submission_failure() {
        let sink =
            HttpTicketSink::new("http://127.0.0.1:9", None, Duration::from_millis(500)).unwrap();
        let err = sink.submit(&ticket()).await.unwrap_err();
        assert!(matches!(err, VoxlineError::SubmissionFailed { .. }));
    }

    #[test]
    fn from_config_requires_url() {
        assert!(HttpTicketSink::from_config(&CallbackConfig::default())
            .unwrap()
            .is_none());

        let config = CallbackConfig {
            ticket_api_url: Some("http://tickets.local/".into()),
            ..CallbackConfig::default()
        };
        let sink = HttpTicketSink::from_config(&config).unwrap().unwrap();
        assert_eq!(sink.endpoint(), "http://tickets.local/api/callbacks");
    }
}

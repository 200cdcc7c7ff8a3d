// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the callback API and the public endpoints.

use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use voxline_core::HealthStatus;
use voxline_core::types::OriginateRequest;
use voxline_switch::{Availability, ExtensionStatus, check_availability};

use crate::server::{GatewaySettings, GatewayState};
use crate::validation::{self, FieldError};

/// Request body for `POST /api/callback/originate`.
#[derive(Debug, Default, Deserialize)]
pub struct OriginateBody {
    #[serde(default)]
    pub domain_uuid: Option<String>,
    /// Agent extension rung first.
    #[serde(default)]
    pub extension: String,
    /// Client number bridged once the agent answers.
    #[serde(default)]
    pub client_number: String,
    #[serde(default)]
    pub ticket_id: Option<u64>,
    #[serde(default)]
    pub callback_reason: Option<String>,
    #[serde(default)]
    pub caller_id_name: Option<String>,
    /// Seconds the agent has to answer.
    #[serde(default)]
    pub call_timeout: Option<u32>,
}

/// Response body for `POST /api/callback/originate`.
#[derive(Debug, Serialize)]
pub struct OriginateResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub extension_status: ExtensionStatus,
}

/// Request body for `POST /api/callback/check-availability`.
#[derive(Debug, Default, Deserialize)]
pub struct AvailabilityBody {
    #[serde(default)]
    pub domain_uuid: Option<String>,
    #[serde(default)]
    pub extension: String,
}

/// Response body for `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub switch: String,
    pub active_sessions: usize,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn field_error_response(e: FieldError) -> Response {
    let status = match e {
        FieldError::MissingDomain => StatusCode::BAD_REQUEST,
        FieldError::Invalid { .. } => StatusCode::UNPROCESSABLE_ENTITY,
    };
    (status, Json(ErrorResponse { error: e.to_string() })).into_response()
}

fn build_originate(
    body: &OriginateBody,
    settings: &GatewaySettings,
) -> Result<OriginateRequest, FieldError> {
    let domain_uuid = validation::require_domain(body.domain_uuid.as_deref())?;
    Ok(OriginateRequest {
        domain_name: settings.domain_name(&domain_uuid),
        domain_uuid,
        extension: validation::extension(&body.extension)?,
        client_number: validation::client_number(&body.client_number)?,
        caller_id_name: validation::caller_id_name(body.caller_id_name.as_deref(), settings)?,
        call_timeout_secs: validation::call_timeout(body.call_timeout, settings)?,
        ticket_id: validation::ticket_id(body.ticket_id)?,
        callback_reason: validation::callback_reason(body.callback_reason.as_deref())?,
    })
}

/// Turns a switch refusal into a message for the operator.
fn describe_originate_failure(reply: Option<&str>) -> String {
    let Some(reply) = reply.filter(|r| !r.trim().is_empty()) else {
        return "Falha ao originar chamada".to_string();
    };
    if reply.contains("USER_BUSY") {
        "Ramal ocupado".to_string()
    } else if reply.contains("NO_ANSWER") {
        "Ramal não atendeu".to_string()
    } else if reply.contains("SUBSCRIBER_ABSENT") {
        "Ramal offline".to_string()
    } else if reply.contains("CALL_REJECTED") {
        "Chamada rejeitada".to_string()
    } else {
        reply.trim().chars().take(200).collect()
    }
}

/// POST /api/callback/originate
///
/// Rings the agent extension first and bridges the client once it answers.
/// The extension must be registered and idle, otherwise nothing is dialled.
pub async fn post_originate(
    State(state): State<GatewayState>,
    Json(body): Json<OriginateBody>,
) -> Response {
    let request = match build_originate(&body, &state.settings) {
        Ok(request) => request,
        Err(e) => return field_error_response(e),
    };

    let availability = check_availability(state.switch.as_ref(), &request.extension).await;
    if !availability.available {
        info!(
            domain_uuid = %request.domain_uuid,
            extension = %request.extension,
            status = %availability.status,
            "originate skipped, extension unavailable"
        );
        metrics::counter!("voxline_originates_total", "outcome" => "unavailable").increment(1);
        return (
            StatusCode::OK,
            Json(OriginateResponse {
                success: false,
                call_uuid: None,
                error: availability
                    .reason
                    .or_else(|| Some("Ramal indisponível".to_string())),
                extension_status: availability.status,
            }),
        )
            .into_response();
    }

    match state.switch.originate(&request).await {
        Ok(outcome) if outcome.accepted => {
            info!(
                domain_uuid = %request.domain_uuid,
                extension = %request.extension,
                call_uuid = outcome.call_uuid.as_deref().unwrap_or(""),
                ticket_id = request.ticket_id.as_deref().unwrap_or(""),
                "callback originate initiated"
            );
            metrics::counter!("voxline_originates_total", "outcome" => "initiated").increment(1);
            (
                StatusCode::OK,
                Json(OriginateResponse {
                    success: true,
                    call_uuid: outcome.call_uuid,
                    error: None,
                    extension_status: availability.status,
                }),
            )
                .into_response()
        }
        Ok(outcome) => {
            let message = describe_originate_failure(outcome.error.as_deref());
            warn!(
                domain_uuid = %request.domain_uuid,
                extension = %request.extension,
                error = %message,
                "originate refused by switch"
            );
            metrics::counter!("voxline_originates_total", "outcome" => "refused").increment(1);
            (
                StatusCode::OK,
                Json(OriginateResponse {
                    success: false,
                    call_uuid: None,
                    error: Some(message),
                    extension_status: availability.status,
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!(
                domain_uuid = %request.domain_uuid,
                extension = %request.extension,
                error = %e,
                "originate failed"
            );
            metrics::counter!("voxline_originates_total", "outcome" => "error").increment(1);
            (
                StatusCode::BAD_GATEWAY,
                Json(OriginateResponse {
                    success: false,
                    call_uuid: None,
                    error: Some(e.to_string()),
                    extension_status: availability.status,
                }),
            )
                .into_response()
        }
    }
}

/// POST /api/callback/check-availability
pub async fn post_check_availability(
    State(state): State<GatewayState>,
    Json(body): Json<AvailabilityBody>,
) -> Response {
    let checked = validation::require_domain(body.domain_uuid.as_deref())
        .and_then(|domain| validation::extension(&body.extension).map(|ext| (domain, ext)));
    let (domain_uuid, extension) = match checked {
        Ok(fields) => fields,
        Err(e) => return field_error_response(e),
    };

    let availability: Availability = check_availability(state.switch.as_ref(), &extension).await;
    tracing::debug!(
        domain_uuid = %domain_uuid,
        extension = %extension,
        status = %availability.status,
        "availability checked"
    );
    (StatusCode::OK, Json(availability)).into_response()
}

/// GET /health
///
/// 503 only when the switch is unreachable.
pub async fn get_health(State(state): State<GatewayState>) -> Response {
    let (code, status, switch) = match state.switch.health_check().await {
        Ok(HealthStatus::Healthy) => (StatusCode::OK, "ok", "healthy".to_string()),
        Ok(HealthStatus::Degraded(reason)) => {
            (StatusCode::OK, "degraded", format!("degraded: {reason}"))
        }
        Ok(HealthStatus::Unhealthy(reason)) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "unhealthy",
            format!("unhealthy: {reason}"),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "unhealthy",
            format!("unhealthy: {e}"),
        ),
    };

    let body = HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.health.start_time.elapsed().as_secs(),
        switch,
        active_sessions: state.sessions.active_session_count(),
    };
    (code, Json(body)).into_response()
}

/// GET /metrics
pub async fn get_metrics(State(state): State<GatewayState>) -> Response {
    match &state.health.prometheus_render {
        Some(render) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics disabled").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn originate_body_accepts_minimal_json() {
        let body: OriginateBody = serde_json::from_str(
            r#"{"domain_uuid": "d1", "extension": "1001", "client_number": "5518997752222"}"#,
        )
        .unwrap();
        let request = build_originate(&body, &GatewaySettings::default()).unwrap();
        assert_eq!(request.call_timeout_secs, 30);
        assert_eq!(request.caller_id_name, "Callback");
        assert_eq!(request.ticket_id, None);
        assert_eq!(request.domain_name, "");
    }

    #[test]
    fn missing_domain_is_reported_first() {
        let body = OriginateBody {
            extension: "x".into(),
            ..OriginateBody::default()
        };
        assert_eq!(
            build_originate(&body, &GatewaySettings::default()).unwrap_err(),
            FieldError::MissingDomain
        );
    }

    #[test]
    fn switch_refusals_are_described() {
        assert_eq!(describe_originate_failure(None), "Falha ao originar chamada");
        assert_eq!(
            describe_originate_failure(Some("-ERR USER_BUSY")),
            "Ramal ocupado"
        );
        assert_eq!(
            describe_originate_failure(Some("-ERR SUBSCRIBER_ABSENT")),
            "Ramal offline"
        );
        assert_eq!(
            describe_originate_failure(Some("-ERR GATEWAY_DOWN")),
            "-ERR GATEWAY_DOWN"
        );
    }

    #[test]
    fn originate_response_omits_empty_fields() {
        let json = serde_json::to_value(OriginateResponse {
            success: true,
            call_uuid: Some("job-1".into()),
            error: None,
            extension_status: ExtensionStatus::Available,
        })
        .unwrap();
        insta::assert_json_snapshot!(json, @r###"
        {
          "call_uuid": "job-1",
          "extension_status": "available",
          "success": true
        }
        "###);
    }
}

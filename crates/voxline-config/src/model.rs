// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for Voxline.
//!
//! All section structs use `#[serde(deny_unknown_fields)]` to reject
//! unrecognized config keys at startup, providing actionable error messages.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use voxline_core::TransferDestination;

/// Top-level Voxline configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VoxlineConfig {
    /// Process identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// FreeSWITCH Event Socket connection.
    #[serde(default)]
    pub switch: SwitchConfig,

    /// Realtime session limits and audio bridge settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// AI voice provider relay.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Phone number normalization rules.
    #[serde(default)]
    pub phone: PhoneConfig,

    /// Transfer execution settings.
    #[serde(default)]
    pub transfer: TransferConfig,

    /// Destination loading settings.
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Callback capture and ticket submission settings.
    #[serde(default)]
    pub callback: CallbackConfig,

    /// Outbound conversation event webhook.
    #[serde(default)]
    pub webhook: WebhookConfig,

    /// HTTP surface settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Prometheus metrics settings.
    #[serde(default)]
    pub prometheus: PrometheusConfig,

    /// Static tenant data (destinations and time conditions).
    #[serde(default)]
    pub domains: Vec<DomainConfig>,
}

impl VoxlineConfig {
    /// Looks up a tenant by its uuid.
    pub fn domain(&self, domain_uuid: &str) -> Option<&DomainConfig> {
        self.domains.iter().find(|d| d.domain_uuid == domain_uuid)
    }
}

/// Process identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name of this instance.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// IANA timezone used when a schedule or destination does not name one.
    #[serde(default = "default_timezone")]
    pub default_timezone: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
            default_timezone: default_timezone(),
        }
    }
}

fn default_service_name() -> String {
    "voxline".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timezone() -> String {
    "America/Sao_Paulo".to_string()
}

/// FreeSWITCH Event Socket configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SwitchConfig {
    #[serde(default = "default_esl_host")]
    pub esl_host: String,

    #[serde(default = "default_esl_port")]
    pub esl_port: u16,

    #[serde(default = "default_esl_password")]
    pub esl_password: String,

    /// Upper bound for one command round-trip.
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,

    /// SIP gateway used to bridge originated calls to external numbers.
    #[serde(default = "default_gateway_name")]
    pub gateway: String,

    /// Sofia profile queried for extension registrations.
    #[serde(default = "default_registration_profile")]
    pub registration_profile: String,

    /// Caller id name shown on originated callback calls.
    #[serde(default = "default_originate_caller_name")]
    pub originate_caller_id_name: String,
}

impl Default for SwitchConfig {
    fn default() -> Self {
        Self {
            esl_host: default_esl_host(),
            esl_port: default_esl_port(),
            esl_password: default_esl_password(),
            command_timeout_secs: default_command_timeout(),
            gateway: default_gateway_name(),
            registration_profile: default_registration_profile(),
            originate_caller_id_name: default_originate_caller_name(),
        }
    }
}

fn default_esl_host() -> String {
    "127.0.0.1".to_string()
}

fn default_esl_port() -> u16 {
    8021
}

fn default_esl_password() -> String {
    "ClueCon".to_string()
}

fn default_command_timeout() -> u64 {
    10
}

fn default_gateway_name() -> String {
    "default".to_string()
}

fn default_registration_profile() -> String {
    "internal".to_string()
}

fn default_originate_caller_name() -> String {
    "Retorno".to_string()
}

/// Realtime session configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Hard admission cap per tenant.
    #[serde(default = "default_max_sessions_per_domain")]
    pub max_sessions_per_domain: usize,

    /// Sessions older than this are swept.
    #[serde(default = "default_session_timeout")]
    pub session_timeout_seconds: u64,

    /// How often the sweeper runs.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Fixed rate of the switch media stream.
    #[serde(default = "default_switch_rate")]
    pub switch_sample_rate: u32,

    /// Rate the provider expects for caller audio.
    #[serde(default = "default_provider_rate")]
    pub provider_input_rate: u32,

    /// Rate the provider produces assistant audio at.
    #[serde(default = "default_provider_rate")]
    pub provider_output_rate: u32,

    /// Audio accumulated before playback to the caller starts.
    #[serde(default = "default_output_warmup_ms")]
    pub output_warmup_ms: u32,

    /// Samples per frame sent to the switch (320 = 20 ms at 16 kHz).
    #[serde(default = "default_frame_samples")]
    pub frame_samples: usize,

    /// Capacity of the session event queue feeding the orchestrator.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_sessions_per_domain: default_max_sessions_per_domain(),
            session_timeout_seconds: default_session_timeout(),
            sweep_interval_secs: default_sweep_interval(),
            switch_sample_rate: default_switch_rate(),
            provider_input_rate: default_provider_rate(),
            provider_output_rate: default_provider_rate(),
            output_warmup_ms: default_output_warmup_ms(),
            frame_samples: default_frame_samples(),
            event_buffer: default_event_buffer(),
        }
    }
}

fn default_max_sessions_per_domain() -> usize {
    10
}

fn default_session_timeout() -> u64 {
    3600
}

fn default_sweep_interval() -> u64 {
    30
}

fn default_switch_rate() -> u32 {
    16_000
}

fn default_provider_rate() -> u32 {
    24_000
}

fn default_output_warmup_ms() -> u32 {
    600
}

fn default_frame_samples() -> usize {
    320
}

fn default_event_buffer() -> usize {
    256
}

/// AI voice provider relay configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// WebSocket URL of the provider relay. `None` disables realtime sessions.
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            url: None,
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

fn default_connect_timeout() -> u64 {
    10
}

/// Phone number normalization rules.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PhoneConfig {
    /// Prefix applied to national numbers that lack one.
    #[serde(default = "default_country_code")]
    pub default_country_code: String,

    #[serde(default = "default_min_digits")]
    pub min_digits: usize,

    #[serde(default = "default_max_digits")]
    pub max_digits: usize,

    /// Numbers this short or shorter are internal extensions.
    #[serde(default = "default_max_extension_digits")]
    pub max_extension_digits: usize,
}

impl Default for PhoneConfig {
    fn default() -> Self {
        Self {
            default_country_code: default_country_code(),
            min_digits: default_min_digits(),
            max_digits: default_max_digits(),
            max_extension_digits: default_max_extension_digits(),
        }
    }
}

fn default_country_code() -> String {
    "55".to_string()
}

fn default_min_digits() -> usize {
    8
}

fn default_max_digits() -> usize {
    15
}

fn default_max_extension_digits() -> usize {
    4
}

/// Transfer execution configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TransferConfig {
    #[serde(default = "default_context_name")]
    pub default_context: String,

    #[serde(default = "default_external_context")]
    pub external_context: String,

    #[serde(default = "default_queue_prefix")]
    pub queue_prefix: String,

    #[serde(default = "default_voicemail_prefix")]
    pub voicemail_prefix: String,

    /// Entries kept per tenant before the log is trimmed.
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,

    /// Entries retained after a trim.
    #[serde(default = "default_log_trim_to")]
    pub log_trim_to: usize,

    /// Pause between the announcement and the transfer of an attended transfer.
    #[serde(default = "default_announce_delay")]
    pub attended_announce_delay_ms: u64,

    /// Audio played to the caller before an attended transfer.
    #[serde(default = "default_announce_audio")]
    pub announce_audio: String,

    /// Department name to extension fallbacks, matched case- and accent-insensitively.
    #[serde(default = "default_department_numbers")]
    pub department_numbers: BTreeMap<String, String>,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            default_context: default_context_name(),
            external_context: default_external_context(),
            queue_prefix: default_queue_prefix(),
            voicemail_prefix: default_voicemail_prefix(),
            log_capacity: default_log_capacity(),
            log_trim_to: default_log_trim_to(),
            attended_announce_delay_ms: default_announce_delay(),
            announce_audio: default_announce_audio(),
            department_numbers: default_department_numbers(),
        }
    }
}

fn default_context_name() -> String {
    "default".to_string()
}

fn default_external_context() -> String {
    "external".to_string()
}

fn default_queue_prefix() -> String {
    "queue_".to_string()
}

fn default_voicemail_prefix() -> String {
    "*99".to_string()
}

fn default_log_capacity() -> usize {
    1000
}

fn default_log_trim_to() -> usize {
    500
}

fn default_announce_delay() -> u64 {
    2000
}

fn default_announce_audio() -> String {
    "ivr/ivr-please_hold_while_party_contacted.wav".to_string()
}

fn default_department_numbers() -> BTreeMap<String, String> {
    [
        ("vendas", "200"),
        ("sales", "200"),
        ("suporte", "300"),
        ("support", "300"),
        ("financeiro", "400"),
        ("finance", "400"),
        ("rh", "500"),
        ("hr", "500"),
        ("recepcao", "100"),
        ("reception", "100"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Destination loading configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RoutingConfig {
    /// How long a tenant's destination list is served from cache.
    #[serde(default = "default_cache_ttl")]
    pub destination_cache_ttl_secs: u64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            destination_cache_ttl_secs: default_cache_ttl(),
        }
    }
}

fn default_cache_ttl() -> u64 {
    300
}

/// Callback capture and ticket submission configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CallbackConfig {
    #[serde(default = "default_expiration_hours")]
    pub default_expiration_hours: u32,

    #[serde(default = "default_reason_max_chars")]
    pub reason_max_chars: usize,

    /// Base URL of the ticketing API. `None` disables ticket submission.
    #[serde(default)]
    pub ticket_api_url: Option<String>,

    /// Bearer token sent to the ticketing API.
    #[serde(default)]
    pub ticket_api_token: Option<String>,

    #[serde(default = "default_ticket_timeout")]
    pub ticket_timeout_secs: u64,

    /// Notification attempts before a callback is escalated to manual review.
    #[serde(default = "default_max_notifications")]
    pub max_notifications: u32,
}

impl Default for CallbackConfig {
    fn default() -> Self {
        Self {
            default_expiration_hours: default_expiration_hours(),
            reason_max_chars: default_reason_max_chars(),
            ticket_api_url: None,
            ticket_api_token: None,
            ticket_timeout_secs: default_ticket_timeout(),
            max_notifications: default_max_notifications(),
        }
    }
}

fn default_expiration_hours() -> u32 {
    24
}

fn default_reason_max_chars() -> usize {
    500
}

fn default_ticket_timeout() -> u64 {
    10
}

fn default_max_notifications() -> u32 {
    3
}

/// Outbound webhook configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookConfig {
    /// Target URL. `None` disables delivery.
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default = "default_webhook_timeout")]
    pub timeout_secs: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: default_webhook_timeout(),
        }
    }
}

fn default_webhook_timeout() -> u64 {
    10
}

/// HTTP surface configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_gateway_host")]
    pub host: String,

    #[serde(default = "default_gateway_port")]
    pub port: u16,

    #[serde(default = "default_min_call_timeout")]
    pub min_call_timeout_secs: u32,

    #[serde(default = "default_max_call_timeout")]
    pub max_call_timeout_secs: u32,

    #[serde(default = "default_call_timeout")]
    pub default_call_timeout_secs: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_gateway_host(),
            port: default_gateway_port(),
            min_call_timeout_secs: default_min_call_timeout(),
            max_call_timeout_secs: default_max_call_timeout(),
            default_call_timeout_secs: default_call_timeout(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    8085
}

fn default_min_call_timeout() -> u32 {
    10
}

fn default_max_call_timeout() -> u32 {
    120
}

fn default_call_timeout() -> u32 {
    30
}

/// Prometheus metrics configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PrometheusConfig {
    #[serde(default)]
    pub enabled: bool,
}

/// Static data for one tenant.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DomainConfig {
    pub domain_uuid: String,

    /// SIP domain name extensions register under (e.g. `acme.pbx.example`).
    #[serde(default)]
    pub domain_name: String,

    /// Tenant-local timezone, overriding `service.default_timezone`.
    #[serde(default)]
    pub timezone: Option<String>,

    #[serde(default)]
    pub destinations: Vec<TransferDestination>,

    #[serde(default)]
    pub time_conditions: Vec<TimeConditionEntry>,
}

/// A named weekly schedule as written in configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TimeConditionEntry {
    pub uuid: String,

    #[serde(default)]
    pub name: String,

    /// Falls back to the domain timezone, then `service.default_timezone`.
    #[serde(default)]
    pub timezone: Option<String>,

    /// Preset name, compact text (`0-4:08:00-18:00;5:08:00-12:00`) or JSON map.
    pub schedule: String,

    #[serde(default)]
    pub holidays: Vec<HolidayEntry>,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// A closed calendar day (`YYYY-MM-DD`).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HolidayEntry {
    pub date: String,

    #[serde(default)]
    pub name: Option<String>,
}

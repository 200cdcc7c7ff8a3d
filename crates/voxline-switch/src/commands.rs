// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command builders and reply parsers for the call-control commands in use.
//!
//! Parsers never fail: anything they do not recognize reads as the
//! conservative answer (not accepted, not registered, not in a call).

use voxline_core::types::{OriginateOutcome, OriginateRequest};

/// Longest callback reason forwarded as a channel variable.
const MAX_REASON_CHARS: usize = 100;

pub fn uuid_transfer(call_uuid: &str, destination: &str, context: &str) -> String {
    format!("uuid_transfer {call_uuid} {destination} XML {context}")
}

pub fn uuid_broadcast(call_uuid: &str, audio_path: &str) -> String {
    format!("uuid_broadcast {call_uuid} {audio_path} aleg")
}

pub fn registration_status(profile: &str, extension: &str) -> String {
    format!("sofia status profile {profile} reg {extension}")
}

pub fn show_channels() -> &'static str {
    "show channels"
}

/// `originate {vars}user/{ext}@{domain} &bridge(sofia/gateway/{gw}/{client})`.
///
/// The agent leg rings first; the client is bridged once it answers.
pub fn originate(request: &OriginateRequest, gateway: &str) -> String {
    let mut vars = vec![
        format!("origination_caller_id_number={}", request.client_number),
        format!(
            "origination_caller_id_name={}",
            sanitize_variable(&request.caller_id_name, MAX_REASON_CHARS)
        ),
        format!("domain_uuid={}", request.domain_uuid),
        "call_direction=outbound".to_string(),
        format!("call_timeout={}", request.call_timeout_secs),
    ];
    if let Some(ticket_id) = &request.ticket_id {
        vars.push(format!("ticket_id={}", sanitize_variable(ticket_id, 64)));
    }
    if let Some(reason) = &request.callback_reason {
        vars.push(format!(
            "callback_reason={}",
            sanitize_variable(reason, MAX_REASON_CHARS)
        ));
    }
    vars.push("record_session=true".to_string());

    let domain = if request.domain_name.trim().is_empty() {
        &request.domain_uuid
    } else {
        &request.domain_name
    };
    format!(
        "originate {{{}}}user/{}@{} &bridge(sofia/gateway/{}/{})",
        vars.join(","),
        request.extension,
        domain,
        gateway,
        request.client_number
    )
}

/// Strips characters that would break the `{a=b,c=d}` variable block.
fn sanitize_variable(value: &str, max_chars: usize) -> String {
    value
        .chars()
        .map(|c| match c {
            ',' | '{' | '}' | '\'' | '\n' | '\r' => ' ',
            other => other,
        })
        .take(max_chars)
        .collect::<String>()
        .trim()
        .to_string()
}

/// Whether a reply acknowledges the command.
pub fn is_ok(reply: &str) -> bool {
    reply.trim_start().starts_with("+OK")
}

/// Whether a registration listing shows the extension as registered.
pub fn parse_registered(reply: &str) -> bool {
    let upper = reply.to_uppercase();
    upper.contains("REGISTERED") && !upper.contains("UNREGISTERED")
}

/// Whether the extension appears as a whole token in the channel listing.
pub fn channels_contain(reply: &str, extension: &str) -> bool {
    if extension.is_empty() {
        return false;
    }
    reply
        .lines()
        .skip_while(|line| !line.contains(','))
        .skip(1)
        .any(|line| {
            line.split(|c: char| !c.is_ascii_alphanumeric())
                .any(|token| token == extension)
        })
}

/// Parses `+OK {uuid}` (api) or `+OK Job-UUID: {uuid}` (bgapi).
pub fn parse_originate(reply: &str) -> OriginateOutcome {
    let trimmed = reply.trim();
    if !is_ok(trimmed) {
        return OriginateOutcome {
            accepted: false,
            call_uuid: None,
            error: Some(if trimmed.is_empty() {
                "empty reply".to_string()
            } else {
                trimmed.to_string()
            }),
        };
    }
    let call_uuid = trimmed
        .lines()
        .find_map(|line| line.split_once("Job-UUID:").map(|(_, id)| id.trim()))
        .or_else(|| {
            trimmed
                .lines()
                .next()
                .and_then(|line| line.trim_start_matches("+OK").split_whitespace().next())
        })
        .filter(|id| !id.is_empty())
        .map(str::to_string);
    OriginateOutcome {
        accepted: true,
        call_uuid,
        error: None,
    }
}

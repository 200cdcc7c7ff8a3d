// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Voxline call orchestration core.

use thiserror::Error;

/// The primary error type used across all Voxline adapter traits and core operations.
///
/// Nothing here is fatal to the process: every variant describes the failure of
/// a single call, tenant request or collaborator round-trip.
#[derive(Debug, Error)]
pub enum VoxlineError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// A phone number could not be normalized into a dialable form.
    #[error("invalid phone number `{input}`: {reason}")]
    InvalidNumber { input: String, reason: String },

    /// A free-text transfer target matched no configured destination.
    #[error("Could not resolve destination: {query}")]
    UnresolvedDestination { query: String },

    /// The telephony switch rejected a command or the control connection failed.
    #[error("switch command `{command}` failed: {message}")]
    SwitchCommandFailed {
        command: String,
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The tenant already runs `limit` concurrent sessions.
    #[error("domain {domain_uuid} reached its session limit ({limit})")]
    DomainCapacityExceeded { domain_uuid: String, limit: usize },

    /// A session for this call identifier is already registered.
    #[error("session already exists for call {call_uuid}")]
    DuplicateSession { call_uuid: String },

    /// The ticketing collaborator did not confirm persistence of a callback.
    #[error("callback submission failed: {message}")]
    SubmissionFailed {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A timezone identifier could not be resolved.
    #[error("unknown timezone `{timezone}`")]
    TimezoneError { timezone: String },

    /// Tenant configuration store errors (lookup failure, malformed records).
    #[error("store error: {source}")]
    Store {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Telephony audio channel errors (socket closed, malformed frame).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// AI voice provider errors (connect failure, stream closed).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An operation was attempted from a state that does not allow it.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl VoxlineError {
    /// Shorthand for a switch failure without an underlying I/O error.
    pub fn switch(command: impl Into<String>, message: impl Into<String>) -> Self {
        VoxlineError::SwitchCommandFailed {
            command: command.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Returns true for admission-control rejections the call-originating layer
    /// should turn into a clean refusal.
    pub fn is_admission_rejection(&self) -> bool {
        matches!(
            self,
            VoxlineError::DomainCapacityExceeded { .. } | VoxlineError::DuplicateSession { .. }
        )
    }
}

// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound Event Socket client.
//!
//! One TCP connection is shared by every caller and serialized behind a
//! mutex; a command owns the connection from write until its reply frame.
//! The connection is opened lazily, dropped on any I/O failure or timeout,
//! and reopened by the next command.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::Mutex;
use voxline_config::model::SwitchConfig;
use voxline_core::types::{
    AdapterType, CommandAck, HealthStatus, OriginateOutcome, OriginateRequest,
};
use voxline_core::{PluginAdapter, SwitchControl, VoxlineError};

use crate::commands;
use crate::protocol::{self, EslFrame, constants};

/// Connection settings for one switch.
#[derive(Debug, Clone)]
pub struct EslConfig {
    pub host: String,
    pub port: u16,
    pub password: String,
    pub command_timeout: Duration,
    /// Outbound gateway used to reach external numbers.
    pub gateway: String,
    /// SIP profile queried for registrations.
    pub registration_profile: String,
}

impl EslConfig {
    pub fn from_config(config: &SwitchConfig) -> Self {
        Self {
            host: config.esl_host.clone(),
            port: config.esl_port,
            password: config.esl_password.clone(),
            command_timeout: Duration::from_secs(config.command_timeout_secs),
            gateway: config.gateway.clone(),
            registration_profile: config.registration_profile.clone(),
        }
    }
}

impl Default for EslConfig {
    fn default() -> Self {
        Self::from_config(&SwitchConfig::default())
    }
}

struct EslConnection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl EslConnection {
    async fn open(config: &EslConfig) -> Result<Self, VoxlineError> {
        let stream = TcpStream::connect((config.host.as_str(), config.port))
            .await
            .map_err(|e| io_error("connect", e))?;
        let (read, writer) = stream.into_split();
        let mut conn = Self {
            reader: BufReader::new(read),
            writer,
        };

        let greeting = conn.next_frame().await.map_err(|e| io_error("auth", e))?;
        if greeting.content_type() != Some(constants::CONTENT_TYPE_AUTH) {
            return Err(VoxlineError::switch(
                "auth",
                format!("unexpected greeting {:?}", greeting.content_type()),
            ));
        }

        let reply = conn
            .exchange(&format!("auth {}", config.password))
            .await
            .map_err(|e| io_error("auth", e))?;
        if !commands::is_ok(reply.payload()) {
            return Err(VoxlineError::switch("auth", "authentication rejected"));
        }
        tracing::info!(host = %config.host, port = config.port, "event socket connected");
        Ok(conn)
    }

    async fn next_frame(&mut self) -> io::Result<EslFrame> {
        protocol::read_frame(&mut self.reader).await?.ok_or_else(|| {
            io::Error::new(io::ErrorKind::UnexpectedEof, "event socket closed")
        })
    }

    /// Writes one command and waits for its reply, skipping unsolicited frames.
    async fn exchange(&mut self, line: &str) -> io::Result<EslFrame> {
        self.writer.write_all(&protocol::encode_command(line)).await?;
        self.writer.flush().await?;
        loop {
            let frame = self.next_frame().await?;
            match frame.content_type() {
                Some(constants::CONTENT_TYPE_REPLY) | Some(constants::CONTENT_TYPE_API) => {
                    return Ok(frame);
                }
                Some(constants::CONTENT_TYPE_DISCONNECT) => {
                    return Err(io::Error::new(
                        io::ErrorKind::ConnectionAborted,
                        "switch sent disconnect notice",
                    ));
                }
                other => tracing::debug!(content_type = ?other, "skipping unsolicited frame"),
            }
        }
    }
}

fn io_error(command: &str, e: io::Error) -> VoxlineError {
    VoxlineError::SwitchCommandFailed {
        command: command.to_string(),
        message: e.to_string(),
        source: Some(Box::new(e)),
    }
}

/// Event Socket client implementing [`SwitchControl`].
pub struct EslClient {
    config: EslConfig,
    conn: Mutex<Option<EslConnection>>,
}

impl EslClient {
    pub fn new(config: EslConfig) -> Self {
        Self {
            config,
            conn: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &EslConfig {
        &self.config
    }

    /// Runs `api {command}` and returns the response body.
    pub async fn api(&self, command: &str) -> Result<String, VoxlineError> {
        let frame = self.execute(&format!("api {command}"), command).await?;
        Ok(frame.payload().to_string())
    }

    /// Runs `bgapi {command}` and returns the reply text (`+OK Job-UUID: ...`).
    pub async fn bgapi(&self, command: &str) -> Result<String, VoxlineError> {
        let frame = self.execute(&format!("bgapi {command}"), command).await?;
        let mut reply = frame.payload().to_string();
        if let Some(job) = frame.header("Job-UUID")
            && !reply.contains("Job-UUID:")
        {
            reply = format!("{reply}\nJob-UUID: {job}");
        }
        Ok(reply)
    }

    async fn execute(&self, line: &str, label: &str) -> Result<EslFrame, VoxlineError> {
        let timeout = self.config.command_timeout;
        match tokio::time::timeout(timeout, self.execute_inner(line, label)).await {
            Ok(result) => result,
            Err(_) => {
                // The connection may hold a half-read reply.
                *self.conn.lock().await = None;
                tracing::warn!(command = label, ?timeout, "switch command timed out");
                Err(VoxlineError::Timeout { duration: timeout })
            }
        }
    }

    async fn execute_inner(&self, line: &str, label: &str) -> Result<EslFrame, VoxlineError> {
        let mut guard = self.conn.lock().await;
        let mut last_error = None;
        // One retry on a fresh connection covers a socket the switch closed
        // while idle.
        for attempt in 0..2 {
            if guard.is_none() {
                *guard = Some(EslConnection::open(&self.config).await?);
            }
            let Some(conn) = guard.as_mut() else {
                continue;
            };
            match conn.exchange(line).await {
                Ok(frame) => {
                    tracing::debug!(command = label, "switch command completed");
                    return Ok(frame);
                }
                Err(e) => {
                    tracing::warn!(command = label, attempt, error = %e, "event socket I/O failed");
                    *guard = None;
                    last_error = Some(e);
                }
            }
        }
        Err(match last_error {
            Some(e) => io_error(label, e),
            None => VoxlineError::switch(label, "no connection"),
        })
    }
}

#[async_trait]
impl PluginAdapter for EslClient {
    fn name(&self) -> &str {
        "esl"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Switch
    }

    async fn health_check(&self) -> Result<HealthStatus, VoxlineError> {
        match self.api("status").await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), VoxlineError> {
        if let Some(mut conn) = self.conn.lock().await.take() {
            let _ = conn.writer.write_all(&protocol::encode_command("exit")).await;
            let _ = conn.writer.shutdown().await;
        }
        Ok(())
    }
}

#[async_trait]
impl SwitchControl for EslClient {
    async fn uuid_transfer(
        &self,
        call_uuid: &str,
        destination: &str,
        context: &str,
    ) -> Result<CommandAck, VoxlineError> {
        let reply = self
            .api(&commands::uuid_transfer(call_uuid, destination, context))
            .await?;
        if commands::is_ok(&reply) {
            return Ok(CommandAck::accepted(reply));
        }
        tracing::warn!(call_uuid, destination, reply = %reply.trim(), "uuid_transfer refused");
        Ok(CommandAck::refused(reply))
    }

    async fn uuid_broadcast(
        &self,
        call_uuid: &str,
        audio_path: &str,
    ) -> Result<CommandAck, VoxlineError> {
        let reply = self
            .api(&commands::uuid_broadcast(call_uuid, audio_path))
            .await?;
        Ok(if commands::is_ok(&reply) {
            CommandAck::accepted(reply)
        } else {
            CommandAck::refused(reply)
        })
    }

    async fn is_registered(&self, extension: &str) -> Result<bool, VoxlineError> {
        let reply = self
            .api(&commands::registration_status(
                &self.config.registration_profile,
                extension,
            ))
            .await?;
        Ok(commands::parse_registered(&reply))
    }

    async fn has_active_call(&self, extension: &str) -> Result<bool, VoxlineError> {
        let reply = self.api(commands::show_channels()).await?;
        Ok(commands::channels_contain(&reply, extension))
    }

    async fn originate(&self, request: &OriginateRequest) -> Result<OriginateOutcome, VoxlineError> {
        let command = commands::originate(request, &self.config.gateway);
        tracing::debug!(%command, "originating callback");
        let reply = self.bgapi(&command).await?;
        let outcome = commands::parse_originate(&reply);
        tracing::info!(
            domain_uuid = %request.domain_uuid,
            extension = %request.extension,
            accepted = outcome.accepted,
            call_uuid = ?outcome.call_uuid,
            "originate submitted"
        );
        Ok(outcome)
    }
}

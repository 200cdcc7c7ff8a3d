// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event Socket wire framing.
//!
//! A frame is a block of `Name: value` header lines ended by an empty line,
//! optionally followed by a body of exactly `Content-Length` bytes.

use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

/// Protocol constants.
pub mod constants {
    pub const DEFAULT_PASSWORD: &str = "ClueCon";
    pub const CONTENT_TYPE_AUTH: &str = "auth/request";
    pub const CONTENT_TYPE_REPLY: &str = "command/reply";
    pub const CONTENT_TYPE_API: &str = "api/response";
    pub const CONTENT_TYPE_DISCONNECT: &str = "text/disconnect-notice";
    /// Largest body accepted from the switch.
    pub const MAX_BODY_BYTES: usize = 4 * 1024 * 1024;
}

/// One decoded frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EslFrame {
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl EslFrame {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("Content-Type")
    }

    pub fn reply_text(&self) -> Option<&str> {
        self.header("Reply-Text")
    }

    /// Body for `api/response`, `Reply-Text` for `command/reply`.
    pub fn payload(&self) -> &str {
        self.body
            .as_deref()
            .or_else(|| self.reply_text())
            .unwrap_or_default()
    }
}

/// Reads one frame. `Ok(None)` on a clean end of stream before any header.
pub async fn read_frame<R>(reader: &mut R) -> io::Result<Option<EslFrame>>
where
    R: AsyncBufRead + Unpin,
{
    let mut frame = EslFrame::default();
    let mut line = String::new();
    loop {
        line.clear();
        let n = reader.read_line(&mut line).await?;
        if n == 0 {
            if frame.headers.is_empty() {
                return Ok(None);
            }
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "stream closed inside a frame header",
            ));
        }
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed.is_empty() {
            // Blank lines between frames are tolerated.
            if frame.headers.is_empty() {
                continue;
            }
            break;
        }
        match trimmed.split_once(':') {
            Some((name, value)) => frame
                .headers
                .push((name.trim().to_string(), value.trim().to_string())),
            None => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("malformed header line `{trimmed}`"),
                ));
            }
        }
    }

    if let Some(length) = frame.header("Content-Length") {
        let length: usize = length.parse().map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidData, "invalid Content-Length header")
        })?;
        if length > constants::MAX_BODY_BYTES {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("body of {length} bytes exceeds limit"),
            ));
        }
        let mut body = vec![0u8; length];
        reader.read_exact(&mut body).await?;
        frame.body = Some(String::from_utf8_lossy(&body).into_owned());
    }
    Ok(Some(frame))
}

/// Encodes a command line as sent by the client.
pub fn encode_command(command: &str) -> Vec<u8> {
    format!("{}\n\n", command.trim_end()).into_bytes()
}

//! Request/response command channel.
//!
//! Every exchange with the device goes through [`CommandChannel`]. One
//! exchange is outstanding at a time; nothing is retried here.

use crate::constants::{MAX_LINE_LEN, STOP_BYTE, TIMEOUT_MS};
use crate::error::{AstroLinkError, Result};
use crate::transport::Transport;
use log::debug;
use std::time::Duration;

/// Line-oriented command channel over a [`Transport`]
pub struct CommandChannel<T: Transport> {
    transport: T,
    timeout: Duration,
}

impl<T: Transport> CommandChannel<T> {
    /// Wrap a transport with the default exchange timeout
    pub fn new(transport: T) -> Self {
        Self::with_timeout(transport, Duration::from_millis(TIMEOUT_MS))
    }

    /// Wrap a transport with a custom exchange timeout
    pub fn with_timeout(transport: T, timeout: Duration) -> Self {
        CommandChannel { transport, timeout }
    }

    /// Give the transport back, closing the channel
    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Send a command and return the validated response line.
    ///
    /// The response is accepted only if it is non-empty and its first
    /// character echoes the command opcode.
    pub fn send(&mut self, command: &str) -> Result<String> {
        let opcode = self.write_command(command)?;

        let raw = self.transport.read_until(STOP_BYTE, MAX_LINE_LEN, self.timeout)?;
        self.transport.clear()?;

        let response = String::from_utf8_lossy(&raw)
            .trim_end_matches(&['\r', '\n'][..])
            .to_string();
        debug!("RES {}", response);

        match response.chars().next() {
            None => Err(AstroLinkError::EmptyResponse),
            Some(first) if first != opcode => Err(AstroLinkError::OpcodeMismatch {
                expected: opcode,
                actual: response,
            }),
            Some(_) => Ok(response),
        }
    }

    /// Flush stale input, then write the command and its terminator.
    fn write_command(&mut self, command: &str) -> Result<char> {
        let opcode = command
            .chars()
            .next()
            .ok_or_else(|| AstroLinkError::InvalidArgument("empty command".to_string()))?;
        if command.contains(&['\n', '\r'][..]) {
            return Err(AstroLinkError::InvalidArgument(format!(
                "command {:?} contains a line terminator",
                command
            )));
        }

        self.transport.clear()?;
        debug!("CMD {}", command);

        let mut line = Vec::with_capacity(command.len() + 1);
        line.extend_from_slice(command.as_bytes());
        line.push(STOP_BYTE);
        self.transport.write_all(&line)?;
        Ok(opcode)
    }
}

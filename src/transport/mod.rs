//! Byte-stream transports the command channel runs over.

mod simulator;

pub use simulator::SimulatedTransport;

use crate::error::{AstroLinkError, Result};
use serialport::SerialPort;
use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};

/// Half-duplex byte channel to the device.
pub trait Transport: Send {
    /// Discard any pending input and output.
    fn clear(&mut self) -> Result<()>;

    /// Write all bytes and flush them out.
    fn write_all(&mut self, bytes: &[u8]) -> Result<()>;

    /// Read until `stop` is seen, `max_len` bytes arrive or `timeout` elapses.
    ///
    /// The returned bytes include the stop byte when one was read. A timeout
    /// with no bytes at all is [`AstroLinkError::Timeout`].
    fn read_until(&mut self, stop: u8, max_len: usize, timeout: Duration) -> Result<Vec<u8>>;
}

impl Transport for Box<dyn SerialPort> {
    fn clear(&mut self) -> Result<()> {
        (**self).clear(serialport::ClearBuffer::All)?;
        Ok(())
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        Write::write_all(self, bytes)?;
        Write::flush(self)?;
        Ok(())
    }

    fn read_until(&mut self, stop: u8, max_len: usize, timeout: Duration) -> Result<Vec<u8>> {
        let deadline = Instant::now() + timeout;
        let mut line = Vec::with_capacity(max_len);
        let mut byte = [0u8; 1];

        while line.len() < max_len {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            self.set_timeout(remaining)?;
            match self.read(&mut byte) {
                Ok(0) => continue,
                Ok(_) => {
                    line.push(byte[0]);
                    if byte[0] == stop {
                        return Ok(line);
                    }
                }
                Err(e) if e.kind() == ErrorKind::TimedOut => break,
                Err(e) => return Err(e.into()),
            }
        }

        if line.is_empty() || line.len() < max_len {
            return Err(AstroLinkError::Timeout);
        }
        Ok(line)
    }
}

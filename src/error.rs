//! Error types for AstroLink protocol operations.

use thiserror::Error;

/// Result type alias for AstroLink operations.
pub type Result<T> = std::result::Result<T, AstroLinkError>;

/// Error types for AstroLink 4 micro communication.
#[derive(Error, Debug)]
pub enum AstroLinkError {
    /// Serial port communication error
    #[error("Serial port error: {0}")]
    SerialPort(#[from] serialport::Error),

    /// General I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// No stop byte arrived before the exchange timeout
    #[error("Communication timeout")]
    Timeout,

    /// Device answered with an empty line
    #[error("Empty response")]
    EmptyResponse,

    /// Response opcode does not echo the command opcode
    #[error("Opcode mismatch: sent {expected:?}, got {actual:?}")]
    OpcodeMismatch {
        /// Opcode of the command that was sent
        expected: char,
        /// Full response line received
        actual: String,
    },

    /// No command channel, the session is closed
    #[error("Not connected")]
    NotConnected,

    /// Handshake answer did not identify an AstroLink 4 micro
    #[error("Device not recognized: {response:?}")]
    HandshakeMismatch {
        /// Handshake response received
        response: String,
    },

    /// A record has fewer fields than the operation needs
    #[error("Record too short: need {required} fields, got {actual}")]
    RecordTooShort {
        /// Minimum number of fields required
        required: usize,
        /// Number of fields received
        actual: usize,
    },

    /// Field parsing error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Rejected before anything was sent
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl AstroLinkError {
    /// True for failures of a single request/response exchange.
    ///
    /// Callers treat all of these the same way: the command failed and may be
    /// tried again later.
    pub fn is_comm_failure(&self) -> bool {
        matches!(
            self,
            AstroLinkError::SerialPort(_)
                | AstroLinkError::Io(_)
                | AstroLinkError::Timeout
                | AstroLinkError::EmptyResponse
                | AstroLinkError::OpcodeMismatch { .. }
                | AstroLinkError::NotConnected
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comm_failures_are_classified() {
        assert!(AstroLinkError::Timeout.is_comm_failure());
        assert!(AstroLinkError::EmptyResponse.is_comm_failure());
        let mismatch = AstroLinkError::OpcodeMismatch {
            expected: 'q',
            actual: "r".into(),
        };
        assert!(mismatch.is_comm_failure());
        assert!(!AstroLinkError::RecordTooShort { required: 23, actual: 10 }.is_comm_failure());
        let handshake = AstroLinkError::HandshakeMismatch {
            response: "#:Other".into(),
        };
        assert!(!handshake.is_comm_failure());
    }
}

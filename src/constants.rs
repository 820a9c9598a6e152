//! Protocol constants for AstroLink 4 micro communication.
//!
//! This module defines the opcodes, framing bytes, timing parameters and
//! serial port configuration used by the line protocol.

/// Line terminator appended to every command and ending every response
pub const STOP_BYTE: u8 = b'\n';

/// Field separator for status and settings records
pub const FIELD_DELIMITER: &str = ":";

/// Maximum response length read from the device
pub const MAX_LINE_LEN: usize = 250;

/// Handshake command
pub const HANDSHAKE_CMD: &str = "#";

/// Prefix a genuine device answers the handshake with
pub const HANDSHAKE_PREFIX: &str = "#:AstroLink4mini";

/// Status query
pub const STATUS_CMD: &str = "q";

/// Settings query
pub const SETTINGS_READ_CMD: &str = "u";

/// Settings write opcode, replaces field 0 of a read settings record
pub const SETTINGS_WRITE_OPCODE: &str = "U";

/// Firmware version query
pub const VERSION_CMD: &str = "A";

/// Absolute move opcode, `R:<channel>:<target>`
pub const MOVE_OPCODE: char = 'R';

/// Position sync opcode, `P:<channel>:<position>`
pub const SYNC_OPCODE: char = 'P';

/// Abort all motion
pub const ABORT_CMD: &str = "H";

/// Relay output opcode, `C:<channel>:<0|1>`
pub const RELAY_OPCODE: char = 'C';

/// PWM output opcode, `B:<channel>:<0..100>`
pub const PWM_OPCODE: char = 'B';

/// Default baud rate (38400 bps)
pub const BAUD_RATE: u32 = 38_400;

/// Per-exchange read timeout in milliseconds
pub const TIMEOUT_MS: u64 = 3_000;

/// Poll period in milliseconds
pub const POLL_INTERVAL_MS: u64 = 500;

/// Default serial device
pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";

/// Number of switchable relay outputs
pub const RELAY_COUNT: usize = 3;

/// Number of PWM outputs
pub const PWM_COUNT: usize = 2;

/// Highest accepted PWM duty cycle
pub const PWM_MAX_DUTY: u8 = 100;

//! # AstroLink 4 micro Library
//!
//! A Rust library for driving the AstroLink 4 micro focuser, power switch and
//! environment hub over its line-oriented serial protocol.
//!
//! ## Features
//!
//! - Validated request/response exchanges over any byte transport
//! - Decoding of the fixed-position status record into typed telemetry
//! - Read-modify-write of the device settings record with per-group sync status
//! - Fixed-period polling that confirms settings by reading them back
//! - A simulated device for development without hardware
//!
//! ## Example
//!
//! ```no_run
//! use astrolink4_micro::{AstroLink4Micro, DriverConfig, Focuser};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut hub = AstroLink4Micro::open(DriverConfig::with_port("/dev/ttyUSB0"))?;
//!     hub.poll_once();
//!     hub.move_relative(Focuser::One, 250)?;
//!     if let Some(status) = hub.snapshot() {
//!         println!("Focuser at {}", status.focuser(Focuser::One).position);
//!     }
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod codec;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod poller;
pub mod protocol;
pub mod settings;
pub mod status;
pub mod sync;
pub mod transport;
pub mod types;

pub use config::DriverConfig;
pub use error::{AstroLinkError, Result};
pub use events::{Event, EventSink};
pub use poller::Poller;
pub use protocol::{AstroLink4Micro, PollOutcome};
pub use settings::{FieldUpdate, FocuserMode, FocuserSettings, HubSettings, SettingsRecord};
pub use status::StatusSnapshot;
pub use sync::{GroupValues, SyncGroup, SyncStatus};
pub use transport::{SimulatedTransport, Transport};
pub use types::*;

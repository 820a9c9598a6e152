//! Notifications pushed to the property layer.

use crate::sync::{GroupValues, SyncGroup, SyncStatus};
use crate::types::{Focuser, MoveState, Reading};
use serde::Serialize;

/// State change published by the driver
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A telemetry value from the status record
    Reading { reading: Reading, value: f64 },
    /// Focuser position and motion state
    Focuser {
        focuser: Focuser,
        position: i64,
        state: MoveState,
    },
    /// Sync status of a group, with values once they are read back
    Group {
        group: SyncGroup,
        status: SyncStatus,
        values: Option<GroupValues>,
    },
}

/// Receiver of driver events.
///
/// Implemented for any `FnMut(Event)` closure, such as one forwarding into
/// an `mpsc::Sender` or pushing onto a shared vector.
pub trait EventSink: Send {
    fn publish(&mut self, event: Event);
}

impl<F> EventSink for F
where
    F: FnMut(Event) + Send,
{
    fn publish(&mut self, event: Event) {
        self(event)
    }
}

use crate::channel::CommandChannel;
use crate::config::DriverConfig;
use crate::constants::*;
use crate::error::{AstroLinkError, Result};
use crate::events::{Event, EventSink};
use crate::settings::{
    max_position_update, reverse_update, FieldUpdate, FocuserMode, FocuserSettings, HubSettings,
    SettingsRecord,
};
use crate::status::StatusSnapshot;
use crate::sync::{GroupValues, SyncGroup, SyncStatus, Synchronizer};
use crate::transport::Transport;
use crate::types::{Focuser, MoveState};
use log::{debug, error, info, warn};
use serialport::SerialPort;

/// What a poll tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// No session, nothing was sent
    NotConnected,
    Polled {
        status_updated: bool,
        settings_read: bool,
    },
}

/// Main AstroLink 4 micro interface.
///
/// Owns the only command channel, the latest status snapshot and the
/// settings sync state. Share it between the poll loop and client calls
/// through a mutex so exchanges never overlap.
pub struct AstroLink4Micro<T: Transport> {
    config: DriverConfig,
    channel: Option<CommandChannel<T>>,
    snapshot: Option<StatusSnapshot>,
    move_states: [MoveState; 2],
    sync: Synchronizer,
    sink: Box<dyn EventSink>,
}

impl AstroLink4Micro<Box<dyn SerialPort>> {
    /// Open the configured serial port and perform the handshake
    pub fn open(config: DriverConfig) -> Result<Self> {
        let port = serialport::new(&config.port, config.baud_rate)
            .timeout(config.timeout())
            .open()?;

        let mut device = AstroLink4Micro::new(config);
        device.connect(port)?;
        Ok(device)
    }

    /// List available serial ports
    pub fn list_ports() -> Result<Vec<serialport::SerialPortInfo>> {
        Ok(serialport::available_ports()?)
    }
}

impl<T: Transport> AstroLink4Micro<T> {
    /// Create a disconnected driver
    pub fn new(config: DriverConfig) -> Self {
        AstroLink4Micro {
            config,
            channel: None,
            snapshot: None,
            move_states: [MoveState::Idle; 2],
            sync: Synchronizer::new(),
            sink: Box::new(|_: Event| {}),
        }
    }

    /// Route published events to `sink`.
    ///
    /// The sink runs while the driver is borrowed, usually under the mutex the
    /// [`Poller`](crate::Poller) locks. It must not call back into the driver.
    pub fn set_event_sink(&mut self, sink: impl EventSink + 'static) {
        self.sink = Box::new(sink);
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Open a session over `transport`.
    ///
    /// The device must answer the handshake with the AstroLink 4 mini
    /// identity, otherwise no session is established.
    pub fn connect(&mut self, transport: T) -> Result<()> {
        let mut channel = CommandChannel::with_timeout(transport, self.config.timeout());
        let response = channel.send(HANDSHAKE_CMD)?;

        if !response.starts_with(HANDSHAKE_PREFIX) {
            error!("Device not recognized.");
            return Err(AstroLinkError::HandshakeMismatch { response });
        }

        info!("Handshake success");
        self.channel = Some(channel);
        self.snapshot = None;
        self.move_states = [MoveState::Idle; 2];
        self.sync = Synchronizer::new();
        Ok(())
    }

    /// Close the session and hand the transport back
    pub fn disconnect(&mut self) -> Option<T> {
        let channel = self.channel.take()?;
        info!("Disconnected");
        Some(channel.into_inner())
    }

    pub fn is_connected(&self) -> bool {
        self.channel.is_some()
    }

    /// Latest decoded status record
    pub fn snapshot(&self) -> Option<StatusSnapshot> {
        self.snapshot.clone()
    }

    /// Latest settings record read back from the device
    pub fn settings(&self) -> Option<SettingsRecord> {
        self.sync.record().copied()
    }

    pub fn move_state(&self, focuser: Focuser) -> MoveState {
        self.move_states[focuser.channel()]
    }

    pub fn sync_status(&self, group: SyncGroup) -> SyncStatus {
        self.sync.table().status(group)
    }

    /// Firmware version string, e.g. `4.8.1 micro`
    pub fn firmware_version(&mut self) -> Result<String> {
        let response = self.channel()?.send(VERSION_CMD)?;
        Ok(response
            .strip_prefix("A:")
            .unwrap_or_default()
            .trim()
            .to_string())
    }

    /// Run one poll cycle.
    ///
    /// Reads the status record, then the settings record while any settings
    /// group is unconfirmed. Failures are logged and absorbed; the previous
    /// snapshot stays in place.
    pub fn poll_once(&mut self) -> PollOutcome {
        if self.channel.is_none() {
            return PollOutcome::NotConnected;
        }

        let status_updated = match self.read_status() {
            Ok(()) => true,
            Err(e) => {
                warn!("Status poll failed: {}", e);
                false
            }
        };

        let settings_read = if self.sync.table().needs_settings_read() {
            match self.reconcile_settings() {
                Ok(()) => true,
                Err(e) => {
                    warn!("Settings poll failed: {}", e);
                    false
                }
            }
        } else {
            false
        };

        PollOutcome::Polled {
            status_updated,
            settings_read,
        }
    }

    fn read_status(&mut self) -> Result<()> {
        let response = self.channel()?.send(STATUS_CMD)?;
        let mut snapshot = StatusSnapshot::from_response(&response)?;

        for focuser in Focuser::ALL {
            let status = *snapshot.focuser(focuser);
            let state = status.move_state();
            self.move_states[focuser.channel()] = state;
            self.publish(Event::Focuser {
                focuser,
                position: status.position,
                state,
            });
        }

        match snapshot.extended.clone() {
            Some(ext) => {
                for (reading, value) in snapshot.readings() {
                    self.publish(Event::Reading { reading, value });
                }
                self.confirm_output(SyncGroup::Outputs, GroupValues::Outputs(ext.outputs));
                self.confirm_output(SyncGroup::Pwm, GroupValues::Pwm(ext.pwm));
            }
            None => {
                debug!("No extended telemetry this cycle");
                snapshot.extended = self.snapshot.as_ref().and_then(|s| s.extended.clone());
            }
        }

        self.snapshot = Some(snapshot);
        Ok(())
    }

    /// Output states are published only until they are confirmed once.
    fn confirm_output(&mut self, group: SyncGroup, values: GroupValues) {
        if self.sync.table().is_confirmed(group) {
            return;
        }
        self.sync.table_mut().confirm(group);
        self.publish(Event::Group {
            group,
            status: SyncStatus::Confirmed,
            values: Some(values),
        });
    }

    fn reconcile_settings(&mut self) -> Result<()> {
        let channel = self.channel.as_mut().ok_or(AstroLinkError::NotConnected)?;
        let confirmed = self.sync.reconcile(channel)?;
        for (group, values) in confirmed {
            self.publish(Event::Group {
                group,
                status: SyncStatus::Confirmed,
                values: Some(values),
            });
        }
        Ok(())
    }

    /// Start a move to an absolute position
    pub fn move_absolute(&mut self, focuser: Focuser, target: u32) -> Result<()> {
        if let Some(max) = self.max_position(focuser) {
            if target > max {
                return Err(AstroLinkError::InvalidArgument(format!(
                    "target {} beyond max position {} of {}",
                    target, max, focuser
                )));
            }
        }

        let command = format!("{}:{}:{}", MOVE_OPCODE, focuser.channel(), target);
        if let Err(e) = self.channel()?.send(&command) {
            warn!("Move of {} failed: {}", focuser, e);
            return Err(e);
        }

        self.move_states[focuser.channel()] = MoveState::Busy;
        let position = self
            .snapshot
            .as_ref()
            .map(|s| s.focuser(focuser).position)
            .unwrap_or_default();
        self.publish(Event::Focuser {
            focuser,
            position,
            state: MoveState::Busy,
        });
        Ok(())
    }

    /// Move by `delta` steps from the last reported position, clamped to the
    /// travel range
    pub fn move_relative(&mut self, focuser: Focuser, delta: i64) -> Result<()> {
        let current = self
            .snapshot
            .as_ref()
            .map(|s| s.focuser(focuser).position)
            .ok_or_else(|| {
                AstroLinkError::InvalidArgument(format!("position of {} not known yet", focuser))
            })?;
        let max = self.max_position(focuser).unwrap_or(u32::MAX);
        let target = current.saturating_add(delta).clamp(0, i64::from(max));
        self.move_absolute(focuser, u32::try_from(target).unwrap_or(max))
    }

    /// Stop all motion. The motion state follows the next status read.
    pub fn abort(&mut self) -> Result<()> {
        self.channel()?.send(ABORT_CMD).map(|_| ()).map_err(|e| {
            warn!("Abort failed: {}", e);
            e
        })
    }

    /// Redefine the current position of a focuser
    pub fn sync_position(&mut self, focuser: Focuser, position: u32) -> Result<()> {
        let command = format!("{}:{}:{}", SYNC_OPCODE, focuser.channel(), position);
        self.channel()?.send(&command).map(|_| ())
    }

    pub fn set_max_position(&mut self, focuser: Focuser, max_position: u32) -> Result<()> {
        self.stage(SyncGroup::MaxPosition(focuser), max_position_update(focuser, max_position))
    }

    pub fn set_reverse(&mut self, focuser: Focuser, reverse: bool) -> Result<()> {
        self.stage(SyncGroup::Reverse(focuser), reverse_update(focuser, reverse))
    }

    pub fn update_focuser_settings(
        &mut self,
        focuser: Focuser,
        settings: &FocuserSettings,
    ) -> Result<()> {
        let update = settings.to_update(focuser)?;
        self.stage(SyncGroup::FocuserSettings(focuser), update)
    }

    pub fn update_focuser_mode(&mut self, focuser: Focuser, mode: &FocuserMode) -> Result<()> {
        self.stage(SyncGroup::FocuserMode(focuser), mode.to_update(focuser))
    }

    pub fn update_hub_settings(&mut self, hub: &HubSettings) -> Result<()> {
        self.stage(SyncGroup::Hub, hub.to_update())
    }

    /// Write raw settings fields as part of `group`
    pub fn update_group(&mut self, group: SyncGroup, update: FieldUpdate) -> Result<()> {
        self.stage(group, update)
    }

    /// Switch a relay output (0-based)
    pub fn set_relay(&mut self, output: usize, on: bool) -> Result<()> {
        if output >= RELAY_COUNT {
            return Err(AstroLinkError::InvalidArgument(format!("no relay output {}", output)));
        }
        let command = format!("{}:{}:{}", RELAY_OPCODE, output, u8::from(on));
        let result = self.channel()?.send(&command);
        self.track_output(SyncGroup::Outputs, result)
    }

    /// Set a PWM output duty cycle in percent (0-based output)
    pub fn set_pwm(&mut self, output: usize, duty: u8) -> Result<()> {
        if output >= PWM_COUNT {
            return Err(AstroLinkError::InvalidArgument(format!("no PWM output {}", output)));
        }
        if duty > PWM_MAX_DUTY {
            return Err(AstroLinkError::InvalidArgument(format!(
                "duty {} above {}",
                duty, PWM_MAX_DUTY
            )));
        }
        let command = format!("{}:{}:{}", PWM_OPCODE, output, duty);
        let result = self.channel()?.send(&command);
        self.track_output(SyncGroup::Pwm, result)
    }

    fn track_output(&mut self, group: SyncGroup, result: Result<String>) -> Result<()> {
        let table = self.sync.table_mut();
        table.begin_write(group);
        match &result {
            Ok(_) => table.written(group),
            Err(e) => {
                warn!("Writing {:?} failed: {}", group, e);
                table.fail(group);
            }
        }
        let status = table.status(group);
        self.publish(Event::Group {
            group,
            status,
            values: None,
        });
        result.map(|_| ())
    }

    fn stage(&mut self, group: SyncGroup, update: FieldUpdate) -> Result<()> {
        let channel = self.channel.as_mut().ok_or(AstroLinkError::NotConnected)?;
        let result = self.sync.stage_update(channel, group, &update);
        match &result {
            Err(AstroLinkError::InvalidArgument(_)) => return result,
            Err(e) => warn!("Writing {:?} failed: {}", group, e),
            Ok(()) => {}
        }
        let status = self.sync.table().status(group);
        self.publish(Event::Group {
            group,
            status,
            values: None,
        });
        result
    }

    fn max_position(&self, focuser: Focuser) -> Option<u32> {
        self.sync.record().map(|r| r.focuser(focuser).max_position)
    }

    fn channel(&mut self) -> Result<&mut CommandChannel<T>> {
        self.channel.as_mut().ok_or(AstroLinkError::NotConnected)
    }

    fn publish(&mut self, event: Event) {
        self.sink.publish(event);
    }
}

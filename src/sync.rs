//! Settings synchronization.
//!
//! The device has no partial-write command, so every settings change reads
//! the whole record, merges the changed fields and writes the whole record
//! back. Confirmation happens later, when a poll re-reads the settings.

use crate::channel::CommandChannel;
use crate::codec;
use crate::constants::{FIELD_DELIMITER, SETTINGS_READ_CMD, SETTINGS_WRITE_OPCODE};
use crate::error::{AstroLinkError, Result};
use crate::settings::{
    field, FieldUpdate, FocuserMode, FocuserSettings, HubSettings, SettingsRecord,
};
use crate::transport::Transport;
use crate::types::Focuser;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Synchronization state of one group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncStatus {
    /// Not yet read back from the device
    Unconfirmed,
    /// Written, waiting for a read-back
    PendingWrite,
    /// Read back from the device
    Confirmed,
    /// Last write was not delivered
    Failed,
}

/// Fields that are written together and confirmed as a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SyncGroup {
    FocuserSettings(Focuser),
    FocuserMode(Focuser),
    MaxPosition(Focuser),
    Reverse(Focuser),
    Hub,
    /// Relay outputs, confirmed from the status record
    Outputs,
    /// PWM outputs, confirmed from the status record
    Pwm,
}

impl SyncGroup {
    /// Groups stored in the settings record
    pub const SETTINGS: [SyncGroup; 9] = [
        SyncGroup::FocuserSettings(Focuser::One),
        SyncGroup::FocuserSettings(Focuser::Two),
        SyncGroup::FocuserMode(Focuser::One),
        SyncGroup::FocuserMode(Focuser::Two),
        SyncGroup::MaxPosition(Focuser::One),
        SyncGroup::MaxPosition(Focuser::Two),
        SyncGroup::Reverse(Focuser::One),
        SyncGroup::Reverse(Focuser::Two),
        SyncGroup::Hub,
    ];

    /// Groups confirmed from the status record
    pub const OUTPUTS: [SyncGroup; 2] = [SyncGroup::Outputs, SyncGroup::Pwm];

    pub fn is_settings(self) -> bool {
        !matches!(self, SyncGroup::Outputs | SyncGroup::Pwm)
    }

    /// Current values of a settings group
    pub fn values_from(self, record: &SettingsRecord) -> Option<GroupValues> {
        let values = match self {
            SyncGroup::FocuserSettings(f) => {
                GroupValues::FocuserSettings(record.focuser(f).settings)
            }
            SyncGroup::FocuserMode(f) => GroupValues::FocuserMode(record.focuser(f).mode),
            SyncGroup::MaxPosition(f) => GroupValues::MaxPosition(record.focuser(f).max_position),
            SyncGroup::Reverse(f) => GroupValues::Reverse(record.focuser(f).reverse),
            SyncGroup::Hub => GroupValues::Hub(record.hub),
            SyncGroup::Outputs | SyncGroup::Pwm => return None,
        };
        Some(values)
    }
}

/// Resolved values published with a group
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GroupValues {
    FocuserSettings(FocuserSettings),
    FocuserMode(FocuserMode),
    MaxPosition(u32),
    Reverse(bool),
    Hub(HubSettings),
    Outputs([bool; 3]),
    Pwm([u8; 2]),
}

/// Per-group sync state machine.
///
/// Every group starts `Unconfirmed`. A write moves it to `PendingWrite` or
/// `Failed`; only a read-back moves it to `Confirmed`.
#[derive(Debug, Clone)]
pub struct SyncTable {
    groups: BTreeMap<SyncGroup, SyncStatus>,
}

impl SyncTable {
    pub fn new() -> Self {
        let groups = SyncGroup::SETTINGS
            .iter()
            .chain(SyncGroup::OUTPUTS.iter())
            .map(|group| (*group, SyncStatus::Unconfirmed))
            .collect();
        SyncTable { groups }
    }

    pub fn status(&self, group: SyncGroup) -> SyncStatus {
        self.groups.get(&group).copied().unwrap_or(SyncStatus::Unconfirmed)
    }

    /// A local write is being issued
    pub fn begin_write(&mut self, group: SyncGroup) {
        self.groups.insert(group, SyncStatus::Unconfirmed);
    }

    /// The write reached the device
    pub fn written(&mut self, group: SyncGroup) {
        self.groups.insert(group, SyncStatus::PendingWrite);
    }

    pub fn fail(&mut self, group: SyncGroup) {
        self.groups.insert(group, SyncStatus::Failed);
    }

    /// A read-back reflected the group
    pub fn confirm(&mut self, group: SyncGroup) {
        self.groups.insert(group, SyncStatus::Confirmed);
    }

    pub fn is_confirmed(&self, group: SyncGroup) -> bool {
        self.status(group) == SyncStatus::Confirmed
    }

    /// True while any settings group still waits for a read-back
    pub fn needs_settings_read(&self) -> bool {
        SyncGroup::SETTINGS.iter().any(|g| !self.is_confirmed(*g))
    }
}

impl Default for SyncTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-modify-write engine for the settings record
#[derive(Debug, Default)]
pub struct Synchronizer {
    table: SyncTable,
    record: Option<SettingsRecord>,
}

impl Synchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self) -> &SyncTable {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut SyncTable {
        &mut self.table
    }

    /// Last settings record read from the device
    pub fn record(&self) -> Option<&SettingsRecord> {
        self.record.as_ref()
    }

    /// Merge `update` into the device's settings record and write it back.
    ///
    /// On success the group is `PendingWrite`; on any failure it is `Failed`
    /// and nothing partial has been written.
    pub fn stage_update<T: Transport>(
        &mut self,
        channel: &mut CommandChannel<T>,
        group: SyncGroup,
        update: &FieldUpdate,
    ) -> Result<()> {
        if !group.is_settings() {
            return Err(AstroLinkError::InvalidArgument(format!(
                "{:?} is not stored in the settings record",
                group
            )));
        }
        validate(update)?;

        self.table.begin_write(group);
        match write_merged(channel, update) {
            Ok(()) => {
                self.table.written(group);
                Ok(())
            }
            Err(e) => {
                self.table.fail(group);
                Err(e)
            }
        }
    }

    /// Single-field form of [`Synchronizer::stage_update`]
    pub fn stage_field<T: Transport>(
        &mut self,
        channel: &mut CommandChannel<T>,
        group: SyncGroup,
        index: usize,
        value: impl Into<String>,
    ) -> Result<()> {
        self.stage_update(channel, group, &FieldUpdate::from([(index, value.into())]))
    }

    /// Re-read the settings if any group is unconfirmed.
    ///
    /// Every settings group that was not confirmed becomes `Confirmed` and is
    /// returned with its values as read.
    pub fn reconcile<T: Transport>(
        &mut self,
        channel: &mut CommandChannel<T>,
    ) -> Result<Vec<(SyncGroup, GroupValues)>> {
        if !self.table.needs_settings_read() {
            return Ok(Vec::new());
        }

        let response = channel.send(SETTINGS_READ_CMD)?;
        let record = SettingsRecord::from_response(&response)?;

        let mut confirmed = Vec::new();
        for group in SyncGroup::SETTINGS {
            if self.table.is_confirmed(group) {
                continue;
            }
            if let Some(values) = group.values_from(&record) {
                self.table.confirm(group);
                confirmed.push((group, values));
            }
        }
        self.record = Some(record);
        Ok(confirmed)
    }
}

/// Updates must not touch the opcode field or break the record framing
fn validate(update: &FieldUpdate) -> Result<()> {
    if update.is_empty() {
        return Err(AstroLinkError::InvalidArgument("empty settings update".to_string()));
    }
    if update.contains_key(&field::OPCODE) {
        return Err(AstroLinkError::InvalidArgument("field 0 holds the opcode".to_string()));
    }
    if let Some((index, value)) = update
        .iter()
        .find(|(_, v)| v.contains(FIELD_DELIMITER) || v.contains(&['\n', '\r'][..]))
    {
        return Err(AstroLinkError::InvalidArgument(format!(
            "value {:?} for field {} breaks the record framing",
            value, index
        )));
    }
    Ok(())
}

fn write_merged<T: Transport>(channel: &mut CommandChannel<T>, update: &FieldUpdate) -> Result<()> {
    let response = channel.send(SETTINGS_READ_CMD)?;
    let mut fields = codec::split(&response, FIELD_DELIMITER);

    let highest = update.keys().next_back().copied().unwrap_or(0);
    if fields.len() <= highest {
        return Err(AstroLinkError::RecordTooShort {
            required: highest + 1,
            actual: fields.len(),
        });
    }

    fields[field::OPCODE] = SETTINGS_WRITE_OPCODE.to_string();
    for (index, value) in update {
        fields[*index] = value.clone();
    }

    let record = codec::join(&fields, FIELD_DELIMITER);
    debug!("Writing settings record with {} fields", fields.len());
    channel.send(&record)?;
    Ok(())
}

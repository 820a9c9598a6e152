//! Settings record schema and field encoding.
//!
//! The `u` answer carries every setting in one record and the `U` command
//! takes the whole record back. Offsets count the opcode field as 0.
//! Per-focuser settings come in pairs: focuser 1 at the base offset, focuser 2
//! right after it.

use crate::codec;
use crate::constants::FIELD_DELIMITER;
use crate::error::{AstroLinkError, Result};
use crate::status::{flag, number};
use crate::types::Focuser;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Field index to new wire value, merged into a read record before writing
pub type FieldUpdate = BTreeMap<usize, String>;

/// Field offsets of the settings record
pub mod field {
    use crate::types::Focuser;

    pub const OPCODE: usize = 0;
    pub const BUZZER: usize = 1;
    pub const MANUAL: usize = 2;
    pub const CURRENT: usize = 3;
    pub const HOLD: usize = 5;
    pub const SPEED: usize = 7;
    pub const ACCELERATION: usize = 9;
    pub const MICROSTEP_MODE: usize = 11;
    pub const MAX_POSITION: usize = 13;
    pub const REVERSE: usize = 15;
    pub const STEP_SIZE: usize = 17;
    pub const COMP_STEPS: usize = 19;
    pub const COMP_TRIGGER: usize = 21;
    pub const COMP_AUTO: usize = 23;
    pub const PWM_PRESCALER: usize = 25;
    pub const OUTPUT_DEFAULT: [usize; 3] = [26, 27, 28];
    pub const PWM_DEFAULT: [usize; 2] = [29, 30];
    pub const PWM_HUMIDITY_AUTO: [usize; 2] = [31, 32];
    pub const HUMIDITY_START: usize = 33;
    pub const HUMIDITY_FULL: usize = 34;
    pub const HUMIDITY_HYSTERESIS: usize = 35;
    pub const OVERCURRENT: usize = 36;
    pub const OVERVOLTAGE: usize = 37;
    pub const OVERTIME: usize = 38;
    pub const COMP_SENSOR: usize = 40;

    /// Offset of a per-focuser field
    pub fn of(base: usize, focuser: Focuser) -> usize {
        base + focuser.channel()
    }
}

/// Fields in a complete settings record
pub const SETTINGS_LEN: usize = 41;

/// Step size is stored in hundredths of a micron
pub const STEP_SIZE_SCALE: f64 = 100.0;

/// Compensation is stored in hundredths of a step per degree
pub const COMP_STEPS_SCALE: f64 = 100.0;

/// Overcurrent limit is stored in hundredths of an amp
pub const OVERCURRENT_SCALE: f64 = 100.0;

/// Overvoltage limit is stored in millivolts
pub const OVERVOLTAGE_SCALE: f64 = 1000.0;

/// Acceleration written when none is given, as a multiple of speed
pub const ACCELERATION_PER_SPEED: u32 = 5;

/// Encode a real value as a scaled integer wire field
pub fn encode_scaled(value: f64, scale: f64) -> String {
    ((value * scale).round() as i64).to_string()
}

/// Decode a scaled integer wire field
pub fn decode_scaled(raw: &str, scale: f64) -> Result<f64> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| AstroLinkError::Parse(format!("not a number: {:?}", raw)))?;
    Ok(value / scale)
}

fn encode_flag(value: bool) -> String {
    let raw = if value { "1" } else { "0" };
    raw.to_string()
}

fn scaled(fields: &[String], index: usize, scale: f64) -> Result<f64> {
    let raw = fields.get(index).ok_or(AstroLinkError::RecordTooShort {
        required: index + 1,
        actual: fields.len(),
    })?;
    decode_scaled(raw, scale)
}

/// Motion settings of one focuser
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FocuserSettings {
    /// Motor current [%]
    pub motor_current: u32,
    /// Hold current [%]
    pub hold_current: u32,
    pub speed: u32,
    /// Defaults to five times the speed when not given
    pub acceleration: Option<u32>,
    /// Step size [µm]
    pub step_size: f64,
    /// Temperature compensation [steps/°C]
    pub compensation_steps: f64,
    /// Minimum compensation move [steps]
    pub compensation_trigger: u32,
}

impl FocuserSettings {
    /// Acceleration to write, five times the speed when not given
    pub fn acceleration(&self) -> Result<u32> {
        match self.acceleration {
            Some(acceleration) => Ok(acceleration),
            None => self.speed.checked_mul(ACCELERATION_PER_SPEED).ok_or_else(|| {
                AstroLinkError::InvalidArgument(format!("speed {} too high", self.speed))
            }),
        }
    }

    pub fn to_update(&self, focuser: Focuser) -> Result<FieldUpdate> {
        let acceleration = self.acceleration()?;
        let mut update = FieldUpdate::new();
        update.insert(field::of(field::CURRENT, focuser), self.motor_current.to_string());
        update.insert(field::of(field::HOLD, focuser), self.hold_current.to_string());
        update.insert(field::of(field::SPEED, focuser), self.speed.to_string());
        update.insert(field::of(field::ACCELERATION, focuser), acceleration.to_string());
        update.insert(
            field::of(field::STEP_SIZE, focuser),
            encode_scaled(self.step_size, STEP_SIZE_SCALE),
        );
        update.insert(
            field::of(field::COMP_STEPS, focuser),
            encode_scaled(self.compensation_steps, COMP_STEPS_SCALE),
        );
        update.insert(
            field::of(field::COMP_TRIGGER, focuser),
            self.compensation_trigger.to_string(),
        );
        Ok(update)
    }

    fn decode(fields: &[String], focuser: Focuser) -> Result<Self> {
        Ok(FocuserSettings {
            motor_current: number(fields, field::of(field::CURRENT, focuser))?,
            hold_current: number(fields, field::of(field::HOLD, focuser))?,
            speed: number(fields, field::of(field::SPEED, focuser))?,
            acceleration: Some(number(fields, field::of(field::ACCELERATION, focuser))?),
            step_size: scaled(fields, field::of(field::STEP_SIZE, focuser), STEP_SIZE_SCALE)?,
            compensation_steps: scaled(
                fields,
                field::of(field::COMP_STEPS, focuser),
                COMP_STEPS_SCALE,
            )?,
            compensation_trigger: number(fields, field::of(field::COMP_TRIGGER, focuser))?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocuserMode {
    pub microstep_mode: u32,
    pub auto_compensation: bool,
}

impl FocuserMode {
    pub fn to_update(&self, focuser: Focuser) -> FieldUpdate {
        let mut update = FieldUpdate::new();
        update.insert(field::of(field::MICROSTEP_MODE, focuser), self.microstep_mode.to_string());
        update.insert(field::of(field::COMP_AUTO, focuser), encode_flag(self.auto_compensation));
        update
    }

    fn decode(fields: &[String], focuser: Focuser) -> Result<Self> {
        Ok(FocuserMode {
            microstep_mode: number(fields, field::of(field::MICROSTEP_MODE, focuser))?,
            auto_compensation: flag(fields, field::of(field::COMP_AUTO, focuser))?,
        })
    }
}

/// Settings not tied to a focuser
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HubSettings {
    pub buzzer: bool,
    pub manual_mode: bool,
    pub pwm_prescaler: u32,
    pub output_defaults: [bool; 3],
    pub pwm_defaults: [u8; 2],
    pub pwm_humidity_auto: [bool; 2],
    /// Humidity [%] where dew heaters start
    pub humidity_start: u32,
    /// Humidity [%] where dew heaters run at full power
    pub humidity_full: u32,
    pub humidity_hysteresis: u32,
    /// [A]
    pub overcurrent_limit: f64,
    /// [V]
    pub overvoltage_limit: f64,
    /// [ms]
    pub overtime_limit: u32,
    pub compensation_sensor: u32,
}

impl HubSettings {
    pub fn to_update(&self) -> FieldUpdate {
        let mut update = FieldUpdate::new();
        update.insert(field::BUZZER, encode_flag(self.buzzer));
        update.insert(field::MANUAL, encode_flag(self.manual_mode));
        update.insert(field::PWM_PRESCALER, self.pwm_prescaler.to_string());
        for (index, on) in field::OUTPUT_DEFAULT.iter().zip(self.output_defaults) {
            update.insert(*index, encode_flag(on));
        }
        for (index, duty) in field::PWM_DEFAULT.iter().zip(self.pwm_defaults) {
            update.insert(*index, duty.to_string());
        }
        for (index, auto) in field::PWM_HUMIDITY_AUTO.iter().zip(self.pwm_humidity_auto) {
            update.insert(*index, encode_flag(auto));
        }
        update.insert(field::HUMIDITY_START, self.humidity_start.to_string());
        update.insert(field::HUMIDITY_FULL, self.humidity_full.to_string());
        update.insert(field::HUMIDITY_HYSTERESIS, self.humidity_hysteresis.to_string());
        update.insert(field::OVERCURRENT, encode_scaled(self.overcurrent_limit, OVERCURRENT_SCALE));
        update.insert(field::OVERVOLTAGE, encode_scaled(self.overvoltage_limit, OVERVOLTAGE_SCALE));
        update.insert(field::OVERTIME, self.overtime_limit.to_string());
        update.insert(field::COMP_SENSOR, self.compensation_sensor.to_string());
        update
    }

    fn decode(fields: &[String]) -> Result<Self> {
        Ok(HubSettings {
            buzzer: flag(fields, field::BUZZER)?,
            manual_mode: flag(fields, field::MANUAL)?,
            pwm_prescaler: number(fields, field::PWM_PRESCALER)?,
            output_defaults: [
                flag(fields, field::OUTPUT_DEFAULT[0])?,
                flag(fields, field::OUTPUT_DEFAULT[1])?,
                flag(fields, field::OUTPUT_DEFAULT[2])?,
            ],
            pwm_defaults: [
                number(fields, field::PWM_DEFAULT[0])?,
                number(fields, field::PWM_DEFAULT[1])?,
            ],
            pwm_humidity_auto: [
                flag(fields, field::PWM_HUMIDITY_AUTO[0])?,
                flag(fields, field::PWM_HUMIDITY_AUTO[1])?,
            ],
            humidity_start: number(fields, field::HUMIDITY_START)?,
            humidity_full: number(fields, field::HUMIDITY_FULL)?,
            humidity_hysteresis: number(fields, field::HUMIDITY_HYSTERESIS)?,
            overcurrent_limit: scaled(fields, field::OVERCURRENT, OVERCURRENT_SCALE)?,
            overvoltage_limit: scaled(fields, field::OVERVOLTAGE, OVERVOLTAGE_SCALE)?,
            overtime_limit: number(fields, field::OVERTIME)?,
            compensation_sensor: number(fields, field::COMP_SENSOR)?,
        })
    }
}

/// Everything the device stores about one focuser
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FocuserRecord {
    pub settings: FocuserSettings,
    pub mode: FocuserMode,
    pub max_position: u32,
    pub reverse: bool,
}

/// One decoded settings record
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SettingsRecord {
    pub focusers: [FocuserRecord; 2],
    pub hub: HubSettings,
}

impl SettingsRecord {
    /// Decode a full `u` response line
    pub fn from_response(line: &str) -> Result<Self> {
        Self::decode(&codec::split(line, FIELD_DELIMITER))
    }

    /// Decode settings fields, opcode field included
    pub fn decode(fields: &[String]) -> Result<Self> {
        if fields.len() < SETTINGS_LEN {
            return Err(AstroLinkError::RecordTooShort {
                required: SETTINGS_LEN,
                actual: fields.len(),
            });
        }
        let focuser = |f: Focuser| -> Result<FocuserRecord> {
            Ok(FocuserRecord {
                settings: FocuserSettings::decode(fields, f)?,
                mode: FocuserMode::decode(fields, f)?,
                max_position: number(fields, field::of(field::MAX_POSITION, f))?,
                reverse: flag(fields, field::of(field::REVERSE, f))?,
            })
        };
        Ok(SettingsRecord {
            focusers: [focuser(Focuser::One)?, focuser(Focuser::Two)?],
            hub: HubSettings::decode(fields)?,
        })
    }

    pub fn focuser(&self, focuser: Focuser) -> &FocuserRecord {
        &self.focusers[focuser.channel()]
    }
}

/// Single-field update to the max position of a focuser
pub fn max_position_update(focuser: Focuser, max_position: u32) -> FieldUpdate {
    FieldUpdate::from([(field::of(field::MAX_POSITION, focuser), max_position.to_string())])
}

/// Single-field update to the reverse flag of a focuser
pub fn reverse_update(focuser: Focuser, reverse: bool) -> FieldUpdate {
    FieldUpdate::from([(field::of(field::REVERSE, focuser), encode_flag(reverse))])
}

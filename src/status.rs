//! Status record decoding.
//!
//! The `q` answer is a fixed-position record. Field offsets below are counted
//! after the leading opcode field has been dropped, so offset 0 is the device
//! code. They are a contract with the firmware and live only in this module.

use crate::codec;
use crate::constants::FIELD_DELIMITER;
use crate::error::{AstroLinkError, Result};
use crate::types::{Focuser, MoveState, Reading};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Field offsets of the status record
pub mod field {
    pub const DEVICE_CODE: usize = 0;
    pub const POSITION: [usize; 2] = [1, 3];
    pub const STEPS_TO_GO: [usize; 2] = [2, 4];
    pub const TOTAL_CURRENT: usize = 5;
    pub const SENS1_PRESENT: usize = 6;
    pub const SENS1_TEMP: usize = 7;
    pub const SENS1_HUM: usize = 8;
    pub const SENS1_DEW: usize = 9;
    pub const SENS2_PRESENT: usize = 10;
    pub const SENS2_TEMP: usize = 11;
    pub const PWM: [usize; 2] = [12, 13];
    pub const OUTPUT: [usize; 3] = [14, 15, 16];
    pub const VIN: usize = 17;
    pub const VREG: usize = 18;
    pub const AMP_HOURS: usize = 19;
    pub const WATT_HOURS: usize = 20;
    pub const DEW_AUTO: [usize; 2] = [21, 22];
    pub const PROTECTION_ALARM: usize = 23;
    pub const SKY_PRESENT: usize = 25;
    pub const SKY_TEMP: usize = 26;
    pub const SKY_AMBIENT: usize = 27;
    pub const SQM_PRESENT: usize = 32;
    pub const SQM: usize = 33;
}

/// Fields needed for both focuser blocks
pub const FOCUSER_BLOCK_LEN: usize = 5;

/// Fields needed for sensors, outputs and power data
pub const EXTENDED_BLOCK_LEN: usize = 24;

/// Fields needed for the sky sensors
pub const SKY_BLOCK_LEN: usize = 34;

/// Position and remaining travel of one focuser
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FocuserStatus {
    pub position: i64,
    pub steps_to_go: i64,
}

impl FocuserStatus {
    pub fn move_state(&self) -> MoveState {
        MoveState::from_steps_to_go(self.steps_to_go)
    }
}

/// Temperature/humidity probe. Readings are zero whenever the probe is absent.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ClimateSensor {
    pub present: bool,
    pub temperature: f64,
    pub humidity: f64,
    pub dew_point: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SkyTelemetry {
    pub sky_sensor_present: bool,
    pub sky_temperature: f64,
    pub ambient_temperature: f64,
    pub brightness_sensor_present: bool,
    /// Sky quality in mag/arcsec²
    pub brightness: f64,
}

/// Everything past the focuser block
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExtendedTelemetry {
    pub total_current: f64,
    pub sensor1: ClimateSensor,
    pub sensor2: ClimateSensor,
    pub pwm: [u8; 2],
    pub outputs: [bool; 3],
    pub input_voltage: f64,
    pub regulated_voltage: f64,
    pub amp_hours: f64,
    pub watt_hours: f64,
    pub dew_auto: [bool; 2],
    pub protection_alarm: bool,
    pub sky: Option<SkyTelemetry>,
}

/// One decoded status record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub device_code: String,
    pub focusers: [FocuserStatus; 2],
    /// `None` when the device did not report extended telemetry this cycle
    pub extended: Option<ExtendedTelemetry>,
    pub received_at: DateTime<Utc>,
}

impl StatusSnapshot {
    /// Decode a full `q` response line
    pub fn from_response(line: &str) -> Result<Self> {
        let fields = codec::split(line, FIELD_DELIMITER);
        Self::decode(fields.get(1..).unwrap_or_default())
    }

    /// Decode status fields with the opcode field already dropped.
    ///
    /// Too few fields for the focuser block is an error. Missing extended or
    /// sky blocks are skipped.
    pub fn decode(fields: &[String]) -> Result<Self> {
        if fields.len() < FOCUSER_BLOCK_LEN {
            return Err(AstroLinkError::RecordTooShort {
                required: FOCUSER_BLOCK_LEN,
                actual: fields.len(),
            });
        }

        let mut focusers = [FocuserStatus::default(); 2];
        for focuser in Focuser::ALL {
            let ch = focuser.channel();
            focusers[ch] = FocuserStatus {
                position: number(fields, field::POSITION[ch])?,
                steps_to_go: number(fields, field::STEPS_TO_GO[ch])?,
            };
        }

        let extended = if fields.len() >= EXTENDED_BLOCK_LEN {
            Some(decode_extended(fields)?)
        } else {
            None
        };

        Ok(StatusSnapshot {
            device_code: fields[field::DEVICE_CODE].clone(),
            focusers,
            extended,
            received_at: Utc::now(),
        })
    }

    pub fn focuser(&self, focuser: Focuser) -> &FocuserStatus {
        &self.focusers[focuser.channel()]
    }

    /// Published telemetry values, empty without extended telemetry
    pub fn readings(&self) -> Vec<(Reading, f64)> {
        let ext = match &self.extended {
            Some(ext) => ext,
            None => return Vec::new(),
        };

        let mut readings = vec![
            (Reading::TotalCurrent, ext.total_current),
            (Reading::InputVoltage, ext.input_voltage),
            (Reading::RegulatedVoltage, ext.regulated_voltage),
            (Reading::AmpHours, ext.amp_hours),
            (Reading::WattHours, ext.watt_hours),
            (Reading::Sensor1Temperature, ext.sensor1.temperature),
            (Reading::Sensor1Humidity, ext.sensor1.humidity),
            (Reading::Sensor1DewPoint, ext.sensor1.dew_point),
            (Reading::Sensor2Temperature, ext.sensor2.temperature),
            (Reading::ProtectionAlarm, if ext.protection_alarm { 1.0 } else { 0.0 }),
        ];
        if let Some(sky) = &ext.sky {
            readings.push((Reading::SkyTemperature, sky.sky_temperature));
            readings.push((Reading::SkyAmbientTemperature, sky.ambient_temperature));
            readings.push((Reading::SkyBrightness, sky.brightness));
        }
        readings
    }
}

fn decode_extended(fields: &[String]) -> Result<ExtendedTelemetry> {
    let sensor1_present = flag(fields, field::SENS1_PRESENT)?;
    let sensor2_present = flag(fields, field::SENS2_PRESENT)?;

    let sensor1 = ClimateSensor {
        present: sensor1_present,
        temperature: gated(sensor1_present, fields, field::SENS1_TEMP)?,
        humidity: gated(sensor1_present, fields, field::SENS1_HUM)?,
        dew_point: gated(sensor1_present, fields, field::SENS1_DEW)?,
    };
    let sensor2 = ClimateSensor {
        present: sensor2_present,
        temperature: gated(sensor2_present, fields, field::SENS2_TEMP)?,
        ..ClimateSensor::default()
    };

    let sky = if fields.len() >= SKY_BLOCK_LEN {
        let sky_present = flag(fields, field::SKY_PRESENT)?;
        let sqm_present = flag(fields, field::SQM_PRESENT)?;
        Some(SkyTelemetry {
            sky_sensor_present: sky_present,
            sky_temperature: gated(sky_present, fields, field::SKY_TEMP)?,
            ambient_temperature: gated(sky_present, fields, field::SKY_AMBIENT)?,
            brightness_sensor_present: sqm_present,
            brightness: gated(sqm_present, fields, field::SQM)?,
        })
    } else {
        None
    };

    Ok(ExtendedTelemetry {
        total_current: number(fields, field::TOTAL_CURRENT)?,
        sensor1,
        sensor2,
        pwm: [number(fields, field::PWM[0])?, number(fields, field::PWM[1])?],
        outputs: [
            flag(fields, field::OUTPUT[0])?,
            flag(fields, field::OUTPUT[1])?,
            flag(fields, field::OUTPUT[2])?,
        ],
        input_voltage: number(fields, field::VIN)?,
        regulated_voltage: number(fields, field::VREG)?,
        amp_hours: number(fields, field::AMP_HOURS)?,
        watt_hours: number(fields, field::WATT_HOURS)?,
        dew_auto: [flag(fields, field::DEW_AUTO[0])?, flag(fields, field::DEW_AUTO[1])?],
        protection_alarm: flag(fields, field::PROTECTION_ALARM)?,
        sky,
    })
}

/// Parse the field at `index`
pub(crate) fn number<T: FromStr>(fields: &[String], index: usize) -> Result<T> {
    let raw = fields.get(index).ok_or(AstroLinkError::RecordTooShort {
        required: index + 1,
        actual: fields.len(),
    })?;
    raw.trim()
        .parse()
        .map_err(|_| AstroLinkError::Parse(format!("field {} is not a number: {:?}", index, raw)))
}

/// Numeric 0/1 flag, any non-zero value counts as set
pub(crate) fn flag(fields: &[String], index: usize) -> Result<bool> {
    Ok(number::<f64>(fields, index)? != 0.0)
}

/// A reading whose sensor is absent is reset to zero instead of parsed
fn gated(present: bool, fields: &[String], index: usize) -> Result<f64> {
    if present {
        number(fields, index)
    } else {
        Ok(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REFERENCE: &str = "q:AL4MIC:4671:0:0:0:0.43:1:23.1:45.4:9.7:1:13.3:40:31:0:0:1:12.1:7.9:12.1:144.7:0:0:0:0:1:-4.1:18.5:1:34.1:88.9:4.7:1:19.77";

    fn with_field(line: &str, index: usize, value: &str) -> String {
        let mut fields = codec::split(line, FIELD_DELIMITER);
        fields[index + 1] = value.to_string();
        fields.join(FIELD_DELIMITER)
    }

    #[test]
    fn decodes_reference_line() {
        let snapshot = StatusSnapshot::from_response(REFERENCE).unwrap();
        assert_eq!(snapshot.device_code, "AL4MIC");
        assert_eq!(snapshot.focuser(Focuser::One).position, 4671);
        assert_eq!(snapshot.focuser(Focuser::One).move_state(), MoveState::Idle);

        let ext = snapshot.extended.unwrap();
        assert_eq!(ext.total_current, 0.43);
        assert_eq!(ext.sensor1.temperature, 23.1);
        assert_eq!(ext.sensor1.humidity, 45.4);
        assert_eq!(ext.sensor1.dew_point, 9.7);
        assert_eq!(ext.sensor2.temperature, 13.3);
        assert_eq!(ext.pwm, [40, 31]);
        assert_eq!(ext.outputs, [false, false, true]);
        assert_eq!(ext.input_voltage, 12.1);
        assert_eq!(ext.regulated_voltage, 7.9);
        assert_eq!(ext.watt_hours, 144.7);

        let sky = ext.sky.unwrap();
        assert_eq!(sky.sky_temperature, -4.1);
        assert_eq!(sky.ambient_temperature, 18.5);
        assert_eq!(sky.brightness, 19.77);
    }

    #[test]
    fn steps_to_go_drives_move_state() {
        let busy = StatusSnapshot::from_response("q:AL4MIC:4671:120:0:0").unwrap();
        assert_eq!(busy.focuser(Focuser::One).move_state(), MoveState::Busy);
        assert_eq!(busy.focuser(Focuser::Two).move_state(), MoveState::Idle);
    }

    #[test]
    fn absent_sensor_reads_zero() {
        let line = with_field(REFERENCE, field::SENS1_PRESENT, "0");
        let ext = StatusSnapshot::from_response(&line).unwrap().extended.unwrap();
        assert!(!ext.sensor1.present);
        assert_eq!(ext.sensor1.temperature, 0.0);
        assert_eq!(ext.sensor1.humidity, 0.0);
        assert_eq!(ext.sensor1.dew_point, 0.0);
        assert_eq!(ext.sensor2.temperature, 13.3);

        let line = with_field(REFERENCE, field::SQM_PRESENT, "0");
        let sky = StatusSnapshot::from_response(&line).unwrap().extended.unwrap().sky.unwrap();
        assert_eq!(sky.brightness, 0.0);
        assert_eq!(sky.sky_temperature, -4.1);
    }

    #[test]
    fn absent_sensor_ignores_garbage_reading() {
        let absent = with_field(REFERENCE, field::SENS2_PRESENT, "0");
        let line = with_field(&absent, field::SENS2_TEMP, "n/a");
        let ext = StatusSnapshot::from_response(&line).unwrap().extended.unwrap();
        assert_eq!(ext.sensor2.temperature, 0.0);
    }

    #[test]
    fn short_record_skips_extended_block() {
        let snapshot = StatusSnapshot::from_response("q:AL4MIC:100:5:0:0:0.43:1:23.1").unwrap();
        assert_eq!(snapshot.focuser(Focuser::One).position, 100);
        assert_eq!(snapshot.focuser(Focuser::One).steps_to_go, 5);
        assert!(snapshot.extended.is_none());
        assert!(snapshot.readings().is_empty());
    }

    #[test]
    fn record_without_sky_block() {
        let fields: Vec<String> = codec::split(REFERENCE, FIELD_DELIMITER);
        let line = fields[..=EXTENDED_BLOCK_LEN].join(FIELD_DELIMITER);
        let ext = StatusSnapshot::from_response(&line).unwrap().extended.unwrap();
        assert!(ext.sky.is_none());
        assert_eq!(ext.outputs, [false, false, true]);
    }

    #[test]
    fn truncated_focuser_block_is_an_error() {
        assert!(matches!(
            StatusSnapshot::from_response("q:AL4MIC:4671"),
            Err(AstroLinkError::RecordTooShort { required: 5, actual: 2 })
        ));
        assert!(matches!(
            StatusSnapshot::from_response("q:AL4MIC:abc:0:0:0"),
            Err(AstroLinkError::Parse(_))
        ));
    }

    #[test]
    fn readings_use_wire_names() {
        let snapshot = StatusSnapshot::from_response(REFERENCE).unwrap();
        let readings = snapshot.readings();
        assert!(readings.contains(&(Reading::InputVoltage, 12.1)));
        assert!(readings.contains(&(Reading::SkyBrightness, 19.77)));
        assert_eq!(Reading::TotalCurrent.name(), "ITOT");
    }
}

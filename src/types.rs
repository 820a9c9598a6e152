use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the two stepper channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Focuser {
    One,
    Two,
}

impl Focuser {
    pub const ALL: [Focuser; 2] = [Focuser::One, Focuser::Two];

    /// Channel number used on the wire and as the pair offset in records
    pub fn channel(self) -> usize {
        match self {
            Focuser::One => 0,
            Focuser::Two => 1,
        }
    }
}

impl fmt::Display for Focuser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "focuser {}", self.channel() + 1)
    }
}

/// Motion state of a focuser, driven by the reported steps-to-go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveState {
    Idle,
    Busy,
}

impl MoveState {
    /// Zero steps-to-go is the only completion signal
    pub fn from_steps_to_go(steps_to_go: i64) -> Self {
        if steps_to_go == 0 {
            MoveState::Idle
        } else {
            MoveState::Busy
        }
    }
}

/// Named telemetry values published from the status record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Reading {
    TotalCurrent,
    InputVoltage,
    RegulatedVoltage,
    AmpHours,
    WattHours,
    Sensor1Temperature,
    Sensor1Humidity,
    Sensor1DewPoint,
    Sensor2Temperature,
    ProtectionAlarm,
    SkyTemperature,
    SkyAmbientTemperature,
    SkyBrightness,
}

impl Reading {
    /// Stable field name for the property layer
    pub fn name(self) -> &'static str {
        match self {
            Reading::TotalCurrent => "ITOT",
            Reading::InputVoltage => "VIN",
            Reading::RegulatedVoltage => "REG",
            Reading::AmpHours => "AH",
            Reading::WattHours => "WH",
            Reading::Sensor1Temperature => "SENS1_TEMP",
            Reading::Sensor1Humidity => "SENS1_HUM",
            Reading::Sensor1DewPoint => "SENS1_DEW",
            Reading::Sensor2Temperature => "SENS2_TEMP",
            Reading::ProtectionAlarm => "ALARM",
            Reading::SkyTemperature => "SKY_TEMP",
            Reading::SkyAmbientTemperature => "SKY_AMBIENT",
            Reading::SkyBrightness => "SKY_SQM",
        }
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

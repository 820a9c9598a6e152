//! In-memory stand-in for an AstroLink 4 micro.
//!
//! Answers every opcode with the canned lines of a reference unit and keeps
//! enough state to behave like one: written settings are read back, relays
//! and PWM outputs show up in the next status line, and a move takes one
//! status poll to complete.

use super::Transport;
use crate::codec;
use crate::constants::FIELD_DELIMITER;
use crate::error::{AstroLinkError, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

const STATUS_LINE: &str = "q:AL4MIC:4671:0:0:0:0.43:1:23.1:45.4:9.7:1:13.3:40:31:0:0:1:12.1:7.9:12.1:144.7:0:0:0:0:1:-4.1:18.5:1:34.1:88.9:4.7:1:19.77";
const SETTINGS_LINE: &str = "u:1:1:80:120:30:50:200:800:200:800:0:2:10000:80000:0:0:50:18:30:15:5:10:10:0:1:0:0:0:0:0:0:0:40:90:10:1100:14000:10000:100:0";
const HANDSHAKE_LINE: &str = "#:AstroLink4mini";
const VERSION_LINE: &str = "A:4.8.1 micro";

// Offsets into the full status split, opcode included.
const STATUS_POSITION: [usize; 2] = [2, 4];
const STATUS_STEPS_TO_GO: [usize; 2] = [3, 5];
const STATUS_PWM: usize = 13;
const STATUS_OUTPUT: usize = 15;

#[derive(Debug)]
struct SimulatorState {
    status: Vec<String>,
    settings: Vec<String>,
    targets: [i64; 2],
    overrides: HashMap<char, Option<String>>,
    pending: Option<Vec<u8>>,
    written: Vec<String>,
}

/// Simulated device transport.
///
/// Clones share one device, so a test can keep a handle for scripting and
/// inspection after the transport has been moved into a driver.
#[derive(Debug, Clone)]
pub struct SimulatedTransport {
    state: Arc<Mutex<SimulatorState>>,
}

impl SimulatedTransport {
    /// Create a simulator seeded with the reference unit's records
    pub fn new() -> Self {
        let status = codec::split(STATUS_LINE, FIELD_DELIMITER);
        let targets = [
            status[STATUS_POSITION[0]].parse().unwrap_or(0),
            status[STATUS_POSITION[1]].parse().unwrap_or(0),
        ];
        SimulatedTransport {
            state: Arc::new(Mutex::new(SimulatorState {
                status,
                settings: codec::split(SETTINGS_LINE, FIELD_DELIMITER),
                targets,
                overrides: HashMap::new(),
                pending: None,
                written: Vec::new(),
            })),
        }
    }

    /// Always answer commands starting with `opcode` with `line`
    pub fn set_response(&self, opcode: char, line: &str) {
        self.lock().overrides.insert(opcode, Some(line.to_string()));
    }

    /// Never answer commands starting with `opcode`, so they time out
    pub fn set_silent(&self, opcode: char) {
        self.lock().overrides.insert(opcode, None);
    }

    /// Replace the settings record the device reports
    pub fn set_settings_line(&self, line: &str) {
        self.lock().settings = codec::split(line, FIELD_DELIMITER);
    }

    /// Replace the status record the device reports
    pub fn set_status_line(&self, line: &str) {
        self.lock().status = codec::split(line, FIELD_DELIMITER);
    }

    /// Commands written so far, without terminators
    pub fn written(&self) -> Vec<String> {
        self.lock().written.clone()
    }

    /// Forget the command history
    pub fn clear_written(&self) {
        self.lock().written.clear();
    }

    fn lock(&self) -> MutexGuard<'_, SimulatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SimulatedTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatorState {
    fn respond(&mut self, command: &str) -> Option<String> {
        let opcode = command.chars().next()?;
        if let Some(scripted) = self.overrides.get(&opcode) {
            return scripted.clone();
        }

        let args = codec::split(command, FIELD_DELIMITER);
        let channel = |i: usize| args.get(i).and_then(|a| a.parse::<usize>().ok());
        let value = |i: usize| args.get(i).and_then(|a| a.parse::<i64>().ok());

        match opcode {
            '#' => Some(HANDSHAKE_LINE.to_string()),
            'A' => Some(VERSION_LINE.to_string()),
            'q' => {
                let line = self.status.join(FIELD_DELIMITER);
                self.settle_moves();
                Some(line)
            }
            'u' => Some(self.settings.join(FIELD_DELIMITER)),
            'U' => {
                let mut record = args.clone();
                record[0] = "u".to_string();
                self.settings = record;
                Some("U:".to_string())
            }
            'R' => {
                let (ch, target) = (channel(1)?, value(2)?);
                let position = self.status_value(*STATUS_POSITION.get(ch)?);
                self.targets[ch] = target;
                self.set_status(STATUS_STEPS_TO_GO[ch], (target - position).abs());
                Some("R:".to_string())
            }
            'P' => {
                let (ch, position) = (channel(1)?, value(2)?);
                self.set_status(*STATUS_POSITION.get(ch)?, position);
                self.targets[ch] = position;
                Some("P:".to_string())
            }
            'H' => {
                for ch in 0..STATUS_STEPS_TO_GO.len() {
                    let position = self.status_value(STATUS_POSITION[ch]);
                    self.set_status(STATUS_STEPS_TO_GO[ch], 0);
                    self.targets[ch] = position;
                }
                Some("H:".to_string())
            }
            'C' => {
                let (ch, on) = (channel(1)?, value(2)?);
                self.set_status(STATUS_OUTPUT + ch, on);
                Some("C:".to_string())
            }
            'B' => {
                let (ch, duty) = (channel(1)?, value(2)?);
                self.set_status(STATUS_PWM + ch, duty);
                Some("B:".to_string())
            }
            _ => None,
        }
    }

    /// Moves reported busy by one status line are finished by the next.
    fn settle_moves(&mut self) {
        for ch in 0..STATUS_POSITION.len() {
            if self.status_value(STATUS_STEPS_TO_GO[ch]) != 0 {
                self.set_status(STATUS_POSITION[ch], self.targets[ch]);
                self.set_status(STATUS_STEPS_TO_GO[ch], 0);
            }
        }
    }

    fn set_status(&mut self, index: usize, value: i64) {
        if let Some(field) = self.status.get_mut(index) {
            *field = value.to_string();
        }
    }

    fn status_value(&self, index: usize) -> i64 {
        self.status.get(index).and_then(|v| v.parse().ok()).unwrap_or(0)
    }
}

impl Transport for SimulatedTransport {
    fn clear(&mut self) -> Result<()> {
        self.lock().pending = None;
        Ok(())
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let text = String::from_utf8_lossy(bytes);
        let command = text.trim_end_matches(&['\r', '\n'][..]).to_string();
        let mut state = self.lock();
        let response = state.respond(&command);
        state.pending = response.map(|mut line| {
            line.push('\n');
            line.into_bytes()
        });
        state.written.push(command);
        Ok(())
    }

    fn read_until(&mut self, _stop: u8, max_len: usize, _timeout: Duration) -> Result<Vec<u8>> {
        match self.lock().pending.take() {
            Some(mut line) => {
                line.truncate(max_len);
                Ok(line)
            }
            None => Err(AstroLinkError::Timeout),
        }
    }
}

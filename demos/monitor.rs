//! Monitor Example
//!
//! Connects to an AstroLink 4 micro, polls it in the background and prints
//! every published event as JSON. After a few seconds it nudges focuser 1 and
//! toggles relay output 1 so the sync states can be watched converging.
//!
//! Usage:
//!   cargo run --example monitor                      # Interactive mode
//!   cargo run --example monitor -- /dev/ttyUSB0      # Specify port
//!   cargo run --example monitor -- --simulate        # No hardware needed
//!
//! Set RUST_LOG environment variable to control logging:
//!   RUST_LOG=debug cargo run --example monitor -- --simulate

use astrolink4_micro::{
    AstroLink4Micro, DriverConfig, Event, Focuser, Poller, Result, SimulatedTransport, Transport,
};
use inquire::Select;
use log::{info, warn};
use serialport::SerialPort;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Interactive serial port selection using inquire
fn select_port() -> Result<String> {
    let ports = AstroLink4Micro::<Box<dyn SerialPort>>::list_ports()?;

    if ports.is_empty() {
        eprintln!("No serial ports found!");
        std::process::exit(1);
    }

    let port_names: Vec<String> = ports
        .iter()
        .map(|p| format!("{} - {:?}", p.port_name, p.port_type))
        .collect();

    let selection = Select::new("Select a serial port:", port_names)
        .prompt()
        .map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Selection cancelled: {}", e),
            )
        })?;

    let port_name = selection.split(" - ").next().unwrap_or_default().to_string();
    Ok(port_name)
}

fn print_event(event: Event) {
    match serde_json::to_string(&event) {
        Ok(line) => println!("{}", line),
        Err(e) => warn!("Could not encode event: {}", e),
    }
}

fn run<T: Transport + 'static>(mut hub: AstroLink4Micro<T>) -> Result<()> {
    hub.set_event_sink(print_event);
    let interval = hub.config().poll_interval();

    match hub.firmware_version() {
        Ok(version) => info!("Firmware {}", version),
        Err(e) => warn!("Firmware version unavailable: {}", e),
    }

    let hub = Arc::new(Mutex::new(hub));
    let poller = Poller::spawn(Arc::clone(&hub), interval)?;

    thread::sleep(Duration::from_secs(3));
    {
        let mut hub = hub.lock().unwrap();
        if let Some(status) = hub.snapshot() {
            info!("{} at {}", Focuser::One, status.focuser(Focuser::One).position);
        }
        hub.move_relative(Focuser::One, 100)?;
        hub.set_relay(0, true)?;
    }

    thread::sleep(Duration::from_secs(5));
    poller.stop();
    info!("Monitor finished");
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let arg = std::env::args().nth(1);
    if arg.as_deref() == Some("--simulate") {
        info!("Using simulated device");
        let mut hub = AstroLink4Micro::new(DriverConfig::default());
        hub.connect(SimulatedTransport::new())?;
        return run(hub);
    }

    let port_name = arg.map(Ok).unwrap_or_else(select_port)?;
    info!("Connecting to {}", port_name);
    let hub = AstroLink4Micro::<Box<dyn SerialPort>>::open(DriverConfig::with_port(port_name))?;
    run(hub)
}

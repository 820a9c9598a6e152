use astrolink4_micro::{
    AstroLink4Micro, DriverConfig, Event, Focuser, MoveState, Poller, SimulatedTransport,
    SyncGroup, SyncStatus,
};
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

#[test]
fn poller_drives_move_to_completion() {
    let sim = SimulatedTransport::new();
    let (tx, rx) = mpsc::channel();
    let mut hub = AstroLink4Micro::new(DriverConfig::default());
    hub.set_event_sink(move |event| {
        let _ = tx.send(event);
    });
    hub.connect(sim.clone()).unwrap();
    hub.poll_once();
    hub.move_absolute(Focuser::One, 6000).unwrap();

    let hub = Arc::new(Mutex::new(hub));
    let poller = Poller::spawn(Arc::clone(&hub), Duration::from_millis(10)).unwrap();

    let done = Event::Focuser {
        focuser: Focuser::One,
        position: 6000,
        state: MoveState::Idle,
    };
    let mut finished = false;
    while let Ok(event) = rx.recv_timeout(Duration::from_secs(2)) {
        if event == done {
            finished = true;
            break;
        }
    }
    poller.stop();

    assert!(finished);
    let hub = hub.lock().unwrap();
    assert_eq!(hub.move_state(Focuser::One), MoveState::Idle);
    assert_eq!(hub.sync_status(SyncGroup::Hub), SyncStatus::Confirmed);
}

#[test]
fn stopped_poller_sends_nothing() {
    let sim = SimulatedTransport::new();
    let mut hub = AstroLink4Micro::new(DriverConfig::default());
    hub.connect(sim.clone()).unwrap();
    let hub = Arc::new(Mutex::new(hub));

    let poller = Poller::spawn(Arc::clone(&hub), Duration::from_millis(5)).unwrap();
    std::thread::sleep(Duration::from_millis(30));
    poller.stop();

    let polls = sim.written().iter().filter(|c| c.as_str() == "q").count();
    assert!(polls >= 1);

    sim.clear_written();
    std::thread::sleep(Duration::from_millis(30));
    assert!(sim.written().is_empty());
}

#[test]
fn client_calls_interleave_with_polls() {
    let sim = SimulatedTransport::new();
    let mut hub = AstroLink4Micro::new(DriverConfig::default());
    hub.connect(sim.clone()).unwrap();
    let hub = Arc::new(Mutex::new(hub));
    let poller = Poller::spawn(Arc::clone(&hub), Duration::from_millis(5)).unwrap();

    for output in 0..3 {
        hub.lock().unwrap().set_relay(output, true).unwrap();
        std::thread::sleep(Duration::from_millis(10));
    }
    drop(poller);
    hub.lock().unwrap().poll_once();

    let written = sim.written();
    for output in 0..3 {
        assert!(written.contains(&format!("C:{}:1", output)));
    }
    let hub = hub.lock().unwrap();
    assert_eq!(hub.snapshot().unwrap().extended.unwrap().outputs, [true, true, true]);
}

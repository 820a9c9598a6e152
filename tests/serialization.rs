use astrolink4_micro::{
    DriverConfig, Event, Focuser, GroupValues, MoveState, Reading, StatusSnapshot, SyncGroup,
    SyncStatus,
};
use serde_json::json;

#[test]
fn events_serialize_with_type_tag() {
    let event = Event::Focuser {
        focuser: Focuser::Two,
        position: 1200,
        state: MoveState::Busy,
    };
    assert_eq!(
        serde_json::to_value(&event).unwrap(),
        json!({"type": "focuser", "focuser": "Two", "position": 1200, "state": "Busy"})
    );

    let event = Event::Reading { reading: Reading::InputVoltage, value: 12.5 };
    assert_eq!(
        serde_json::to_value(&event).unwrap(),
        json!({"type": "reading", "reading": "InputVoltage", "value": 12.5})
    );

    let event = Event::Group {
        group: SyncGroup::MaxPosition(Focuser::One),
        status: SyncStatus::Confirmed,
        values: Some(GroupValues::MaxPosition(30000)),
    };
    assert_eq!(
        serde_json::to_value(&event).unwrap(),
        json!({
            "type": "group",
            "group": {"MaxPosition": "One"},
            "status": "Confirmed",
            "values": {"MaxPosition": 30000}
        })
    );
}

#[test]
fn snapshot_round_trips_through_json() {
    let snapshot = StatusSnapshot::from_response(
        "q:AL4MIC:4671:0:0:0:0.43:1:23.1:45.4:9.7:1:13.3:40:31:0:0:1:12.1:7.9:12.1:144.7:0:0:0",
    )
    .unwrap();
    let text = serde_json::to_string(&snapshot).unwrap();
    let decoded: StatusSnapshot = serde_json::from_str(&text).unwrap();
    assert_eq!(decoded.focusers, snapshot.focusers);
    assert_eq!(decoded.received_at, snapshot.received_at);
    let extended = decoded.extended.unwrap();
    assert_eq!(extended.sensor2.temperature, 13.3);
    assert_eq!(extended.outputs, [false, false, true]);
    assert!(extended.sky.is_none());
}

#[test]
fn partial_config_takes_defaults() {
    let config: DriverConfig = serde_json::from_str(r#"{"port": "/dev/ttyACM0"}"#).unwrap();
    assert_eq!(config, DriverConfig::with_port("/dev/ttyACM0"));

    let config: DriverConfig = serde_json::from_str(r#"{"poll_interval_ms": 1000}"#).unwrap();
    assert_eq!(config.poll_interval_ms, 1000);
    assert_eq!(config.baud_rate, 38_400);
}

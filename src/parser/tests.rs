//! Stream parser behaviour: framing, decoding, home detection and throttling

use super::*;
use crate::protocol::messages::mav_cmd;
use crate::test_utils::{self, VEHICLE_SYSTEM_ID};
use crate::types::{CommandKind, CommandOutcome, LogSeverity};
use proptest::prelude::*;

/// Options that never throttle within a test's lifetime.
fn unthrottled() -> ParserOptions {
    ParserOptions::default().with_emit_interval(Duration::ZERO)
}

fn link_events(events: &[ParsedEvent]) -> Vec<&LinkEvent> {
    events
        .iter()
        .filter_map(|e| match e {
            ParsedEvent::Link(link) => Some(link),
            _ => None,
        })
        .collect()
}

fn telemetry(events: &[ParsedEvent]) -> Vec<Arc<TelemetrySnapshot>> {
    events
        .iter()
        .filter_map(|e| match e {
            ParsedEvent::Telemetry(snap) => Some(snap.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn heartbeat_round_trip() {
    let mut parser = StreamParser::new(unthrottled());
    let events = parser.feed(&test_utils::heartbeat(0, true, 4, 4, 4));

    assert!(link_events(&events).contains(&&LinkEvent::Heartbeat {
        system_id: VEHICLE_SYSTEM_ID,
        component_id: 1
    }));
    let snap = parser.snapshot();
    assert!(snap.status.armed);
    assert_eq!(snap.status.flight_mode, "Mission");
    assert_eq!(snap.status.system_status, "ACTIVE");
    assert!(snap.timestamp.is_some());
    assert_eq!(parser.stats().frames, 1);
}

#[test]
fn position_and_velocity_conversions() {
    let mut parser = StreamParser::new(unthrottled());
    parser.feed(&test_utils::global_position(0, 47.397742, 8.545594, 488.25, 12.5, 271.5));

    let snap = parser.snapshot();
    assert!((snap.position.latitude - 47.397742).abs() < 1e-7);
    assert!((snap.position.longitude - 8.545594).abs() < 1e-7);
    assert!((snap.position.altitude - 488.25).abs() < 1e-3);
    assert!((snap.position.relative_altitude - 12.5).abs() < 1e-3);
    assert!((snap.velocity.north - 1.5).abs() < 1e-6);
    assert!((snap.velocity.east + 2.5).abs() < 1e-6);
    assert!((snap.velocity.down - 0.1).abs() < 1e-6);
    assert!((snap.heading - 271.5).abs() < 1e-3);
}

#[test]
fn field_groups_are_updated_independently() {
    let mut parser = StreamParser::new(unthrottled());
    parser.feed(&test_utils::attitude(0, 0.1, -0.2, 1.5));
    parser.feed(&test_utils::vfr_hud(1, 12.0, 11.5, 180, 64));
    parser.feed(&test_utils::sys_status(2, 35.0, 15.8, 9.5, 72));

    let snap = parser.snapshot();
    assert_eq!(snap.attitude.roll, 0.1);
    assert_eq!(snap.attitude.yaw, 1.5);
    assert_eq!(snap.velocity.air_speed, 12.0);
    assert_eq!(snap.velocity.ground_speed, 11.5);
    assert_eq!(snap.heading, 180.0);
    assert_eq!(snap.throttle, 64.0);
    assert_eq!(snap.status.cpu_load, 35.0);
    assert!((snap.status.battery.voltage - 15.8).abs() < 1e-3);
    assert!((snap.status.battery.current - 9.5).abs() < 1e-3);
    assert_eq!(snap.status.battery.remaining, 72);
    // Heartbeat never arrived
    assert_eq!(snap.status.flight_mode, "UNKNOWN");
}

#[test]
fn leading_garbage_is_discarded() {
    let mut parser = StreamParser::new(unthrottled());
    let mut stream = vec![0x00, 0x13, 0x37, 0x42];
    stream.extend_from_slice(&test_utils::attitude(0, 0.5, 0.0, 0.0));

    let events = parser.feed(&stream);
    assert_eq!(telemetry(&events).len(), 1);
    assert_eq!(parser.stats().discarded_bytes, 4);
    assert_eq!(parser.pending(), 0);
}

#[test]
fn incomplete_frame_waits_for_more_bytes() {
    let mut parser = StreamParser::new(unthrottled());
    let frame = test_utils::attitude(0, 0.5, 0.0, 0.0);

    assert!(parser.feed(&frame[..5]).is_empty());
    assert!(parser.feed(&frame[5..20]).is_empty());
    assert_eq!(parser.pending(), 20);
    let events = parser.feed(&frame[20..]);
    assert_eq!(telemetry(&events).len(), 1);
    assert_eq!(parser.pending(), 0);
}

#[test]
fn signed_frame_length_includes_signature() {
    let mut frame = test_utils::command_ack(0, mav_cmd::NAV_LAND, 0).to_vec();
    frame[2] |= crate::protocol::INCOMPAT_FLAG_SIGNED;
    // Checksum covers the flags byte, so trust it for this check
    frame.extend_from_slice(&[0xAB; crate::protocol::SIGNATURE_LEN]);
    frame.extend_from_slice(&test_utils::mission_ack(1, 0));

    let mut parser = StreamParser::new(unthrottled().with_checksum_policy(ChecksumPolicy::Trust));
    let events = parser.feed(&frame);

    assert_eq!(events.len(), 2);
    assert_eq!(
        events[0],
        ParsedEvent::Link(LinkEvent::CommandAck {
            command: CommandKind::Land,
            outcome: CommandOutcome::Accepted
        })
    );
    assert_eq!(events[1], ParsedEvent::Mission(MissionEvent::Ack { result: 0 }));
}

#[test]
fn corrupted_frame_is_dropped_and_next_frame_recovered() {
    let mut bad = test_utils::attitude(0, 0.5, 0.0, 0.0).to_vec();
    bad[14] ^= 0xFF;
    let mut stream = bad.clone();
    stream.extend_from_slice(&test_utils::command_ack(1, mav_cmd::NAV_TAKEOFF, 2));

    let mut parser = StreamParser::new(unthrottled());
    let events = parser.feed(&stream);

    assert_eq!(parser.stats().crc_errors, 1);
    assert_eq!(
        link_events(&events),
        vec![&LinkEvent::CommandAck {
            command: CommandKind::Takeoff,
            outcome: CommandOutcome::Denied
        }]
    );
    assert_eq!(parser.snapshot().attitude.roll, 0.0);

    // Trusting the transport decodes it anyway
    let mut trusting = StreamParser::new(unthrottled().with_checksum_policy(ChecksumPolicy::Trust));
    trusting.feed(&bad);
    assert_eq!(trusting.stats().crc_errors, 0);
    assert_eq!(trusting.stats().frames, 1);
}

#[test]
fn unknown_messages_are_ignored() {
    // GPS_RAW_INT, not decoded by this parser
    let unknown = crate::protocol::build_frame(24, 0, 1, 1, &[0u8; 30]);
    let mut stream = unknown.to_vec();
    stream.extend_from_slice(&test_utils::mission_request_int(1, 3));

    let mut parser = StreamParser::new(unthrottled());
    let events = parser.feed(&stream);
    assert_eq!(parser.stats().unknown, 1);
    assert_eq!(
        events,
        vec![ParsedEvent::Mission(MissionEvent::ItemRequested { seq: 3, int_form: true })]
    );
}

#[test]
fn stray_magic_with_unknown_id_does_not_swallow_real_frames() {
    // Header claiming a 200 byte payload for id 500, which has no CRC seed
    let mut stream = vec![0xFD, 200, 0, 0, 0, 1, 1, 0xF4, 0x01, 0x00];
    stream.extend_from_slice(&test_utils::heartbeat(0, true, 3, 0, 4));
    stream.extend_from_slice(&test_utils::command_ack(1, mav_cmd::NAV_LAND, 0));
    // Enough trailing bytes for the bogus frame to look complete
    stream.resize(10 + 200 + 2, 0);

    let mut parser = StreamParser::new(unthrottled());
    let events = parser.feed(&stream);
    assert_eq!(parser.stats().unknown, 1);
    assert_eq!(parser.stats().frames, 2);
    let link = link_events(&events);
    assert!(matches!(link[0], LinkEvent::Heartbeat { .. }));
    assert!(matches!(link[1], LinkEvent::CommandAck { command: CommandKind::Land, .. }));
    assert_eq!(parser.pending(), 0);

    // Trusting the transport takes the declared length at face value
    let mut trusting = StreamParser::new(unthrottled().with_checksum_policy(ChecksumPolicy::Trust));
    assert!(trusting.feed(&stream).is_empty());
    assert_eq!(trusting.stats().unknown, 1);
    assert_eq!(trusting.stats().frames, 0);
}

#[test]
fn mission_events_do_not_touch_telemetry() {
    let mut parser = StreamParser::new(unthrottled());
    let mut stream = test_utils::mission_request(0, 0).to_vec();
    stream.extend_from_slice(&test_utils::mission_ack(1, 13));
    let events = parser.feed(&stream);

    assert_eq!(
        events,
        vec![
            ParsedEvent::Mission(MissionEvent::ItemRequested { seq: 0, int_form: false }),
            ParsedEvent::Mission(MissionEvent::Ack { result: 13 }),
        ]
    );
    assert!(parser.snapshot().timestamp.is_none());
}

#[test]
fn home_position_fires_once_on_first_real_fix() {
    let mut parser = StreamParser::new(unthrottled());
    let homes = |events: &[ParsedEvent]| {
        events
            .iter()
            .filter(|e| matches!(e, ParsedEvent::Link(LinkEvent::HomePosition(_))))
            .count()
    };

    assert_eq!(homes(&parser.feed(&test_utils::global_position(0, 0.0, 0.0, 0.0, 0.0, 0.0))), 0);
    assert_eq!(homes(&parser.feed(&test_utils::global_position(1, -1.0, -1.0, 0.0, 0.0, 0.0))), 0);

    let events = parser.feed(&test_utils::global_position(2, 47.5, 8.5, 500.0, 0.0, 0.0));
    let home = events.iter().find_map(|e| match e {
        ParsedEvent::Link(LinkEvent::HomePosition(home)) => Some(*home),
        _ => None,
    });
    let home = home.expect("home event");
    assert!((home.latitude - 47.5).abs() < 1e-7);
    assert!((home.altitude - 500.0).abs() < 1e-3);

    assert_eq!(homes(&parser.feed(&test_utils::global_position(3, 47.6, 8.6, 510.0, 10.0, 0.0))), 0);
    assert_eq!(homes(&parser.feed(&test_utils::global_position(4, 0.0, 0.0, 0.0, 0.0, 0.0))), 0);
}

#[test]
fn param_progress_counts_distinct_indices() {
    let mut parser = StreamParser::new(unthrottled());
    let mut stream = Vec::new();
    stream.extend_from_slice(&test_utils::param_value(0, "MPC_XY_VEL_MAX", 12.0, 0, 3));
    stream.extend_from_slice(&test_utils::param_value(1, "MPC_XY_VEL_MAX", 12.0, 0, 3));
    stream.extend_from_slice(&test_utils::param_value(2, "NAV_ACC_RAD", 2.0, 1, 3));
    // Response to PARAM_SET carries no meaningful total
    stream.extend_from_slice(&test_utils::param_value(3, "NAV_ACC_RAD", 2.5, 1, 0));

    let events = parser.feed(&stream);
    let progress: Vec<_> = link_events(&events)
        .into_iter()
        .filter_map(|e| match e {
            LinkEvent::ParamProgress { received, total } => Some((*received, *total)),
            _ => None,
        })
        .collect();
    assert_eq!(progress, vec![(1, 3), (1, 3), (2, 3)]);

    let values = link_events(&events)
        .into_iter()
        .filter(|e| matches!(e, LinkEvent::ParamValue(_)))
        .count();
    assert_eq!(values, 4);

    match link_events(&events)[0] {
        LinkEvent::ParamValue(entry) => {
            assert_eq!(entry.id, "MPC_XY_VEL_MAX");
            assert_eq!(entry.value, 12.0);
            assert_eq!(entry.param_type, 9);
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn command_ack_with_unknown_command() {
    let mut parser = StreamParser::new(unthrottled());
    let events = parser.feed(&test_utils::command_ack(0, 512, 3));
    assert_eq!(
        events,
        vec![ParsedEvent::Link(LinkEvent::CommandAck {
            command: CommandKind::Unknown(512),
            outcome: CommandOutcome::Unsupported
        })]
    );
}

#[test]
fn status_text_becomes_log_message() {
    let mut parser = StreamParser::new(unthrottled());
    let events = parser.feed(&test_utils::status_text(0, 6, "Takeoff detected"));
    assert_eq!(
        events,
        vec![ParsedEvent::Link(LinkEvent::LogMessage {
            severity: LogSeverity::Info,
            text: "Takeoff detected".to_string()
        })]
    );
}

#[tokio::test(start_paused = true)]
async fn telemetry_emission_is_throttled() {
    let mut parser = StreamParser::default();
    let burst: Vec<u8> = (0..20u8)
        .flat_map(|seq| test_utils::attitude(seq, seq as f32 * 0.01, 0.0, 0.0).to_vec())
        .collect();

    // Twenty updates at the same instant collapse into one emission
    let events = parser.feed(&burst);
    let emitted = telemetry(&events);
    assert_eq!(emitted.len(), 1);
    assert_eq!(emitted[0].attitude.roll, 0.0);
    // ...while the snapshot holds the latest values
    assert!((parser.snapshot().attitude.roll - 0.19).abs() < 1e-6);

    tokio::time::advance(Duration::from_millis(10)).await;
    assert!(telemetry(&parser.feed(&test_utils::attitude(20, 0.3, 0.0, 0.0))).is_empty());

    tokio::time::advance(Duration::from_millis(25)).await;
    let emitted = telemetry(&parser.feed(&test_utils::attitude(21, 0.4, 0.0, 0.0)));
    assert_eq!(emitted.len(), 1);
    assert_eq!(emitted[0].attitude.roll, 0.4);
}

#[tokio::test(start_paused = true)]
async fn throttle_rate_bound_over_time() {
    let mut parser = StreamParser::default();
    let mut emitted = 0;
    // 250 Hz attitude stream for one simulated second
    for i in 0..250u32 {
        emitted += telemetry(&parser.feed(&test_utils::attitude(i as u8, 0.0, 0.0, 0.0))).len();
        tokio::time::advance(Duration::from_millis(4)).await;
    }
    assert!(emitted <= 1000 / 33 + 1, "emitted {emitted} snapshots in one second");
    assert!(emitted >= 25);
}

/// Replace wall-clock timestamps so event streams from separate runs compare equal.
fn normalized(events: Vec<ParsedEvent>) -> Vec<ParsedEvent> {
    events
        .into_iter()
        .map(|e| match e {
            ParsedEvent::Telemetry(snap) => {
                let mut snap = (*snap).clone();
                snap.timestamp = None;
                ParsedEvent::Telemetry(Arc::new(snap))
            }
            other => other,
        })
        .collect()
}

fn mixed_stream() -> Vec<u8> {
    let mut stream = vec![0x55, 0xAA, 0x00];
    stream.extend_from_slice(&test_utils::heartbeat(0, false, 3, 0, 3));
    stream.extend_from_slice(&test_utils::param_value(1, "SYS_AUTOSTART", 4001.0, 0, 2));
    stream.extend_from_slice(&[0x01, 0x02]);
    stream.extend_from_slice(&test_utils::global_position(2, 47.1, 8.2, 400.0, 1.0, 45.0));
    stream.extend_from_slice(&test_utils::mission_request_int(3, 0));
    stream.extend_from_slice(&test_utils::status_text(4, 4, "Low battery"));
    stream.extend_from_slice(&test_utils::command_ack(5, mav_cmd::COMPONENT_ARM_DISARM, 0));
    stream.extend_from_slice(&test_utils::param_value(6, "SYS_HITL", 0.0, 1, 2));
    stream.extend_from_slice(&test_utils::mission_ack(7, 0));
    stream
}

proptest! {
    #[test]
    fn chunking_does_not_change_events(cuts in prop::collection::vec(any::<prop::sample::Index>(), 0..12)) {
        let stream = mixed_stream();
        let options = ParserOptions::default().with_emit_interval(Duration::from_secs(3600));

        let whole = normalized(StreamParser::new(options).feed(&stream));

        let mut points: Vec<usize> = cuts.iter().map(|i| i.index(stream.len() + 1)).collect();
        points.sort_unstable();
        points.dedup();

        let mut parser = StreamParser::new(options);
        let mut chunked = Vec::new();
        let mut start = 0;
        for point in points.into_iter().chain(std::iter::once(stream.len())) {
            chunked.extend(parser.feed(&stream[start..point]));
            start = point;
        }

        prop_assert_eq!(normalized(chunked), whole);
        prop_assert_eq!(parser.pending(), 0);
    }

    #[test]
    fn arbitrary_bytes_never_panic(data in prop::collection::vec(any::<u8>(), 0..600)) {
        let mut parser = StreamParser::new(unthrottled());
        parser.feed(&data);
        let stats = parser.stats();
        prop_assert!(stats.discarded_bytes as usize <= data.len());
    }
}

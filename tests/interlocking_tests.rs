//! End-to-end tests for the control point: commands in, aspects, status and
//! outputs out, driven through the public API and the mock field.

use cp_interlock::config::InputBindings;
use cp_interlock::hal::{MockIo, MockLatch, MockPacket};
use cp_interlock::outputs::SIGNAL_PINS;
use cp_interlock::signals::restricting_heads;
use cp_interlock::status::STATUS_PACKET_LEN;
use cp_interlock::{
    CommandSource, ControlPoint, ControlPointConfig, Entrance, IndicatorMode, InputId, RejectReason,
    RemoteCommand, Route, SignalAspect, SignalHead, TickEvents, TimelockId, TimelockState, TurnoutId,
};

const CTC: u8 = 0x10;
const NEIGHBOUR: u8 = 0x20;

// Neighbour status byte 6: Main 1 / Main 2 OS occupancy in bits 0 and 1.
const OS_MAIN1: u8 = 0x01;
const OS_MAIN2: u8 = 0x02;
// Neighbour status byte 7: Main 1 east adjoin / approach / approach2.
const M1E_ADJOIN: u8 = 0x01;
const M1E_APPROACH: u8 = 0x02;
const M1E_APPROACH2: u8 = 0x04;

/// Control point with the OS and Main 1 east blocks bound to the
/// neighbour's status packet.
fn control_point(unlock_delay_secs: u16) -> ControlPoint<MockLatch> {
    let bindings = InputBindings::default()
        .with_virtual(InputId::Main1Os, NEIGHBOUR, b'S', 6)
        .with_virtual(InputId::Main2Os, NEIGHBOUR, b'S', (1 << 5) | 6)
        .with_virtual(InputId::Main1EastAdjoin, NEIGHBOUR, b'S', 7)
        .with_virtual(InputId::Main1EastApproach, NEIGHBOUR, b'S', (1 << 5) | 7)
        .with_virtual(InputId::Main1EastApproach2, NEIGHBOUR, b'S', (2 << 5) | 7);
    let config = ControlPointConfig::default().with_unlock_delay_secs(unlock_delay_secs);
    ControlPoint::new(config, &bindings, MockLatch::new())
}

fn neighbour_reports(cp: &mut ControlPoint<MockLatch>, os: u8, main1_east: u8) {
    cp.receive_packet(&MockPacket::status(NEIGHBOUR, &[os, main1_east]));
}

fn code(cp: &mut ControlPoint<MockLatch>, io: &MockIo, entrance: Entrance, set: bool) {
    assert!(cp.submit(RemoteCommand::CodeRoute { entrance, set }, CommandSource::Local));
    cp.cycle(io, TickEvents::idle()).unwrap();
}

fn throw(cp: &mut ControlPoint<MockLatch>, io: &MockIo, turnout: TurnoutId, normal: bool) {
    assert!(cp.submit(RemoteCommand::SetTurnout { turnout, normal }, CommandSource::Local));
    cp.cycle(io, TickEvents::idle()).unwrap();
}

fn last_reject(cp: &ControlPoint<MockLatch>) -> Option<RejectReason> {
    cp.last_outcome().and_then(|(_, outcome)| outcome.reject_reason())
}

/// Cycle with output refresh and let the field follow the switch machines.
fn settle(cp: &mut ControlPoint<MockLatch>, io: &mut MockIo) {
    cp.cycle(io, TickEvents::output_refresh(false)).unwrap();
    io.follow_turnout_outputs(cp.output_frame());
    cp.cycle(io, TickEvents::idle()).unwrap();
}

// ============================================================================
// Signal Aspects
// ============================================================================

#[test]
fn main1_eastbound_clear_shows_green() {
    let mut cp = control_point(30);
    let io = MockIo::field_at_rest();

    code(&mut cp, &io, Entrance::Main1Eastbound, true);

    assert_eq!(cp.state().aspect(SignalHead::Main1WestLower), SignalAspect::Red);
    assert_eq!(cp.state().aspect(SignalHead::Main1WestUpper), SignalAspect::Green);
    for head in SignalHead::ALL {
        if head != SignalHead::Main1WestUpper {
            assert_eq!(cp.state().aspect(head), SignalAspect::Red, "{:?}", head);
        }
    }
}

#[test]
fn approach_occupancy_cascades() {
    let mut cp = control_point(30);
    let io = MockIo::field_at_rest();
    code(&mut cp, &io, Entrance::Main1Eastbound, true);

    let cases = [
        (M1E_APPROACH, SignalAspect::Yellow),
        (M1E_APPROACH2, SignalAspect::FlashingYellow),
        (M1E_APPROACH | M1E_APPROACH2, SignalAspect::Yellow),
        (M1E_ADJOIN | M1E_APPROACH, SignalAspect::Red),
        (0, SignalAspect::Green),
    ];
    for (bits, aspect) in cases {
        neighbour_reports(&mut cp, 0, bits);
        cp.cycle(&io, TickEvents::idle()).unwrap();
        assert_eq!(cp.state().aspect(SignalHead::Main1WestUpper), aspect, "bits {:#04x}", bits);
    }
}

#[test]
fn turnout_in_motion_holds_every_head_red() {
    let mut cp = control_point(30);
    let mut io = MockIo::field_at_rest();

    throw(&mut cp, &io, TurnoutId::EastCrossover, false);
    assert!(cp.state().turnout(TurnoutId::EastCrossover).in_motion());
    assert!(cp.state().aspects().iter().all(|a| *a == SignalAspect::Red));

    // Coded from the requested alignment, but Red until the points land.
    code(&mut cp, &io, Entrance::Main1Eastbound, true);
    assert!(cp.state().routes().contains(Route::Main1ToMain2Eastbound));
    assert!(cp.state().aspects().iter().all(|a| *a == SignalAspect::Red));

    settle(&mut cp, &mut io);
    assert!(!cp.state().turnout(TurnoutId::EastCrossover).in_motion());
    assert_eq!(cp.state().aspect(SignalHead::Main1WestLower), SignalAspect::Green);
    assert_eq!(cp.state().aspect(SignalHead::Main1WestUpper), SignalAspect::Red);
}

#[test]
fn flashing_aspects_follow_blink_flag() {
    let mut cp = control_point(30);
    let io = MockIo::field_at_rest();
    code(&mut cp, &io, Entrance::Main1Eastbound, true);
    neighbour_reports(&mut cp, 0, M1E_APPROACH2);

    let yellow = SIGNAL_PINS[SignalHead::Main1WestUpper.index()].yellow;

    cp.cycle(&io, TickEvents::output_refresh(true)).unwrap();
    assert!(cp.output_frame().get(yellow.device, yellow.port, yellow.bit));

    cp.cycle(&io, TickEvents::output_refresh(false)).unwrap();
    assert!(!cp.output_frame().get(yellow.device, yellow.port, yellow.bit));
    assert_eq!(cp.latch().latch_count, 2);
}

// ============================================================================
// Route Coding
// ============================================================================

#[test]
fn opposing_route_is_rejected() {
    let mut cp = control_point(30);
    let io = MockIo::field_at_rest();

    code(&mut cp, &io, Entrance::Main1Westbound, true);
    assert!(cp.state().routes().contains(Route::Main1Westbound));

    code(&mut cp, &io, Entrance::Main1Eastbound, true);
    assert_eq!(last_reject(&cp), Some(RejectReason::ConflictingRoute));
    assert_eq!(cp.state().routes().iter().collect::<Vec<_>>(), vec![Route::Main1Westbound]);
}

#[test]
fn route_table_holds_two_routes() {
    let mut cp = control_point(30);
    let io = MockIo::field_at_rest();

    code(&mut cp, &io, Entrance::Main1Eastbound, true);
    code(&mut cp, &io, Entrance::Main2Westbound, true);
    code(&mut cp, &io, Entrance::Main2Eastbound, true);
    assert_eq!(last_reject(&cp), Some(RejectReason::ConflictingRoute));

    code(&mut cp, &io, Entrance::Main2Westbound, false);
    code(&mut cp, &io, Entrance::Main2Eastbound, true);
    assert!(last_reject(&cp).is_none());
    assert_eq!(cp.state().routes().len(), 2);
}

#[test]
fn main3_entrance_never_routes() {
    let mut cp = control_point(30);
    let io = MockIo::field_at_rest();

    code(&mut cp, &io, Entrance::Main3Eastbound, true);
    assert_eq!(last_reject(&cp), Some(RejectReason::AlignmentNotRoutable));
    assert!(cp.state().routes().is_empty());
}

#[test]
fn coding_locks_both_crossovers() {
    let mut cp = control_point(30);
    let io = MockIo::field_at_rest();

    code(&mut cp, &io, Entrance::Main2Westbound, true);
    for id in TurnoutId::ALL {
        assert!(cp.state().turnout(id).is_locked(), "{:?}", id);
    }

    throw(&mut cp, &io, TurnoutId::WestCrossover, false);
    assert_eq!(last_reject(&cp), Some(RejectReason::TurnoutLocked));
    assert!(cp.state().turnout(TurnoutId::WestCrossover).requested_normal());

    // Clearing the last route with the OS empty releases the locks.
    code(&mut cp, &io, Entrance::Main2Westbound, false);
    assert!(cp.state().routes().is_empty());
    for id in TurnoutId::ALL {
        assert!(!cp.state().turnout(id).is_locked(), "{:?}", id);
    }
}

// ============================================================================
// Vital Logic
// ============================================================================

#[test]
fn occupancy_drops_crossing_routes_and_holds_locks() {
    let mut cp = control_point(30);
    let mut io = MockIo::field_at_rest();

    throw(&mut cp, &io, TurnoutId::EastCrossover, false);
    settle(&mut cp, &mut io);
    code(&mut cp, &io, Entrance::Main1Eastbound, true);
    assert!(cp.state().routes().contains(Route::Main1ToMain2Eastbound));

    // Occupancy on the other main still drops a crossing route.
    neighbour_reports(&mut cp, OS_MAIN2, 0);
    cp.cycle(&io, TickEvents::idle()).unwrap();
    assert!(cp.state().routes().is_empty());
    assert!(cp.state().turnout(TurnoutId::EastCrossover).is_locked());

    throw(&mut cp, &io, TurnoutId::EastCrossover, true);
    assert_eq!(last_reject(&cp), Some(RejectReason::TrackOccupied));

    neighbour_reports(&mut cp, 0, 0);
    cp.cycle(&io, TickEvents::idle()).unwrap();
    assert!(TurnoutId::ALL.iter().all(|id| !cp.state().turnout(*id).is_locked()));
}

#[test]
fn occupancy_only_drops_own_main_straight_routes() {
    let mut cp = control_point(30);
    let io = MockIo::field_at_rest();
    code(&mut cp, &io, Entrance::Main1Eastbound, true);
    code(&mut cp, &io, Entrance::Main2Eastbound, true);

    neighbour_reports(&mut cp, OS_MAIN1, 0);
    cp.cycle(&io, TickEvents::idle()).unwrap();

    assert_eq!(cp.state().routes().iter().collect::<Vec<_>>(), vec![Route::Main2Eastbound]);
    assert!(cp.status().main1_occupied);
    assert!(cp.status().main2_west_cleared);
}

#[test]
fn occupied_os_refuses_turnout_moves() {
    let mut cp = control_point(30);
    let io = MockIo::field_at_rest();

    neighbour_reports(&mut cp, OS_MAIN1, 0);
    throw(&mut cp, &io, TurnoutId::WestCrossover, false);
    assert_eq!(last_reject(&cp), Some(RejectReason::TrackOccupied));
    assert!(cp.state().turnout(TurnoutId::WestCrossover).requested_normal());
}

// ============================================================================
// Timelock
// ============================================================================

fn timelock(cp: &ControlPoint<MockLatch>) -> TimelockState {
    cp.state().timelock(TimelockId::Main).state()
}

#[test]
fn timelock_unlocks_after_delay() {
    let mut cp = control_point(5);
    let mut io = MockIo::field_at_rest();
    code(&mut cp, &io, Entrance::Main1Eastbound, true);

    io.engage_timelock_switch(true);
    cp.cycle(&io, TickEvents::idle()).unwrap();
    assert_eq!(timelock(&cp), TimelockState::TimerRunning);
    assert_eq!(cp.state().timelock(TimelockId::Main).seconds_remaining(), 5);

    for tick in 1..5 {
        cp.cycle(&io, TickEvents::idle().with_one_hz()).unwrap();
        assert_eq!(timelock(&cp), TimelockState::TimerRunning, "tick {}", tick);
        assert!(cp.state().routes().is_empty());
        assert!(cp.status().east_crossover.manual);
    }
    // Only 1 Hz ticks advance the countdown.
    cp.cycle(&io, TickEvents::idle()).unwrap();
    assert_eq!(timelock(&cp), TimelockState::TimerRunning);

    cp.cycle(&io, TickEvents::idle().with_one_hz()).unwrap();
    assert_eq!(timelock(&cp), TimelockState::Unlocked);
}

#[test]
fn releasing_switch_during_countdown_relocks() {
    let mut cp = control_point(5);
    let mut io = MockIo::field_at_rest();

    io.engage_timelock_switch(true);
    cp.cycle(&io, TickEvents::idle()).unwrap();
    io.engage_timelock_switch(false);
    cp.cycle(&io, TickEvents::idle()).unwrap();
    assert_eq!(timelock(&cp), TimelockState::Locked);
}

#[test]
fn unlocked_hands_points_to_levers() {
    let mut cp = control_point(1);
    let mut io = MockIo::field_at_rest();

    io.engage_timelock_switch(true);
    cp.cycle(&io, TickEvents::idle()).unwrap();
    cp.cycle(&io, TickEvents::idle().with_one_hz()).unwrap();
    assert_eq!(timelock(&cp), TimelockState::Unlocked);

    // Remote moves are refused while the plant is open.
    throw(&mut cp, &io, TurnoutId::EastCrossover, false);
    assert_eq!(last_reject(&cp), Some(RejectReason::TimelockOpen));
    code(&mut cp, &io, Entrance::Main1Eastbound, true);
    assert_eq!(last_reject(&cp), Some(RejectReason::TimelockOpen));

    // Both normal: restricting indication on the outer upper heads.
    for head in SignalHead::ALL {
        let expected = if restricting_heads(true, true).contains(&head) {
            SignalAspect::FlashingRed
        } else {
            SignalAspect::Red
        };
        assert_eq!(cp.state().aspect(head), expected, "{:?}", head);
    }
    assert_eq!(cp.state().timelock(TimelockId::Main).indicator(), IndicatorMode::Solid);

    io.set_manual_lever(TurnoutId::WestCrossover, false);
    cp.cycle(&io, TickEvents::output_refresh(false)).unwrap();
    assert!(!cp.state().turnout(TurnoutId::WestCrossover).requested_normal());
    assert!(cp.state().aspects().iter().all(|a| *a == SignalAspect::Red));

    io.follow_turnout_outputs(cp.output_frame());
    cp.cycle(&io, TickEvents::idle()).unwrap();
    for head in restricting_heads(true, false) {
        assert_eq!(cp.state().aspect(*head), SignalAspect::FlashingRed, "{:?}", head);
    }
}

#[test]
fn relock_restores_interlocking_control() {
    let mut cp = control_point(1);
    let mut io = MockIo::field_at_rest();

    io.engage_timelock_switch(true);
    cp.cycle(&io, TickEvents::idle()).unwrap();
    cp.cycle(&io, TickEvents::idle().with_one_hz()).unwrap();
    cp.cycle(&io, TickEvents::idle()).unwrap();

    io.engage_timelock_switch(false);
    cp.cycle(&io, TickEvents::idle()).unwrap();
    assert_eq!(timelock(&cp), TimelockState::Relocking);
    cp.cycle(&io, TickEvents::idle()).unwrap();
    assert_eq!(timelock(&cp), TimelockState::Locked);

    cp.cycle(&io, TickEvents::idle()).unwrap();
    assert!(!cp.status().east_crossover.manual);
    assert_eq!(cp.state().timelock(TimelockId::Main).indicator(), IndicatorMode::Off);

    code(&mut cp, &io, Entrance::Main2Eastbound, true);
    assert!(last_reject(&cp).is_none());
}

// ============================================================================
// Bus
// ============================================================================

#[test]
fn bus_commands_round_trip_to_status_packet() {
    let mut cp = control_point(30);
    let io = MockIo::field_at_rest();
    let address = cp.config().bus_address;

    cp.cycle(&io, TickEvents::idle()).unwrap();
    assert!(cp.poll_status_packet().is_some());
    assert!(cp.poll_status_packet().is_none());

    cp.receive_packet(&MockPacket::code_route(CTC, address, Entrance::Main1Eastbound, true));
    cp.cycle(&io, TickEvents::idle()).unwrap();
    let (queued, outcome) = cp.last_outcome().unwrap();
    assert_eq!(queued.source, CommandSource::Bus);
    assert!(outcome.is_applied());

    let pkt = cp.poll_status_packet().unwrap();
    assert_eq!(pkt.len(), STATUS_PACKET_LEN);
    assert_eq!(pkt[1], address);
    assert_eq!(pkt[5], b'S');
    // Main 1 west entrance cleared.
    assert_ne!(pkt[6] & 0x08, 0);
    // Both crossovers normal and locked.
    assert_eq!(pkt[7], 0x99);
}

#[test]
fn node_answers_ping_and_version_on_the_reply_path() {
    let mut cp = control_point(30);
    let address = cp.config().bus_address;

    cp.receive_packet(&MockPacket::raw(CTC, address, b'A', &[]));
    cp.receive_packet(&MockPacket::raw(CTC, 0xFF, b'V', &[]));

    let ping = cp.poll_reply_packet().unwrap();
    assert_eq!((ping[0], ping[1], ping[5]), (CTC, address, b'a'));
    let version = cp.poll_reply_packet().unwrap();
    assert_eq!(version[5], b'v');
    assert_eq!(&version[12..], b"CP3 ");
    assert!(cp.poll_reply_packet().is_none());
}

#[test]
fn malformed_command_leaves_matching_virtual_input_alone() {
    let bindings = InputBindings::default().with_virtual(InputId::Main1Os, NEIGHBOUR, b'C', 6);
    let mut cp = ControlPoint::new(ControlPointConfig::default(), &bindings, MockLatch::new());

    cp.receive_packet(&MockPacket::raw(NEIGHBOUR, 0x03, b'C', &[b'Z' | 1, 0, 0]));
    assert!(!cp.state().input(InputId::Main1Os));
    assert_eq!(cp.pending_commands(), 0);
}

#[test]
fn reset_request_from_the_bus() {
    let mut cp = control_point(30);
    let io = MockIo::field_at_rest();
    let address = cp.config().bus_address;
    code(&mut cp, &io, Entrance::Main1Eastbound, true);
    assert!(!cp.state().routes().is_empty());

    cp.receive_packet(&MockPacket::raw(CTC, address, b'X', &[]));
    assert!(cp.state().routes().is_empty());
    assert!(cp.state().aspects().iter().all(|a| *a == SignalAspect::Red));
}

#[test]
fn reset_returns_to_safe_state() {
    let mut cp = control_point(30);
    let io = MockIo::field_at_rest();
    code(&mut cp, &io, Entrance::Main1Eastbound, true);
    assert!(cp.submit(
        RemoteCommand::CodeRoute {
            entrance: Entrance::Main2Eastbound,
            set: true
        },
        CommandSource::Local
    ));

    cp.reset();
    assert!(cp.state().routes().is_empty());
    assert_eq!(cp.pending_commands(), 0);
    assert!(cp.state().aspects().iter().all(|a| *a == SignalAspect::Red));
    assert!(TurnoutId::ALL.iter().all(|id| !cp.state().turnout(*id).is_locked()));
}

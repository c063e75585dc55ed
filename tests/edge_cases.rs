//! Edge case and boundary condition tests for the control point

use cp_interlock::config::InputBindings;
use cp_interlock::hal::{MockIo, MockLatch, MockPacket};
use cp_interlock::outputs::{OutputFrame, SIGNAL_PINS, XIO_COUNT, XIO_PORTS};
use cp_interlock::packet;
use cp_interlock::{
    CommandSource, ControlPoint, ControlPointConfig, ControlPointState, Entrance, InputId, RejectReason,
    RemoteCommand, SignalHead, TickClock, TickEvents, TimelockId, TimelockState, TurnoutId,
};

fn control_point() -> ControlPoint<MockLatch> {
    ControlPoint::new(ControlPointConfig::default(), &InputBindings::default(), MockLatch::new())
}

// ============================================================================
// Wire Boundaries
// ============================================================================

#[test]
fn unknown_wire_ids_are_rejected_without_queueing() {
    let mut cp = control_point();
    let io = MockIo::field_at_rest();

    let mut pkt = MockPacket::code_route(0x10, 0x03, Entrance::Main1Eastbound, true);
    pkt[7] = 0;
    assert_eq!(RemoteCommand::decode(&pkt), Some(Err(RejectReason::UnknownEntrance)));
    cp.receive_packet(&pkt);

    let mut pkt = MockPacket::set_turnout(0x10, 0x03, TurnoutId::EastCrossover, true);
    pkt[7] = 0xFF;
    assert_eq!(RemoteCommand::decode(&pkt), Some(Err(RejectReason::UnknownTurnout)));
    cp.receive_packet(&pkt);

    assert_eq!(cp.pending_commands(), 0);
    cp.cycle(&io, TickEvents::idle()).unwrap();
    assert!(cp.last_outcome().is_none());
    assert!(cp.state().routes().is_empty());
}

#[test]
fn empty_and_truncated_packets_are_ignored() {
    let mut cp = control_point();
    let before = cp.status();

    cp.receive_packet(&[]);
    cp.receive_packet(&[0xFF]);
    cp.receive_packet(&[0xFF, 0x20, 6, 0, 0]);

    assert_eq!(cp.pending_commands(), 0);
    assert_eq!(cp.status(), before);
}

#[test]
fn virtual_bit_beyond_declared_length_is_ignored() {
    let bindings = InputBindings::default().with_virtual(InputId::Main1Os, 0x20, b'S', 8);
    let mut state = ControlPointState::new(&bindings);

    // Byte 8 is present in the buffer but past the declared length.
    let mut pkt = MockPacket::status(0x20, &[0x00, 0x00, 0xFF]);
    pkt[packet::LEN] = 8;
    state.apply_remote_filter(&pkt);
    assert!(!state.input(InputId::Main1Os));

    pkt[packet::LEN] = 9;
    state.apply_remote_filter(&pkt);
    assert!(state.input(InputId::Main1Os));
}

#[test]
fn status_from_other_source_leaves_inputs_alone() {
    let bindings = InputBindings::default().with_virtual(InputId::Main2Os, 0x20, b'S', 6);
    let mut state = ControlPointState::new(&bindings);

    state.apply_remote_filter(&MockPacket::status(0x21, &[0xFF]));
    state.apply_remote_filter(&MockPacket::raw(0x20, 0xFF, b'X', &[0xFF]));
    assert!(!state.input(InputId::Main2Os));
}

// ============================================================================
// Defensive Recovery
// ============================================================================

#[test]
fn unrecognized_timelock_code_relocks() {
    let mut state = ControlPointState::default();
    state.restore_timelock(TimelockId::Main, 42, 7);
    assert_eq!(state.timelock(TimelockId::Main).state(), TimelockState::Unknown);

    // Switch released (input high) on the default board.
    state.apply_local_filter(&MockIo::field_at_rest());
    state.step_timelock(30);
    assert_eq!(state.timelock(TimelockId::Main).state(), TimelockState::Relocking);
    state.step_timelock(30);
    assert_eq!(state.timelock(TimelockId::Main).state(), TimelockState::Locked);
}

#[test]
fn unknown_timelock_holds_signals_red() {
    let mut state = ControlPointState::default();
    assert!(state.code_route(Entrance::Main1Eastbound, true).is_applied());
    state.restore_timelock(TimelockId::Main, 9, 0);
    state.derive_aspects();
    assert!(state.aspects().iter().all(|a| a.is_red_family()));
}

#[test]
fn latch_failure_propagates_and_recovers() {
    let mut cp = control_point();
    let io = MockIo::field_at_rest();
    cp.latch_mut().fail_next = true;

    assert!(cp.cycle(&io, TickEvents::output_refresh(false)).is_err());
    assert!(cp.cycle(&io, TickEvents::output_refresh(false)).is_ok());
    assert_eq!(cp.latch().latch_count, 1);
}

#[test]
fn timer_floors_at_zero() {
    let mut cp = ControlPoint::new(
        ControlPointConfig::default().with_unlock_delay_secs(0),
        &InputBindings::default(),
        MockLatch::new(),
    );
    let mut io = MockIo::field_at_rest();
    io.engage_timelock_switch(true);

    for _ in 0..3 {
        cp.cycle(&io, TickEvents::idle().with_one_hz()).unwrap();
    }
    let tl = cp.state().timelock(TimelockId::Main);
    assert_eq!(tl.seconds_remaining(), 0);
    assert_eq!(tl.state(), TimelockState::Unlocked);
}

// ============================================================================
// Output Boundaries
// ============================================================================

#[test]
fn output_frame_ignores_out_of_range() {
    let mut frame = OutputFrame::new();
    frame.set(XIO_COUNT as u8, 0, 0, true);
    frame.set(0, XIO_PORTS as u8, 0, true);
    frame.set(0, 0, 8, true);
    assert_eq!(frame, OutputFrame::new());
    assert!(!frame.get(XIO_COUNT as u8, 0, 0));
    assert!(frame.device(XIO_COUNT as u8).is_none());
}

#[test]
fn common_anode_inverts_lamps() {
    let config = ControlPointConfig::default().with_common_anode(true);
    let mut cp = ControlPoint::new(config, &InputBindings::default(), MockLatch::new());
    cp.cycle(&MockIo::field_at_rest(), TickEvents::output_refresh(false)).unwrap();

    let pins = SIGNAL_PINS[SignalHead::Main2EastUpper.index()];
    let frame = cp.latch().last.unwrap();
    // Red lit is driven low, the other lamps high.
    assert!(!frame.get(pins.red.device, pins.red.port, pins.red.bit));
    assert!(frame.get(pins.yellow.device, pins.yellow.port, pins.yellow.bit));
    assert!(frame.get(pins.green.device, pins.green.port, pins.green.bit));
}

// ============================================================================
// Configuration Boundaries
// ============================================================================

#[test]
fn config_values_are_sanitized() {
    let config = ControlPointConfig::default()
        .with_bus_address(0xFF)
        .with_status_interval_decisecs(3)
        .with_unlock_delay_decisecs(305);
    assert_eq!(config.bus_address, 0x03);
    assert_eq!(config.status_interval_decisecs, 10);
    assert_eq!(config.unlock_delay_secs, 30);

    let config = ControlPointConfig::default().with_status_interval_decisecs(1000);
    assert_eq!(config.status_interval_decisecs, 255);
}

#[test]
fn unbound_input_reads_zeroed_physical_pin() {
    let mut state = ControlPointState::new(&InputBindings::empty());
    let io = MockIo::new().with_input(0, 0, 0, true);
    state.apply_local_filter(&io);
    // Every input now sits on device 0, port A, bit 0.
    assert!(InputId::ALL.iter().all(|id| state.input(*id)));
}

#[test]
fn queue_full_drops_newest() {
    let mut cp = control_point();
    let first = RemoteCommand::SetTurnout {
        turnout: TurnoutId::EastCrossover,
        normal: false,
    };
    assert!(cp.submit(first, CommandSource::Local));
    let filler = RemoteCommand::CodeRoute {
        entrance: Entrance::Main3Eastbound,
        set: true,
    };
    while cp.submit(filler, CommandSource::Local) {}
    assert_eq!(cp.pending_commands(), cp_interlock::COMMAND_QUEUE_LEN);

    // The whole queue drains in one cycle.
    cp.cycle(&MockIo::field_at_rest(), TickEvents::idle()).unwrap();
    assert_eq!(cp.pending_commands(), 0);
    assert!(!cp.state().turnout(TurnoutId::EastCrossover).requested_normal());
}

#[test]
fn tick_clock_fires_one_hz_every_ten_deciseconds() {
    let mut clock = TickClock::new();
    let fired: Vec<bool> = (0..30).map(|_| clock.decisecond().one_hz).collect();
    assert_eq!(fired.iter().filter(|f| **f).count(), 3);
}

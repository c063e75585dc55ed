//! Mock implementations for testing without hardware.
//!
//! This module provides test doubles for the I/O traits and a small packet
//! builder, enabling development and testing on desktop without an
//! expander board or a bus.
//!
//! # Available Mocks
//!
//! | Mock | Trait | Purpose |
//! |------|-------|---------|
//! | [`MockIo`] | [`DebouncedInputs`] | Settable input image, optional field simulation |
//! | [`MockLatch`] | [`OutputLatch`] | Records latched frames, injectable failure |
//! | [`MockPacket`] | - | Builds bus packets for the receive path |
//!
//! # Example
//!
//! ```rust
//! use cp_interlock::hal::{MockIo, MockLatch, MockPacket};
//! use cp_interlock::{ControlPoint, ControlPointConfig, Entrance, SignalAspect, SignalHead, TickEvents};
//! use cp_interlock::config::InputBindings;
//!
//! let mut cp = ControlPoint::new(ControlPointConfig::default(), &InputBindings::default(), MockLatch::new());
//! let io = MockIo::field_at_rest();
//!
//! cp.receive_packet(&MockPacket::code_route(0x10, 0x03, Entrance::Main1Eastbound, true));
//! cp.cycle(&io, TickEvents::output_refresh(false)).unwrap();
//!
//! assert_eq!(cp.state().aspect(SignalHead::Main1WestUpper), SignalAspect::Green);
//! assert_eq!(cp.latch().latch_count, 1);
//! ```
//!
//! [`DebouncedInputs`]: crate::traits::DebouncedInputs
//! [`OutputLatch`]: crate::traits::OutputLatch

use crate::config::DEFAULT_PHYSICAL_INPUTS;
use crate::input::{InputId, PhysicalBinding};
use crate::outputs::{OutputFrame, TURNOUT_PINS, XIO_COUNT, XIO_PORTS};
use crate::packet::{self, Packet};
use crate::route::Entrance;
use crate::traits::{DebouncedInputs, OutputLatch};
use crate::turnout::TurnoutId;

// ============================================================================
// Hardware Mocks
// ============================================================================

/// Mock debounced input image.
///
/// Holds one byte per expander port. Use the builder methods to place
/// levels, or [`field_at_rest`](Self::field_at_rest) for a plant with the
/// timelock switch released and both crossovers lying normal.
///
/// # Example
///
/// ```rust
/// use cp_interlock::hal::MockIo;
/// use cp_interlock::traits::DebouncedInputs;
/// use cp_interlock::{InputId, TurnoutId};
///
/// let mut io = MockIo::field_at_rest();
/// assert!(io.debounced(0, 3, 7)); // timelock switch released (active low)
///
/// io.engage_timelock_switch(true);
/// assert!(!io.debounced(0, 3, 7));
///
/// io.set_turnout_position(TurnoutId::EastCrossover, false);
/// assert!(!io.input(InputId::EastCrossoverActualPos));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MockIo {
    /// Port levels, `[device][port]`.
    pub ports: [[u8; XIO_PORTS]; XIO_COUNT],
}

impl MockIo {
    /// All inputs low.
    pub fn new() -> Self {
        Self::default()
    }

    /// Timelock switch released, crossovers and their manual levers normal.
    pub fn field_at_rest() -> Self {
        Self::new()
            .with_named(InputId::TimelockSwitch, true)
            .with_named(InputId::EastCrossoverActualPos, true)
            .with_named(InputId::WestCrossoverActualPos, true)
            .with_named(InputId::EastCrossoverManualPos, true)
            .with_named(InputId::WestCrossoverManualPos, true)
    }

    /// Builder: set one input bit.
    pub fn with_input(mut self, device: u8, port: u8, bit: u8, level: bool) -> Self {
        self.set(device, port, bit, level);
        self
    }

    /// Builder: set the bit a named input is wired to on the default board.
    pub fn with_named(mut self, id: InputId, level: bool) -> Self {
        self.set_input(id, level);
        self
    }

    /// Set one input bit. Out-of-range addresses are ignored.
    pub fn set(&mut self, device: u8, port: u8, bit: u8, level: bool) {
        if bit > 7 {
            return;
        }
        if let Some(p) = self
            .ports
            .get_mut(device as usize)
            .and_then(|d| d.get_mut(port as usize))
        {
            if level {
                *p |= 1 << bit;
            } else {
                *p &= !(1 << bit);
            }
        }
    }

    /// Set the bit a named input is wired to on the default board. Inputs
    /// with no default wiring are ignored.
    pub fn set_input(&mut self, id: InputId, level: bool) {
        if let Some(r) = DEFAULT_PHYSICAL_INPUTS.iter().find(|r| r.input == id) {
            self.set(r.binding.device, r.binding.port, r.binding.bit, level);
        }
    }

    /// Read back the bit a named input is wired to on the default board.
    pub fn input(&self, id: InputId) -> bool {
        DEFAULT_PHYSICAL_INPUTS
            .iter()
            .find(|r| r.input == id)
            .map_or(false, |r| self.read(r.binding))
    }

    /// Engage (`true`) or release the timelock switch. The switch input is
    /// active low.
    pub fn engage_timelock_switch(&mut self, engaged: bool) {
        self.set_input(InputId::TimelockSwitch, !engaged);
    }

    /// Place a crossover's position sense.
    pub fn set_turnout_position(&mut self, id: TurnoutId, normal: bool) {
        self.set_input(id.actual_position_input(), normal);
    }

    /// Place a crossover's manual lever.
    pub fn set_manual_lever(&mut self, id: TurnoutId, normal: bool) {
        self.set_input(id.manual_position_input(), normal);
    }

    /// Move every crossover's position sense to match the switch machine
    /// outputs in `frame`, as if the points had finished throwing.
    pub fn follow_turnout_outputs(&mut self, frame: &OutputFrame) {
        for id in TurnoutId::ALL {
            let out = TURNOUT_PINS[id.index()];
            let level = frame.get(out.pin.device, out.pin.port, out.pin.bit);
            self.set_turnout_position(id, level != out.is_normal_low);
        }
    }

    fn read(&self, pin: PhysicalBinding) -> bool {
        self.debounced(pin.device, pin.port, pin.bit)
    }
}

impl DebouncedInputs for MockIo {
    fn debounced(&self, device: u8, port: u8, bit: u8) -> bool {
        bit <= 7
            && self
                .ports
                .get(device as usize)
                .and_then(|d| d.get(port as usize))
                .map_or(false, |p| p & (1 << bit) != 0)
    }
}

/// Mock output latch.
///
/// Records the last latched frame and how many latches happened. Set
/// [`fail_next`](Self::fail_next) to make the next latch return an error.
///
/// # Example
///
/// ```rust
/// use cp_interlock::hal::MockLatch;
/// use cp_interlock::outputs::OutputFrame;
/// use cp_interlock::traits::OutputLatch;
///
/// let mut latch = MockLatch::new();
/// latch.fail_next = true;
/// assert!(latch.latch(&OutputFrame::new()).is_err());
/// assert!(latch.latch(&OutputFrame::new()).is_ok());
/// assert_eq!(latch.latch_count, 1);
/// ```
#[derive(Debug, Default)]
pub struct MockLatch {
    /// Most recently latched frame.
    pub last: Option<OutputFrame>,
    /// Number of successful latches.
    pub latch_count: usize,
    /// If set, the next latch fails and clears this flag.
    pub fail_next: bool,
}

impl MockLatch {
    /// Creates a new mock latch.
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutputLatch for MockLatch {
    type Error = ();

    fn latch(&mut self, frame: &OutputFrame) -> Result<(), ()> {
        if self.fail_next {
            self.fail_next = false;
            return Err(());
        }
        self.last = Some(*frame);
        self.latch_count += 1;
        Ok(())
    }
}

// ============================================================================
// Packet builder
// ============================================================================

/// Builds bus packets for tests. CRC bytes are left zero.
///
/// # Example
///
/// ```rust
/// use cp_interlock::hal::MockPacket;
/// use cp_interlock::{RemoteCommand, TurnoutId};
///
/// let pkt = MockPacket::set_turnout(0x10, 0x03, TurnoutId::WestCrossover, false);
/// assert_eq!(
///     RemoteCommand::decode(&pkt),
///     Some(Ok(RemoteCommand::SetTurnout { turnout: TurnoutId::WestCrossover, normal: false })),
/// );
/// ```
pub struct MockPacket;

impl MockPacket {
    /// Packet of type `msg_type` carrying `data` from `src` to `dest`.
    pub fn raw(src: u8, dest: u8, msg_type: u8, data: &[u8]) -> Packet {
        packet::build(src, dest, msg_type, data)
    }

    /// Broadcast status packet from a neighbour.
    pub fn status(src: u8, data: &[u8]) -> Packet {
        Self::raw(src, packet::BROADCAST, packet::TYPE_STATUS, data)
    }

    /// CTC route command.
    pub fn code_route(src: u8, dest: u8, entrance: Entrance, set: bool) -> Packet {
        let flag = if set { b'S' } else { b'C' };
        Self::raw(src, dest, packet::TYPE_COMMAND, &[b'G', entrance.code(), flag])
    }

    /// CTC turnout command.
    pub fn set_turnout(src: u8, dest: u8, turnout: TurnoutId, normal: bool) -> Packet {
        let flag = if normal { b'M' } else { b'D' };
        Self::raw(src, dest, packet::TYPE_COMMAND, &[b'T', turnout.index() as u8, flag])
    }
}

// ============================================================================
// Tests
// ============================================================================

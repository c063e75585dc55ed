//! Deferred output projection.
//!
//! Each cycle the logical state is rendered into an [`OutputFrame`], a bit
//! image of every expander output, which the I/O driver latches in one go.
//! The pin tables here are the static wiring of the control point board.
//!
//! # Example
//!
//! ```rust
//! use cp_interlock::outputs::{render_outputs, OutputFrame, SIGNAL_PINS};
//! use cp_interlock::{ControlPointState, SignalHead};
//!
//! let state = ControlPointState::default();
//! let mut frame = OutputFrame::new();
//! render_outputs(&state, &mut frame, false, true);
//!
//! // All heads at Red, common cathode: red lamps driven high.
//! let red = SIGNAL_PINS[SignalHead::Main1EastUpper.index()].red;
//! assert!(frame.get(red.device, red.port, red.bit));
//! ```

use crate::aspects::{Lamp, SignalHead};
use crate::input::PhysicalBinding;
use crate::state::ControlPointState;
use crate::timelock::TimelockId;
use crate::turnout::TurnoutId;

/// Number of I/O expanders on the board.
pub const XIO_COUNT: usize = 2;
/// Ports per expander.
pub const XIO_PORTS: usize = 5;

/// Port A.
pub const PORT_A: u8 = 0;
/// Port B.
pub const PORT_B: u8 = 1;
/// Port C.
pub const PORT_C: u8 = 2;
/// Port D.
pub const PORT_D: u8 = 3;
/// Port E.
pub const PORT_E: u8 = 4;

/// Bit image of all expander outputs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OutputFrame {
    ports: [[u8; XIO_PORTS]; XIO_COUNT],
}

impl OutputFrame {
    /// All outputs low.
    pub const fn new() -> Self {
        Self {
            ports: [[0; XIO_PORTS]; XIO_COUNT],
        }
    }

    /// Drive one output. Out-of-range addresses are ignored.
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

    /// Read back one output. Out-of-range addresses read low.
    pub fn get(&self, device: u8, port: u8, bit: u8) -> bool {
        bit <= 7 && self.port(device, port) & (1 << bit) != 0
    }

    /// Whole port byte, zero for out-of-range addresses.
    pub fn port(&self, device: u8, port: u8) -> u8 {
        self.ports
            .get(device as usize)
            .and_then(|d| d.get(port as usize))
            .copied()
            .unwrap_or(0)
    }

    /// Port bytes of one expander, for the driver's burst write.
    pub fn device(&self, device: u8) -> Option<&[u8; XIO_PORTS]> {
        self.ports.get(device as usize)
    }

    fn drive(&mut self, pin: PhysicalBinding, level: bool) {
        self.set(pin.device, pin.port, pin.bit, level);
    }
}

// ============================================================================
// Pin tables
// ============================================================================

/// Lamp outputs of one signal head.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SignalPins {
    /// Red lamp.
    pub red: PhysicalBinding,
    /// Yellow lamp.
    pub yellow: PhysicalBinding,
    /// Green lamp.
    pub green: PhysicalBinding,
}

impl SignalPins {
    const fn on_device0(red: (u8, u8), yellow: (u8, u8), green: (u8, u8)) -> Self {
        Self {
            red: PhysicalBinding::new(0, red.0, red.1),
            yellow: PhysicalBinding::new(0, yellow.0, yellow.1),
            green: PhysicalBinding::new(0, green.0, green.1),
        }
    }

    fn lamp(&self, lamp: Lamp) -> PhysicalBinding {
        match lamp {
            Lamp::Red => self.red,
            Lamp::Yellow => self.yellow,
            Lamp::Green => self.green,
        }
    }
}

/// Lamp wiring, indexed by [`SignalHead::index`].
pub const SIGNAL_PINS: [SignalPins; SignalHead::COUNT] = [
    SignalPins::on_device0((PORT_A, 0), (PORT_A, 1), (PORT_A, 2)),
    SignalPins::on_device0((PORT_A, 3), (PORT_A, 4), (PORT_A, 5)),
    SignalPins::on_device0((PORT_A, 6), (PORT_A, 7), (PORT_B, 0)),
    SignalPins::on_device0((PORT_B, 1), (PORT_B, 2), (PORT_B, 3)),
    SignalPins::on_device0((PORT_B, 4), (PORT_B, 5), (PORT_B, 6)),
    SignalPins::on_device0((PORT_B, 7), (PORT_C, 0), (PORT_C, 1)),
    SignalPins::on_device0((PORT_C, 2), (PORT_C, 3), (PORT_C, 4)),
    SignalPins::on_device0((PORT_C, 5), (PORT_C, 6), (PORT_C, 7)),
];

/// Control output of one turnout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TurnoutPin {
    /// Output driving the switch machine.
    pub pin: PhysicalBinding,
    /// If true the output is low for normal.
    pub is_normal_low: bool,
}

/// Switch machine wiring, indexed by [`TurnoutId::index`].
pub const TURNOUT_PINS: [TurnoutPin; TurnoutId::COUNT] = [
    TurnoutPin {
        pin: PhysicalBinding::new(1, PORT_A, 0),
        is_normal_low: false,
    },
    TurnoutPin {
        pin: PhysicalBinding::new(1, PORT_A, 1),
        is_normal_low: false,
    },
];

/// Timelock release indicator lamp.
pub const TIMELOCK_INDICATOR_PIN: PhysicalBinding = PhysicalBinding::new(0, PORT_D, 6);

// ============================================================================
// Rendering
// ============================================================================

/// Render signal lamps, switch machine outputs and the timelock indicator.
///
/// `common_anode` inverts the lamp drive (lamps active low). `blink_on` is
/// the current phase of the flash flag.
pub fn render_outputs(state: &ControlPointState, frame: &mut OutputFrame, common_anode: bool, blink_on: bool) {
    let on = !common_anode;

    for head in SignalHead::ALL {
        let pins = &SIGNAL_PINS[head.index()];
        frame.drive(pins.red, !on);
        frame.drive(pins.yellow, !on);
        frame.drive(pins.green, !on);
        if let Some(lamp) = state.aspect(head).lit_lamp(blink_on) {
            frame.drive(pins.lamp(lamp), on);
        }
    }

    for id in TurnoutId::ALL {
        let out = TURNOUT_PINS[id.index()];
        let normal = state.requested_normal(id);
        frame.drive(out.pin, normal != out.is_normal_low);
    }

    let indicator = state.timelock(TimelockId::Main).indicator();
    frame.drive(TIMELOCK_INDICATOR_PIN, indicator.is_lit(blink_on));
}

//! Input model: named sensors and the two filters that write them.
//!
//! Every input is bound once, at construction, either to a bit of a remote
//! node's status message (a *virtual* input) or to a debounced bit of the
//! local I/O expanders (a *physical* input). Only the matching filter ever
//! writes an input:
//!
//! - [`ControlPointState::apply_remote_filter`] for virtual inputs
//! - [`ControlPointState::apply_local_filter`] for physical inputs
//!
//! Interlocking logic reads inputs, never writes them.
//!
//! # Example
//!
//! ```rust
//! use cp_interlock::{ControlPointState, InputId};
//! use cp_interlock::config::InputBindings;
//!
//! // Main 1 OS occupancy is bit 0 of byte 6 in status packets from node 0x20.
//! let bindings = InputBindings::default().with_virtual(InputId::Main1Os, 0x20, b'S', 6);
//! let mut state = ControlPointState::new(&bindings);
//!
//! // dest, src, len, crc_l, crc_h, type, data...
//! let packet = [0xFF, 0x20, 8, 0, 0, b'S', 0x01, 0x00];
//! state.apply_remote_filter(&packet);
//! assert!(state.input(InputId::Main1Os));
//! ```

use log::trace;

use crate::packet;
use crate::state::ControlPointState;
use crate::traits::DebouncedInputs;

/// Named inputs of the control point.
///
/// The sixteen approach inputs come in four groups, one per approach
/// (Main 1 east, Main 2 east, Main 1 west, Main 2 west), each reporting the
/// adjoining block, the first and second approach blocks, and the
/// neighbour's tumble-down indication.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[allow(missing_docs)]
pub enum InputId {
    Main1EastAdjoin = 0,
    Main1EastApproach,
    Main1EastApproach2,
    Main1EastTumble,
    Main2EastAdjoin,
    Main2EastApproach,
    Main2EastApproach2,
    Main2EastTumble,
    Main1WestAdjoin,
    Main1WestApproach,
    Main1WestApproach2,
    Main1WestTumble,
    Main2WestAdjoin,
    Main2WestApproach,
    Main2WestApproach2,
    Main2WestTumble,
    /// Main 1 OS (interlocking limits) occupancy.
    Main1Os,
    /// Main 2 OS (interlocking limits) occupancy.
    Main2Os,
    /// East crossover position sense, set when normal.
    EastCrossoverActualPos,
    /// West crossover position sense, set when normal.
    WestCrossoverActualPos,
    /// East crossover manual lever, set when normal.
    EastCrossoverManualPos,
    /// West crossover manual lever, set when normal.
    WestCrossoverManualPos,
    /// Timelock release switch. Active low: clear means engaged.
    TimelockSwitch,
}

impl InputId {
    /// Number of inputs.
    pub const COUNT: usize = 23;

    /// Every input in index order.
    pub const ALL: [InputId; Self::COUNT] = [
        InputId::Main1EastAdjoin,
        InputId::Main1EastApproach,
        InputId::Main1EastApproach2,
        InputId::Main1EastTumble,
        InputId::Main2EastAdjoin,
        InputId::Main2EastApproach,
        InputId::Main2EastApproach2,
        InputId::Main2EastTumble,
        InputId::Main1WestAdjoin,
        InputId::Main1WestApproach,
        InputId::Main1WestApproach2,
        InputId::Main1WestTumble,
        InputId::Main2WestAdjoin,
        InputId::Main2WestApproach,
        InputId::Main2WestApproach2,
        InputId::Main2WestTumble,
        InputId::Main1Os,
        InputId::Main2Os,
        InputId::EastCrossoverActualPos,
        InputId::WestCrossoverActualPos,
        InputId::EastCrossoverManualPos,
        InputId::WestCrossoverManualPos,
        InputId::TimelockSwitch,
    ];

    /// Array index of this input.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

// ============================================================================
// Bindings
// ============================================================================

/// Location of a virtual input inside a remote node's message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VirtualBinding {
    /// Bus address of the reporting node.
    pub source: u8,
    /// Message type byte the bit is carried in.
    pub msg_type: u8,
    /// Byte offset within the packet.
    pub byte: u8,
    /// Bit within that byte (0..=7).
    pub bit: u8,
}

impl VirtualBinding {
    /// Build a binding from the packed configuration byte: the low five bits
    /// are the byte offset, the high three bits the bit number.
    ///
    /// ```
    /// use cp_interlock::input::VirtualBinding;
    ///
    /// let b = VirtualBinding::from_bit_byte(0x30, b'S', (3 << 5) | 7);
    /// assert_eq!(b.byte, 7);
    /// assert_eq!(b.bit, 3);
    /// ```
    pub const fn from_bit_byte(source: u8, msg_type: u8, bit_byte: u8) -> Self {
        Self {
            source,
            msg_type,
            byte: bit_byte & 0x1F,
            bit: bit_byte >> 5,
        }
    }

    /// Extract this input's value from `packet`.
    ///
    /// Returns `None` when the packet is not from the bound source, is of
    /// another type, or is too short to carry the bound byte.
    pub fn read(&self, packet: &[u8]) -> Option<bool> {
        if packet.len() <= packet::TYPE {
            return None;
        }
        if packet[packet::SRC] != self.source || packet[packet::TYPE] != self.msg_type {
            return None;
        }
        let byte = self.byte as usize;
        if byte >= packet[packet::LEN] as usize {
            return None;
        }
        packet.get(byte).map(|b| b & (1 << (self.bit & 0x07)) != 0)
    }
}

/// Location of a physical input on the local I/O expanders.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PhysicalBinding {
    /// Expander index.
    pub device: u8,
    /// Port on the expander (A = 0 .. E = 4).
    pub port: u8,
    /// Bit within the port.
    pub bit: u8,
}

impl PhysicalBinding {
    /// Create a physical binding.
    pub const fn new(device: u8, port: u8, bit: u8) -> Self {
        Self { device, port, bit }
    }
}

/// Resolved binding of one input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum InputBinding {
    /// Value arrives in a remote message.
    Virtual(VirtualBinding),
    /// Value read from local I/O.
    Physical(PhysicalBinding),
}

impl Default for InputBinding {
    fn default() -> Self {
        InputBinding::Physical(PhysicalBinding::default())
    }
}

impl InputBinding {
    /// True for inputs fed by remote messages.
    pub fn is_virtual(&self) -> bool {
        matches!(self, InputBinding::Virtual(_))
    }
}

/// One input: current value plus its immutable binding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Input {
    pub(crate) is_set: bool,
    binding: InputBinding,
}

impl Input {
    pub(crate) fn new(binding: InputBinding) -> Self {
        Self {
            is_set: false,
            binding,
        }
    }

    /// Current value.
    pub fn is_set(&self) -> bool {
        self.is_set
    }

    /// True if the value arrives via a remote message.
    pub fn is_virtual(&self) -> bool {
        self.binding.is_virtual()
    }

    /// Binding resolved at construction.
    pub fn binding(&self) -> &InputBinding {
        &self.binding
    }
}

// ============================================================================
// Filters
// ============================================================================

impl ControlPointState {
    /// Current value of an input.
    #[inline]
    pub fn input(&self, id: InputId) -> bool {
        self.inputs[id.index()].is_set
    }

    /// Full record of an input.
    pub fn input_state(&self, id: InputId) -> &Input {
        &self.inputs[id.index()]
    }

    /// Update every virtual input bound to this message's source and type.
    ///
    /// Messages that match no binding leave all inputs unchanged.
    pub fn apply_remote_filter(&mut self, packet: &[u8]) {
        for (id, input) in InputId::ALL.iter().zip(self.inputs.iter_mut()) {
            let InputBinding::Virtual(binding) = input.binding else {
                continue;
            };
            if let Some(value) = binding.read(packet) {
                if input.is_set != value {
                    trace!("virtual input {:?} -> {}", id, value);
                }
                input.is_set = value;
            }
        }
    }

    /// Update every physical input from the debounced local I/O snapshot.
    pub fn apply_local_filter<I: DebouncedInputs + ?Sized>(&mut self, io: &I) {
        for input in self.inputs.iter_mut() {
            if let InputBinding::Physical(b) = input.binding {
                input.is_set = io.debounced(b.device, b.port, b.bit);
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn set_input(&mut self, id: InputId, value: bool) {
        self.inputs[id.index()].is_set = value;
    }
}

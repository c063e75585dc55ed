//! Command types, decoding and outcomes.
//!
//! Two commands reach the interlocking, whatever surface they arrive on:
//!
//! - [`RemoteCommand::SetTurnout`] asks for a crossover position
//! - [`RemoteCommand::CodeRoute`] sets or clears a route from an entrance
//!
//! Commands are authorized against the current state and either applied or
//! rejected with a [`RejectReason`]. A rejection is an ordinary value, not
//! an error, and never changes state.
//!
//! # Command Flow
//!
//! 1. A bus packet is decoded with [`RemoteCommand::decode`], or a web/MQTT
//!    request is parsed into a [`RemoteCommand`]
//! 2. The command is queued with its [`CommandSource`]
//! 3. At the next cycle boundary it is applied with
//!    [`ControlPointState::apply_command`]
//!
//! # Example
//!
//! ```rust
//! use cp_interlock::{CommandSource, ControlPointState, Entrance, RemoteCommand};
//!
//! // dest, src, len, crc_l, crc_h, 'C', 'G', entrance 2, 'S'
//! let packet = [0x03, 0x01, 9, 0, 0, b'C', b'G', 2, b'S'];
//! let cmd = RemoteCommand::decode(&packet).unwrap().unwrap();
//! assert_eq!(cmd, RemoteCommand::CodeRoute { entrance: Entrance::Main1Westbound, set: true });
//!
//! let mut state = ControlPointState::default();
//! assert!(state.apply_command(cmd, CommandSource::Bus).is_applied());
//! ```

use core::fmt;

use log::{debug, warn};

use crate::packet;
use crate::route::Entrance;
use crate::state::ControlPointState;
use crate::turnout::TurnoutId;

// ============================================================================
// Command Source
// ============================================================================

/// Where a command came from. Used for logging and reporting only; every
/// source is authorized by the same rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CommandSource {
    /// CTC command packet on the bus.
    Bus,
    /// REST API.
    WebApi,
    /// MQTT command topic.
    Mqtt,
    /// Local panel or test harness.
    Local,
}

impl CommandSource {
    /// Returns the source as a lowercase string.
    pub const fn as_str(&self) -> &'static str {
        match self {
            CommandSource::Bus => "bus",
            CommandSource::WebApi => "web_api",
            CommandSource::Mqtt => "mqtt",
            CommandSource::Local => "local",
        }
    }
}

// ============================================================================
// Commands
// ============================================================================

/// A request to the interlocking.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RemoteCommand {
    /// Move a crossover.
    SetTurnout {
        /// Which crossover.
        turnout: TurnoutId,
        /// `true` for normal, `false` for reverse.
        normal: bool,
    },
    /// Set or clear a route.
    CodeRoute {
        /// Entrance signal the route starts at.
        entrance: Entrance,
        /// `true` to set, `false` to clear.
        set: bool,
    },
}

impl RemoteCommand {
    /// Decode a CTC command packet.
    ///
    /// Returns `None` if the packet is not a well-formed CTC command (wrong
    /// type, shorter than nine bytes, unknown sub-command or flag byte).
    /// A well-formed command naming a turnout or entrance that does not
    /// exist returns `Some(Err(..))`.
    ///
    /// | Byte 6 | Byte 7 | Byte 8 |
    /// |--------|--------|--------|
    /// | `'G'` | entrance number | `'S'` set / `'C'` clear |
    /// | `'T'` | turnout number | `'M'` normal / `'D'` reverse |
    ///
    /// ```
    /// use cp_interlock::{RejectReason, RemoteCommand, TurnoutId};
    ///
    /// let pkt = [0x03, 0x01, 9, 0, 0, b'C', b'T', 1, b'D'];
    /// assert_eq!(
    ///     RemoteCommand::decode(&pkt),
    ///     Some(Ok(RemoteCommand::SetTurnout { turnout: TurnoutId::WestCrossover, normal: false })),
    /// );
    ///
    /// let pkt = [0x03, 0x01, 9, 0, 0, b'C', b'T', 9, b'M'];
    /// assert_eq!(RemoteCommand::decode(&pkt), Some(Err(RejectReason::UnknownTurnout)));
    ///
    /// let pkt = [0x03, 0x01, 9, 0, 0, b'C', b'T', 1, b'X'];
    /// assert_eq!(RemoteCommand::decode(&pkt), None);
    /// ```
    pub fn decode(pkt: &[u8]) -> Option<Result<Self, RejectReason>> {
        if pkt.len() < 9 || pkt[packet::TYPE] != packet::TYPE_COMMAND || pkt[packet::LEN] < 9 {
            return None;
        }
        let (kind, id, flag) = (pkt[6], pkt[7], pkt[8]);
        match (kind, flag) {
            (b'G', b'S' | b'C') => Some(
                Entrance::from_wire(id)
                    .map(|entrance| RemoteCommand::CodeRoute {
                        entrance,
                        set: flag == b'S',
                    })
                    .ok_or(RejectReason::UnknownEntrance),
            ),
            (b'T', b'M' | b'D') => Some(
                TurnoutId::from_wire(id)
                    .map(|turnout| RemoteCommand::SetTurnout {
                        turnout,
                        normal: flag == b'M',
                    })
                    .ok_or(RejectReason::UnknownTurnout),
            ),
            _ => None,
        }
    }
}

// ============================================================================
// Command Outcomes
// ============================================================================

/// Result of applying a command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CommandOutcome {
    /// The command took effect.
    Applied,
    /// The command was refused; state is unchanged.
    Rejected(RejectReason),
}

impl CommandOutcome {
    /// True if the command took effect.
    pub fn is_applied(&self) -> bool {
        matches!(self, CommandOutcome::Applied)
    }

    /// The rejection reason, if any.
    pub fn reject_reason(&self) -> Option<RejectReason> {
        match self {
            CommandOutcome::Applied => None,
            CommandOutcome::Rejected(reason) => Some(*reason),
        }
    }
}

/// Reason a command was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RejectReason {
    /// The timelock is not Locked.
    TimelockOpen,
    /// A main-track OS section is occupied.
    TrackOccupied,
    /// The turnout is locked by a route.
    TurnoutLocked,
    /// The crossover alignment leads nowhere from this entrance.
    AlignmentNotRoutable,
    /// The opposing route is already set.
    ConflictingRoute,
    /// The active-route set is full.
    RouteTableFull,
    /// No turnout with that number.
    UnknownTurnout,
    /// No entrance with that number.
    UnknownEntrance,
}

impl RejectReason {
    /// Returns the reason as a lowercase string.
    pub const fn as_str(&self) -> &'static str {
        match self {
            RejectReason::TimelockOpen => "timelock_open",
            RejectReason::TrackOccupied => "track_occupied",
            RejectReason::TurnoutLocked => "turnout_locked",
            RejectReason::AlignmentNotRoutable => "alignment_not_routable",
            RejectReason::ConflictingRoute => "conflicting_route",
            RejectReason::RouteTableFull => "route_table_full",
            RejectReason::UnknownTurnout => "unknown_turnout",
            RejectReason::UnknownEntrance => "unknown_entrance",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ControlPointState {
    /// Authorize and apply a command.
    pub fn apply_command(&mut self, cmd: RemoteCommand, source: CommandSource) -> CommandOutcome {
        let outcome = match cmd {
            RemoteCommand::SetTurnout { turnout, normal } => self.set_turnout(turnout, normal),
            RemoteCommand::CodeRoute { entrance, set } => self.code_route(entrance, set),
        };
        match outcome {
            CommandOutcome::Applied => debug!("{:?} from {} applied", cmd, source.as_str()),
            CommandOutcome::Rejected(reason) => {
                warn!("{:?} from {} rejected: {}", cmd, source.as_str(), reason)
            }
        }
        outcome
    }
}

//! Turnout model and turnout command authorization.
//!
//! Each crossover carries two positions: the *actual* position, written only
//! from the sensed track position, and the *requested* position, written
//! only by an authorized command or by the manual lever while the timelock
//! is open. Whenever the two differ the turnout is in motion and every
//! signal shows Red.
//!
//! # Example
//!
//! ```rust
//! use cp_interlock::{ControlPointState, TurnoutId};
//!
//! let mut state = ControlPointState::default();
//!
//! // Timelock is Locked and nothing is occupied: the request is accepted.
//! let outcome = state.set_turnout(TurnoutId::EastCrossover, false);
//! assert!(outcome.is_applied());
//! assert!(!state.requested_normal(TurnoutId::EastCrossover));
//!
//! // The actual position has not moved yet.
//! assert!(state.actual_normal(TurnoutId::EastCrossover));
//! assert!(state.turnouts_in_motion());
//! ```

use crate::commands::{CommandOutcome, RejectReason};
use crate::input::InputId;
use crate::state::ControlPointState;
use crate::timelock::{TimelockId, TimelockState};

/// Turnouts of the control point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TurnoutId {
    /// Crossover at the east end.
    EastCrossover = 0,
    /// Crossover at the west end.
    WestCrossover = 1,
}

impl TurnoutId {
    /// Number of turnouts.
    pub const COUNT: usize = 2;

    /// Every turnout in index order.
    pub const ALL: [TurnoutId; Self::COUNT] = [TurnoutId::EastCrossover, TurnoutId::WestCrossover];

    /// Array index of this turnout.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Decode a turnout number received from the bus.
    ///
    /// Out-of-range numbers return `None`.
    ///
    /// ```
    /// use cp_interlock::TurnoutId;
    ///
    /// assert_eq!(TurnoutId::from_wire(0), Some(TurnoutId::EastCrossover));
    /// assert_eq!(TurnoutId::from_wire(1), Some(TurnoutId::WestCrossover));
    /// assert_eq!(TurnoutId::from_wire(2), None);
    /// ```
    pub const fn from_wire(code: u8) -> Option<Self> {
        match code {
            0 => Some(TurnoutId::EastCrossover),
            1 => Some(TurnoutId::WestCrossover),
            _ => None,
        }
    }

    /// Returns the turnout name as a lowercase string.
    pub const fn as_str(&self) -> &'static str {
        match self {
            TurnoutId::EastCrossover => "east_crossover",
            TurnoutId::WestCrossover => "west_crossover",
        }
    }

    /// Parse a turnout name. Accepts `east_crossover`/`east`/`e` and the
    /// west equivalents, trimmed and case-insensitive.
    pub fn from_name(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("east_crossover") || s.eq_ignore_ascii_case("east") || s.eq_ignore_ascii_case("e") {
            Some(TurnoutId::EastCrossover)
        } else if s.eq_ignore_ascii_case("west_crossover") || s.eq_ignore_ascii_case("west") || s.eq_ignore_ascii_case("w") {
            Some(TurnoutId::WestCrossover)
        } else {
            None
        }
    }

    /// Input reporting the sensed position of this turnout.
    pub const fn actual_position_input(self) -> InputId {
        match self {
            TurnoutId::EastCrossover => InputId::EastCrossoverActualPos,
            TurnoutId::WestCrossover => InputId::WestCrossoverActualPos,
        }
    }

    /// Input reporting the position of this turnout's manual lever.
    pub const fn manual_position_input(self) -> InputId {
        match self {
            TurnoutId::EastCrossover => InputId::EastCrossoverManualPos,
            TurnoutId::WestCrossover => InputId::WestCrossoverManualPos,
        }
    }
}

/// State of one turnout.
///
/// # Default
///
/// Normal (both actual and requested), unlocked, not manual.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Turnout {
    actual_normal: bool,
    requested_normal: bool,
    locked: bool,
    manual: bool,
}

impl Default for Turnout {
    fn default() -> Self {
        Self {
            actual_normal: true,
            requested_normal: true,
            locked: false,
            manual: false,
        }
    }
}

impl Turnout {
    /// Last sensed position.
    pub fn actual_normal(&self) -> bool {
        self.actual_normal
    }

    /// Commanded position.
    pub fn requested_normal(&self) -> bool {
        self.requested_normal
    }

    /// Interlocking lock, set by route coding.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// True while the turnout is under manual control.
    pub fn is_manual(&self) -> bool {
        self.manual
    }

    /// True when the sensed position has not caught up with the request.
    pub fn in_motion(&self) -> bool {
        self.actual_normal != self.requested_normal
    }
}

// ============================================================================
// Turnout accessors
// ============================================================================

impl ControlPointState {
    /// State of a turnout.
    #[inline]
    pub fn turnout(&self, id: TurnoutId) -> &Turnout {
        &self.turnouts[id.index()]
    }

    /// All turnouts, indexed by [`TurnoutId::index`].
    pub fn turnouts(&self) -> &[Turnout; TurnoutId::COUNT] {
        &self.turnouts
    }

    /// Look up a turnout by its bus number. Out-of-range numbers return
    /// `None` rather than failing.
    pub fn turnout_by_wire(&self, code: u8) -> Option<&Turnout> {
        TurnoutId::from_wire(code).map(|id| self.turnout(id))
    }

    /// Commanded position of a turnout.
    pub fn requested_normal(&self, id: TurnoutId) -> bool {
        self.turnout(id).requested_normal
    }

    /// Sensed position of a turnout.
    pub fn actual_normal(&self, id: TurnoutId) -> bool {
        self.turnout(id).actual_normal
    }

    /// Interlocking lock of a turnout.
    pub fn is_turnout_locked(&self, id: TurnoutId) -> bool {
        self.turnout(id).locked
    }

    /// Manual-control flag of a turnout.
    pub fn is_turnout_manual(&self, id: TurnoutId) -> bool {
        self.turnout(id).manual
    }

    /// True when either crossover's sensed and requested positions differ.
    pub fn turnouts_in_motion(&self) -> bool {
        self.turnouts.iter().any(Turnout::in_motion)
    }

    pub(crate) fn set_requested_normal(&mut self, id: TurnoutId, normal: bool) {
        self.turnouts[id.index()].requested_normal = normal;
    }

    pub(crate) fn set_turnout_locked(&mut self, id: TurnoutId, locked: bool) {
        self.turnouts[id.index()].locked = locked;
    }

    pub(crate) fn set_turnout_manual(&mut self, id: TurnoutId, manual: bool) {
        self.turnouts[id.index()].manual = manual;
    }

    pub(crate) fn set_all_turnouts_locked(&mut self, locked: bool) {
        for id in TurnoutId::ALL {
            self.set_turnout_locked(id, locked);
        }
    }

    pub(crate) fn set_all_turnouts_manual(&mut self, manual: bool) {
        for id in TurnoutId::ALL {
            self.set_turnout_manual(id, manual);
        }
    }

    /// Copy each turnout's position-sense input into its actual position.
    ///
    /// This is the only writer of [`Turnout::actual_normal`]. A set input
    /// means the points lie normal.
    pub fn sense_turnout_positions(&mut self) {
        for id in TurnoutId::ALL {
            let sensed = self.input(id.actual_position_input());
            self.turnouts[id.index()].actual_normal = sensed;
        }
    }

    // ========================================================================
    // Authorization
    // ========================================================================

    /// Request a new position for a turnout.
    ///
    /// Accepted only while the main timelock is Locked, neither main-track
    /// occupancy input is set, and the turnout is not locked by a route. A
    /// rejected request changes nothing.
    pub fn set_turnout(&mut self, id: TurnoutId, normal: bool) -> CommandOutcome {
        if self.timelock(TimelockId::Main).state() != TimelockState::Locked {
            return CommandOutcome::Rejected(RejectReason::TimelockOpen);
        }
        if self.input(InputId::Main1Os) || self.input(InputId::Main2Os) {
            return CommandOutcome::Rejected(RejectReason::TrackOccupied);
        }
        if self.is_turnout_locked(id) {
            return CommandOutcome::Rejected(RejectReason::TurnoutLocked);
        }

        self.set_requested_normal(id, normal);
        CommandOutcome::Applied
    }
}

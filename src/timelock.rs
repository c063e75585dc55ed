//! Timelock state machine.
//!
//! A timelock holds the crossovers under interlocking control until a
//! maintainer operates the release switch and waits out the unlock delay.
//! Only then may the manual levers move the points. Every turnout and route
//! command is refused unless the timelock is [`Locked`](TimelockState::Locked).
//!
//! # States
//!
//! ```text
//!            switch on                timer == 0
//!   Locked ------------> TimerRunning ----------> Unlocked
//!     ^                       |                      |
//!     |        switch off     |                      | switch off
//!     +-----------------------+                      v
//!     +------------------------------------------- Relocking
//!                   switch off
//! ```
//!
//! An unrecognized state is forced to `Relocking`.
//!
//! # Example
//!
//! ```rust
//! use cp_interlock::{ControlPointState, TimelockId, TimelockState};
//!
//! let mut state = ControlPointState::default();
//! // With default inputs the release switch reads engaged (active low).
//! state.step_timelock(3);
//! assert_eq!(state.timelock(TimelockId::Main).state(), TimelockState::TimerRunning);
//! assert_eq!(state.timelock(TimelockId::Main).seconds_remaining(), 3);
//!
//! for _ in 0..3 {
//!     state.apply_1hz_tick();
//!     state.step_timelock(3);
//! }
//! assert_eq!(state.timelock(TimelockId::Main).state(), TimelockState::Unlocked);
//! ```

use log::{info, warn};

use crate::input::InputId;
use crate::state::ControlPointState;
use crate::turnout::TurnoutId;

/// Timelocks of the control point. One timelock governs both crossovers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TimelockId {
    /// The timelock covering the east and west crossovers.
    Main = 0,
}

impl TimelockId {
    /// Number of timelocks.
    pub const COUNT: usize = 1;

    /// Every timelock in index order.
    pub const ALL: [TimelockId; Self::COUNT] = [TimelockId::Main];

    /// Array index of this timelock.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// State of a timelock.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TimelockState {
    /// Interlocking in control.
    #[default]
    Locked,
    /// Release requested, counting down.
    TimerRunning,
    /// Manual control granted.
    Unlocked,
    /// Release switch returned, waiting to lock.
    Relocking,
    /// Unrecognized state.
    Unknown,
}

impl TimelockState {
    /// Stored state code.
    pub const fn code(self) -> u8 {
        match self {
            TimelockState::Locked => 0,
            TimelockState::TimerRunning => 1,
            TimelockState::Unlocked => 2,
            TimelockState::Relocking => 3,
            TimelockState::Unknown => 100,
        }
    }

    /// Decode a stored state code. Anything unrecognized is
    /// [`Unknown`](Self::Unknown).
    ///
    /// ```
    /// use cp_interlock::TimelockState;
    ///
    /// assert_eq!(TimelockState::from_code(2), TimelockState::Unlocked);
    /// assert_eq!(TimelockState::from_code(42), TimelockState::Unknown);
    /// ```
    pub const fn from_code(code: u8) -> Self {
        match code {
            0 => TimelockState::Locked,
            1 => TimelockState::TimerRunning,
            2 => TimelockState::Unlocked,
            3 => TimelockState::Relocking,
            _ => TimelockState::Unknown,
        }
    }

    /// Returns the state as a lowercase string.
    pub const fn as_str(&self) -> &'static str {
        match self {
            TimelockState::Locked => "locked",
            TimelockState::TimerRunning => "timer_running",
            TimelockState::Unlocked => "unlocked",
            TimelockState::Relocking => "relocking",
            TimelockState::Unknown => "unknown",
        }
    }
}

/// What the release indicator lamp shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum IndicatorMode {
    /// Dark.
    #[default]
    Off,
    /// Follows the blink flag.
    Blinking,
    /// Steady on.
    Solid,
}

impl IndicatorMode {
    /// Whether the lamp is lit in this blink phase.
    pub const fn is_lit(self, blink_on: bool) -> bool {
        match self {
            IndicatorMode::Off => false,
            IndicatorMode::Blinking => blink_on,
            IndicatorMode::Solid => true,
        }
    }
}

/// One timelock.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Timelock {
    pub(crate) state: TimelockState,
    pub(crate) seconds_remaining: u16,
    pub(crate) indicator: IndicatorMode,
}

impl Timelock {
    /// Current state.
    pub fn state(&self) -> TimelockState {
        self.state
    }

    /// Seconds left on the unlock countdown.
    pub fn seconds_remaining(&self) -> u16 {
        self.seconds_remaining
    }

    /// Current release indicator mode.
    pub fn indicator(&self) -> IndicatorMode {
        self.indicator
    }
}

// ============================================================================
// State machine
// ============================================================================

impl ControlPointState {
    /// State of a timelock.
    #[inline]
    pub fn timelock(&self, id: TimelockId) -> &Timelock {
        &self.timelocks[id.index()]
    }

    pub(crate) fn timelock_mut(&mut self, id: TimelockId) -> &mut Timelock {
        &mut self.timelocks[id.index()]
    }

    /// Load a timelock from a stored state code, e.g. after a warm restart.
    /// Unrecognized codes load as [`TimelockState::Unknown`] and recover
    /// through `Relocking` on the next step.
    pub fn restore_timelock(&mut self, id: TimelockId, code: u8, seconds_remaining: u16) {
        let tl = self.timelock_mut(id);
        tl.state = TimelockState::from_code(code);
        tl.seconds_remaining = seconds_remaining;
    }

    /// Count every running timer down by one second, stopping at zero.
    ///
    /// Call exactly once per 1 Hz tick.
    pub fn apply_1hz_tick(&mut self) {
        for tl in self.timelocks.iter_mut() {
            tl.seconds_remaining = tl.seconds_remaining.saturating_sub(1);
        }
    }

    /// Advance the main timelock one step from the release switch input.
    ///
    /// `unlock_delay_secs` is loaded into the countdown when the switch is
    /// first engaged.
    pub fn step_timelock(&mut self, unlock_delay_secs: u16) {
        let switch_on = !self.input(InputId::TimelockSwitch);
        let current = self.timelock(TimelockId::Main).state;

        let next = match current {
            TimelockState::Locked if switch_on => {
                let tl = self.timelock_mut(TimelockId::Main);
                tl.seconds_remaining = unlock_delay_secs;
                tl.indicator = IndicatorMode::Blinking;
                TimelockState::TimerRunning
            }
            TimelockState::Locked => {
                self.timelock_mut(TimelockId::Main).indicator = IndicatorMode::Off;
                self.set_all_turnouts_manual(false);
                TimelockState::Locked
            }
            TimelockState::TimerRunning if !switch_on => TimelockState::Locked,
            TimelockState::TimerRunning if self.timelock(TimelockId::Main).seconds_remaining == 0 => {
                TimelockState::Unlocked
            }
            TimelockState::TimerRunning => {
                self.routes.clear_all();
                self.set_all_turnouts_manual(true);
                self.timelock_mut(TimelockId::Main).indicator = IndicatorMode::Blinking;
                TimelockState::TimerRunning
            }
            TimelockState::Unlocked if !switch_on => TimelockState::Relocking,
            TimelockState::Unlocked => {
                self.set_all_turnouts_locked(false);
                self.routes.clear_all();
                self.set_all_turnouts_manual(true);
                for id in TurnoutId::ALL {
                    let lever = self.input(id.manual_position_input());
                    self.set_requested_normal(id, lever);
                }
                self.timelock_mut(TimelockId::Main).indicator = IndicatorMode::Solid;
                TimelockState::Unlocked
            }
            TimelockState::Relocking if !switch_on => TimelockState::Locked,
            TimelockState::Relocking => TimelockState::Relocking,
            TimelockState::Unknown => {
                warn!("timelock in unrecognized state, forcing relock");
                TimelockState::Relocking
            }
        };

        if next != current {
            info!("timelock {} -> {}", current.as_str(), next.as_str());
            self.timelock_mut(TimelockId::Main).state = next;
        }
    }
}

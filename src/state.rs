//! The single owned state aggregate of the control point.
//!
//! [`ControlPointState`] holds every signal aspect, turnout, input, timelock
//! and the active-route set. It is sized at construction and never
//! reallocated; every interlocking operation takes it by reference. The
//! operations themselves live next to the data they govern:
//!
//! | Module | Operations |
//! |--------|------------|
//! | [`input`](crate::input) | binding resolution, remote and local filters |
//! | [`turnout`](crate::turnout) | accessors, position sense, `set_turnout` |
//! | [`timelock`](crate::timelock) | 1 Hz tick, `step_timelock` |
//! | [`route`](crate::route) | `code_route`, occupancy-driven clearing |
//! | [`signals`](crate::signals) | `derive_aspects` |
//! | [`status`](crate::status) | `status` projection |
//!
//! # Example
//!
//! ```rust
//! use cp_interlock::{ControlPointState, SignalAspect, SignalHead, TimelockState, TimelockId};
//! use cp_interlock::config::InputBindings;
//!
//! let state = ControlPointState::new(&InputBindings::default());
//! assert_eq!(state.aspect(SignalHead::Main1WestUpper), SignalAspect::Red);
//! assert_eq!(state.timelock(TimelockId::Main).state(), TimelockState::Locked);
//! assert!(state.routes().is_empty());
//! ```

use crate::aspects::{SignalAspect, SignalHead};
use crate::config::InputBindings;
use crate::input::{Input, InputId};
use crate::route::ActiveRoutes;
use crate::timelock::{Timelock, TimelockId};
use crate::turnout::{Turnout, TurnoutId};

/// Aggregate interlocking state.
///
/// Created once at power-up with the resolved input bindings. [`reset`]
/// returns it to the initial safe state: all signals Red, all turnouts
/// normal and unlocked, all timelocks Locked, no routes. Bindings survive a
/// reset.
///
/// [`reset`]: Self::reset
#[derive(Clone, Debug)]
pub struct ControlPointState {
    pub(crate) signals: [SignalAspect; SignalHead::COUNT],
    pub(crate) turnouts: [Turnout; TurnoutId::COUNT],
    pub(crate) inputs: [Input; InputId::COUNT],
    pub(crate) timelocks: [Timelock; TimelockId::COUNT],
    pub(crate) routes: ActiveRoutes,
}

impl ControlPointState {
    /// Create the state, resolving every input's binding against `bindings`.
    pub fn new(bindings: &InputBindings) -> Self {
        Self {
            signals: [SignalAspect::Red; SignalHead::COUNT],
            turnouts: [Turnout::default(); TurnoutId::COUNT],
            inputs: InputId::ALL.map(|id| Input::new(bindings.resolve(id))),
            timelocks: [Timelock::default(); TimelockId::COUNT],
            routes: ActiveRoutes::new(),
        }
    }

    /// Return to the power-up safe state. Input bindings are kept, input
    /// values are cleared.
    pub fn reset(&mut self) {
        self.signals = [SignalAspect::Red; SignalHead::COUNT];
        self.turnouts = [Turnout::default(); TurnoutId::COUNT];
        for input in self.inputs.iter_mut() {
            input.is_set = false;
        }
        self.timelocks = [Timelock::default(); TimelockId::COUNT];
        self.routes.clear_all();
    }

    /// Current aspect of a signal head.
    #[inline]
    pub fn aspect(&self, head: SignalHead) -> SignalAspect {
        self.signals[head.index()]
    }

    /// All aspects, indexed by [`SignalHead::index`].
    pub fn aspects(&self) -> &[SignalAspect; SignalHead::COUNT] {
        &self.signals
    }

    #[inline]
    pub(crate) fn set_aspect(&mut self, head: SignalHead, aspect: SignalAspect) {
        self.signals[head.index()] = aspect;
    }

    pub(crate) fn set_all_aspects(&mut self, aspect: SignalAspect) {
        self.signals = [aspect; SignalHead::COUNT];
    }

    /// The active-route set.
    pub fn routes(&self) -> &ActiveRoutes {
        &self.routes
    }
}

impl Default for ControlPointState {
    fn default() -> Self {
        Self::new(&InputBindings::default())
    }
}

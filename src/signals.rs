//! Signal aspect engine.
//!
//! Aspects are recomputed from scratch every cycle by
//! [`ControlPointState::derive_aspects`]. All heads start at Red, then:
//!
//! 1. A crossover in motion leaves everything Red.
//! 2. An open timelock leaves everything Red, except that while fully
//!    Unlocked the heads governing the current alignment show Flashing Red
//!    (proceed on sight).
//! 3. Otherwise each active route clears its approach head according to the
//!    occupancy of the blocks beyond it, while its home head stays Red.
//!
//! # Example
//!
//! ```rust
//! use cp_interlock::{ControlPointState, Entrance, SignalAspect, SignalHead};
//!
//! let mut state = ControlPointState::default();
//! state.code_route(Entrance::Main1Eastbound, true);
//! state.derive_aspects();
//!
//! assert_eq!(state.aspect(SignalHead::Main1WestUpper), SignalAspect::Green);
//! assert_eq!(state.aspect(SignalHead::Main1WestLower), SignalAspect::Red);
//! ```

use crate::aspects::{SignalAspect, SignalHead};
use crate::input::InputId;
use crate::route::Route;
use crate::state::ControlPointState;
use crate::timelock::{TimelockId, TimelockState};
use crate::turnout::TurnoutId;

/// The block occupancy inputs beyond one end of the plant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ApproachBlocks {
    /// Block immediately beyond the plant.
    pub adjoin: InputId,
    /// First approach block.
    pub approach: InputId,
    /// Second approach block.
    pub approach2: InputId,
}

impl ApproachBlocks {
    /// Main 1, beyond the east end.
    pub const MAIN1_EAST: Self = Self {
        adjoin: InputId::Main1EastAdjoin,
        approach: InputId::Main1EastApproach,
        approach2: InputId::Main1EastApproach2,
    };
    /// Main 2, beyond the east end.
    pub const MAIN2_EAST: Self = Self {
        adjoin: InputId::Main2EastAdjoin,
        approach: InputId::Main2EastApproach,
        approach2: InputId::Main2EastApproach2,
    };
    /// Main 1, beyond the west end.
    pub const MAIN1_WEST: Self = Self {
        adjoin: InputId::Main1WestAdjoin,
        approach: InputId::Main1WestApproach,
        approach2: InputId::Main1WestApproach2,
    };
    /// Main 2, beyond the west end.
    pub const MAIN2_WEST: Self = Self {
        adjoin: InputId::Main2WestAdjoin,
        approach: InputId::Main2WestApproach,
        approach2: InputId::Main2WestApproach2,
    };
}

/// Heads and blocks involved in one route.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RouteSignals {
    /// Head held at Red while the route is active.
    pub home: SignalHead,
    /// Head cleared for the route.
    pub approach: SignalHead,
    /// Blocks the route leads into.
    pub blocks: ApproachBlocks,
}

impl RouteSignals {
    /// Signal table entry for a route.
    pub const fn for_route(route: Route) -> Self {
        use SignalHead::*;
        let (home, approach, blocks) = match route {
            Route::Main1Eastbound => (Main1WestLower, Main1WestUpper, ApproachBlocks::MAIN1_EAST),
            Route::Main1Westbound => (Main1EastLower, Main1EastUpper, ApproachBlocks::MAIN1_WEST),
            Route::Main2Eastbound => (Main2WestLower, Main2WestUpper, ApproachBlocks::MAIN2_EAST),
            Route::Main2Westbound => (Main2EastLower, Main2EastUpper, ApproachBlocks::MAIN2_WEST),
            Route::Main2ViaMain1Eastbound => (Main2WestUpper, Main2WestLower, ApproachBlocks::MAIN2_EAST),
            Route::Main2ViaMain1Westbound => (Main2EastUpper, Main2EastLower, ApproachBlocks::MAIN2_WEST),
            Route::Main1ToMain2Eastbound => (Main1WestUpper, Main1WestLower, ApproachBlocks::MAIN2_EAST),
            Route::Main1ToMain2Westbound => (Main1EastUpper, Main1EastLower, ApproachBlocks::MAIN2_WEST),
            Route::Main2ToMain1Eastbound => (Main2WestUpper, Main2WestLower, ApproachBlocks::MAIN1_EAST),
            Route::Main2ToMain1Westbound => (Main2EastUpper, Main2EastLower, ApproachBlocks::MAIN1_WEST),
        };
        Self {
            home,
            approach,
            blocks,
        }
    }
}

/// Aspect for a cleared head given the occupancy of the blocks ahead.
///
/// ```
/// use cp_interlock::signals::cascade_aspect;
/// use cp_interlock::SignalAspect;
///
/// assert_eq!(cascade_aspect(false, false, false), SignalAspect::Green);
/// assert_eq!(cascade_aspect(false, false, true), SignalAspect::FlashingYellow);
/// assert_eq!(cascade_aspect(false, true, true), SignalAspect::Yellow);
/// assert_eq!(cascade_aspect(true, false, false), SignalAspect::Red);
/// ```
pub const fn cascade_aspect(adjoin: bool, approach: bool, approach2: bool) -> SignalAspect {
    if adjoin {
        SignalAspect::Red
    } else if approach {
        SignalAspect::Yellow
    } else if approach2 {
        SignalAspect::FlashingYellow
    } else {
        SignalAspect::Green
    }
}

/// Heads showing Flashing Red while the timelock is Unlocked, by actual
/// crossover alignment.
pub const fn restricting_heads(east_normal: bool, west_normal: bool) -> &'static [SignalHead] {
    use SignalHead::*;
    match (east_normal, west_normal) {
        (true, true) => &[Main1EastUpper, Main2EastUpper, Main1WestUpper, Main2WestUpper],
        (true, false) => &[Main1EastLower, Main2WestLower],
        (false, true) => &[Main1WestLower, Main2EastLower],
        (false, false) => &[Main2WestLower, Main2EastLower],
    }
}

impl ControlPointState {
    /// Recompute every signal aspect from the current state.
    ///
    /// Idempotent: running it twice on unchanged state gives the same
    /// aspects.
    pub fn derive_aspects(&mut self) {
        self.set_all_aspects(SignalAspect::Red);

        if self.turnouts_in_motion() {
            return;
        }

        match self.timelock(TimelockId::Main).state() {
            TimelockState::Locked => {}
            TimelockState::Unlocked => {
                let east = self.actual_normal(TurnoutId::EastCrossover);
                let west = self.actual_normal(TurnoutId::WestCrossover);
                for head in restricting_heads(east, west) {
                    self.set_aspect(*head, SignalAspect::FlashingRed);
                }
                return;
            }
            _ => return,
        }

        let routes = self.routes.clone();
        for route in routes.iter() {
            let signals = RouteSignals::for_route(route);
            let aspect = cascade_aspect(
                self.input(signals.blocks.adjoin),
                self.input(signals.blocks.approach),
                self.input(signals.blocks.approach2),
            );
            self.set_aspect(signals.home, SignalAspect::Red);
            self.set_aspect(signals.approach, aspect);
        }
    }
}

//! Routes, entrances and the route-coding algorithm.
//!
//! The dispatcher codes a route by naming an *entrance* (the signal a train
//! will pass) and asking for it to be set or cleared. The entrance plus the
//! current requested alignment of the two crossovers selects exactly one
//! route, or none when the alignment leads nowhere from that entrance.
//!
//! ```text
//!   M2 ------------------------------ M2
//!            \                /
//!         west xover     east xover
//!              \            /
//!   M1 ------------------------------ M1
//! ```
//!
//! # Coding table
//!
//! | Entrance | East | West | Route |
//! |----------|------|------|-------|
//! | Main 1 eastbound | N | N | Main1Eastbound |
//! | Main 1 eastbound | R | N | Main1ToMain2Eastbound |
//! | Main 1 westbound | N | N | Main1Westbound |
//! | Main 1 westbound | N | R | Main1ToMain2Westbound |
//! | Main 2 eastbound | N | N | Main2Eastbound |
//! | Main 2 eastbound | N | R | Main2ToMain1Eastbound |
//! | Main 2 eastbound | R | R | Main2ViaMain1Eastbound |
//! | Main 2 westbound | N | N | Main2Westbound |
//! | Main 2 westbound | N | R | Main2ToMain1Westbound |
//! | Main 2 westbound | R | R | Main2ViaMain1Westbound |
//!
//! Every other combination is refused. Main 3 has no route through this
//! plant and is always refused.
//!
//! # Example
//!
//! ```rust
//! use cp_interlock::{ControlPointState, Entrance, Route, RejectReason, CommandOutcome};
//!
//! let mut state = ControlPointState::default();
//! assert!(state.code_route(Entrance::Main1Westbound, true).is_applied());
//! assert!(state.routes().contains(Route::Main1Westbound));
//!
//! // The opposing move over the same track is refused.
//! assert_eq!(
//!     state.code_route(Entrance::Main1Eastbound, true),
//!     CommandOutcome::Rejected(RejectReason::ConflictingRoute),
//! );
//! ```

use log::info;

use crate::commands::{CommandOutcome, RejectReason};
use crate::input::InputId;
use crate::state::ControlPointState;
use crate::timelock::{TimelockId, TimelockState};
use crate::turnout::TurnoutId;

/// Capacity of the active-route set.
pub const MAX_ROUTES: usize = 2;

/// Traffic paths through the control point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Route {
    /// Main 1 straight through, eastbound.
    Main1Eastbound,
    /// Main 1 straight through, westbound.
    Main1Westbound,
    /// Main 2 straight through, eastbound.
    Main2Eastbound,
    /// Main 2 straight through, westbound.
    Main2Westbound,
    /// Main 2 to Main 1 and back to Main 2 over both crossovers, eastbound.
    Main2ViaMain1Eastbound,
    /// Main 2 to Main 1 and back to Main 2 over both crossovers, westbound.
    Main2ViaMain1Westbound,
    /// Main 1 across the east crossover to Main 2, eastbound.
    Main1ToMain2Eastbound,
    /// Main 1 across the west crossover to Main 2, westbound.
    Main1ToMain2Westbound,
    /// Main 2 across the west crossover to Main 1, eastbound.
    Main2ToMain1Eastbound,
    /// Main 2 across the east crossover to Main 1, westbound.
    Main2ToMain1Westbound,
}

impl Route {
    /// Every route.
    pub const ALL: [Route; 10] = [
        Route::Main1Eastbound,
        Route::Main1Westbound,
        Route::Main2Eastbound,
        Route::Main2Westbound,
        Route::Main2ViaMain1Eastbound,
        Route::Main2ViaMain1Westbound,
        Route::Main1ToMain2Eastbound,
        Route::Main1ToMain2Westbound,
        Route::Main2ToMain1Eastbound,
        Route::Main2ToMain1Westbound,
    ];

    /// The route that runs head-on over the same track in the other
    /// direction. Both may never be active together.
    pub const fn opposing(self) -> Route {
        match self {
            Route::Main1Eastbound => Route::Main1Westbound,
            Route::Main1Westbound => Route::Main1Eastbound,
            Route::Main2Eastbound => Route::Main2Westbound,
            Route::Main2Westbound => Route::Main2Eastbound,
            Route::Main2ViaMain1Eastbound => Route::Main2ViaMain1Westbound,
            Route::Main2ViaMain1Westbound => Route::Main2ViaMain1Eastbound,
            Route::Main1ToMain2Eastbound => Route::Main2ToMain1Westbound,
            Route::Main2ToMain1Westbound => Route::Main1ToMain2Eastbound,
            Route::Main1ToMain2Westbound => Route::Main2ToMain1Eastbound,
            Route::Main2ToMain1Eastbound => Route::Main1ToMain2Westbound,
        }
    }

    /// True for diagonal and loop routes, which use track of both mains.
    pub const fn crosses_mains(self) -> bool {
        !matches!(
            self,
            Route::Main1Eastbound | Route::Main1Westbound | Route::Main2Eastbound | Route::Main2Westbound
        )
    }

    /// Entrance signal this route is coded from.
    pub const fn entrance(self) -> Entrance {
        match self {
            Route::Main1Eastbound | Route::Main1ToMain2Eastbound => Entrance::Main1Eastbound,
            Route::Main1Westbound | Route::Main1ToMain2Westbound => Entrance::Main1Westbound,
            Route::Main2Eastbound | Route::Main2ViaMain1Eastbound | Route::Main2ToMain1Eastbound => {
                Entrance::Main2Eastbound
            }
            Route::Main2Westbound | Route::Main2ViaMain1Westbound | Route::Main2ToMain1Westbound => {
                Entrance::Main2Westbound
            }
        }
    }

    /// Returns the route name as a lowercase string.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Route::Main1Eastbound => "main1_eastbound",
            Route::Main1Westbound => "main1_westbound",
            Route::Main2Eastbound => "main2_eastbound",
            Route::Main2Westbound => "main2_westbound",
            Route::Main2ViaMain1Eastbound => "main2_via_main1_eastbound",
            Route::Main2ViaMain1Westbound => "main2_via_main1_westbound",
            Route::Main1ToMain2Eastbound => "main1_to_main2_eastbound",
            Route::Main1ToMain2Westbound => "main1_to_main2_westbound",
            Route::Main2ToMain1Eastbound => "main2_to_main1_eastbound",
            Route::Main2ToMain1Westbound => "main2_to_main1_westbound",
        }
    }
}

/// Entrance signals a route can be coded from.
///
/// The discriminants are the entrance numbers used on the bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Entrance {
    /// West-end signal on Main 1, for eastbound moves.
    Main1Eastbound = 1,
    /// East-end signal on Main 1, for westbound moves.
    Main1Westbound = 2,
    /// West-end signal on Main 2, for eastbound moves.
    Main2Eastbound = 3,
    /// East-end signal on Main 2, for westbound moves.
    Main2Westbound = 4,
    /// West-end signal on Main 3. No route through this plant.
    Main3Eastbound = 5,
}

impl Entrance {
    /// Every entrance.
    pub const ALL: [Entrance; 5] = [
        Entrance::Main1Eastbound,
        Entrance::Main1Westbound,
        Entrance::Main2Eastbound,
        Entrance::Main2Westbound,
        Entrance::Main3Eastbound,
    ];

    /// Bus entrance number.
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Decode a bus entrance number. Unknown numbers return `None`.
    pub const fn from_wire(code: u8) -> Option<Self> {
        match code {
            1 => Some(Entrance::Main1Eastbound),
            2 => Some(Entrance::Main1Westbound),
            3 => Some(Entrance::Main2Eastbound),
            4 => Some(Entrance::Main2Westbound),
            5 => Some(Entrance::Main3Eastbound),
            _ => None,
        }
    }

    /// Returns the entrance name as a lowercase string.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Entrance::Main1Eastbound => "main1_eastbound",
            Entrance::Main1Westbound => "main1_westbound",
            Entrance::Main2Eastbound => "main2_eastbound",
            Entrance::Main2Westbound => "main2_westbound",
            Entrance::Main3Eastbound => "main3_eastbound",
        }
    }

    /// Parse an entrance name as produced by [`as_str`](Self::as_str),
    /// trimmed and case-insensitive.
    pub fn from_name(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL.into_iter().find(|e| e.as_str().eq_ignore_ascii_case(s))
    }

    /// The route this entrance leads to for the given crossover alignment
    /// (`true` = normal), or `None` if the alignment is not routable.
    pub const fn candidate_route(self, east_normal: bool, west_normal: bool) -> Option<Route> {
        match (self, east_normal, west_normal) {
            (Entrance::Main1Eastbound, true, true) => Some(Route::Main1Eastbound),
            (Entrance::Main1Eastbound, false, true) => Some(Route::Main1ToMain2Eastbound),
            (Entrance::Main1Westbound, true, true) => Some(Route::Main1Westbound),
            (Entrance::Main1Westbound, true, false) => Some(Route::Main1ToMain2Westbound),
            (Entrance::Main2Eastbound, true, true) => Some(Route::Main2Eastbound),
            (Entrance::Main2Eastbound, true, false) => Some(Route::Main2ToMain1Eastbound),
            (Entrance::Main2Eastbound, false, false) => Some(Route::Main2ViaMain1Eastbound),
            (Entrance::Main2Westbound, true, true) => Some(Route::Main2Westbound),
            (Entrance::Main2Westbound, true, false) => Some(Route::Main2ToMain1Westbound),
            (Entrance::Main2Westbound, false, false) => Some(Route::Main2ViaMain1Westbound),
            _ => None,
        }
    }
}

// ============================================================================
// Active-route set
// ============================================================================

/// Bounded set of active routes, at most [`MAX_ROUTES`] entries.
///
/// # Example
///
/// ```rust
/// use cp_interlock::{ActiveRoutes, Route};
///
/// let mut routes = ActiveRoutes::new();
/// assert_eq!(routes.set(Route::Main1Eastbound), Ok(true));
/// assert_eq!(routes.set(Route::Main1Eastbound), Ok(false)); // already present
/// assert_eq!(routes.len(), 1);
/// assert_eq!(routes.slots(), [Some(Route::Main1Eastbound), None]);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActiveRoutes {
    routes: heapless::Vec<Route, MAX_ROUTES>,
}

impl ActiveRoutes {
    /// An empty set.
    pub const fn new() -> Self {
        Self {
            routes: heapless::Vec::new(),
        }
    }

    /// Add a route. Returns `Ok(true)` if it was added, `Ok(false)` if it
    /// was already present, and `Err` with the route if the set is full.
    pub fn set(&mut self, route: Route) -> Result<bool, Route> {
        if self.contains(route) {
            return Ok(false);
        }
        self.routes.push(route).map(|()| true)
    }

    /// Remove a route. Returns whether it was present.
    pub fn clear(&mut self, route: Route) -> bool {
        match self.routes.iter().position(|r| *r == route) {
            Some(i) => {
                self.routes.remove(i);
                true
            }
            None => false,
        }
    }

    /// Remove every route.
    pub fn clear_all(&mut self) {
        self.routes.clear();
    }

    /// Keep only the routes for which `keep` is true.
    pub fn retain(&mut self, keep: impl FnMut(&Route) -> bool) {
        self.routes.retain(keep);
    }

    /// True if `route` is active.
    pub fn contains(&self, route: Route) -> bool {
        self.routes.contains(&route)
    }

    /// True if no route is active.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// True if no further route fits.
    pub fn is_full(&self) -> bool {
        self.routes.is_full()
    }

    /// Number of active routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Active routes in the order they were set.
    pub fn iter(&self) -> impl Iterator<Item = Route> + '_ {
        self.routes.iter().copied()
    }

    /// Slot view, unused slots `None`.
    pub fn slots(&self) -> [Option<Route>; MAX_ROUTES] {
        let mut slots = [None; MAX_ROUTES];
        for (slot, route) in slots.iter_mut().zip(self.routes.iter()) {
            *slot = Some(*route);
        }
        slots
    }
}

// ============================================================================
// Route coding and vital logic
// ============================================================================

impl ControlPointState {
    /// Set or clear a route from an entrance.
    ///
    /// Both directions require the main timelock to be Locked. Setting picks
    /// the route from the *requested* crossover alignment, refuses it if the
    /// opposing route is active, then locks both crossovers and adds it.
    /// Clearing removes every route coded from that entrance and leaves the
    /// locks to [`apply_occupancy_rules`](Self::apply_occupancy_rules).
    pub fn code_route(&mut self, entrance: Entrance, set: bool) -> CommandOutcome {
        if self.timelock(TimelockId::Main).state() != TimelockState::Locked {
            return CommandOutcome::Rejected(RejectReason::TimelockOpen);
        }

        if !set {
            self.routes.retain(|r| {
                let keep = r.entrance() != entrance;
                if !keep {
                    info!("route {} cleared", r.as_str());
                }
                keep
            });
            return CommandOutcome::Applied;
        }

        let east = self.requested_normal(TurnoutId::EastCrossover);
        let west = self.requested_normal(TurnoutId::WestCrossover);
        let Some(route) = entrance.candidate_route(east, west) else {
            return CommandOutcome::Rejected(RejectReason::AlignmentNotRoutable);
        };
        if self.routes.contains(route.opposing()) {
            return CommandOutcome::Rejected(RejectReason::ConflictingRoute);
        }
        if !self.routes.contains(route) && self.routes.is_full() {
            return CommandOutcome::Rejected(RejectReason::RouteTableFull);
        }

        self.set_all_turnouts_locked(true);
        if let Ok(true) = self.routes.set(route) {
            info!("route {} set", route.as_str());
        }
        CommandOutcome::Applied
    }

    /// Occupancy-driven route clearing and turnout release.
    ///
    /// Occupancy on either main drops every route that crosses between the
    /// mains; occupancy on a main also drops that main's own routes. When
    /// neither main is occupied and no route remains, both crossovers are
    /// unlocked. This is the only place route locks are released.
    pub fn apply_occupancy_rules(&mut self) {
        let main1 = self.input(InputId::Main1Os);
        let main2 = self.input(InputId::Main2Os);

        if main1 || main2 {
            self.routes.retain(|r| {
                let keep = match r {
                    Route::Main1Eastbound | Route::Main1Westbound => !main1,
                    Route::Main2Eastbound | Route::Main2Westbound => !main2,
                    _ => false,
                };
                if !keep {
                    info!("route {} dropped by occupancy", r.as_str());
                }
                keep
            });
        }

        if !main1 && !main2 && self.routes.is_empty() {
            self.set_all_turnouts_locked(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aligned(east_normal: bool, west_normal: bool) -> ControlPointState {
        let mut state = ControlPointState::default();
        state.set_requested_normal(TurnoutId::EastCrossover, east_normal);
        state.set_requested_normal(TurnoutId::WestCrossover, west_normal);
        state
    }

    #[test]
    fn opposing_is_symmetric() {
        for r in Route::ALL {
            assert_eq!(r.opposing().opposing(), r);
            assert_ne!(r.opposing(), r);
            assert_eq!(r.opposing().crosses_mains(), r.crosses_mains());
        }
    }

    #[test]
    fn candidate_routes_lead_back_to_their_entrance() {
        for e in Entrance::ALL {
            for east in [true, false] {
                for west in [true, false] {
                    if let Some(r) = e.candidate_route(east, west) {
                        assert_eq!(r.entrance(), e);
                    }
                }
            }
        }
    }

    #[test]
    fn entrance_wire_codes() {
        for e in Entrance::ALL {
            assert_eq!(Entrance::from_wire(e.code()), Some(e));
        }
        assert_eq!(Entrance::from_wire(0), None);
        assert_eq!(Entrance::from_wire(6), None);
        assert_eq!(Entrance::from_name("MAIN2_WESTBOUND"), Some(Entrance::Main2Westbound));
        assert_eq!(Entrance::from_name("main4"), None);
    }

    #[test]
    fn active_routes_capacity() {
        let mut routes = ActiveRoutes::new();
        assert_eq!(routes.set(Route::Main1Eastbound), Ok(true));
        assert_eq!(routes.set(Route::Main2Westbound), Ok(true));
        assert!(routes.is_full());
        assert_eq!(routes.set(Route::Main1Eastbound), Ok(false));
        assert_eq!(routes.set(Route::Main2Eastbound), Err(Route::Main2Eastbound));
        assert_eq!(routes.len(), 2);

        assert!(routes.clear(Route::Main1Eastbound));
        assert!(!routes.clear(Route::Main1Eastbound));
        assert_eq!(routes.slots(), [Some(Route::Main2Westbound), None]);
    }

    #[test]
    fn code_main1_eastbound_locks_both_crossovers() {
        let mut state = aligned(true, true);
        assert!(state.code_route(Entrance::Main1Eastbound, true).is_applied());
        assert!(state.routes().contains(Route::Main1Eastbound));
        assert!(state.is_turnout_locked(TurnoutId::EastCrossover));
        assert!(state.is_turnout_locked(TurnoutId::WestCrossover));
    }

    #[test]
    fn code_diagonals_and_loop() {
        let mut state = aligned(false, true);
        assert!(state.code_route(Entrance::Main1Eastbound, true).is_applied());
        assert!(state.routes().contains(Route::Main1ToMain2Eastbound));
        assert!(state.is_turnout_locked(TurnoutId::WestCrossover));

        let mut state = aligned(false, false);
        assert!(state.code_route(Entrance::Main2Westbound, true).is_applied());
        assert!(state.routes().contains(Route::Main2ViaMain1Westbound));

        let mut state = aligned(true, false);
        assert!(state.code_route(Entrance::Main2Eastbound, true).is_applied());
        assert!(state.routes().contains(Route::Main2ToMain1Eastbound));
    }

    #[test]
    fn unroutable_alignment_refused() {
        let mut state = aligned(false, false);
        assert_eq!(
            state.code_route(Entrance::Main1Eastbound, true),
            CommandOutcome::Rejected(RejectReason::AlignmentNotRoutable)
        );
        let mut state = aligned(false, true);
        assert_eq!(
            state.code_route(Entrance::Main2Westbound, true),
            CommandOutcome::Rejected(RejectReason::AlignmentNotRoutable)
        );
        let mut state = aligned(true, true);
        assert_eq!(
            state.code_route(Entrance::Main3Eastbound, true),
            CommandOutcome::Rejected(RejectReason::AlignmentNotRoutable)
        );
        assert!(state.routes().is_empty());
        assert!(!state.is_turnout_locked(TurnoutId::EastCrossover));
    }

    #[test]
    fn opposing_route_refused_without_mutation() {
        let mut state = aligned(true, true);
        assert!(state.code_route(Entrance::Main1Westbound, true).is_applied());
        let before = state.routes().clone();

        assert_eq!(
            state.code_route(Entrance::Main1Eastbound, true),
            CommandOutcome::Rejected(RejectReason::ConflictingRoute)
        );
        assert_eq!(*state.routes(), before);
    }

    #[test]
    fn recoding_is_idempotent() {
        let mut state = aligned(true, true);
        assert!(state.code_route(Entrance::Main2Eastbound, true).is_applied());
        assert!(state.code_route(Entrance::Main2Eastbound, true).is_applied());
        assert_eq!(state.routes().len(), 1);
    }

    #[test]
    fn full_table_refuses_new_route() {
        let mut state = aligned(true, true);
        assert!(state.code_route(Entrance::Main1Eastbound, true).is_applied());
        assert!(state.code_route(Entrance::Main2Eastbound, true).is_applied());
        let _ = state.routes.clear(Route::Main2Eastbound);
        let _ = state.routes.set(Route::Main2Westbound);
        assert!(state.routes().is_full());

        state.set_requested_normal(TurnoutId::EastCrossover, false);
        assert_eq!(
            state.code_route(Entrance::Main1Eastbound, true),
            CommandOutcome::Rejected(RejectReason::RouteTableFull)
        );
    }

    #[test]
    fn code_route_requires_locked_timelock() {
        let mut state = aligned(true, true);
        state.timelock_mut(TimelockId::Main).state = TimelockState::TimerRunning;
        assert_eq!(
            state.code_route(Entrance::Main1Eastbound, true),
            CommandOutcome::Rejected(RejectReason::TimelockOpen)
        );
        assert_eq!(
            state.code_route(Entrance::Main1Eastbound, false),
            CommandOutcome::Rejected(RejectReason::TimelockOpen)
        );
        assert!(!state.is_turnout_locked(TurnoutId::EastCrossover));
    }

    #[test]
    fn clearing_keeps_locks() {
        let mut state = aligned(true, true);
        assert!(state.code_route(Entrance::Main1Eastbound, true).is_applied());
        assert!(state.code_route(Entrance::Main1Eastbound, false).is_applied());
        assert!(state.routes().is_empty());
        assert!(state.is_turnout_locked(TurnoutId::EastCrossover));

        state.apply_occupancy_rules();
        assert!(!state.is_turnout_locked(TurnoutId::EastCrossover));
        assert!(!state.is_turnout_locked(TurnoutId::WestCrossover));
    }

    #[test]
    fn occupancy_drops_crossing_routes() {
        for occ in [InputId::Main1Os, InputId::Main2Os] {
            let mut state = ControlPointState::default();
            let _ = state.routes.set(Route::Main2ViaMain1Eastbound);
            let _ = state.routes.set(Route::Main1ToMain2Westbound);
            state.set_input(occ, true);
            state.apply_occupancy_rules();
            assert!(state.routes().iter().all(|r| !r.crosses_mains()));
        }
    }

    #[test]
    fn occupancy_drops_own_main_only() {
        let mut state = ControlPointState::default();
        let _ = state.routes.set(Route::Main1Eastbound);
        let _ = state.routes.set(Route::Main2Westbound);
        state.set_all_turnouts_locked(true);
        state.set_input(InputId::Main1Os, true);

        state.apply_occupancy_rules();

        assert!(!state.routes().contains(Route::Main1Eastbound));
        assert!(state.routes().contains(Route::Main2Westbound));
        assert!(state.is_turnout_locked(TurnoutId::EastCrossover));
    }

    #[test]
    fn occupancy_holds_locks_even_without_routes() {
        let mut state = ControlPointState::default();
        state.set_all_turnouts_locked(true);
        state.set_input(InputId::Main2Os, true);
        state.apply_occupancy_rules();
        assert!(state.is_turnout_locked(TurnoutId::WestCrossover));

        state.set_input(InputId::Main2Os, false);
        state.apply_occupancy_rules();
        assert!(!state.is_turnout_locked(TurnoutId::WestCrossover));
    }
}

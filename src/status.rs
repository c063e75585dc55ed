//! Status projection for the bus.
//!
//! [`StatusSnapshot`] is the externally visible summary of the control
//! point: OS occupancy, which entrances are cleared, crossover state, and
//! the *virtual approach occupancy* this plant reports to its neighbours.
//! Neighbouring control points treat our signal pairs as if they were
//! blocks: a pair at stop reads as an occupied adjoining block, a pair at
//! approach reads as occupied approach blocks, and so on.
//!
//! # Packet layout
//!
//! | Byte | Bits |
//! |------|------|
//! | 6 | M1 OS, M2 OS, M1E/M1W/M2E/M2W entrance cleared |
//! | 7 | east crossover N/R/manual/lock, west crossover in the high nibble |
//! | 8 | Main 1 east pair (low nibble), Main 1 west pair (high nibble) |
//! | 9 | Main 2 east pair (low nibble), Main 2 west pair (high nibble) |
//!
//! The top bit of each nibble in bytes 8 and 9 is the tumble-down flag.
//!
//! # Example
//!
//! ```rust
//! use cp_interlock::{ControlPointState, Entrance};
//! use cp_interlock::status::StatusSnapshot;
//!
//! let mut state = ControlPointState::default();
//! state.code_route(Entrance::Main1Eastbound, true);
//! state.derive_aspects();
//!
//! let status = state.status();
//! assert!(status.main1_west_cleared);
//! assert!(status.east_crossover.locked);
//! assert_eq!(status.to_bytes()[0], 0x08);
//! ```

use crate::aspects::{SignalAspect, SignalHead};
use crate::input::InputId;
use crate::packet;
use crate::route::Route;
use crate::state::ControlPointState;
use crate::timelock::{TimelockId, TimelockState};
use crate::turnout::TurnoutId;

/// Length of an encoded status packet.
pub const STATUS_PACKET_LEN: usize = 12;

/// Approach occupancy implied by a pair of signal heads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VirtualOccupancy {
    /// Adjoining block reads occupied.
    pub adjoin: bool,
    /// First approach block reads occupied.
    pub approach: bool,
    /// Second approach block reads occupied.
    pub approach2: bool,
}

impl VirtualOccupancy {
    /// Derive from the upper and lower head of one signal.
    ///
    /// ```
    /// use cp_interlock::status::VirtualOccupancy;
    /// use cp_interlock::SignalAspect;
    ///
    /// let occ = VirtualOccupancy::from_heads(SignalAspect::Red, SignalAspect::Lunar);
    /// assert_eq!(occ.bits(), 0x07);
    /// let occ = VirtualOccupancy::from_heads(SignalAspect::Red, SignalAspect::Yellow);
    /// assert_eq!(occ.bits(), 0x06);
    /// let occ = VirtualOccupancy::from_heads(SignalAspect::FlashingYellow, SignalAspect::Red);
    /// assert_eq!(occ.bits(), 0x04);
    /// let occ = VirtualOccupancy::from_heads(SignalAspect::Green, SignalAspect::Red);
    /// assert_eq!(occ.bits(), 0x00);
    /// ```
    pub fn from_heads(upper: SignalAspect, lower: SignalAspect) -> Self {
        if upper.is_red_family() && lower.is_red_family() {
            Self {
                adjoin: true,
                approach: true,
                approach2: true,
            }
        } else if upper == SignalAspect::Yellow || lower == SignalAspect::Yellow {
            Self {
                adjoin: false,
                approach: true,
                approach2: true,
            }
        } else if upper == SignalAspect::FlashingYellow || lower == SignalAspect::FlashingYellow {
            Self {
                adjoin: false,
                approach: false,
                approach2: true,
            }
        } else {
            Self::default()
        }
    }

    /// Low three bits of a status nibble.
    pub fn bits(&self) -> u8 {
        (self.adjoin as u8) | (self.approach as u8) << 1 | (self.approach2 as u8) << 2
    }
}

/// Reported state of one crossover.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TurnoutStatus {
    /// Points sensed normal.
    pub normal: bool,
    /// Points sensed reverse.
    pub reverse: bool,
    /// Under manual control, or timelock not Locked.
    pub manual: bool,
    /// Locked by a route.
    pub locked: bool,
}

impl TurnoutStatus {
    /// Status nibble.
    pub fn bits(&self) -> u8 {
        (self.normal as u8) | (self.reverse as u8) << 1 | (self.manual as u8) << 2 | (self.locked as u8) << 3
    }
}

/// Everything the control point reports about itself.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusSnapshot {
    /// Main 1 OS occupied.
    pub main1_occupied: bool,
    /// Main 2 OS occupied.
    pub main2_occupied: bool,
    /// A westbound route from the Main 1 east entrance is set.
    pub main1_east_cleared: bool,
    /// An eastbound route from the Main 1 west entrance is set.
    pub main1_west_cleared: bool,
    /// A westbound route from the Main 2 east entrance is set.
    pub main2_east_cleared: bool,
    /// An eastbound route from the Main 2 west entrance is set.
    pub main2_west_cleared: bool,
    /// East crossover.
    pub east_crossover: TurnoutStatus,
    /// West crossover.
    pub west_crossover: TurnoutStatus,
    /// Main 1 east signal pair.
    pub main1_east_approach: VirtualOccupancy,
    /// Main 1 west signal pair.
    pub main1_west_approach: VirtualOccupancy,
    /// Main 2 east signal pair.
    pub main2_east_approach: VirtualOccupancy,
    /// Main 2 west signal pair.
    pub main2_west_approach: VirtualOccupancy,
    /// Tumble-down toward the Main 1 east neighbour.
    pub main1_east_tumble: bool,
    /// Tumble-down toward the Main 1 west neighbour.
    pub main1_west_tumble: bool,
    /// Tumble-down toward the Main 2 east neighbour.
    pub main2_east_tumble: bool,
    /// Tumble-down toward the Main 2 west neighbour.
    pub main2_west_tumble: bool,
    /// Main timelock state.
    pub timelock: TimelockState,
}

impl StatusSnapshot {
    /// Data bytes 6..=9 of the status packet.
    pub fn to_bytes(&self) -> [u8; 4] {
        let b6 = (self.main1_occupied as u8)
            | (self.main2_occupied as u8) << 1
            | (self.main1_east_cleared as u8) << 2
            | (self.main1_west_cleared as u8) << 3
            | (self.main2_east_cleared as u8) << 4
            | (self.main2_west_cleared as u8) << 5;
        let b7 = self.east_crossover.bits() | self.west_crossover.bits() << 4;
        let b8 = self.main1_east_approach.bits()
            | (self.main1_east_tumble as u8) << 3
            | self.main1_west_approach.bits() << 4
            | (self.main1_west_tumble as u8) << 7;
        let b9 = self.main2_east_approach.bits()
            | (self.main2_east_tumble as u8) << 3
            | self.main2_west_approach.bits() << 4
            | (self.main2_west_tumble as u8) << 7;
        [b6, b7, b8, b9]
    }

    /// Broadcast status packet from `address`.
    ///
    /// The CRC bytes are left zero. The bus driver must compute and fill
    /// them in before transmitting; peers drop packets with a bad CRC.
    pub fn encode_status_packet(&self, address: u8) -> [u8; STATUS_PACKET_LEN] {
        let mut pkt = [0u8; STATUS_PACKET_LEN];
        pkt[packet::DEST] = packet::BROADCAST;
        pkt[packet::SRC] = address;
        pkt[packet::LEN] = STATUS_PACKET_LEN as u8;
        pkt[packet::TYPE] = packet::TYPE_STATUS;
        pkt[packet::DATA..packet::DATA + 4].copy_from_slice(&self.to_bytes());
        pkt
    }
}

impl ControlPointState {
    /// Project the current state into a status snapshot.
    pub fn status(&self) -> StatusSnapshot {
        let locked = self.timelock(TimelockId::Main).state() == TimelockState::Locked;
        let turnout = |id: TurnoutId| {
            let t = self.turnout(id);
            TurnoutStatus {
                normal: t.actual_normal(),
                reverse: !t.actual_normal(),
                manual: t.is_manual() || !locked,
                locked: t.is_locked(),
            }
        };
        let pair = |upper: SignalHead, lower: SignalHead| {
            VirtualOccupancy::from_heads(self.aspect(upper), self.aspect(lower))
        };
        let any = |routes: &[Route]| routes.iter().any(|r| self.routes.contains(*r));

        StatusSnapshot {
            main1_occupied: self.input(InputId::Main1Os),
            main2_occupied: self.input(InputId::Main2Os),
            main1_east_cleared: any(&[Route::Main1Westbound, Route::Main1ToMain2Westbound]),
            main1_west_cleared: any(&[Route::Main1Eastbound, Route::Main1ToMain2Eastbound]),
            main2_east_cleared: any(&[
                Route::Main2Westbound,
                Route::Main2ToMain1Westbound,
                Route::Main2ViaMain1Westbound,
            ]),
            main2_west_cleared: any(&[
                Route::Main2Eastbound,
                Route::Main2ToMain1Eastbound,
                Route::Main2ViaMain1Eastbound,
            ]),
            east_crossover: turnout(TurnoutId::EastCrossover),
            west_crossover: turnout(TurnoutId::WestCrossover),
            main1_east_approach: pair(SignalHead::Main1EastUpper, SignalHead::Main1EastLower),
            main1_west_approach: pair(SignalHead::Main1WestUpper, SignalHead::Main1WestLower),
            main2_east_approach: pair(SignalHead::Main2EastUpper, SignalHead::Main2EastLower),
            main2_west_approach: pair(SignalHead::Main2WestUpper, SignalHead::Main2WestLower),
            main1_east_tumble: any(&[Route::Main1Eastbound, Route::Main2ToMain1Eastbound]),
            main1_west_tumble: any(&[Route::Main1Westbound, Route::Main2ToMain1Westbound]),
            main2_east_tumble: any(&[
                Route::Main2Eastbound,
                Route::Main2ViaMain1Eastbound,
                Route::Main1ToMain2Eastbound,
            ]),
            main2_west_tumble: any(&[
                Route::Main2Westbound,
                Route::Main2ViaMain1Westbound,
                Route::Main1ToMain2Westbound,
            ]),
            timelock: self.timelock(TimelockId::Main).state(),
        }
    }
}

// ============================================================================
// Publication
// ============================================================================

/// Decides when a status packet goes out: whenever the encoded status
/// changes, and otherwise once per interval.
///
/// # Example
///
/// ```rust
/// use cp_interlock::status::{StatusPublisher, StatusSnapshot};
///
/// let mut publisher = StatusPublisher::new(20); // 2 s
/// let status = StatusSnapshot::default();
///
/// assert!(publisher.should_publish(&status)); // first report
/// publisher.tick_decisecond();
/// assert!(!publisher.should_publish(&status)); // unchanged
/// ```
#[derive(Clone, Debug)]
pub struct StatusPublisher {
    interval_decisecs: u8,
    elapsed_decisecs: u8,
    last: Option<[u8; 4]>,
}

impl StatusPublisher {
    /// Create a publisher with the given heartbeat interval in deciseconds.
    pub fn new(interval_decisecs: u8) -> Self {
        Self {
            interval_decisecs,
            elapsed_decisecs: 0,
            last: None,
        }
    }

    /// Advance the heartbeat timer. Call at 10 Hz.
    pub fn tick_decisecond(&mut self) {
        self.elapsed_decisecs = self.elapsed_decisecs.saturating_add(1);
    }

    /// Returns `true` and restarts the heartbeat if `status` should be sent
    /// now.
    pub fn should_publish(&mut self, status: &StatusSnapshot) -> bool {
        let bytes = status.to_bytes();
        let changed = self.last != Some(bytes);
        if changed || self.elapsed_decisecs >= self.interval_decisecs {
            self.last = Some(bytes);
            self.elapsed_decisecs = 0;
            true
        } else {
            false
        }
    }
}

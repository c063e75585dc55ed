//! Signal aspects and the signal heads they are shown on.
//!
//! A control point of this layout carries eight heads: an upper and a lower
//! head facing each of the four approaches (Main 1 and Main 2, east and west
//! ends). Upper heads govern straight-through moves, lower heads govern
//! diverging moves across a crossover.
//!
//! # Example
//!
//! ```rust
//! use cp_interlock::{Lamp, SignalAspect};
//!
//! assert!(SignalAspect::Lunar.is_red_family());
//! assert_eq!(SignalAspect::Lunar.lit_lamp(true), Some(Lamp::Red));
//! assert_eq!(SignalAspect::FlashingYellow.lit_lamp(false), None);
//! ```

/// Logical aspect displayed by a signal head.
///
/// The discriminants are the wire codes used by the CTC bus.
///
/// # Default
///
/// Defaults to [`Red`](Self::Red), the most restrictive aspect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SignalAspect {
    /// Head dark.
    Off = 0,
    /// Clear.
    Green = 1,
    /// Approach.
    Yellow = 2,
    /// Advance approach.
    FlashingYellow = 3,
    /// Stop.
    #[default]
    Red = 4,
    /// Flashing green.
    FlashingGreen = 5,
    /// Restricting: proceed on sight, interlocking open.
    FlashingRed = 6,
    /// Lunar white.
    ///
    /// Accepted as a value but the heads have no lunar lamp, so it is
    /// always rendered as [`Red`](Self::Red).
    Lunar = 7,
}

/// One of the three lamps in a searchlight-style head.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lamp {
    /// Red lamp.
    Red,
    /// Yellow lamp.
    Yellow,
    /// Green lamp.
    Green,
}

impl SignalAspect {
    /// Every aspect in wire-code order.
    pub const ALL: [SignalAspect; 8] = [
        SignalAspect::Off,
        SignalAspect::Green,
        SignalAspect::Yellow,
        SignalAspect::FlashingYellow,
        SignalAspect::Red,
        SignalAspect::FlashingGreen,
        SignalAspect::FlashingRed,
        SignalAspect::Lunar,
    ];

    /// Wire code of this aspect.
    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Decode a wire code. Unknown codes return `None`.
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    /// Returns the aspect as a lowercase string.
    ///
    /// ```
    /// use cp_interlock::SignalAspect;
    ///
    /// assert_eq!(SignalAspect::FlashingRed.as_str(), "flashing_red");
    /// ```
    pub const fn as_str(&self) -> &'static str {
        match self {
            SignalAspect::Off => "off",
            SignalAspect::Green => "green",
            SignalAspect::Yellow => "yellow",
            SignalAspect::FlashingYellow => "flashing_yellow",
            SignalAspect::Red => "red",
            SignalAspect::FlashingGreen => "flashing_green",
            SignalAspect::FlashingRed => "flashing_red",
            SignalAspect::Lunar => "lunar",
        }
    }

    /// True for every aspect that means "stop" to a following train:
    /// red, flashing red and lunar.
    pub const fn is_red_family(self) -> bool {
        matches!(
            self,
            SignalAspect::Red | SignalAspect::FlashingRed | SignalAspect::Lunar
        )
    }

    /// True for aspects whose lamp is only lit while the blink flag is on.
    pub const fn is_flashing(self) -> bool {
        matches!(
            self,
            SignalAspect::FlashingYellow | SignalAspect::FlashingGreen | SignalAspect::FlashingRed
        )
    }

    /// The lamp to illuminate for this aspect, given the current blink phase.
    ///
    /// Flashing aspects light their lamp only while `blink_on` is true.
    /// [`Lunar`](Self::Lunar) cannot be displayed and lights red.
    pub const fn lit_lamp(self, blink_on: bool) -> Option<Lamp> {
        match self {
            SignalAspect::Off => None,
            SignalAspect::Green => Some(Lamp::Green),
            SignalAspect::Yellow => Some(Lamp::Yellow),
            SignalAspect::Red | SignalAspect::Lunar => Some(Lamp::Red),
            SignalAspect::FlashingGreen if blink_on => Some(Lamp::Green),
            SignalAspect::FlashingYellow if blink_on => Some(Lamp::Yellow),
            SignalAspect::FlashingRed if blink_on => Some(Lamp::Red),
            SignalAspect::FlashingGreen
            | SignalAspect::FlashingYellow
            | SignalAspect::FlashingRed => None,
        }
    }
}

/// Signal heads of the control point.
///
/// `Main1East*` heads stand at the east end of Main 1 and face westbound
/// trains; `Main1West*` heads stand at the west end and face eastbound trains.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SignalHead {
    /// Main 1, east end, upper head.
    Main1EastUpper = 0,
    /// Main 1, east end, lower head.
    Main1EastLower = 1,
    /// Main 2, east end, upper head.
    Main2EastUpper = 2,
    /// Main 2, east end, lower head.
    Main2EastLower = 3,
    /// Main 1, west end, upper head.
    Main1WestUpper = 4,
    /// Main 1, west end, lower head.
    Main1WestLower = 5,
    /// Main 2, west end, upper head.
    Main2WestUpper = 6,
    /// Main 2, west end, lower head.
    Main2WestLower = 7,
}

impl SignalHead {
    /// Number of heads.
    pub const COUNT: usize = 8;

    /// Every head in index order.
    pub const ALL: [SignalHead; Self::COUNT] = [
        SignalHead::Main1EastUpper,
        SignalHead::Main1EastLower,
        SignalHead::Main2EastUpper,
        SignalHead::Main2EastLower,
        SignalHead::Main1WestUpper,
        SignalHead::Main1WestLower,
        SignalHead::Main2WestUpper,
        SignalHead::Main2WestLower,
    ];

    /// Array index of this head.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Short name used in logs and the web API.
    pub const fn as_str(&self) -> &'static str {
        match self {
            SignalHead::Main1EastUpper => "main1_east_upper",
            SignalHead::Main1EastLower => "main1_east_lower",
            SignalHead::Main2EastUpper => "main2_east_upper",
            SignalHead::Main2EastLower => "main2_east_lower",
            SignalHead::Main1WestUpper => "main1_west_upper",
            SignalHead::Main1WestLower => "main1_west_lower",
            SignalHead::Main2WestUpper => "main2_west_upper",
            SignalHead::Main2WestLower => "main2_west_lower",
        }
    }
}

//! Shared message types for HTTP/MQTT communication.
//!
//! These types are `no_std` compatible and can be deserialized using either
//! `serde_json` (desktop) or `serde-json-core` (embedded). Turnouts and
//! entrances are named in `snake_case`, the same names
//! [`TurnoutId::as_str`] and [`Entrance::as_str`] return.
//!
//! # Example
//!
//! ```
//! use cp_interlock::messages::CodeRouteRequest;
//! use cp_interlock::{Entrance, RemoteCommand};
//!
//! // Desktop: using serde_json
//! #[cfg(feature = "web")]
//! {
//!     let json = r#"{"entrance": "main2_westbound", "set": false}"#;
//!     let req: CodeRouteRequest = serde_json::from_str(json).unwrap();
//!     assert_eq!(
//!         RemoteCommand::from(req),
//!         RemoteCommand::CodeRoute { entrance: Entrance::Main2Westbound, set: false },
//!     );
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::commands::RemoteCommand;
use crate::route::Entrance;
use crate::turnout::TurnoutId;

// ============================================================================
// Request Types
// ============================================================================

/// Request to move a crossover.
///
/// # JSON Examples
///
/// ```json
/// {"turnout": "east_crossover", "normal": true}
/// {"turnout": "west_crossover", "normal": false}
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetTurnoutRequest {
    /// Which crossover
    pub turnout: TurnoutId,
    /// `true` for normal, `false` for reverse
    pub normal: bool,
}

impl SetTurnoutRequest {
    /// Create a new turnout request.
    pub fn new(turnout: TurnoutId, normal: bool) -> Self {
        Self { turnout, normal }
    }
}

impl From<SetTurnoutRequest> for RemoteCommand {
    fn from(req: SetTurnoutRequest) -> Self {
        RemoteCommand::SetTurnout {
            turnout: req.turnout,
            normal: req.normal,
        }
    }
}

fn default_set() -> bool {
    true
}

/// Request to set or clear a route.
///
/// `set` defaults to `true` when omitted.
///
/// # JSON Examples
///
/// ```json
/// {"entrance": "main1_eastbound"}
/// {"entrance": "main1_eastbound", "set": false}
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeRouteRequest {
    /// Entrance signal the route starts at
    pub entrance: Entrance,
    /// `true` to set, `false` to clear
    #[serde(default = "default_set")]
    pub set: bool,
}

impl CodeRouteRequest {
    /// Request to set a route.
    pub fn set(entrance: Entrance) -> Self {
        Self { entrance, set: true }
    }

    /// Request to clear a route.
    pub fn clear(entrance: Entrance) -> Self {
        Self { entrance, set: false }
    }
}

impl From<CodeRouteRequest> for RemoteCommand {
    fn from(req: CodeRouteRequest) -> Self {
        RemoteCommand::CodeRoute {
            entrance: req.entrance,
            set: req.set,
        }
    }
}

// ============================================================================
// Parsing Functions (using serde-json-core for no_std compatibility)
// ============================================================================

/// Parse a turnout request from JSON bytes.
///
/// Works in both `std` and `no_std` environments using `serde-json-core`.
///
/// # Example
///
/// ```
/// use cp_interlock::messages::parse_turnout_request;
/// use cp_interlock::TurnoutId;
///
/// let req = parse_turnout_request(br#"{"turnout": "west_crossover", "normal": false}"#).unwrap();
/// assert_eq!(req.turnout, TurnoutId::WestCrossover);
/// assert!(!req.normal);
///
/// assert!(parse_turnout_request(br#"{"turnout": "north_crossover", "normal": true}"#).is_none());
/// ```
#[cfg(feature = "serde-json-core")]
pub fn parse_turnout_request(json: &[u8]) -> Option<SetTurnoutRequest> {
    serde_json_core::from_slice(json).ok().map(|(req, _)| req)
}

/// Parse a route request from JSON bytes.
///
/// # Example
///
/// ```
/// use cp_interlock::messages::parse_route_request;
/// use cp_interlock::Entrance;
///
/// let req = parse_route_request(br#"{"entrance": "main2_eastbound"}"#).unwrap();
/// assert_eq!(req.entrance, Entrance::Main2Eastbound);
/// assert!(req.set);
/// ```
#[cfg(feature = "serde-json-core")]
pub fn parse_route_request(json: &[u8]) -> Option<CodeRouteRequest> {
    serde_json_core::from_slice(json).ok().map(|(req, _)| req)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_convert_to_commands() {
        let cmd: RemoteCommand = SetTurnoutRequest::new(TurnoutId::EastCrossover, false).into();
        assert_eq!(
            cmd,
            RemoteCommand::SetTurnout {
                turnout: TurnoutId::EastCrossover,
                normal: false
            }
        );

        let cmd: RemoteCommand = CodeRouteRequest::clear(Entrance::Main1Westbound).into();
        assert_eq!(
            cmd,
            RemoteCommand::CodeRoute {
                entrance: Entrance::Main1Westbound,
                set: false
            }
        );
    }

    #[cfg(feature = "serde-json-core")]
    #[test]
    fn parse_route_defaults_to_set() {
        let req = parse_route_request(br#"{"entrance": "main3_eastbound"}"#).unwrap();
        assert_eq!(req, CodeRouteRequest::set(Entrance::Main3Eastbound));
    }

    #[cfg(feature = "serde-json-core")]
    #[test]
    fn parse_rejects_bad_json() {
        assert!(parse_route_request(b"not json").is_none());
        assert!(parse_route_request(br#"{"entrance": 1}"#).is_none());
        assert!(parse_turnout_request(br#"{"turnout": "east_crossover"}"#).is_none());
    }

    #[cfg(feature = "web")]
    #[test]
    fn serde_json_round_names() {
        let json = serde_json::to_string(&SetTurnoutRequest::new(TurnoutId::WestCrossover, true)).unwrap();
        assert_eq!(json, r#"{"turnout":"west_crossover","normal":true}"#);
    }
}

//! API request and response types for HTTP/MQTT communication.

use serde::{Deserialize, Serialize};

use crate::status::StatusSnapshot;
use crate::traits::OutputLatch;
use crate::{
    CommandOutcome, CommandSource, ControlPoint, RemoteCommand, Route, SignalAspect, SignalHead,
    TimelockId, TimelockState, TurnoutId,
};

// Re-export shared request types from messages module
pub use crate::messages::{CodeRouteRequest, SetTurnoutRequest};

// ============================================================================
// Response Types
// ============================================================================

/// API response wrapper for consistent JSON structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the request was successful
    pub success: bool,
    /// Response data (present when success=true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Error message (present when success=false)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Create a successful response with data
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Create an error response
    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Status projection plus the raw status bytes as sent on the bus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Decoded status
    pub status: StatusSnapshot,
    /// Data bytes 6..=9 of the bus status packet
    pub bytes: [u8; 4],
}

impl From<&StatusSnapshot> for StatusResponse {
    fn from(status: &StatusSnapshot) -> Self {
        Self {
            status: *status,
            bytes: status.to_bytes(),
        }
    }
}

/// One crossover in the state response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnoutResponse {
    /// Which crossover
    pub id: TurnoutId,
    /// Sensed position
    pub actual_normal: bool,
    /// Commanded position
    pub requested_normal: bool,
    /// Locked by a route
    pub locked: bool,
    /// Under manual control
    pub manual: bool,
}

/// One signal head in the state response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalResponse {
    /// Head
    pub head: SignalHead,
    /// Logical aspect
    pub aspect: SignalAspect,
}

/// Last command the control loop applied
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeResponse {
    /// The command
    pub command: RemoteCommand,
    /// Where it came from
    pub source: CommandSource,
    /// What became of it
    pub outcome: CommandOutcome,
}

/// Full interlocking state response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateResponse {
    /// Main timelock state
    pub timelock: TimelockState,
    /// Seconds left on the release countdown
    pub timelock_seconds: u16,
    /// Both crossovers
    pub turnouts: Vec<TurnoutResponse>,
    /// Active routes, in slot order
    pub routes: Vec<Route>,
    /// Every signal head
    pub signals: Vec<SignalResponse>,
    /// Commands waiting for the next cycle
    pub pending_commands: usize,
    /// Last command applied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_outcome: Option<OutcomeResponse>,
}

impl<O: OutputLatch> From<&ControlPoint<O>> for StateResponse {
    fn from(cp: &ControlPoint<O>) -> Self {
        let state = cp.state();
        let timelock = state.timelock(TimelockId::Main);
        Self {
            timelock: timelock.state(),
            timelock_seconds: timelock.seconds_remaining(),
            turnouts: TurnoutId::ALL
                .iter()
                .map(|&id| {
                    let t = state.turnout(id);
                    TurnoutResponse {
                        id,
                        actual_normal: t.actual_normal(),
                        requested_normal: t.requested_normal(),
                        locked: t.is_locked(),
                        manual: t.is_manual(),
                    }
                })
                .collect(),
            routes: state.routes().iter().collect(),
            signals: SignalHead::ALL
                .iter()
                .map(|&head| SignalResponse {
                    head,
                    aspect: state.aspect(head),
                })
                .collect(),
            pending_commands: cp.pending_commands(),
            last_outcome: cp.last_outcome().map(|(queued, outcome)| OutcomeResponse {
                command: queued.command,
                source: queued.source,
                outcome,
            }),
        }
    }
}

/// Command result response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResponse {
    /// Whether the command was accepted into the queue
    pub accepted: bool,
    /// Result details
    pub result: String,
}

impl CommandResponse {
    /// Command queued for the next cycle.
    pub fn queued() -> Self {
        Self {
            accepted: true,
            result: "queued".to_string(),
        }
    }

    /// Command dropped because the queue is full.
    pub fn queue_full() -> Self {
        Self {
            accepted: false,
            result: "queue_full".to_string(),
        }
    }
}

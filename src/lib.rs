//! # cp-interlock
//!
//! Vital interlocking logic for a two-crossover CTC control point: two main
//! tracks, an east and a west crossover, eight signal heads and a timelock
//! guarding manual operation. Optional web API and MQTT surfaces.
//!
//! ## Features
//!
//! - **Route coding**: Entrance plus crossover alignment selects the route;
//!   conflicting, occupied and unroutable requests are rejected
//! - **Signal aspects**: Recomputed from scratch every cycle, cascading from
//!   the neighbouring plants' virtual approach occupancy
//! - **Timelock**: Maintainer release switch with an unlock delay before the
//!   manual levers take over
//! - **Deferred outputs**: Logical state rendered into an expander bit image
//!   and latched once per cycle
//! - **Status reporting**: Bus status packet on change and on a heartbeat
//! - **Bus housekeeping**: Ping and version replies, remote reset
//!
//! ## Architecture
//!
//! The crate is structured to allow testing on desktop without hardware:
//!
//! - `state` - The single owned state aggregate
//! - `route`, `turnout`, `timelock`, `signals` - Interlocking rules on that state
//! - `commands`, `queue` - Command decoding and the pending-command queue
//! - `control_point` - Main control loop that ties everything together
//! - `traits` - Expander I/O abstractions
//! - `hal` - Mock implementations for testing
//!
//! ## Example
//!
//! ```rust
//! use cp_interlock::{
//!     CommandSource, ControlPoint, ControlPointConfig, Entrance, RemoteCommand, SignalAspect,
//!     SignalHead, TickClock,
//!     config::InputBindings,
//!     hal::{MockIo, MockLatch},
//! };
//!
//! let mut cp = ControlPoint::new(ControlPointConfig::default(), &InputBindings::default(), MockLatch::new());
//! let io = MockIo::field_at_rest();
//! let mut clock = TickClock::new();
//!
//! // Queue a route from any surface
//! let cmd = RemoteCommand::CodeRoute { entrance: Entrance::Main2Westbound, set: true };
//! assert!(cp.submit(cmd, CommandSource::Local));
//!
//! // Run the control loop at 10 Hz
//! let status = cp.cycle(&io, clock.decisecond()).unwrap();
//! assert!(status.main2_east_cleared);
//! assert_eq!(cp.state().aspect(SignalHead::Main2EastUpper), SignalAspect::Green);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

/// Signal aspects and heads.
pub mod aspects;
/// Command types, decoding and outcomes.
pub mod commands;
/// Control loop that coordinates commands, interlocking rules and hardware.
pub mod control_point;
/// Hardware abstraction layer with mock implementations for testing.
pub mod hal;
/// Named inputs and the filters that write them.
pub mod input;
/// Output frame rendering and board wiring.
pub mod outputs;
/// Bus packet layout.
pub mod packet;
/// Pending-command queue.
pub mod queue;
/// Routes, entrances and route coding.
pub mod route;
/// Signal aspect engine.
pub mod signals;
/// Control point state aggregate.
pub mod state;
/// Status projection and publishing.
pub mod status;
/// Timelock state machine.
pub mod timelock;
/// Core traits for hardware abstraction.
pub mod traits;
/// Turnout model and turnout commands.
pub mod turnout;

/// Configuration for the control point and its network surfaces.
pub mod config;

/// Shared message types for HTTP/MQTT communication (serde-based).
#[cfg(feature = "serde")]
pub mod messages;

/// Network services for HTTP API and MQTT (feature-gated).
#[cfg(any(feature = "web", feature = "mqtt"))]
pub mod services;

// Re-exports for convenience
pub use aspects::{Lamp, SignalAspect, SignalHead};
pub use commands::{CommandOutcome, CommandSource, RejectReason, RemoteCommand};
pub use control_point::{ControlPoint, TickClock, TickEvents, COMMAND_QUEUE_LEN, REPLY_QUEUE_LEN};
pub use input::{InputBinding, InputId};
pub use outputs::OutputFrame;
pub use queue::{CommandQueue, QueuedCommand};
pub use route::{ActiveRoutes, Entrance, Route, MAX_ROUTES};
pub use state::ControlPointState;
pub use status::{StatusPublisher, StatusSnapshot};
pub use timelock::{IndicatorMode, Timelock, TimelockId, TimelockState};
pub use traits::{DebouncedInputs, OutputLatch};
pub use turnout::{Turnout, TurnoutId};

// Config re-exports
pub use config::{Config, ControlPointConfig, DeviceConfig, InputBindings, MqttConfig, WebConfig};

// Message re-exports (for HTTP/MQTT APIs)
#[cfg(feature = "serde")]
pub use messages::{CodeRouteRequest, SetTurnoutRequest};

// Parsing function re-exports (serde-json-core based)
#[cfg(feature = "serde-json-core")]
pub use messages::{parse_route_request, parse_turnout_request};

//! Unified shared state for all control point services.
//!
//! `SharedControlPoint` provides thread-safe access to a single
//! [`ControlPoint`] that is shared between the 10 Hz control loop, the web
//! server and the MQTT handler. Network surfaces never apply commands
//! directly: they queue them, and the control loop applies them at the next
//! cycle boundary.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use cp_interlock::hal::{MockIo, MockLatch};
//! use cp_interlock::services::SharedControlPoint;
//! use cp_interlock::config::InputBindings;
//! use cp_interlock::{CommandSource, ControlPoint, ControlPointConfig, Entrance, RemoteCommand, TickEvents};
//!
//! let cp = ControlPoint::new(ControlPointConfig::default(), &InputBindings::default(), MockLatch::new());
//! let shared = Arc::new(SharedControlPoint::new(cp));
//!
//! // Web/MQTT side: queue a command
//! let cmd = RemoteCommand::CodeRoute { entrance: Entrance::Main1Westbound, set: true };
//! assert!(shared.submit(cmd, CommandSource::WebApi));
//!
//! // Control loop side: run a cycle
//! let io = MockIo::field_at_rest();
//! shared.with_control_point(|cp| cp.cycle(&io, TickEvents::idle())).unwrap();
//!
//! // Change detection for MQTT publishing
//! assert!(shared.check_changes().is_some());
//! assert!(shared.check_changes().is_none());
//! ```

use std::sync::Mutex;
use std::time::Instant;

use crate::status::StatusSnapshot;
use crate::traits::OutputLatch;
use crate::{CommandSource, ControlPoint, RemoteCommand};

// ============================================================================
// Change Detection
// ============================================================================

/// Tracks the last published status for change detection (used by MQTT
/// publishing).
#[derive(Clone, Debug, Default)]
pub struct ChangeDetection {
    /// Encoded status bytes last reported
    pub last_status: Option<[u8; 4]>,
}

// ============================================================================
// Shared Control Point
// ============================================================================

/// Unified shared state for all services (control loop, web, MQTT).
///
/// # Thread Safety
///
/// - Uses `Mutex` for control point access (not `RwLock`) because the 10 Hz
///   cycle writes on every pass.
/// - Change detection has a separate lock to minimize contention during MQTT
///   publishes.
pub struct SharedControlPoint<O: OutputLatch> {
    control_point: Mutex<ControlPoint<O>>,
    start_time: Instant,
    change_detection: Mutex<ChangeDetection>,
}

impl<O: OutputLatch> SharedControlPoint<O> {
    /// Wrap a control point for sharing.
    pub fn new(control_point: ControlPoint<O>) -> Self {
        Self {
            control_point: Mutex::new(control_point),
            start_time: Instant::now(),
            change_detection: Mutex::new(ChangeDetection::default()),
        }
    }

    /// Milliseconds since the shared state was created.
    #[inline]
    pub fn now_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    /// Access the control point with a mutable lock.
    ///
    /// The closure pattern prevents accidentally holding the lock across
    /// await points.
    pub fn with_control_point<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut ControlPoint<O>) -> R,
    {
        let mut guard = self.control_point.lock().unwrap();
        f(&mut *guard)
    }

    /// Queue a command for the next cycle. Returns `false` if the queue is
    /// full.
    pub fn submit(&self, command: RemoteCommand, source: CommandSource) -> bool {
        self.with_control_point(|cp| cp.submit(command, source))
    }

    /// Current status projection.
    pub fn status(&self) -> StatusSnapshot {
        self.with_control_point(|cp| cp.status())
    }

    /// Returns the status if it changed since the last call, `None`
    /// otherwise.
    pub fn check_changes(&self) -> Option<StatusSnapshot> {
        let status = self.status();
        let bytes = status.to_bytes();

        let mut detection = self.change_detection.lock().unwrap();
        if detection.last_status == Some(bytes) {
            None
        } else {
            detection.last_status = Some(bytes);
            Some(status)
        }
    }

    /// Take the current status as the change detection baseline without
    /// reporting a change.
    pub fn sync_change_detection(&self) {
        let bytes = self.status().to_bytes();
        self.change_detection.lock().unwrap().last_status = Some(bytes);
    }
}

//! Control loop façade that ties everything together.
//!
//! This module provides [`ControlPoint`], which owns the interlocking
//! state, the configuration, the pending-command queue and the output
//! latch, and runs one full interlocking cycle per call to
//! [`cycle`](ControlPoint::cycle).
//!
//! # Cycle order
//!
//! 1. 1 Hz tick (timelock countdown)
//! 2. Local input filter
//! 3. Turnout position sense
//! 4. Timelock state machine
//! 5. Pending commands, oldest first
//! 6. Occupancy-driven route clearing and turnout unlocking
//! 7. Aspect derivation
//! 8. If requested, render outputs and latch them
//!
//! Bus packets received between cycles go through
//! [`receive_packet`](ControlPoint::receive_packet): CTC commands are queued,
//! ping and version requests are answered through
//! [`poll_reply_packet`](ControlPoint::poll_reply_packet), a reset request
//! resets the control point, and packet types the node does not handle
//! itself feed the virtual inputs.
//!
//! # Example
//!
//! ```rust
//! use cp_interlock::hal::{MockIo, MockLatch};
//! use cp_interlock::{CommandSource, ControlPoint, ControlPointConfig, RemoteCommand, TickClock, TurnoutId};
//! use cp_interlock::config::InputBindings;
//!
//! let config = ControlPointConfig::default();
//! let mut cp = ControlPoint::new(config, &InputBindings::default(), MockLatch::new());
//! let mut io = MockIo::field_at_rest();
//! let mut clock = TickClock::new();
//!
//! let cmd = RemoteCommand::SetTurnout { turnout: TurnoutId::EastCrossover, normal: false };
//! assert!(cp.submit(cmd, CommandSource::Local));
//!
//! // Main loop - call cycle() at 10 Hz
//! for _ in 0..3 {
//!     cp.cycle(&io, clock.decisecond()).unwrap();
//!     io.follow_turnout_outputs(cp.output_frame());
//! }
//!
//! assert!(!cp.state().actual_normal(TurnoutId::EastCrossover));
//! ```

use heapless::Deque;
use log::{debug, info, warn};

use crate::commands::{CommandOutcome, CommandSource, RemoteCommand};
use crate::config::{ControlPointConfig, InputBindings};
use crate::outputs::{render_outputs, OutputFrame};
use crate::packet::{self, Packet};
use crate::queue::{CommandQueue, QueuedCommand};
use crate::state::ControlPointState;
use crate::status::{StatusPublisher, StatusSnapshot, STATUS_PACKET_LEN};
use crate::traits::{DebouncedInputs, OutputLatch};

/// Capacity of the pending-command queue.
pub const COMMAND_QUEUE_LEN: usize = 8;

/// Capacity of the outgoing reply queue.
pub const REPLY_QUEUE_LEN: usize = 4;

// ============================================================================
// Tick events
// ============================================================================

/// Scheduler flags handed to one cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickEvents {
    /// A 1 Hz tick elapsed since the last cycle.
    pub one_hz: bool,
    /// Current phase of the flash flag.
    pub blink: bool,
    /// Render and latch outputs this cycle.
    pub write_outputs: bool,
}

impl TickEvents {
    /// No events: logic runs, outputs are not written.
    pub const fn idle() -> Self {
        Self {
            one_hz: false,
            blink: false,
            write_outputs: false,
        }
    }

    /// Output refresh with the given flash phase.
    pub const fn output_refresh(blink: bool) -> Self {
        Self {
            one_hz: false,
            blink,
            write_outputs: true,
        }
    }

    /// Builder: also deliver a 1 Hz tick.
    pub const fn with_one_hz(mut self) -> Self {
        self.one_hz = true;
        self
    }
}

/// Decisecond counters that produce [`TickEvents`].
///
/// Outputs refresh every decisecond. The flash flag toggles every 0.6 s and
/// the 1 Hz tick fires every ten deciseconds.
///
/// ```
/// use cp_interlock::TickClock;
///
/// let mut clock = TickClock::new();
/// let ticks = (0..10).filter(|_| clock.decisecond().one_hz).count();
/// assert_eq!(ticks, 1);
/// ```
#[derive(Clone, Debug, Default)]
pub struct TickClock {
    decisecs: u8,
    blink_decisecs: u8,
    blink: bool,
}

impl TickClock {
    /// Decisecs per flash phase.
    pub const BLINK_HALF_PERIOD: u8 = 6;

    /// Create a clock with the flash flag off.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance by one decisecond and return the events for this cycle.
    pub fn decisecond(&mut self) -> TickEvents {
        self.decisecs += 1;
        let one_hz = self.decisecs >= 10;
        if one_hz {
            self.decisecs = 0;
        }

        self.blink_decisecs += 1;
        if self.blink_decisecs >= Self::BLINK_HALF_PERIOD {
            self.blink_decisecs = 0;
            self.blink = !self.blink;
        }

        TickEvents {
            one_hz,
            blink: self.blink,
            write_outputs: true,
        }
    }
}

// ============================================================================
// Control point
// ============================================================================

/// The interlocking control loop.
///
/// # Type Parameter
///
/// - `O`: The output latch implementation ([`OutputLatch`] trait)
///
/// # Thread Safety
///
/// Not thread-safe. The network surfaces share it through
/// `SharedControlPoint` from the services module (requires `web` or `mqtt`
/// feature).
pub struct ControlPoint<O: OutputLatch> {
    state: ControlPointState,
    config: ControlPointConfig,
    queue: CommandQueue<COMMAND_QUEUE_LEN>,
    latch: O,
    frame: OutputFrame,
    publisher: StatusPublisher,
    replies: Deque<Packet, REPLY_QUEUE_LEN>,
    last_outcome: Option<(QueuedCommand, CommandOutcome)>,
}

impl<O: OutputLatch> ControlPoint<O> {
    /// Create a control point in the power-up safe state.
    pub fn new(config: ControlPointConfig, bindings: &InputBindings, latch: O) -> Self {
        Self {
            state: ControlPointState::new(bindings),
            publisher: StatusPublisher::new(config.status_interval_decisecs),
            config,
            queue: CommandQueue::new(),
            latch,
            frame: OutputFrame::new(),
            replies: Deque::new(),
            last_outcome: None,
        }
    }

    /// Handle one bus packet.
    ///
    /// The CRC is not checked here: the bus driver must drop packets that
    /// fail it before handing them over.
    ///
    /// Our own packets and packets addressed elsewhere are ignored. Then, by
    /// packet type:
    ///
    /// | Type | Handling |
    /// |------|----------|
    /// | `'C'` | CTC command queued for the next cycle; malformed ones and unknown ids are dropped |
    /// | `'A'` | Ping, answered with an `'a'` reply |
    /// | `'V'` | Version, answered with a `'v'` reply |
    /// | `'X'` | [`reset`](Self::reset) |
    /// | `'R'`, `'W'` | Storage access, not served |
    /// | other | Offered to the virtual-input filter |
    pub fn receive_packet(&mut self, pkt: &[u8]) {
        if pkt.len() <= packet::TYPE {
            return;
        }
        let address = self.config.bus_address;
        let src = pkt[packet::SRC];
        if src == address {
            return;
        }
        if pkt[packet::DEST] != address && pkt[packet::DEST] != packet::BROADCAST {
            return;
        }

        match pkt[packet::TYPE] {
            packet::TYPE_COMMAND => self.receive_command(pkt),
            packet::TYPE_PING => self.queue_reply(packet::build(address, src, packet::TYPE_PING_REPLY, &[])),
            packet::TYPE_VERSION => {
                self.queue_reply(packet::build(address, src, packet::TYPE_VERSION_REPLY, &packet::VERSION_DATA))
            }
            packet::TYPE_RESET => {
                info!("reset requested by {:#04x}", src);
                self.reset();
            }
            packet::TYPE_STORAGE_READ | packet::TYPE_STORAGE_WRITE => {
                debug!("storage request from {:#04x} ignored", src);
            }
            _ => self.state.apply_remote_filter(pkt),
        }
    }

    fn receive_command(&mut self, pkt: &[u8]) {
        let src = pkt[packet::SRC];
        match RemoteCommand::decode(pkt) {
            Some(Ok(cmd)) => {
                if !self.submit(cmd, CommandSource::Bus) {
                    warn!("command queue full, dropped {:?} from {:#04x}", cmd, src);
                }
            }
            Some(Err(reason)) => {
                warn!("CTC command from {:#04x} rejected: {}", src, reason);
            }
            None => debug!("malformed CTC command from {:#04x}", src),
        }
    }

    fn queue_reply(&mut self, reply: Packet) {
        if let Err(dropped) = self.replies.push_back(reply) {
            warn!("reply queue full, dropped reply to {:#04x}", dropped[packet::DEST]);
        }
    }

    /// Queue a command for the next cycle. Returns `false` if the queue is
    /// full.
    #[must_use]
    pub fn submit(&mut self, command: RemoteCommand, source: CommandSource) -> bool {
        self.queue.push(QueuedCommand::new(command, source))
    }

    /// Run one interlocking cycle and return the resulting status.
    pub fn cycle<I: DebouncedInputs + ?Sized>(
        &mut self,
        inputs: &I,
        ticks: TickEvents,
    ) -> Result<StatusSnapshot, O::Error> {
        if ticks.one_hz {
            self.state.apply_1hz_tick();
        }

        self.state.apply_local_filter(inputs);
        self.state.sense_turnout_positions();
        self.state.step_timelock(self.config.unlock_delay_secs);

        while let Some(queued) = self.queue.pop() {
            let outcome = self.state.apply_command(queued.command, queued.source);
            self.last_outcome = Some((queued, outcome));
        }

        self.state.apply_occupancy_rules();
        self.state.derive_aspects();

        if ticks.write_outputs {
            render_outputs(&self.state, &mut self.frame, self.config.heads_common_anode, ticks.blink);
            self.latch.latch(&self.frame)?;
        }

        self.publisher.tick_decisecond();
        Ok(self.state.status())
    }

    /// Status packet to broadcast, if one is due: when the status changed
    /// since the last one sent, or when the status interval elapsed.
    pub fn poll_status_packet(&mut self) -> Option<[u8; STATUS_PACKET_LEN]> {
        let status = self.state.status();
        if self.publisher.should_publish(&status) {
            debug!("status due: {:02x?}", status.to_bytes());
            Some(status.encode_status_packet(self.config.bus_address))
        } else {
            None
        }
    }

    /// Next reply to send on the bus, oldest first. The CRC bytes are zero
    /// for the bus driver to fill in.
    pub fn poll_reply_packet(&mut self) -> Option<Packet> {
        self.replies.pop_front()
    }

    /// Return to the power-up safe state. Pending commands and unsent
    /// replies are dropped.
    pub fn reset(&mut self) {
        self.state.reset();
        self.queue.clear();
        self.replies.clear();
        self.frame = OutputFrame::new();
        self.publisher = StatusPublisher::new(self.config.status_interval_decisecs);
        self.last_outcome = None;
    }

    /// Interlocking state.
    pub fn state(&self) -> &ControlPointState {
        &self.state
    }

    /// Current status projection.
    pub fn status(&self) -> StatusSnapshot {
        self.state.status()
    }

    /// Configuration the control point was built with.
    pub fn config(&self) -> &ControlPointConfig {
        &self.config
    }

    /// Most recently rendered outputs.
    pub fn output_frame(&self) -> &OutputFrame {
        &self.frame
    }

    /// The output latch.
    pub fn latch(&self) -> &O {
        &self.latch
    }

    /// Mutable access to the output latch.
    pub fn latch_mut(&mut self) -> &mut O {
        &mut self.latch
    }

    /// Number of commands waiting for the next cycle.
    pub fn pending_commands(&self) -> usize {
        self.queue.len()
    }

    /// Last command applied and what became of it.
    pub fn last_outcome(&self) -> Option<(QueuedCommand, CommandOutcome)> {
        self.last_outcome
    }
}

//! Command queue between the messaging surfaces and the control loop.
//!
//! Commands can arrive at any time (bus receive, HTTP handler, MQTT event
//! loop) but are only applied at a cycle boundary. [`CommandQueue`] holds
//! them in arrival order until the next [`cycle`](crate::ControlPoint::cycle)
//! drains it. There is no prioritisation: the interlocking rules treat every
//! source alike, so first come is first served.
//!
//! # Example
//!
//! ```rust
//! use cp_interlock::queue::{CommandQueue, QueuedCommand};
//! use cp_interlock::{CommandSource, RemoteCommand, TurnoutId};
//!
//! let mut queue: CommandQueue<2> = CommandQueue::new();
//! let cmd = RemoteCommand::SetTurnout { turnout: TurnoutId::EastCrossover, normal: false };
//!
//! assert!(queue.push(QueuedCommand::new(cmd, CommandSource::WebApi)));
//! assert!(queue.push(QueuedCommand::new(cmd, CommandSource::Mqtt)));
//! assert!(!queue.push(QueuedCommand::new(cmd, CommandSource::Bus))); // full
//!
//! assert_eq!(queue.pop().map(|q| q.source), Some(CommandSource::WebApi));
//! ```

use heapless::Deque;

use crate::commands::{CommandSource, RemoteCommand};

/// A command together with where it came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueuedCommand {
    /// The command to apply.
    pub command: RemoteCommand,
    /// Surface that submitted it.
    pub source: CommandSource,
}

impl QueuedCommand {
    /// Wrap a command with its source.
    pub fn new(command: RemoteCommand, source: CommandSource) -> Self {
        Self { command, source }
    }
}

/// Fixed-capacity FIFO of pending commands.
pub struct CommandQueue<const N: usize> {
    pending: Deque<QueuedCommand, N>,
}

impl<const N: usize> CommandQueue<N> {
    /// Creates a new empty queue with capacity N.
    pub fn new() -> Self {
        Self {
            pending: Deque::new(),
        }
    }

    /// Append a command. Returns `false` if the queue is full; the command
    /// is dropped and the caller should report it.
    #[must_use]
    pub fn push(&mut self, cmd: QueuedCommand) -> bool {
        self.pending.push_back(cmd).is_ok()
    }

    /// Take the oldest command.
    pub fn pop(&mut self) -> Option<QueuedCommand> {
        self.pending.pop_front()
    }

    /// Number of pending commands.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// True if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// True if no further command fits.
    pub fn is_full(&self) -> bool {
        self.pending.is_full()
    }

    /// Drop every pending command.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

impl<const N: usize> Default for CommandQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

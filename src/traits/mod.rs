//! Trait definitions for hardware abstraction.
//!
//! This module defines the seam between the interlocking and the I/O
//! expander board, so the same logic runs against the real expanders and
//! against desktop mocks.
//!
//! # Submodules
//!
//! - `hardware`: Debounced input reads and output frame latching
//!
//! # Hardware Abstraction
//!
//! - [`DebouncedInputs`]: Read a settled input bit
//! - [`OutputLatch`]: Write a full output frame in one transfer

pub mod hardware;

pub use hardware::*;

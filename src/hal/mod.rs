//! Hardware Abstraction Layer implementations.
//!
//! This module contains concrete implementations of the traits
//! defined in [`crate::traits`].
//!
//! # Available Implementations
//!
//! - `mock`: Test implementations for desktop development
//!
//! The board's own expander driver lives with the firmware that links this
//! crate; it only has to implement [`DebouncedInputs`](crate::traits::DebouncedInputs)
//! and [`OutputLatch`](crate::traits::OutputLatch).

pub mod mock;

pub use mock::*;

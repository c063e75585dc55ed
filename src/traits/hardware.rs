//! Hardware abstraction traits for the local I/O expanders.
//!
//! The interlocking never talks to the I2C bus. The expander driver and its
//! debounce filter sit behind two small traits:
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`DebouncedInputs`] | Read one debounced input bit |
//! | [`OutputLatch`] | Latch a complete [`OutputFrame`] |
//!
//! # Implementation
//!
//! For testing and desktop development, use the mock implementations from
//! [`crate::hal::mock`].
//!
//! # Example
//!
//! ```rust
//! use cp_interlock::traits::{DebouncedInputs, OutputLatch};
//! use cp_interlock::hal::{MockIo, MockLatch};
//! use cp_interlock::outputs::OutputFrame;
//!
//! let io = MockIo::new().with_input(0, 3, 7, true);
//! assert!(io.debounced(0, 3, 7));
//! assert!(!io.debounced(0, 3, 6));
//!
//! let mut latch = MockLatch::new();
//! latch.latch(&OutputFrame::new()).unwrap();
//! assert_eq!(latch.latch_count, 1);
//! ```

use crate::outputs::OutputFrame;

/// Debounced digital inputs, addressed by expander, port and bit.
///
/// # Implementation Notes
///
/// - Debouncing is the implementor's job; the interlocking takes the value
///   as settled
/// - Out-of-range addresses should read `false`
///
/// # Example Implementation
///
/// ```rust,ignore
/// use cp_interlock::traits::DebouncedInputs;
///
/// struct Expanders { debounced: [[u8; 5]; 2] }
///
/// impl DebouncedInputs for Expanders {
///     fn debounced(&self, device: u8, port: u8, bit: u8) -> bool {
///         self.debounced
///             .get(device as usize)
///             .and_then(|d| d.get(port as usize))
///             .map_or(false, |p| p & (1 << bit) != 0)
///     }
/// }
/// ```
pub trait DebouncedInputs {
    /// Settled level of one input.
    fn debounced(&self, device: u8, port: u8, bit: u8) -> bool;
}

impl<T: DebouncedInputs + ?Sized> DebouncedInputs for &T {
    fn debounced(&self, device: u8, port: u8, bit: u8) -> bool {
        (**self).debounced(device, port, bit)
    }
}

/// Output latch: writes a whole frame to the expanders at once.
///
/// Called once per output-refresh cycle. Implementations may skip ports
/// whose value has not changed.
pub trait OutputLatch {
    /// Error type for latch operations.
    type Error;

    /// Write every output in `frame`.
    fn latch(&mut self, frame: &OutputFrame) -> Result<(), Self::Error>;
}

impl<T: OutputLatch + ?Sized> OutputLatch for &mut T {
    type Error = T::Error;

    fn latch(&mut self, frame: &OutputFrame) -> Result<(), Self::Error> {
        (**self).latch(frame)
    }
}

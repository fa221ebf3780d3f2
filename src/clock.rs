//! Time source for the timed parts of the calibration flow.

use embedded_hal::delay::DelayNs;

/// A blocking delay that can also tell the time.
///
/// The skip prompt measures its window against [`Clock::now_ms()`] and paces
/// its polling with [`DelayNs`]; the post-recalibration flush paces the
/// render loop the same way.
pub trait Clock: DelayNs {
    /// Milliseconds since an arbitrary, fixed origin. Must not go backwards.
    fn now_ms(&mut self) -> u64;

    /// Milliseconds elapsed since `start`, an earlier [`Clock::now_ms()`].
    fn elapsed_ms(&mut self, start: u64) -> u64 {
        self.now_ms().saturating_sub(start)
    }
}

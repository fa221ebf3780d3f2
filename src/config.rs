//! Tunables of the calibration flow and the compiled-in calibration.

use crate::calibration::{CalibrationVector, DEFAULT_LOW_THRESHOLD, MAX_CALIBRATION_RUNS};

#[cfg(feature = "defmt")]
use defmt::Format;

/// Known-good calibration of the 3.5" 320x480 ILI9488 panel.
///
/// Obtained by running the calibration a few times and keeping the most
/// extreme reading per value. Replace it with the values logged after
/// calibrating a different panel, or with
/// [`CalibrationVector::UNCALIBRATED`] to force calibration on every boot.
pub const KNOWN_GOOD_CALIBRATION: CalibrationVector =
    CalibrationVector::new([246, 3849, 257, 189, 3945, 3889, 3994, 194]);

/// Configuration of the calibration flow.
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationConfig {
    /// Number of corner-calibration passes per run.
    pub runs: usize,
    /// Slot values whose maximum is below this are reduced to their minimum.
    pub low_threshold: u16,
    /// How long the skip prompt waits for a touch.
    pub skip_timeout_ms: u32,
    /// Touch polling cadence of the skip prompt.
    pub skip_poll_interval_ms: u32,
    /// How long the skip confirmation stays on screen.
    pub skip_confirm_hold_ms: u32,
    /// Render loop steps before the first forced refresh.
    pub flush_first_steps: u8,
    /// Render loop steps between the first and the second forced refresh.
    pub flush_second_steps: u8,
    /// Delay after each render loop step.
    pub flush_step_interval_ms: u32,
    /// Size of the corner markers, in pixels.
    pub corner_marker_size: u32,
    /// Calibration reused when the operator skips.
    pub known_good: CalibrationVector,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl CalibrationConfig {
    pub const fn new() -> Self {
        Self {
            runs: 4,
            low_threshold: DEFAULT_LOW_THRESHOLD,
            skip_timeout_ms: 5000,
            skip_poll_interval_ms: 50,
            skip_confirm_hold_ms: 200,
            flush_first_steps: 10,
            flush_second_steps: 5,
            flush_step_interval_ms: 20,
            corner_marker_size: 10,
            known_good: KNOWN_GOOD_CALIBRATION,
        }
    }

    /// Sets the number of passes, clamped to `1..=MAX_CALIBRATION_RUNS`.
    pub const fn with_runs(mut self, runs: usize) -> Self {
        self.runs = if runs == 0 {
            1
        } else if runs > MAX_CALIBRATION_RUNS {
            MAX_CALIBRATION_RUNS
        } else {
            runs
        };
        self
    }

    pub const fn with_low_threshold(mut self, low_threshold: u16) -> Self {
        self.low_threshold = low_threshold;
        self
    }

    pub const fn with_skip_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.skip_timeout_ms = timeout_ms;
        self
    }

    pub const fn with_known_good(mut self, known_good: CalibrationVector) -> Self {
        self.known_good = known_good;
        self
    }

    pub const fn with_corner_marker_size(mut self, size: u32) -> Self {
        self.corner_marker_size = size;
        self
    }

    /// Returns true if the compiled-in calibration can be offered for reuse.
    pub fn has_known_good(&self) -> bool {
        !self.known_good.is_placeholder()
    }
}

//! Repeated corner-calibration passes.

use crate::{
    calibration::{CalibrationSampleSet, MAX_CALIBRATION_RUNS},
    config::CalibrationConfig,
    error::{Error, PanelError},
    panel::TouchPanel,
    prompt::draw_prompt,
};
use core::fmt::Write;
use embedded_hal::delay::DelayNs;
use heapless::String;

/// Runs corner-calibration passes back to back and collects their raw
/// readings.
#[derive(Debug, Clone, Copy)]
pub struct CalibrationSampler {
    marker_size: u32,
}

impl CalibrationSampler {
    pub fn new(config: &CalibrationConfig) -> Self {
        Self {
            marker_size: config.corner_marker_size,
        }
    }

    /// Runs `run_count` passes, clamped to `1..=MAX_CALIBRATION_RUNS`.
    ///
    /// Each pass is announced with its index and then blocks in
    /// [`TouchPanel::sample_corners()`] until the operator has touched all
    /// four corners. The samples are kept as they are, even all-zero ones.
    pub fn run_passes<P, D>(
        &self,
        panel: &mut P,
        delay: &mut D,
        run_count: usize,
    ) -> Result<CalibrationSampleSet, PanelError<P>>
    where
        P: TouchPanel,
        D: DelayNs,
    {
        let run_count = run_count.clamp(1, MAX_CALIBRATION_RUNS);
        let mut samples = CalibrationSampleSet::new();

        for run in 1..=run_count {
            let mut text: String<64> = String::new();
            let _ = write!(text, "Touch Calibration\nTouch the corners\nRun {run}/{run_count}");
            draw_prompt(panel.display(), &text).map_err(Error::DrawTarget)?;

            let sample = panel
                .sample_corners(delay, self.marker_size)
                .map_err(Error::Touch)?;

            #[cfg(feature = "defmt")]
            defmt::debug!("pass {}/{}: {:?}", run, run_count, sample);

            if samples.push(sample).is_err() {
                break;
            }
        }

        Ok(samples)
    }
}

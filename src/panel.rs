//! The display + touch panel seen by the calibration flow.

use crate::{
    calibration::{CalibrationData, CalibrationVector, Point, RawCalibrationSample, Size},
    calibration_run::{sample_corners, CalibrationRunError},
    driver::{Error, Xpt2046},
};
use core::fmt::Debug;
use embedded_graphics::{draw_target::DrawTarget, pixelcolor::Rgb565};
use embedded_hal::{delay::DelayNs, digital::InputPin, spi::SpiDevice};

/// A display with an optional touch controller.
///
/// This is everything the calibration flow and the pointer input need from
/// the hardware. The display is reachable for drawing prompts; the touch
/// controller may be absent, in which case calibration is skipped entirely.
pub trait TouchPanel {
    type Error: Debug;
    type Display: DrawTarget<Color = Rgb565>;

    fn display(&mut self) -> &mut Self::Display;

    /// Size of the display in pixels.
    fn display_size(&self) -> Size;

    /// Returns false if the panel has no touch controller.
    fn has_touch(&self) -> bool;

    /// Makes `vector` the calibration used by [`TouchPanel::poll_touch()`].
    fn install_calibration(&mut self, vector: &CalibrationVector);

    /// Returns the calibrated touch point, or `None` if the panel is not
    /// pressed. The point is not clamped to the display.
    fn poll_touch(&mut self) -> Result<Option<Point>, Self::Error>;

    /// Runs one blocking corner-calibration pass.
    fn sample_corners<D: DelayNs>(
        &mut self,
        delay: &mut D,
        marker_size: u32,
    ) -> Result<RawCalibrationSample, Self::Error>;
}

/// The error returned by [`TouchScreen`].
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug)]
pub enum TouchScreenError<SpiError, IrqError, DTError> {
    /// Corner sampling was requested from a panel without touch controller.
    NoTouchController,
    /// Reading the touch controller for pointer input failed.
    Xpt2046(Error<SpiError, IrqError>),
    /// The corner-calibration pass failed.
    Run(CalibrationRunError<SpiError, IrqError, DTError>),
}

impl<SpiError, IrqError, DTError> From<CalibrationRunError<SpiError, IrqError, DTError>>
    for TouchScreenError<SpiError, IrqError, DTError>
{
    fn from(e: CalibrationRunError<SpiError, IrqError, DTError>) -> Self {
        TouchScreenError::Run(e)
    }
}

/// A [`TouchPanel`] made of an embedded-graphics display and an XPT2046.
#[derive(Debug)]
pub struct TouchScreen<DT, Spi, Irq> {
    display: DT,
    touch: Option<Xpt2046<Spi, Irq>>,
    calibration: CalibrationVector,
}

impl<DT, Spi, SpiError, Irq, IrqError> TouchScreen<DT, Spi, Irq>
where
    DT: DrawTarget<Color = Rgb565>,
    DT::Error: Debug,
    Spi: SpiDevice<u8, Error = SpiError>,
    SpiError: Debug,
    Irq: InputPin<Error = IrqError>,
    IrqError: Debug,
{
    /// Pairs `display` with `touch`. Pass `None` for a display without touch
    /// controller.
    pub fn new(display: DT, touch: Option<Xpt2046<Spi, Irq>>) -> Self {
        Self {
            display,
            touch,
            calibration: CalibrationVector::UNCALIBRATED,
        }
    }

    /// The calibration vector last installed.
    pub fn calibration(&self) -> &CalibrationVector {
        &self.calibration
    }

    pub fn touch(&mut self) -> Option<&mut Xpt2046<Spi, Irq>> {
        self.touch.as_mut()
    }

    pub fn release(self) -> (DT, Option<Xpt2046<Spi, Irq>>) {
        (self.display, self.touch)
    }
}

impl<DT, Spi, SpiError, Irq, IrqError> TouchPanel for TouchScreen<DT, Spi, Irq>
where
    DT: DrawTarget<Color = Rgb565>,
    DT::Error: Debug,
    Spi: SpiDevice<u8, Error = SpiError>,
    SpiError: Debug,
    Irq: InputPin<Error = IrqError>,
    IrqError: Debug,
{
    type Error = TouchScreenError<SpiError, IrqError, DT::Error>;
    type Display = DT;

    fn display(&mut self) -> &mut DT {
        &mut self.display
    }

    fn display_size(&self) -> Size {
        self.display.bounding_box().size
    }

    fn has_touch(&self) -> bool {
        self.touch.is_some()
    }

    /// A vector the transform cannot be derived from (for instance one with
    /// a degenerate pass in it) is recorded, but the previous transform
    /// stays active.
    fn install_calibration(&mut self, vector: &CalibrationVector) {
        self.calibration = *vector;
        let size = self.display_size();
        let Some(touch) = self.touch.as_mut() else {
            return;
        };
        match CalibrationData::from_vector(vector, size) {
            Ok(calibration_data) => touch.set_calibration_data(&calibration_data),
            Err(_e) => {
                #[cfg(feature = "defmt")]
                defmt::warn!(
                    "calibration {:?} has no transform ({:?}), keeping the previous one",
                    vector,
                    _e
                );
            }
        }
    }

    fn poll_touch(&mut self) -> Result<Option<Point>, Self::Error> {
        match self.touch.as_mut() {
            Some(touch) => touch.poll().map_err(TouchScreenError::Xpt2046),
            None => Ok(None),
        }
    }

    fn sample_corners<D: DelayNs>(
        &mut self,
        delay: &mut D,
        marker_size: u32,
    ) -> Result<RawCalibrationSample, Self::Error> {
        let touch = self
            .touch
            .as_mut()
            .ok_or(TouchScreenError::NoTouchController)?;
        Ok(sample_corners(
            touch,
            &mut self.display,
            delay,
            marker_size,
        )?)
    }
}

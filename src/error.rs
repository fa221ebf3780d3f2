//! Error definition for the crate

#[cfg(feature = "defmt")]
use defmt::Format;

pub use crate::calibration::CalibrationError;
pub use crate::driver::Error as TouchError;

/// The error returned by the calibration flow.
///
/// Only failures of the collaborators surface here. A missing touch
/// controller is not an error, and a calibration pass the operator never
/// completes blocks instead of failing.
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Debug, PartialEq, Eq)]
pub enum Error<PanelError, DrawError> {
    /// An error occurred in the touch panel.
    Touch(PanelError),
    /// An error occurred while drawing a prompt on the display.
    DrawTarget(DrawError),
}

/// The [`Error`] of a calibration flow running on panel `P`.
pub type PanelError<P> = Error<
    <P as crate::panel::TouchPanel>::Error,
    <<P as crate::panel::TouchPanel>::Display as embedded_graphics::draw_target::DrawTarget>::Error,
>;

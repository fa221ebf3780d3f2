//! The blocking corner-calibration pass.
//!
//! The two requirements on the touch screen are that its touch panel
//! controller is the XPT2046, and that the software driver for its display
//! panel implements the
//! [embedded-graphics-core's](https://crates.io/crates/embedded-graphics-core)
//! [DrawTarget](https://docs.rs/embedded-graphics-core/latest/embedded_graphics_core/draw_target/trait.DrawTarget.html)
//! trait with a Color type implementing the
//! [RgbColor](https://docs.rs/embedded-graphics-core/latest/embedded_graphics_core/pixelcolor/trait.RgbColor.html)
//! trait.

use crate::{
    calibration::{Corner, Point, RawCalibrationSample, Size},
    driver::{Error, Xpt2046},
};
use core::fmt::Debug;
use embedded_graphics::{
    draw_target::DrawTarget,
    geometry::Dimensions,
    pixelcolor::RgbColor,
    primitives::{Primitive, PrimitiveStyle, Triangle},
    Drawable,
};
use embedded_hal::{delay::DelayNs, digital::InputPin, spi::SpiDevice};

/// The error returned when an error occurs in [`sample_corners()`].
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug)]
pub enum CalibrationRunError<SpiError, IrqError, DTError> {
    /// An error occurred in the Xpt2046 touch panel driver.
    Xpt2046(Error<SpiError, IrqError>),
    /// An error occurred in the display panel driver.
    DrawTarget(DTError),
}

/// Runs one corner-calibration pass and returns its raw readings.
///
/// A marker is drawn into each corner in turn (top-left, bottom-left,
/// top-right, bottom-right). For each corner the pass waits for a debounced
/// touch, records the averaged raw reading, erases the marker and waits for
/// the release. Only the markers are drawn, so whatever is already on the
/// screen (such as the pass prompt) stays visible.
///
/// There is no timeout: the pass blocks until the operator has touched all
/// four corners.
pub fn sample_corners<Spi, SpiError, Irq, IrqError, DT, DELAY>(
    touch: &mut Xpt2046<Spi, Irq>,
    draw_target: &mut DT,
    delay: &mut DELAY,
    marker_size: u32,
) -> Result<RawCalibrationSample, CalibrationRunError<SpiError, IrqError, DT::Error>>
where
    Spi: SpiDevice<u8, Error = SpiError>,
    SpiError: Debug,
    Irq: InputPin<Error = IrqError>,
    IrqError: Debug,
    DT: DrawTarget<Color: RgbColor>,
    DELAY: DelayNs,
{
    let display_size = draw_target.bounding_box().size;
    let mut sample = RawCalibrationSample::default();

    for corner in Corner::ALL {
        let marker = corner_marker(corner, display_size, marker_size);
        marker
            .into_styled(PrimitiveStyle::with_fill(DT::Color::WHITE))
            .draw(draw_target)
            .map_err(CalibrationRunError::DrawTarget)?;

        touch.clear_touch();
        while !touch.is_touched() {
            touch.run().map_err(CalibrationRunError::Xpt2046)?;
            delay.delay_us(500);
        }
        sample.set_corner(corner, touch.get_touch_point_raw());

        marker
            .bounding_box()
            .into_styled(PrimitiveStyle::with_fill(DT::Color::BLACK))
            .draw(draw_target)
            .map_err(CalibrationRunError::DrawTarget)?;
        while touch
            .penirq_is_active()
            .map_err(CalibrationRunError::Xpt2046)?
        {
            delay.delay_ms(100);
        }
        delay.delay_ms(200);
    }

    #[cfg(feature = "defmt")]
    defmt::debug!("corner pass raw readings: {:?}", sample);

    Ok(sample)
}

/// A right triangle filling the given corner, legs `size` pixels long.
fn corner_marker(corner: Corner, display_size: Size, size: u32) -> Triangle {
    let tip = corner.display_point(display_size);
    let leg = size.max(1) as i32;
    let (dx, dy) = match corner {
        Corner::TopLeft => (leg, leg),
        Corner::BottomLeft => (leg, -leg),
        Corner::TopRight => (-leg, leg),
        Corner::BottomRight => (-leg, -leg),
    };

    Triangle::new(
        tip,
        Point::new(tip.x + dx, tip.y),
        Point::new(tip.x, tip.y + dy),
    )
}

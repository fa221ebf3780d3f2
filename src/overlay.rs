//! Diagnostic overlay showing the active calibration.

use crate::controller::CalibrationContext;
use core::fmt::Write;
use embedded_graphics::{
    draw_target::DrawTarget,
    geometry::{Dimensions, Point},
    mono_font::{ascii::FONT_10X20, MonoTextStyleBuilder},
    pixelcolor::{Rgb565, RgbColor},
    primitives::{Primitive, PrimitiveStyle},
    text::{Alignment, Baseline, Text, TextStyleBuilder},
    Drawable,
};
use heapless::String;

/// Capacity of the overlay text, enough for eight five-digit values.
pub const OVERLAY_TEXT_CAPACITY: usize = 96;

/// Distance of the overlay from the top-right corner of the display.
const MARGIN: i32 = 5;
/// Black padding around the text.
const PADDING: i32 = 5;

/// A read-only label with the calibration values, toggled on demand.
///
/// Operators copy the values shown here into
/// [`crate::config::KNOWN_GOOD_CALIBRATION`].
#[derive(Debug, Default)]
pub struct DiagnosticOverlay {
    visible: bool,
}

impl DiagnosticOverlay {
    pub const fn new() -> Self {
        Self { visible: false }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Shows a hidden overlay or hides a visible one. Returns the new
    /// visibility.
    pub fn toggle(&mut self) -> bool {
        self.visible = !self.visible;
        self.visible
    }

    /// Formats the overlay text for `context`.
    pub fn text(context: &CalibrationContext) -> String<OVERLAY_TEXT_CAPACITY> {
        let mut text = String::new();
        // Both variants fit the capacity.
        let _ = if context.is_calibrated() {
            let v = context.vector().values();
            write!(
                text,
                "Cal Values:\n{}, {}, {}, {},\n{}, {}, {}, {}",
                v[0], v[1], v[2], v[3], v[4], v[5], v[6], v[7]
            )
        } else {
            text.write_str("Not Calibrated\nRun CAL first")
        };
        text
    }

    /// Draws the overlay in the top-right corner of `display`, or nothing if
    /// it is hidden.
    pub fn draw<DT>(
        &self,
        display: &mut DT,
        context: &CalibrationContext,
    ) -> Result<(), DT::Error>
    where
        DT: DrawTarget<Color = Rgb565>,
    {
        if !self.visible {
            return Ok(());
        }

        let text = Self::text(context);
        let anchor = Point::new(
            display.bounding_box().bottom_right().map_or(0, |p| p.x) - MARGIN - PADDING,
            MARGIN + PADDING,
        );
        let label = Text::with_text_style(
            &text,
            anchor,
            MonoTextStyleBuilder::new()
                .font(&FONT_10X20)
                .text_color(Rgb565::GREEN)
                .background_color(Rgb565::BLACK)
                .build(),
            TextStyleBuilder::new()
                .alignment(Alignment::Right)
                .baseline(Baseline::Top)
                .build(),
        );

        label
            .bounding_box()
            .offset(PADDING)
            .into_styled(PrimitiveStyle::with_fill(Rgb565::BLACK))
            .draw(display)?;
        label.draw(display)?;
        Ok(())
    }
}

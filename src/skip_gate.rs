//! The time-boxed prompt offering to skip calibration.

use crate::{
    clock::Clock,
    config::CalibrationConfig,
    error::{Error, PanelError},
    panel::TouchPanel,
    prompt::draw_prompt,
};
use core::fmt::Write;
use embedded_graphics::{
    draw_target::DrawTarget,
    geometry::{Point, Size},
    mono_font::{ascii::FONT_10X20, MonoTextStyle},
    pixelcolor::{Rgb565, RgbColor},
    primitives::{Primitive, PrimitiveStyle, PrimitiveStyleBuilder, Rectangle, StrokeAlignment},
    text::{Alignment, Baseline, Text, TextStyleBuilder},
    Drawable,
};
use heapless::String;

#[cfg(feature = "defmt")]
use defmt::Format;

/// Size of the skip button, shrunk to fit smaller displays.
const BUTTON_SIZE: Size = Size::new(200, 80);

/// What the operator chose at the skip prompt.
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipDecision {
    /// Keep the known-good calibration.
    Skip,
    /// Run the corner calibration.
    Proceed,
}

/// Lets the operator bypass calibration by touching the screen within a
/// fixed window.
#[derive(Debug, Clone, Copy)]
pub struct SkipGate {
    timeout_ms: u32,
    poll_interval_ms: u32,
    confirm_hold_ms: u32,
}

impl SkipGate {
    pub fn new(config: &CalibrationConfig) -> Self {
        Self {
            timeout_ms: config.skip_timeout_ms,
            poll_interval_ms: config.skip_poll_interval_ms,
            confirm_hold_ms: config.skip_confirm_hold_ms,
        }
    }

    /// Shows the skip prompt and polls the panel until it is touched or the
    /// window closes.
    ///
    /// Returns [`SkipDecision::Proceed`] without drawing anything when
    /// `has_existing_calibration` is false, since there is nothing to keep.
    /// The panel should already use the existing calibration so that the
    /// touch is recognized.
    pub fn offer_skip<P, C>(
        &self,
        panel: &mut P,
        clock: &mut C,
        has_existing_calibration: bool,
    ) -> Result<SkipDecision, PanelError<P>>
    where
        P: TouchPanel,
        C: Clock,
    {
        if !has_existing_calibration {
            return Ok(SkipDecision::Proceed);
        }

        let button = self.draw(panel).map_err(Error::DrawTarget)?;

        let start = clock.now_ms();
        while clock.elapsed_ms(start) < u64::from(self.timeout_ms) {
            if panel.poll_touch().map_err(Error::Touch)?.is_some() {
                button
                    .into_styled(PrimitiveStyle::with_fill(Rgb565::YELLOW))
                    .draw(panel.display())
                    .map_err(Error::DrawTarget)?;
                clock.delay_ms(self.confirm_hold_ms);

                #[cfg(feature = "defmt")]
                defmt::info!("calibration skipped after {} ms", clock.elapsed_ms(start));
                return Ok(SkipDecision::Skip);
            }
            clock.delay_ms(self.poll_interval_ms);
        }

        #[cfg(feature = "defmt")]
        defmt::info!("no touch within {} ms, calibrating", self.timeout_ms);
        Ok(SkipDecision::Proceed)
    }

    /// Draws the prompt and the skip button, returning the button's area.
    fn draw<P: TouchPanel>(
        &self,
        panel: &mut P,
    ) -> Result<Rectangle, <P::Display as DrawTarget>::Error> {
        let display_size = panel.display_size();
        let display = panel.display();

        let mut text: String<128> = String::new();
        // The buffer fits the prompt for any u32 timeout.
        let _ = write!(
            text,
            "Touch Calibration\n\nTouch anywhere to SKIP\n(use existing cal)\n\nOr wait {} seconds\nto calibrate",
            self.timeout_ms / 1000
        );
        draw_prompt(display, &text)?;

        let size = BUTTON_SIZE.component_min(display_size);
        let top_left = Point::new(
            (display_size.width - size.width) as i32 / 2,
            (display_size.height - size.height) as i32 / 2,
        );
        let button = Rectangle::new(top_left, size);
        button
            .into_styled(
                PrimitiveStyleBuilder::new()
                    .fill_color(Rgb565::GREEN)
                    .stroke_color(Rgb565::WHITE)
                    .stroke_width(1)
                    .stroke_alignment(StrokeAlignment::Inside)
                    .build(),
            )
            .draw(display)?;
        Text::with_text_style(
            "TOUCH SKIP",
            button.center(),
            MonoTextStyle::new(&FONT_10X20, Rgb565::BLACK),
            TextStyleBuilder::new()
                .alignment(Alignment::Center)
                .baseline(Baseline::Middle)
                .build(),
        )
        .draw(display)?;

        Ok(button)
    }
}

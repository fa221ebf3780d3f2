//! Full-screen text prompts shown while calibrating.

use embedded_graphics::{
    draw_target::DrawTarget,
    geometry::Point,
    mono_font::{ascii::FONT_10X20, MonoTextStyle},
    pixelcolor::{Rgb565, RgbColor},
    text::{Baseline, Text},
    Drawable,
};

/// Top-left corner of the prompt text.
const PROMPT_ORIGIN: Point = Point::new(10, 10);

/// Clears the screen and writes `text` (lines separated by `\n`) in white.
pub(crate) fn draw_prompt<DT>(display: &mut DT, text: &str) -> Result<(), DT::Error>
where
    DT: DrawTarget<Color = Rgb565>,
{
    display.clear(Rgb565::BLACK)?;
    Text::with_baseline(
        text,
        PROMPT_ORIGIN,
        MonoTextStyle::new(&FONT_10X20, Rgb565::WHITE),
        Baseline::Top,
    )
    .draw(display)?;
    Ok(())
}

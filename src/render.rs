//! The retained-mode GUI toolkit as seen from the calibration flow.

use crate::{clock::Clock, config::CalibrationConfig};

/// The render loop of the GUI toolkit.
///
/// All calls are synchronous. The toolkit reads pointer input through
/// [`crate::input::TouchInputAdapter`] from within [`RenderLoop::step()`].
pub trait RenderLoop {
    /// Marks the whole active screen as needing a redraw.
    fn invalidate_screen(&mut self);

    /// Runs one iteration of the toolkit: timers, input, partial redraws.
    fn step(&mut self);

    /// Redraws everything that is pending right now, bypassing the
    /// toolkit's refresh period.
    fn force_full_refresh(&mut self);
}

/// Repaints the screen after the calibration prompts drew over it.
///
/// The toolkit only redraws what it considers dirty and flushes through a
/// partial buffer, so one refresh is not enough to cover everything the
/// prompts overwrote. The screen is invalidated, the loop is pumped and
/// refreshed twice.
pub fn flush_barrier<R, C>(render: &mut R, clock: &mut C, config: &CalibrationConfig)
where
    R: RenderLoop,
    C: Clock,
{
    render.invalidate_screen();
    pump(render, clock, config.flush_first_steps, config.flush_step_interval_ms);
    render.force_full_refresh();
    pump(render, clock, config.flush_second_steps, config.flush_step_interval_ms);
    render.force_full_refresh();
}

fn pump<R: RenderLoop, C: Clock>(render: &mut R, clock: &mut C, steps: u8, interval_ms: u32) {
    for _ in 0..steps {
        render.step();
        clock.delay_ms(interval_ms);
    }
}

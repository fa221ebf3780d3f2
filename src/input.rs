//! Pointer input for the GUI toolkit.

use crate::{
    calibration::{Point, Size},
    panel::TouchPanel,
};

#[cfg(feature = "defmt")]
use defmt::Format;

/// The pixel area pointer coordinates are confined to.
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayBounds {
    pub width: u32,
    pub height: u32,
}

impl DisplayBounds {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Clamps `point` into `[0, width - 1] x [0, height - 1]`.
    pub fn clamp(&self, point: Point) -> Point {
        Point::new(
            point.x.clamp(0, last_index(self.width)),
            point.y.clamp(0, last_index(self.height)),
        )
    }
}

impl From<Size> for DisplayBounds {
    fn from(size: Size) -> Self {
        Self::new(size.width, size.height)
    }
}

fn last_index(length: u32) -> i32 {
    i32::try_from(length.saturating_sub(1)).unwrap_or(i32::MAX)
}

#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerState {
    Pressed,
    Released,
}

/// One pointer reading handed to the GUI toolkit.
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerData {
    pub point: Point,
    pub state: PointerState,
}

/// Reads the panel once per render loop tick and turns the reading into
/// [`PointerData`].
///
/// A released pointer keeps reporting where it was last pressed, which is
/// what the toolkit expects for release events.
#[derive(Debug, Clone, Copy)]
pub struct TouchInputAdapter {
    bounds: DisplayBounds,
    last_point: Point,
}

impl TouchInputAdapter {
    pub fn new(bounds: DisplayBounds) -> Self {
        Self {
            bounds,
            last_point: Point::zero(),
        }
    }

    /// Takes the bounds from the panel's display.
    pub fn for_panel<P: TouchPanel>(panel: &P) -> Self {
        Self::new(panel.display_size().into())
    }

    pub fn bounds(&self) -> DisplayBounds {
        self.bounds
    }

    /// Polls `panel` without blocking.
    pub fn read<P: TouchPanel>(&mut self, panel: &mut P) -> Result<PointerData, P::Error> {
        let state = match panel.poll_touch()? {
            Some(point) => {
                self.last_point = self.bounds.clamp(point);
                PointerState::Pressed
            }
            None => PointerState::Released,
        };
        Ok(PointerData {
            point: self.last_point,
            state,
        })
    }
}

//! Fakes for the hardware seams, shared by the unit tests.

use crate::{
    calibration::{CalibrationData, CalibrationVector, Point, RawCalibrationSample, Size},
    clock::Clock,
    driver::Xpt2046,
    panel::TouchPanel,
    render::RenderLoop,
};
use core::convert::Infallible;
use embedded_graphics::{
    draw_target::DrawTarget,
    geometry::OriginDimensions,
    pixelcolor::{Rgb565, RgbColor},
    primitives::{PointsIter, Rectangle},
    Pixel,
};
use embedded_hal::{
    delay::DelayNs,
    digital::{self, ErrorKind, ErrorType as DigitalErrorType, InputPin},
    spi::{ErrorType as SpiErrorType, Operation, SpiDevice},
};
use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    rc::Rc,
};

/// Clock whose delays advance its own time, so timed flows run instantly and
/// deterministically. Clones share the same time.
#[derive(Debug, Default, Clone)]
pub(crate) struct FakeClock {
    now_ns: Rc<Cell<u64>>,
}

impl FakeClock {
    pub(crate) fn ms(&self) -> u64 {
        self.now_ns.get() / 1_000_000
    }
}

impl DelayNs for FakeClock {
    fn delay_ns(&mut self, ns: u32) {
        self.now_ns.set(self.now_ns.get() + u64::from(ns));
    }
}

impl Clock for FakeClock {
    fn now_ms(&mut self) -> u64 {
        self.ms()
    }
}

/// SPI device answering every X/Y transfer with the current raw reading.
pub(crate) struct FakeSpi {
    raw: Rc<Cell<(u16, u16)>>,
    transfers: Rc<Cell<usize>>,
}

impl SpiErrorType for FakeSpi {
    type Error = Infallible;
}

impl SpiDevice<u8> for FakeSpi {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Infallible> {
        for operation in operations {
            if let Operation::Transfer(read, write) = operation {
                assert_eq!(write.len(), 5);
                let (x, y) = self.raw.get();
                let x = x.to_be_bytes();
                let y = y.to_be_bytes();
                read.copy_from_slice(&[0, x[0], x[1], y[0], y[1]]);
                self.transfers.set(self.transfers.get() + 1);
            }
        }
        Ok(())
    }
}

/// PENIRQ pin whose level is shared with the test.
pub(crate) struct FakeIrq {
    pressed: Rc<Cell<bool>>,
    fault: Rc<Cell<bool>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct IrqFault;

impl digital::Error for IrqFault {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

impl DigitalErrorType for FakeIrq {
    type Error = IrqFault;
}

impl InputPin for FakeIrq {
    fn is_high(&mut self) -> Result<bool, IrqFault> {
        self.is_low().map(|low| !low)
    }

    fn is_low(&mut self) -> Result<bool, IrqFault> {
        if self.fault.get() {
            return Err(IrqFault);
        }
        Ok(self.pressed.get())
    }
}

/// Handles for steering a fake XPT2046 from a test.
pub(crate) struct Harness {
    pub(crate) raw: Rc<Cell<(u16, u16)>>,
    pub(crate) pressed: Rc<Cell<bool>>,
    pub(crate) transfers: Rc<Cell<usize>>,
    /// Makes every PENIRQ read fail while set.
    pub(crate) irq_fault: Rc<Cell<bool>>,
}

pub(crate) fn fake_xpt2046(size: Size) -> (Xpt2046<FakeSpi, FakeIrq>, Harness) {
    let raw = Rc::new(Cell::new((0, 0)));
    let pressed = Rc::new(Cell::new(false));
    let transfers = Rc::new(Cell::new(0));
    let irq_fault = Rc::new(Cell::new(false));
    let touch = Xpt2046::new(
        FakeSpi {
            raw: raw.clone(),
            transfers: transfers.clone(),
        },
        FakeIrq {
            pressed: pressed.clone(),
            fault: irq_fault.clone(),
        },
        &CalibrationData::estimate(size),
    );
    (
        touch,
        Harness {
            raw,
            pressed,
            transfers,
            irq_fault,
        },
    )
}

/// Delay that plays the operator during a corner pass: it presses the next
/// corner while the pass polls for a touch and lets go while the pass waits
/// for the release.
pub(crate) struct CornerToucher {
    raw: Rc<Cell<(u16, u16)>>,
    pressed: Rc<Cell<bool>>,
    corners: VecDeque<(u16, u16)>,
    pub(crate) touched: usize,
    watched: Option<(FakeDisplay, Rectangle)>,
    /// White pixels inside the watched area, counted at every touch poll.
    pub(crate) watched_white: Vec<usize>,
}

impl CornerToucher {
    pub(crate) fn new(harness: &Harness, corners: &[(u16, u16)]) -> Self {
        Self {
            raw: harness.raw.clone(),
            pressed: harness.pressed.clone(),
            corners: corners.iter().copied().collect(),
            touched: 0,
            watched: None,
            watched_white: Vec::new(),
        }
    }

    /// Counts the white pixels of `area` on `display` while waiting for each
    /// touch.
    pub(crate) fn watching(mut self, display: &FakeDisplay, area: Rectangle) -> Self {
        self.watched = Some((display.clone(), area));
        self
    }
}

impl DelayNs for CornerToucher {
    fn delay_ns(&mut self, ns: u32) {
        match ns {
            // Polling for the touch.
            500_000 => {
                if let Some((display, area)) = &self.watched {
                    let white = area
                        .points()
                        .filter(|p| display.pixel(p.x, p.y) == Some(Rgb565::WHITE))
                        .count();
                    self.watched_white.push(white);
                }
                if !self.pressed.get() {
                    if let Some(raw) = self.corners.pop_front() {
                        self.raw.set(raw);
                        self.pressed.set(true);
                    }
                }
            }
            // Waiting for the release.
            100_000_000 => {
                self.pressed.set(false);
                self.touched += 1;
            }
            _ => {}
        }
    }
}

/// In-memory RGB565 frame buffer. Clones share the frame.
#[derive(Debug, Clone)]
pub(crate) struct FakeDisplay {
    size: Size,
    frame: Rc<RefCell<Vec<Rgb565>>>,
    pub(crate) clears: usize,
}

impl FakeDisplay {
    pub(crate) fn new(size: Size) -> Self {
        Self {
            size,
            frame: Rc::new(RefCell::new(vec![
                Rgb565::BLACK;
                (size.width * size.height) as usize
            ])),
            clears: 0,
        }
    }

    pub(crate) fn pixel(&self, x: i32, y: i32) -> Option<Rgb565> {
        if x < 0 || y < 0 || x >= self.size.width as i32 || y >= self.size.height as i32 {
            return None;
        }
        Some(self.frame.borrow()[(y as u32 * self.size.width + x as u32) as usize])
    }

    pub(crate) fn count(&self, color: Rgb565) -> usize {
        self.frame.borrow().iter().filter(|&&c| c == color).count()
    }
}

impl OriginDimensions for FakeDisplay {
    fn size(&self) -> Size {
        self.size
    }
}

impl DrawTarget for FakeDisplay {
    type Color = Rgb565;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Infallible>
    where
        I: IntoIterator<Item = Pixel<Rgb565>>,
    {
        let mut frame = self.frame.borrow_mut();
        for Pixel(point, color) in pixels {
            if point.x >= 0
                && point.y >= 0
                && (point.x as u32) < self.size.width
                && (point.y as u32) < self.size.height
            {
                let index = (point.y as u32 * self.size.width + point.x as u32) as usize;
                frame[index] = color;
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Rgb565) -> Result<(), Infallible> {
        self.clears += 1;
        self.frame.borrow_mut().fill(color);
        Ok(())
    }
}

/// A panel whose touches and corner passes are scripted by the test.
pub(crate) struct ScriptedPanel {
    pub(crate) display: FakeDisplay,
    pub(crate) has_touch: bool,
    clock: FakeClock,
    /// The panel reads as pressed at `touch_at` from this time on.
    pub(crate) touch_from_ms: Option<u64>,
    pub(crate) touch_at: Point,
    pub(crate) passes: VecDeque<RawCalibrationSample>,
    pub(crate) passes_run: usize,
    pub(crate) polls: usize,
    pub(crate) installed: Vec<CalibrationVector>,
    /// The corner pass with this number, counted across all runs, fails.
    pub(crate) failing_pass: Option<usize>,
}

/// The error of a [`ScriptedPanel`] pass set up to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PassFailed;

impl ScriptedPanel {
    pub(crate) fn new(size: Size, clock: &FakeClock) -> Self {
        Self {
            display: FakeDisplay::new(size),
            has_touch: true,
            clock: clock.clone(),
            touch_from_ms: None,
            touch_at: Point::zero(),
            passes: VecDeque::new(),
            passes_run: 0,
            polls: 0,
            installed: Vec::new(),
            failing_pass: None,
        }
    }

    pub(crate) fn with_passes(mut self, passes: &[[u16; 8]]) -> Self {
        self.passes = passes.iter().map(|p| RawCalibrationSample(*p)).collect();
        self
    }
}

impl TouchPanel for ScriptedPanel {
    type Error = PassFailed;
    type Display = FakeDisplay;

    fn display(&mut self) -> &mut FakeDisplay {
        &mut self.display
    }

    fn display_size(&self) -> Size {
        self.display.size
    }

    fn has_touch(&self) -> bool {
        self.has_touch
    }

    fn install_calibration(&mut self, vector: &CalibrationVector) {
        self.installed.push(*vector);
    }

    fn poll_touch(&mut self) -> Result<Option<Point>, PassFailed> {
        self.polls += 1;
        let pressed = self
            .touch_from_ms
            .is_some_and(|from| self.clock.ms() >= from);
        Ok(pressed.then_some(self.touch_at))
    }

    fn sample_corners<D: DelayNs>(
        &mut self,
        _delay: &mut D,
        _marker_size: u32,
    ) -> Result<RawCalibrationSample, PassFailed> {
        self.passes_run += 1;
        if self.failing_pass == Some(self.passes_run) {
            return Err(PassFailed);
        }
        Ok(self.passes.pop_front().unwrap_or_default())
    }
}

/// What the render loop was asked to do, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RenderCall {
    Invalidate,
    Step,
    FullRefresh,
}

#[derive(Debug, Default)]
pub(crate) struct RecordingRenderLoop {
    pub(crate) calls: Vec<RenderCall>,
}

impl RenderLoop for RecordingRenderLoop {
    fn invalidate_screen(&mut self) {
        self.calls.push(RenderCall::Invalidate);
    }

    fn step(&mut self) {
        self.calls.push(RenderCall::Step);
    }

    fn force_full_refresh(&mut self) {
        self.calls.push(RenderCall::FullRefresh);
    }
}

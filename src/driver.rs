//! The Xpt2046 touch panel driver.
//!
//! The XPT2046 is a resistive touch screen controller connected over SPI. It
//! is essentially a 12-bit ADC that is commanded, one Control Byte at a time,
//! to measure the X or Y position of the touch. PENIRQ is pulled low by the
//! controller for as long as the panel is pressed.
//!
//! The driver debounces and averages the X/Y position measurements, and
//! transforms the averaged raw point into display pixels with the active
//! [`CalibrationData`].
//!
//! Information on the operation of the XPT2046 Touch Screen Controller can be
//! found in the XPT2046 data sheet
//! (<https://www.snapeda.com/parts/XPT2046/Xptek/datasheet/>).

use crate::calibration::{CalibrationData, Point};
use core::fmt::Debug;
#[cfg(feature = "defmt")]
use defmt::Format;
use embedded_hal::{digital::InputPin, spi::SpiDevice};

/// Convenience functions for building XPT2046 Control Bytes.
///
/// The Control Byte consists of one start bit (S), three channel select bits
/// (A2-A0), one 12-bit/8-bit select bit (MODE), one single-ended/differential
/// select bit (SER/DFR) and two power-down bits (PD1, PD0). A2-A0, MODE and
/// SER/DFR apply to the current measurement whereas PD1 and PD0 apply after
/// the measurement is complete.
///
/// The measurement starts 9 clock cycles after the start bit and is 12 bits
/// long, so a byte aligned Control Byte produces a measurement misaligned by
/// three bits. The Control Bytes are delayed by three bits at compile time
/// instead, which leaves the measurement byte aligned in the receive buffer.
pub(crate) mod control_byte {
    /// Position channels. Differential measurement, 12-bit output, internal
    /// reference off and PENIRQ enabled after the measurement.
    #[derive(Debug, Clone, Copy)]
    pub enum ChannelSelect {
        XPosition = 0b101,
        YPosition = 0b001,
    }

    const fn build_control_byte(channel: ChannelSelect) -> u8 {
        // S=1, MODE=0 (12 bit), SER/DFR=0 (differential), PD1=0, PD0=0.
        (0b1 << 7) | ((channel as u8) << 4)
    }

    impl ChannelSelect {
        /// The Control Byte for this channel, delayed by three bits.
        pub const fn into_delayed_control_byte(self) -> [u8; 2] {
            ((build_control_byte(self) as u16) << 5).to_be_bytes()
        }
    }
}

/// Number of position measurements averaged into one touch point.
const MAX_SAMPLES: usize = 16;

#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Debug)]
pub enum Error<SpiError, IrqError> {
    /// SPI error
    Spi(SpiError),
    /// IRQ error
    Irq(IrqError),
}

/// Current state of the driver
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TouchScreenState {
    /// Driver waits for touch
    Idle,
    /// Driver debounces the touch
    Presampling,
    /// Confirmed touch
    Touched,
    /// Touch released
    Released,
}

#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Debug)]
struct TouchSamples {
    /// All the touch samples
    samples: [Point; MAX_SAMPLES],
    /// current number of captured samples
    counter: usize,
}

impl Default for TouchSamples {
    fn default() -> Self {
        Self {
            counter: 0,
            samples: [Point::default(); MAX_SAMPLES],
        }
    }
}

impl TouchSamples {
    fn average(&self) -> Point {
        let mut x = 0;
        let mut y = 0;

        for point in self.samples {
            x += point.x;
            y += point.y;
        }
        x /= MAX_SAMPLES as i32;
        y /= MAX_SAMPLES as i32;
        Point::new(x, y)
    }
}

/// The Xpt2046 driver.
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Debug)]
pub struct Xpt2046<Spi, Irq> {
    /// The SPI device interface
    spi: Spi,
    /// PENIRQ, low while the panel is pressed
    irq: Irq,
    /// Current driver state
    screen_state: TouchScreenState,
    /// Ring buffer of the latest position measurements
    buffer: TouchSamples,
    /// Calibration data for transforming touch measurements into display pixel positions.
    calibration_data: CalibrationData,
}

impl<Spi, SpiError, Irq, IrqError> Xpt2046<Spi, Irq>
where
    Spi: SpiDevice<u8, Error = SpiError>,
    SpiError: Debug,
    Irq: InputPin<Error = IrqError>,
    IrqError: Debug,
{
    pub fn new(spi: Spi, irq: Irq, calibration_data: &CalibrationData) -> Self {
        Self {
            spi,
            irq,
            screen_state: TouchScreenState::Idle,
            buffer: TouchSamples::default(),
            calibration_data: *calibration_data,
        }
    }

    /// Reset the driver state.
    pub fn init(&mut self) -> Result<(), Error<SpiError, IrqError>> {
        // Make a throwaway position measurement so that the power-down bits
        // leave PENIRQ enabled.
        _ = self.measure_xy_positions().map_err(Error::Spi)?;

        self.buffer.counter = 0;
        self.screen_state = TouchScreenState::Idle;

        Ok(())
    }

    /// Sets the calibration data used by [`Self::get_touch_point()`].
    pub fn set_calibration_data(&mut self, calibration_data: &CalibrationData) {
        self.calibration_data = *calibration_data;
    }

    pub fn calibration_data(&self) -> &CalibrationData {
        &self.calibration_data
    }

    /// Collects the touch position measurements.
    ///
    /// This should be run continually, from a main loop or a timer
    /// interrupt. After PENIRQ goes high, calling can be suspended until
    /// PENIRQ goes low again.
    pub fn run(&mut self) -> Result<(), Error<SpiError, IrqError>> {
        match self.screen_state {
            TouchScreenState::Idle => {
                if self.penirq_is_active()? {
                    self.buffer.counter = 0;
                    self.screen_state = TouchScreenState::Presampling;
                }
            }
            TouchScreenState::Presampling => {
                if !self.penirq_is_active()? {
                    self.screen_state = TouchScreenState::Released;
                    return Ok(());
                }
                self.push_sample()?;
                if self.buffer.counter == 0 {
                    self.screen_state = TouchScreenState::Touched;
                }
            }
            TouchScreenState::Touched => {
                if !self.penirq_is_active()? {
                    self.screen_state = TouchScreenState::Released;
                    return Ok(());
                }
                self.push_sample()?;
            }
            TouchScreenState::Released => {
                self.buffer.counter = 0;
                self.screen_state = TouchScreenState::Idle;
            }
        }
        Ok(())
    }

    /// Runs the state machine until the touch is either confirmed or gone,
    /// and returns the calibrated touch point while the panel is pressed.
    ///
    /// Presampling takes at most `MAX_SAMPLES` measurements, so this returns
    /// promptly and can be called once per render loop tick.
    pub fn poll(&mut self) -> Result<Option<Point>, Error<SpiError, IrqError>> {
        self.run()?;
        while self.screen_state == TouchScreenState::Presampling {
            self.run()?;
        }
        Ok(self.is_touched().then(|| self.get_touch_point()))
    }

    fn push_sample(&mut self) -> Result<(), Error<SpiError, IrqError>> {
        let (x, y) = self.measure_xy_positions().map_err(Error::Spi)?;
        self.buffer.samples[self.buffer.counter] = Point::new(x.into(), y.into());
        self.buffer.counter = (self.buffer.counter + 1) % MAX_SAMPLES;
        Ok(())
    }

    /// Returns true while PENIRQ signals a pressed panel.
    pub fn penirq_is_active(&mut self) -> Result<bool, Error<SpiError, IrqError>> {
        self.irq.is_low().map_err(Error::Irq)
    }

    /// Returns the touch point in XPT2046 measurement units.
    ///
    /// This is made available for use in touch screen calibration procedures.
    pub fn get_touch_point_raw(&self) -> Point {
        self.buffer.average()
    }

    /// Returns the touch point in display pixel units.
    pub fn get_touch_point(&self) -> Point {
        self.calibration_data.transform(self.get_touch_point_raw())
    }

    /// Returns true once a touch has been debounced and until it is released.
    pub fn is_touched(&self) -> bool {
        self.screen_state == TouchScreenState::Touched
    }

    /// Forgets the current touch, so that the next one is debounced afresh.
    pub fn clear_touch(&mut self) {
        self.buffer.counter = 0;
        self.screen_state = TouchScreenState::Idle;
    }

    /// Returns the measurements of X-Position and Y-Position as the tuple
    /// (X-Position,Y-Position).
    ///
    /// This is the measurement [`Xpt2046::run()`] makes and filters for use
    /// in [`Xpt2046::get_touch_point_raw()`] and
    /// [`Xpt2046::get_touch_point()`].
    pub fn measure_xy_positions(&mut self) -> Result<(u16, u16), SpiError> {
        const M0: [u8; 2] = control_byte::ChannelSelect::XPosition.into_delayed_control_byte();
        const M1: [u8; 2] = control_byte::ChannelSelect::YPosition.into_delayed_control_byte();
        const TX_BUF: [u8; 5] = [M0[0], M0[1], M1[0], M1[1], 0];
        let mut rx_buf = [0; 5];
        self.spi.transfer(&mut rx_buf, &TX_BUF)?;
        let x = u16::from_be_bytes([rx_buf[1], rx_buf[2]]);
        let y = u16::from_be_bytes([rx_buf[3], rx_buf[4]]);
        Ok((x, y))
    }
}

#![deny(
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    unused_qualifications,
    unused_variables,
    unreachable_code,
    unused_comparisons,
    unused_must_use
)]
#![cfg_attr(not(test), no_std)]

//! Touch calibration for display panels with an XPT2046 resistive touch
//! controller, based on the
//! [`embedded-hal`](https://github.com/rust-embedded/embedded-hal) and
//! [`embedded-graphics`](https://github.com/embedded-graphics/embedded-graphics)
//! traits.
//!
//! At boot, [`CalibrationController::run_at_boot()`] either lets the
//! operator keep the compiled-in calibration by touching the screen within a
//! few seconds, or runs several corner-calibration passes and reduces them to
//! one [`CalibrationVector`] by taking the most extreme reading per value.
//! Once the GUI runs, [`TouchInputAdapter`] feeds it clamped pointer data,
//! [`CalibrationController::recalibrate()`] calibrates again on request and
//! [`DiagnosticOverlay`] shows the active values.
//!
//! ```ignore
//! let mut panel = TouchScreen::new(display, Some(Xpt2046::new(spi, irq, &data)));
//! let mut controller = CalibrationController::new(CalibrationConfig::default());
//! controller.run_at_boot(&mut panel, &mut clock)?;
//!
//! let mut input = TouchInputAdapter::for_panel(&panel);
//! loop {
//!     let pointer = input.read(&mut panel)?;
//!     // hand `pointer` to the GUI toolkit and step it
//! }
//! ```

pub mod calibration;
pub mod calibration_run;
pub mod clock;
pub mod config;
pub mod controller;
pub mod driver;
pub mod error;
pub mod input;
pub mod overlay;
pub mod panel;
pub mod render;
pub mod sampler;
pub mod skip_gate;

mod prompt;
#[cfg(test)]
mod testing;

pub use crate::{
    calibration::{
        select_extremes, CalibrationData, CalibrationSampleSet, CalibrationVector,
        RawCalibrationSample,
    },
    clock::Clock,
    config::{CalibrationConfig, KNOWN_GOOD_CALIBRATION},
    controller::{CalibrationContext, CalibrationController, CalibrationOutcome, CalibrationState},
    driver::Xpt2046,
    error::Error,
    input::{DisplayBounds, PointerData, PointerState, TouchInputAdapter},
    overlay::DiagnosticOverlay,
    panel::{TouchPanel, TouchScreen},
    render::RenderLoop,
    skip_gate::{SkipDecision, SkipGate},
};

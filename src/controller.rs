//! The calibration state machine.
//!
//! [`CalibrationController`] composes the [`SkipGate`], the
//! [`CalibrationSampler`] and [`select_extremes()`]. It owns the active
//! calibration in a [`CalibrationContext`] which the render loop side (the
//! pointer input and the diagnostic overlay) reads by reference.
//!
//! ```text
//! NotStarted ──► AwaitingSkipDecision ──► Complete
//!     │                  │                   ▲ │
//!     │                  ▼                   │ │ recalibrate
//!     ├────────────► Sampling ───────────────┘ │
//!     │                  ▲─────────────────────┘
//!     ▼
//!  Disabled
//! ```

use crate::{
    calibration::{select_extremes, CalibrationVector},
    clock::Clock,
    config::CalibrationConfig,
    error::PanelError,
    panel::TouchPanel,
    render::{flush_barrier, RenderLoop},
    sampler::CalibrationSampler,
    skip_gate::{SkipDecision, SkipGate},
};

#[cfg(feature = "defmt")]
use defmt::Format;

/// Where the controller is in the calibration flow.
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationState {
    NotStarted,
    /// The skip prompt is on screen.
    AwaitingSkipDecision,
    /// Corner-calibration passes are running.
    Sampling,
    /// A calibration is installed.
    Complete,
    /// The panel has no touch controller. Absorbing.
    Disabled,
}

impl CalibrationState {
    /// Returns true if the flow may move from `self` to `next`.
    ///
    /// A flow interrupted by a collaborator error falls back to
    /// [`CalibrationState::NotStarted`], or to [`CalibrationState::Complete`]
    /// if it was a recalibration.
    pub fn can_transition_to(self, next: CalibrationState) -> bool {
        use CalibrationState::*;
        matches!(
            (self, next),
            (NotStarted, AwaitingSkipDecision)
                | (NotStarted, Sampling)
                | (NotStarted, Disabled)
                | (AwaitingSkipDecision, Complete)
                | (AwaitingSkipDecision, Sampling)
                | (AwaitingSkipDecision, NotStarted)
                | (Sampling, Complete)
                | (Sampling, NotStarted)
                | (Complete, Sampling)
        )
    }
}

/// How a calibration run ended.
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationOutcome {
    /// The panel has no touch controller; nothing was done.
    Disabled,
    /// The operator kept the known-good calibration.
    Skipped,
    /// A fresh calibration was sampled and installed.
    Calibrated(CalibrationVector),
}

/// The active calibration, as seen by the render loop.
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CalibrationContext {
    vector: CalibrationVector,
    calibrated: bool,
}

impl CalibrationContext {
    /// Returns true if [`CalibrationContext::vector()`] holds a meaningful
    /// calibration.
    pub fn is_calibrated(&self) -> bool {
        self.calibrated
    }

    pub fn vector(&self) -> &CalibrationVector {
        &self.vector
    }
}

/// Drives the touch calibration, once at boot and again on request.
#[derive(Debug)]
pub struct CalibrationController {
    config: CalibrationConfig,
    state: CalibrationState,
    context: CalibrationContext,
}

impl CalibrationController {
    pub fn new(config: CalibrationConfig) -> Self {
        Self {
            config,
            state: CalibrationState::NotStarted,
            context: CalibrationContext::default(),
        }
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    pub fn state(&self) -> CalibrationState {
        self.state
    }

    pub fn context(&self) -> &CalibrationContext {
        &self.context
    }

    /// Calibrates before the render loop runs.
    ///
    /// With a known-good calibration configured, the operator is first
    /// offered to keep it. Otherwise, or if a calibration is already
    /// installed, the corner passes start right away.
    ///
    /// Skipping is only offered from [`CalibrationState::NotStarted`]: calling
    /// this again after a completed calibration samples without the prompt.
    pub fn run_at_boot<P, C>(
        &mut self,
        panel: &mut P,
        clock: &mut C,
    ) -> Result<CalibrationOutcome, PanelError<P>>
    where
        P: TouchPanel,
        C: Clock,
    {
        self.run(panel, clock, true)
    }

    /// Recalibrates while the render loop is active.
    ///
    /// The skip prompt is never shown. Once the passes are over the render
    /// loop is flushed so that the prompts drawn over the GUI are painted over
    /// again, also if a collaborator failed. A failed recalibration keeps the
    /// previous calibration active.
    pub fn recalibrate<P, C, R>(
        &mut self,
        panel: &mut P,
        clock: &mut C,
        render: &mut R,
    ) -> Result<CalibrationOutcome, PanelError<P>>
    where
        P: TouchPanel,
        C: Clock,
        R: RenderLoop,
    {
        let result = self.run(panel, clock, false);
        if !matches!(result, Ok(CalibrationOutcome::Disabled)) {
            flush_barrier(render, clock, &self.config);
        }
        result
    }

    fn run<P, C>(
        &mut self,
        panel: &mut P,
        clock: &mut C,
        offer_skip: bool,
    ) -> Result<CalibrationOutcome, PanelError<P>>
    where
        P: TouchPanel,
        C: Clock,
    {
        if self.state == CalibrationState::Disabled {
            return Ok(CalibrationOutcome::Disabled);
        }
        if !panel.has_touch() {
            #[cfg(feature = "defmt")]
            defmt::warn!("no touch controller, calibration disabled");
            self.enter(CalibrationState::Disabled);
            return Ok(CalibrationOutcome::Disabled);
        }

        let previous = self.state;
        let result = self.calibrate(panel, clock, offer_skip);
        if result.is_err() {
            // The context still holds the calibration installed before.
            self.enter(match previous {
                CalibrationState::Complete => CalibrationState::Complete,
                _ => CalibrationState::NotStarted,
            });
        }
        result
    }

    fn calibrate<P, C>(
        &mut self,
        panel: &mut P,
        clock: &mut C,
        offer_skip: bool,
    ) -> Result<CalibrationOutcome, PanelError<P>>
    where
        P: TouchPanel,
        C: Clock,
    {
        let known_good = self.config.known_good;
        if offer_skip
            && self.state == CalibrationState::NotStarted
            && self.config.has_known_good()
        {
            // The skip touch is read through the known-good calibration.
            panel.install_calibration(&known_good);
            self.enter(CalibrationState::AwaitingSkipDecision);

            let decision = SkipGate::new(&self.config).offer_skip(panel, clock, true)?;
            if decision == SkipDecision::Skip {
                self.context.vector = known_good;
                panel.install_calibration(&self.context.vector);
                self.enter(CalibrationState::Complete);
                return Ok(CalibrationOutcome::Skipped);
            }
        }

        self.enter(CalibrationState::Sampling);
        let samples =
            CalibrationSampler::new(&self.config).run_passes(panel, clock, self.config.runs)?;
        let vector = select_extremes(&samples, self.config.low_threshold).unwrap_or_default();

        self.context.vector = vector;
        panel.install_calibration(&vector);
        self.enter(CalibrationState::Complete);

        #[cfg(feature = "defmt")]
        defmt::info!("calibration values: {=[u16]}", &vector.values()[..]);
        Ok(CalibrationOutcome::Calibrated(vector))
    }

    fn enter(&mut self, next: CalibrationState) {
        if !self.state.can_transition_to(next) {
            #[cfg(feature = "defmt")]
            defmt::warn!("refusing transition {:?} -> {:?}", self.state, next);
            return;
        }
        self.state = next;
        self.context.calibrated = next == CalibrationState::Complete;
    }
}

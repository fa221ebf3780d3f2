//! Calibration data model and the math that turns raw corner readings into a
//! usable transform.
//!
//! A corner-calibration pass produces eight raw XPT2046 readings: the raw X
//! and raw Y measured while the operator touches each of the four corners of
//! the display, in the order top-left, bottom-left, top-right, bottom-right.
//! Several passes are reduced into one [`CalibrationVector`] by
//! [`select_extremes()`], and the vector is turned into an affine
//! [`CalibrationData`] transform by [`CalibrationData::from_vector()`].

pub use embedded_graphics::geometry::{Point, Size};
use heapless::Vec;

#[cfg(feature = "defmt")]
use defmt::Format;

/// Number of raw values produced by one corner-calibration pass.
pub const CALIBRATION_VALUES: usize = 8;

/// Upper bound on the number of passes a single calibration run may take.
pub const MAX_CALIBRATION_RUNS: usize = 8;

/// Raw readings below this value are treated as sitting near the low rail of
/// the 12-bit ADC range, readings at or above it near the high rail.
pub const DEFAULT_LOW_THRESHOLD: u16 = 2000;

/// Full scale of a 12-bit XPT2046 position measurement.
const TOUCH_SIZE: f32 = 4096.0;

/// The error returned when a transform cannot be derived from a set of
/// calibration points.
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationError {
    /// The touch points are collinear (or identical), so no transform exists.
    Collinear,
    /// The alpha coefficient of the transform is not finite.
    Alpha,
    /// The beta coefficient of the transform is not finite.
    Beta,
    /// The delta coefficient of the transform is not finite.
    Delta,
}

/// One of the four display corners touched during a calibration pass.
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    TopLeft,
    BottomLeft,
    TopRight,
    BottomRight,
}

impl Corner {
    /// The corners in the order they are touched and stored.
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::BottomLeft,
        Corner::TopRight,
        Corner::BottomRight,
    ];

    const fn index(self) -> usize {
        match self {
            Corner::TopLeft => 0,
            Corner::BottomLeft => 1,
            Corner::TopRight => 2,
            Corner::BottomRight => 3,
        }
    }

    /// Returns the pixel at this corner of a display of the given size.
    pub fn display_point(self, display_size: Size) -> Point {
        let right = display_size.width.saturating_sub(1) as i32;
        let bottom = display_size.height.saturating_sub(1) as i32;
        match self {
            Corner::TopLeft => Point::new(0, 0),
            Corner::BottomLeft => Point::new(0, bottom),
            Corner::TopRight => Point::new(right, 0),
            Corner::BottomRight => Point::new(right, bottom),
        }
    }
}

/// The raw readings of one corner-calibration pass.
///
/// No plausibility check is made on the values: a pass that returned zeros
/// is carried through as-is.
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawCalibrationSample(pub [u16; CALIBRATION_VALUES]);

impl RawCalibrationSample {
    /// Stores the raw reading for `corner`.
    pub fn set_corner(&mut self, corner: Corner, raw: Point) {
        let i = corner.index() * 2;
        self.0[i] = clamp_raw(raw.x);
        self.0[i + 1] = clamp_raw(raw.y);
    }
}

fn clamp_raw(value: i32) -> u16 {
    value.clamp(0, u16::MAX as i32) as u16
}

/// The raw samples collected by one calibration run, in pass order.
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalibrationSampleSet {
    samples: Vec<RawCalibrationSample, MAX_CALIBRATION_RUNS>,
}

impl CalibrationSampleSet {
    pub const fn new() -> Self {
        Self {
            samples: Vec::new(),
        }
    }

    /// Appends a pass. Hands the sample back if the set is already full.
    pub fn push(&mut self, sample: RawCalibrationSample) -> Result<(), RawCalibrationSample> {
        self.samples.push(sample)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn as_slice(&self) -> &[RawCalibrationSample] {
        &self.samples
    }
}

impl<'a> FromIterator<&'a RawCalibrationSample> for CalibrationSampleSet {
    /// Collects at most [`MAX_CALIBRATION_RUNS`] samples; the rest are dropped.
    fn from_iter<I: IntoIterator<Item = &'a RawCalibrationSample>>(iter: I) -> Self {
        let mut set = Self::new();
        for sample in iter.into_iter().take(MAX_CALIBRATION_RUNS) {
            let _ = set.push(*sample);
        }
        set
    }
}

/// The eight-value calibration mapping handed to the touch driver.
///
/// All zeros is the sentinel for "no known-good calibration".
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationVector([u16; CALIBRATION_VALUES]);

impl Default for CalibrationVector {
    fn default() -> Self {
        Self::UNCALIBRATED
    }
}

impl CalibrationVector {
    /// The placeholder vector.
    pub const UNCALIBRATED: Self = Self([0; CALIBRATION_VALUES]);

    pub const fn new(values: [u16; CALIBRATION_VALUES]) -> Self {
        Self(values)
    }

    pub const fn values(&self) -> &[u16; CALIBRATION_VALUES] {
        &self.0
    }

    /// Returns true if every value is the placeholder 0.
    pub fn is_placeholder(&self) -> bool {
        self.0.iter().all(|&v| v == 0)
    }

    /// Returns the raw (x, y) reading recorded for `corner`.
    pub fn corner(&self, corner: Corner) -> Point {
        let i = corner.index() * 2;
        Point::new(self.0[i].into(), self.0[i + 1].into())
    }
}

impl From<RawCalibrationSample> for CalibrationVector {
    fn from(sample: RawCalibrationSample) -> Self {
        Self(sample.0)
    }
}

/// Reduces the passes of a calibration run into one calibration vector.
///
/// Each of the eight slots is reduced on its own. If every pass read below
/// `low_threshold` in that slot the slot sits near the low rail and the
/// smallest reading is taken; otherwise the largest reading is taken. Either
/// way the value closest to the physical edge of the panel wins, which makes
/// up for the operator stopping short of the true corner.
///
/// Returns `None` for an empty sample set.
pub fn select_extremes(
    samples: &CalibrationSampleSet,
    low_threshold: u16,
) -> Option<CalibrationVector> {
    let (first, rest) = samples.as_slice().split_first()?;

    let mut values = [0; CALIBRATION_VALUES];
    for (slot, value) in values.iter_mut().enumerate() {
        let mut min_v = first.0[slot];
        let mut max_v = first.0[slot];
        for sample in rest {
            min_v = min_v.min(sample.0[slot]);
            max_v = max_v.max(sample.0[slot]);
        }
        *value = if max_v < low_threshold { min_v } else { max_v };
    }

    Some(CalibrationVector(values))
}

/// Three matching points, either on the display (pixels) or on the touch
/// panel (raw XPT2046 units).
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationPoints {
    pub a: Point,
    pub b: Point,
    pub c: Point,
}

/// Affine transform from raw touch measurements to display pixels.
///
/// `x = alpha_x * raw_x + beta_x * raw_y + delta_x`, likewise for `y`.
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationData {
    pub alpha_x: f32,
    pub beta_x: f32,
    pub delta_x: f32,
    pub alpha_y: f32,
    pub beta_y: f32,
    pub delta_y: f32,
}

impl CalibrationData {
    /// A coarse transform that assumes the touch panel spans the full 12-bit
    /// range in the same orientation as the display.
    ///
    /// Good enough to reach the skip prompt before any calibration exists.
    pub fn estimate(display_size: Size) -> Self {
        Self {
            alpha_x: display_size.width as f32 / TOUCH_SIZE,
            beta_x: 0.0,
            delta_x: 0.0,
            alpha_y: 0.0,
            beta_y: display_size.height as f32 / TOUCH_SIZE,
            delta_y: 0.0,
        }
    }

    /// Derives the transform from a calibration vector.
    ///
    /// The four corners give two independent three-point solutions
    /// (top-left/bottom-left/top-right and bottom-right/top-right/bottom-left);
    /// their coefficients are averaged.
    pub fn from_vector(
        vector: &CalibrationVector,
        display_size: Size,
    ) -> Result<Self, CalibrationError> {
        let display = |corner: Corner| corner.display_point(display_size);
        let touch = |corner: Corner| vector.corner(corner);

        let upper = calculate_calibration_data(
            &CalibrationPoints {
                a: display(Corner::TopLeft),
                b: display(Corner::BottomLeft),
                c: display(Corner::TopRight),
            },
            &CalibrationPoints {
                a: touch(Corner::TopLeft),
                b: touch(Corner::BottomLeft),
                c: touch(Corner::TopRight),
            },
        )?;
        let lower = calculate_calibration_data(
            &CalibrationPoints {
                a: display(Corner::BottomRight),
                b: display(Corner::TopRight),
                c: display(Corner::BottomLeft),
            },
            &CalibrationPoints {
                a: touch(Corner::BottomRight),
                b: touch(Corner::TopRight),
                c: touch(Corner::BottomLeft),
            },
        )?;

        Ok(Self {
            alpha_x: (upper.alpha_x + lower.alpha_x) / 2.0,
            beta_x: (upper.beta_x + lower.beta_x) / 2.0,
            delta_x: (upper.delta_x + lower.delta_x) / 2.0,
            alpha_y: (upper.alpha_y + lower.alpha_y) / 2.0,
            beta_y: (upper.beta_y + lower.beta_y) / 2.0,
            delta_y: (upper.delta_y + lower.delta_y) / 2.0,
        })
    }

    /// Maps a raw touch point to display pixels. The result is not clamped
    /// and may fall outside the display.
    pub fn transform(&self, raw: Point) -> Point {
        let raw_x = raw.x as f32;
        let raw_y = raw.y as f32;
        let x = self.alpha_x * raw_x + self.beta_x * raw_y + self.delta_x;
        let y = self.alpha_y * raw_x + self.beta_y * raw_y + self.delta_y;
        Point::new(x as i32, y as i32)
    }
}

/// This function uses the three-point calibration algorithm from "SLYT277:
/// Calibration in Touch-Screen Systems" by Texas Instruments
/// <https://www.ti.com/lit/an/slyt277/slyt277.pdf>.
///
/// Intermediate products are computed in `i64`; raw readings near full scale
/// overflow `i32` in the delta terms.
pub fn calculate_calibration_data(
    display_cp: &CalibrationPoints,
    touch_cp: &CalibrationPoints,
) -> Result<CalibrationData, CalibrationError> {
    let (xa, ya) = (touch_cp.a.x as i64, touch_cp.a.y as i64);
    let (xb, yb) = (touch_cp.b.x as i64, touch_cp.b.y as i64);
    let (xc, yc) = (touch_cp.c.x as i64, touch_cp.c.y as i64);
    let (dxa, dya) = (display_cp.a.x as i64, display_cp.a.y as i64);
    let (dxb, dyb) = (display_cp.b.x as i64, display_cp.b.y as i64);
    let (dxc, dyc) = (display_cp.c.x as i64, display_cp.c.y as i64);

    let det = (xa - xc) * (yb - yc) - (xb - xc) * (ya - yc);
    if det == 0 {
        return Err(CalibrationError::Collinear);
    }

    let det_alpha_x = (dxa - dxc) * (yb - yc) - (dxb - dxc) * (ya - yc);
    let det_beta_x = (xa - xc) * (dxb - dxc) - (xb - xc) * (dxa - dxc);
    let det_delta_x =
        dxa * (xb * yc - xc * yb) - dxb * (xa * yc - xc * ya) + dxc * (xa * yb - xb * ya);
    let det_alpha_y = (dya - dyc) * (yb - yc) - (dyb - dyc) * (ya - yc);
    let det_beta_y = (xa - xc) * (dyb - dyc) - (xb - xc) * (dya - dyc);
    let det_delta_y =
        dya * (xb * yc - xc * yb) - dyb * (xa * yc - xc * ya) + dyc * (xa * yb - xb * ya);

    let det = det as f32;
    let coefficient = |value: i64, error: CalibrationError| {
        let value = value as f32 / det;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(error)
        }
    };

    Ok(CalibrationData {
        alpha_x: coefficient(det_alpha_x, CalibrationError::Alpha)?,
        beta_x: coefficient(det_beta_x, CalibrationError::Beta)?,
        delta_x: coefficient(det_delta_x, CalibrationError::Delta)?,
        alpha_y: coefficient(det_alpha_y, CalibrationError::Alpha)?,
        beta_y: coefficient(det_beta_y, CalibrationError::Beta)?,
        delta_y: coefficient(det_delta_y, CalibrationError::Delta)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(passes: &[[u16; 8]]) -> CalibrationSampleSet {
        passes
            .iter()
            .map(|p| RawCalibrationSample(*p))
            .collect::<std::vec::Vec<_>>()
            .iter()
            .collect()
    }

    #[test]
    fn low_slots_take_minimum_and_high_slots_take_maximum() {
        let samples = set(&[
            [10, 3990, 253, 189, 3922, 3851, 3897, 194],
            [12, 3980, 246, 234, 3945, 3889, 3994, 240],
            [8, 3995, 262, 200, 3930, 3860, 3950, 210],
            [11, 3988, 257, 220, 3940, 3870, 3960, 199],
        ]);

        let vector = select_extremes(&samples, DEFAULT_LOW_THRESHOLD).unwrap();

        assert_eq!(
            vector.values(),
            &[8, 3995, 246, 189, 3945, 3889, 3994, 194]
        );
    }

    #[test]
    fn slot_straddling_the_threshold_takes_maximum() {
        let samples = set(&[[1999, 0, 0, 0, 0, 0, 0, 0], [2000, 0, 0, 0, 0, 0, 0, 0]]);

        let vector = select_extremes(&samples, DEFAULT_LOW_THRESHOLD).unwrap();

        assert_eq!(vector.values()[0], 2000);
        assert_eq!(vector.values()[1], 0);
    }

    #[test]
    fn selection_ignores_pass_order() {
        let passes = [
            [10, 3990, 300, 1500, 2100, 7, 4000, 1999],
            [12, 3980, 250, 1800, 1900, 5, 3500, 2001],
            [8, 3995, 275, 1700, 2050, 9, 3800, 1000],
        ];
        let forward = select_extremes(&set(&passes), DEFAULT_LOW_THRESHOLD);
        let reversed = select_extremes(
            &set(&[passes[2], passes[1], passes[0]]),
            DEFAULT_LOW_THRESHOLD,
        );
        let rotated = select_extremes(
            &set(&[passes[1], passes[2], passes[0]]),
            DEFAULT_LOW_THRESHOLD,
        );

        assert_eq!(forward, reversed);
        assert_eq!(forward, rotated);
    }

    #[test]
    fn identical_passes_reduce_to_the_same_values() {
        let pass = [246, 3849, 257, 189, 3945, 3889, 3994, 194];
        let vector = select_extremes(&set(&[pass, pass, pass, pass]), DEFAULT_LOW_THRESHOLD);
        assert_eq!(vector, Some(CalibrationVector::new(pass)));
    }

    #[test]
    fn zero_pass_flows_through_selection() {
        let samples = set(&[[0; 8], [246, 3849, 257, 189, 3945, 3889, 3994, 194]]);
        let vector = select_extremes(&samples, DEFAULT_LOW_THRESHOLD).unwrap();
        assert_eq!(vector.values(), &[0, 3849, 0, 0, 3945, 3889, 3994, 0]);
    }

    #[test]
    fn empty_set_has_no_selection() {
        assert_eq!(
            select_extremes(&CalibrationSampleSet::new(), DEFAULT_LOW_THRESHOLD),
            None
        );
    }

    #[test]
    fn sample_set_is_bounded() {
        let mut samples = CalibrationSampleSet::new();
        for _ in 0..MAX_CALIBRATION_RUNS {
            assert!(samples.push(RawCalibrationSample::default()).is_ok());
        }
        assert!(samples.push(RawCalibrationSample([1; 8])).is_err());
        assert_eq!(samples.len(), MAX_CALIBRATION_RUNS);
    }

    #[test]
    fn placeholder_is_all_zero() {
        assert!(CalibrationVector::UNCALIBRATED.is_placeholder());
        assert!(!CalibrationVector::new([0, 0, 0, 0, 0, 0, 0, 1]).is_placeholder());
    }

    #[test]
    fn corners_are_stored_in_touch_order() {
        let mut sample = RawCalibrationSample::default();
        sample.set_corner(Corner::TopLeft, Point::new(1, 2));
        sample.set_corner(Corner::BottomLeft, Point::new(3, 4));
        sample.set_corner(Corner::TopRight, Point::new(5, 6));
        sample.set_corner(Corner::BottomRight, Point::new(-7, 70000));
        assert_eq!(sample.0, [1, 2, 3, 4, 5, 6, 0, u16::MAX]);

        let vector = CalibrationVector::from(sample);
        assert_eq!(vector.corner(Corner::TopRight), Point::new(5, 6));
    }

    #[test]
    fn identity_points_give_identity_transform() {
        let cp = CalibrationPoints {
            a: Point::new(10, 10),
            b: Point::new(80, 210),
            c: Point::new(200, 170),
        };
        let data = calculate_calibration_data(&cp, &cp).unwrap();
        assert!((data.alpha_x - 1.0).abs() < 1e-6);
        assert!(data.beta_x.abs() < 1e-6);
        assert!(data.delta_x.abs() < 1e-3);
        assert!(data.alpha_y.abs() < 1e-6);
        assert!((data.beta_y - 1.0).abs() < 1e-6);
        assert!(data.delta_y.abs() < 1e-3);
    }

    #[test]
    fn collinear_points_are_rejected() {
        let display = CalibrationPoints {
            a: Point::new(0, 0),
            b: Point::new(0, 479),
            c: Point::new(319, 0),
        };
        let touch = CalibrationPoints {
            a: Point::new(100, 100),
            b: Point::new(200, 200),
            c: Point::new(300, 300),
        };
        assert_eq!(
            calculate_calibration_data(&display, &touch),
            Err(CalibrationError::Collinear)
        );
    }

    #[test]
    fn placeholder_vector_has_no_transform() {
        assert_eq!(
            CalibrationData::from_vector(&CalibrationVector::UNCALIBRATED, Size::new(320, 480)),
            Err(CalibrationError::Collinear)
        );
    }

    #[test]
    fn vector_transform_maps_corners_onto_display_corners() {
        let size = Size::new(320, 480);
        // Touch panel mounted mirrored in x, spanning 200..3900 on both axes.
        let vector = CalibrationVector::new([3900, 200, 3900, 3900, 200, 200, 200, 3900]);
        let data = CalibrationData::from_vector(&vector, size).unwrap();

        for corner in Corner::ALL {
            let mapped = data.transform(vector.corner(corner));
            let expected = corner.display_point(size);
            assert!((mapped.x - expected.x).abs() <= 1, "{corner:?} {mapped:?}");
            assert!((mapped.y - expected.y).abs() <= 1, "{corner:?} {mapped:?}");
        }
    }

    #[test]
    fn estimate_scales_full_range_onto_display() {
        let data = CalibrationData::estimate(Size::new(320, 480));
        assert_eq!(data.transform(Point::new(2048, 2048)), Point::new(160, 240));
        assert_eq!(data.transform(Point::new(0, 0)), Point::new(0, 0));
    }
}

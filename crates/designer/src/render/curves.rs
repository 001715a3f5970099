//! Connector curves between nodes
//!
//! Connectors leave the source's bottom anchor and enter the target's top
//! anchor along a quadratic Bezier. When several connectors join the same
//! pair of nodes (A→B and B→A), each one bows out to its own side so they
//! never overlap.

use thiserror::Error;

/// Pixels between neighbouring parallel connectors
const PARALLEL_SPACING: f64 = 20.0;

/// Samples taken along each curve for hit-testing and bounds
const SAMPLE_COUNT: usize = 20;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CurveError {
    #[error("connector has zero length (identical source and target positions)")]
    ZeroLength,

    #[error("invalid bow factor: {0} (must be non-negative and finite)")]
    InvalidBow(f64),
}

/// A quadratic Bezier with pre-sampled points
#[derive(Debug, Clone, PartialEq)]
pub struct CurvePath {
    pub start: (f64, f64),
    pub control: (f64, f64),
    pub end: (f64, f64),
    pub samples: Vec<(f64, f64)>,
}

impl CurvePath {
    /// Build a curve from explicit points.
    ///
    /// # Errors
    ///
    /// Returns `CurveError::ZeroLength` when start and end coincide.
    pub fn new(
        start: (f64, f64),
        control: (f64, f64),
        end: (f64, f64),
        sample_count: usize,
    ) -> Result<Self, CurveError> {
        if (start.0 - end.0).abs() < f64::EPSILON && (start.1 - end.1).abs() < f64::EPSILON {
            return Err(CurveError::ZeroLength);
        }

        Ok(Self {
            start,
            control,
            end,
            samples: sample_quadratic(start, control, end, sample_count),
        })
    }

    /// Point on the curve at `t` in [0, 1]
    #[must_use]
    pub fn point_at(&self, t: f64) -> (f64, f64) {
        evaluate_quadratic(self.start, self.control, self.end, t)
    }
}

/// Curve for the `lane`-th connector between two anchors.
///
/// Lane 0 is straight (plus `bow`); lanes 1, 2, 3, 4... alternate sides at
/// growing distances: +1, -1, +2, -2...
///
/// # Errors
///
/// Returns an error for a negative or non-finite `bow`, or when the anchors
/// coincide.
pub fn connector_curve(
    source: (f64, f64),
    target: (f64, f64),
    bow: f64,
    lane: usize,
) -> Result<CurvePath, CurveError> {
    if !bow.is_finite() || bow < 0.0 {
        return Err(CurveError::InvalidBow(bow));
    }

    let mid = ((source.0 + target.0) / 2.0, (source.1 + target.1) / 2.0);
    let dx = target.0 - source.0;
    let dy = target.1 - source.1;
    let length = dx.hypot(dy);
    if length < f64::EPSILON {
        return Err(CurveError::ZeroLength);
    }

    // Right-hand perpendicular
    let perp = (-dy / length, dx / length);
    let offset = length.mul_add(0.2 * bow, PARALLEL_SPACING * lane_multiplier(lane));

    let control = (perp.0.mul_add(offset, mid.0), perp.1.mul_add(offset, mid.1));
    CurvePath::new(source, control, target, SAMPLE_COUNT)
}

#[allow(clippy::cast_precision_loss)]
fn lane_multiplier(lane: usize) -> f64 {
    if lane == 0 {
        return 0.0;
    }
    let sign = if lane % 2 == 0 { -1.0 } else { 1.0 };
    sign * (lane.div_ceil(2)) as f64
}

#[allow(clippy::cast_precision_loss)]
fn sample_quadratic(
    start: (f64, f64),
    control: (f64, f64),
    end: (f64, f64),
    sample_count: usize,
) -> Vec<(f64, f64)> {
    let count = sample_count.max(2);
    (0..count)
        .map(|i| evaluate_quadratic(start, control, end, i as f64 / (count - 1) as f64))
        .collect()
}

fn evaluate_quadratic(start: (f64, f64), control: (f64, f64), end: (f64, f64), t: f64) -> (f64, f64) {
    let t = t.clamp(0.0, 1.0);
    let u = 1.0 - t;
    let a = u * u;
    let b = 2.0 * u * t;
    let c = t * t;
    (
        a.mul_add(start.0, b.mul_add(control.0, c * end.0)),
        a.mul_add(start.1, b.mul_add(control.1, c * end.1)),
    )
}

//! Arrowheads for directed connectors

use thiserror::Error;

use crate::models::MarkerEnd;

/// Default arrowhead length in diagram units
pub const DEFAULT_ARROW_LENGTH: f64 = 12.0;

/// Default arrowhead width in diagram units
pub const DEFAULT_ARROW_WIDTH: f64 = 8.0;

/// Marker size in the document for which the default arrowhead is drawn
const DEFAULT_MARKER_SIZE: f64 = 20.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArrowError {
    #[error("direction vector has zero length")]
    ZeroDirection,

    #[error("invalid arrow dimensions: length={length}, width={width}")]
    InvalidDimensions { length: f64, width: f64 },
}

/// The three corners of an arrowhead triangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrowPath {
    pub tip: (f64, f64),
    pub wing1: (f64, f64),
    pub wing2: (f64, f64),
}

/// Arrowhead with its tip at `tip`, pointing along `direction`.
///
/// # Errors
///
/// Returns an error for non-positive dimensions or a zero direction.
pub fn arrow_head(
    tip: (f64, f64),
    direction: (f64, f64),
    length: f64,
    width: f64,
) -> Result<ArrowPath, ArrowError> {
    if !length.is_finite() || !width.is_finite() || length <= 0.0 || width <= 0.0 {
        return Err(ArrowError::InvalidDimensions { length, width });
    }

    let (nx, ny) = unit(direction)?;
    let perp = (-ny, nx);
    let base = (nx.mul_add(-length, tip.0), ny.mul_add(-length, tip.1));
    let half = width / 2.0;

    Ok(ArrowPath {
        tip,
        wing1: (perp.0.mul_add(half, base.0), perp.1.mul_add(half, base.1)),
        wing2: (perp.0.mul_add(-half, base.0), perp.1.mul_add(-half, base.1)),
    })
}

/// Arrowhead `(length, width)` for a marker, scaled from its 20x20 default
#[must_use]
pub fn marker_dimensions(marker: &MarkerEnd) -> (f64, f64) {
    let scale = |value: Option<f64>| {
        value
            .filter(|v| v.is_finite() && *v > 0.0)
            .map_or(1.0, |v| v / DEFAULT_MARKER_SIZE)
    };
    (
        DEFAULT_ARROW_LENGTH * scale(marker.width),
        DEFAULT_ARROW_WIDTH * scale(marker.height),
    )
}

/// Unit direction from `from` to `to`.
///
/// For a quadratic curve, pass the control point and the end point to get
/// the tangent at the end.
///
/// # Errors
///
/// Returns `ArrowError::ZeroDirection` when the points coincide.
pub fn direction(from: (f64, f64), to: (f64, f64)) -> Result<(f64, f64), ArrowError> {
    unit((to.0 - from.0, to.1 - from.1))
}

fn unit(v: (f64, f64)) -> Result<(f64, f64), ArrowError> {
    let magnitude = v.0.hypot(v.1);
    if magnitude < f64::EPSILON {
        return Err(ArrowError::ZeroDirection);
    }
    Ok((v.0 / magnitude, v.1 / magnitude))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn close(a: (f64, f64), b: (f64, f64)) -> bool {
        (a.0 - b.0).abs() < 1e-9 && (a.1 - b.1).abs() < 1e-9
    }

    #[test]
    fn test_arrow_pointing_down() {
        let arrow = arrow_head((0.0, 100.0), (0.0, 1.0), 12.0, 8.0).unwrap();
        assert!(close(arrow.tip, (0.0, 100.0)));
        assert!(close(arrow.wing1, (-4.0, 88.0)));
        assert!(close(arrow.wing2, (4.0, 88.0)));
    }

    #[test]
    fn test_direction_is_normalized() {
        let (x, y) = direction((0.0, 0.0), (3.0, 4.0)).unwrap();
        assert!(close((x, y), (0.6, 0.8)));
    }

    #[test]
    fn test_zero_direction_rejected() {
        assert_eq!(direction((1.0, 1.0), (1.0, 1.0)), Err(ArrowError::ZeroDirection));
    }

    #[test]
    fn test_invalid_dimensions_rejected() {
        assert!(matches!(
            arrow_head((0.0, 0.0), (1.0, 0.0), 0.0, 8.0),
            Err(ArrowError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn test_default_marker_maps_to_default_length() {
        let (length, width) = marker_dimensions(&MarkerEnd::default());
        assert!((length - DEFAULT_ARROW_LENGTH).abs() < 1e-9);
        assert!((width - DEFAULT_ARROW_WIDTH).abs() < 1e-9);
    }
}

//! Screen-to-diagram coordinate projection
//!
//! Pointer events arrive in client (window) coordinates. The canvas sits
//! somewhere inside the window and shows the diagram under a pan/zoom
//! transform, so placing a dropped node means undoing both:
//!
//! ```text
//! diagram = ((client - canvas origin) - pan) / zoom
//! ```

use crate::models::Position;

const MIN_ZOOM: f64 = 0.1;
const MAX_ZOOM: f64 = 5.0;

/// A validated zoom level, always within [0.1, 5.0].
///
/// Out-of-range values are clamped; NaN and infinity are rejected.
///
/// # Examples
///
/// ```
/// use flowdesign_designer::viewport::ZoomLevel;
///
/// assert_eq!(ZoomLevel::new(10.0)?.value(), 5.0);
/// assert!(ZoomLevel::new(f64::NAN).is_err());
/// # Ok::<(), String>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomLevel {
    value: f64,
}

impl ZoomLevel {
    /// Creates a zoom level, clamping to bounds.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is NaN or infinite.
    pub fn new(value: f64) -> Result<Self, String> {
        if !value.is_finite() {
            return Err("Zoom level must be a finite number".to_string());
        }
        Ok(Self {
            value: value.clamp(MIN_ZOOM, MAX_ZOOM),
        })
    }

    #[must_use]
    pub const fn value(self) -> f64 {
        self.value
    }
}

impl Default for ZoomLevel {
    fn default() -> Self {
        Self { value: 1.0 }
    }
}

/// A point in client (window) pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClientPoint {
    pub x: f64,
    pub y: f64,
}

impl ClientPoint {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// The canvas element's bounding box in client coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CanvasBounds {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl CanvasBounds {
    #[must_use]
    pub const fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// True when the point falls inside the box (edges inclusive)
    #[must_use]
    pub fn contains(&self, point: ClientPoint) -> bool {
        point.x >= self.left
            && point.x <= self.left + self.width
            && point.y >= self.top
            && point.y <= self.top + self.height
    }
}

/// Pan offset and zoom currently applied to the canvas
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub pan: Position,
    pub zoom: ZoomLevel,
}

impl Viewport {
    #[must_use]
    pub const fn new(pan: Position, zoom: ZoomLevel) -> Self {
        Self { pan, zoom }
    }

    /// Project a client point into diagram space.
    ///
    /// # Errors
    ///
    /// Returns an error if the inputs are not finite.
    ///
    /// # Examples
    ///
    /// ```
    /// use flowdesign_designer::models::Position;
    /// use flowdesign_designer::viewport::{CanvasBounds, ClientPoint, Viewport, ZoomLevel};
    ///
    /// let viewport = Viewport::new(Position::new(20.0, 10.0)?, ZoomLevel::new(2.0)?);
    /// let bounds = CanvasBounds::new(100.0, 50.0, 800.0, 600.0);
    /// let p = viewport.project(ClientPoint::new(320.0, 250.0), bounds)?;
    /// assert_eq!((p.x, p.y), (100.0, 95.0));
    /// # Ok::<(), String>(())
    /// ```
    pub fn project(&self, client: ClientPoint, bounds: CanvasBounds) -> Result<Position, String> {
        let zoom = self.zoom.value();
        let x = (client.x - bounds.left - self.pan.x) / zoom;
        let y = (client.y - bounds.top - self.pan.y) / zoom;
        Position::new(x, y)
    }

    /// Inverse of [`Viewport::project`]: diagram space back to client pixels
    #[must_use]
    pub fn to_client(&self, position: Position, bounds: CanvasBounds) -> ClientPoint {
        let zoom = self.zoom.value();
        ClientPoint::new(
            position.x.mul_add(zoom, self.pan.x) + bounds.left,
            position.y.mul_add(zoom, self.pan.y) + bounds.top,
        )
    }
}

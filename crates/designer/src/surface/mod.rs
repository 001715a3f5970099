//! The rendered diagram surface.
//!
//! [`RenderSurface`] is the seam between the designer and whatever draws
//! the graph: the DOM in a browser, or [`SceneSurface`] headlessly. The
//! controller uses it for the drag fast path; the export pipeline uses it
//! to normalize styling and to rasterize.
//!
//! Methods take `&self`. Surfaces are shared (`Rc`) between the controller
//! and the export pipeline and keep their mutable state in cells.

mod scene;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Edge, EdgeId, Node, NodeId, Position};

pub use scene::SceneSurface;

/// Surface failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurfaceError {
    #[error("diagram surface is not mounted")]
    NotMounted,

    #[error("node {0} is not rendered on the surface")]
    NodeNotRendered(NodeId),

    #[error("surface has no visible area ({width}x{height})")]
    EmptyLayout { width: u32, height: u32 },

    #[error("rasterization failed: {0}")]
    Rasterize(String),
}

/// Size of the surface's layout box in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LayoutBox {
    pub width: f64,
    pub height: f64,
}

impl LayoutBox {
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// The surface properties export temporarily overrides
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SurfaceStyle {
    /// CSS background value; `None` means unset (transparent)
    pub background: Option<String>,
    /// CSS overflow value; `None` means unset
    pub overflow: Option<String>,
}

impl SurfaceStyle {
    /// Opaque white and unclipped, the look of a printed page
    #[must_use]
    pub fn print() -> Self {
        Self {
            background: Some("#ffffff".to_string()),
            overflow: Some("visible".to_string()),
        }
    }
}

/// Stroke attributes of one rendered connector path
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeStroke {
    pub edge: EdgeId,
    /// CSS color; `None` means the stylesheet default
    pub color: Option<String>,
    /// Stroke width in CSS pixels; `None` means the stylesheet default
    pub width: Option<f64>,
}

/// Rasterization request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterOptions {
    /// Device pixels per CSS pixel
    pub pixel_ratio: f64,
    /// Capture width in CSS pixels
    pub width: f64,
    /// Capture height in CSS pixels
    pub height: f64,
}

/// A node label placed in raster pixel space
#[derive(Debug, Clone, PartialEq)]
pub struct LabelPlacement {
    pub text: String,
    /// Center of the label, in raster pixels from the top-left corner
    pub x: f64,
    pub y: f64,
    /// Font size in raster pixels
    pub size: f64,
}

/// An opaque RGB image
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    /// Row-major RGB triples, `width * height * 3` bytes
    pub rgb: Vec<u8>,
    /// Text the raster does not contain and the page should overlay
    pub labels: Vec<LabelPlacement>,
}

impl RasterImage {
    /// Width over height
    #[must_use]
    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            return 1.0;
        }
        f64::from(self.width) / f64::from(self.height)
    }

    #[must_use]
    pub const fn is_landscape(&self) -> bool {
        self.width > self.height
    }
}

/// Flatten premultiplied RGBA onto white.
///
/// For premultiplied channels, compositing over white is `c + (255 - a)`.
#[must_use]
pub fn composite_over_white(premultiplied_rgba: &[u8]) -> Vec<u8> {
    premultiplied_rgba
        .chunks_exact(4)
        .flat_map(|px| match px {
            &[r, g, b, a] => {
                let cover = 255 - a;
                [
                    r.saturating_add(cover),
                    g.saturating_add(cover),
                    b.saturating_add(cover),
                ]
            }
            _ => [255, 255, 255],
        })
        .collect()
}

/// What the designer needs from a rendered graph
#[async_trait(?Send)]
pub trait RenderSurface {
    /// Current layout box of the surface element
    fn layout_box(&self) -> LayoutBox;

    fn style(&self) -> SurfaceStyle;

    fn set_style(&self, style: &SurfaceStyle);

    /// Stroke attributes of every rendered connector path
    fn edge_strokes(&self) -> Vec<EdgeStroke>;

    /// Apply strokes by edge id; unknown ids are ignored
    fn set_edge_strokes(&self, strokes: &[EdgeStroke]);

    /// Move a rendered node without touching the store (drag fast path)
    ///
    /// # Errors
    ///
    /// Returns `SurfaceError::NodeNotRendered` if the node has no element.
    fn translate_node(&self, id: &NodeId, position: Position) -> Result<(), SurfaceError>;

    /// Enable or disable position transitions on a rendered node
    fn set_transitions(&self, id: &NodeId, enabled: bool);

    /// Re-render from store state (normal path)
    fn sync(&self, nodes: &[Node], edges: &[Edge]);

    /// Capture the surface as an image
    ///
    /// # Errors
    ///
    /// Returns `SurfaceError::Rasterize` when capture fails.
    async fn rasterize(&self, options: &RasterOptions) -> Result<RasterImage, SurfaceError>;
}

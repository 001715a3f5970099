//! Node outline paths
//!
//! Pure path construction for every [`NodeShape`]. Coordinates are in
//! diagram space; callers apply their own pixel-ratio transform.

use tiny_skia::{Path, PathBuilder, Rect};

use super::visuals::NodeShape;

/// Corner radius of rectangles that are not fully rounded
const CORNER_RADIUS: f32 = 6.0;

/// Horizontal inset of the inner bars of a framed rectangle
const FRAME_INSET: f32 = 12.0;

/// Axis-aligned box a node occupies
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl NodeBox {
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[must_use]
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Where outgoing connectors attach (bottom center)
    #[must_use]
    pub fn source_anchor(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height)
    }

    /// Where incoming connectors attach (top center)
    #[must_use]
    pub fn target_anchor(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y)
    }

    #[must_use]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

/// Outline path for `shape` filling `bounds`.
///
/// Returns `None` for degenerate (zero or negative sized) boxes.
#[must_use]
pub fn outline(shape: NodeShape, bounds: NodeBox) -> Option<Path> {
    if !(bounds.width > 0.0 && bounds.height > 0.0) {
        return None;
    }

    match shape {
        NodeShape::Pill => rounded_rect(bounds, bounds.height / 2.0),
        NodeShape::Rectangle | NodeShape::FramedRectangle => rounded_rect(bounds, 2.0),
        NodeShape::RoundedRectangle => rounded_rect(bounds, CORNER_RADIUS * 2.0),
        NodeShape::Diamond => diamond(bounds),
        NodeShape::Hexagon => hexagon(bounds),
        NodeShape::Parallelogram => parallelogram(bounds),
    }
}

/// Extra strokes drawn on top of the outline (framed rectangle bars)
#[must_use]
pub fn decorations(shape: NodeShape, bounds: NodeBox) -> Option<Path> {
    if shape != NodeShape::FramedRectangle || bounds.width <= FRAME_INSET * 2.0 {
        return None;
    }

    let mut pb = PathBuilder::new();
    let left = bounds.x + FRAME_INSET;
    let right = bounds.right() - FRAME_INSET;
    pb.move_to(left, bounds.y);
    pb.line_to(left, bounds.bottom());
    pb.move_to(right, bounds.y);
    pb.line_to(right, bounds.bottom());
    pb.finish()
}

fn rounded_rect(b: NodeBox, radius: f32) -> Option<Path> {
    let r = radius.min(b.width / 2.0).min(b.height / 2.0).max(0.0);
    if r <= f32::EPSILON {
        let rect = Rect::from_xywh(b.x, b.y, b.width, b.height)?;
        return Some(PathBuilder::from_rect(rect));
    }

    let mut pb = PathBuilder::new();
    pb.move_to(b.x + r, b.y);
    pb.line_to(b.right() - r, b.y);
    pb.quad_to(b.right(), b.y, b.right(), b.y + r);
    pb.line_to(b.right(), b.bottom() - r);
    pb.quad_to(b.right(), b.bottom(), b.right() - r, b.bottom());
    pb.line_to(b.x + r, b.bottom());
    pb.quad_to(b.x, b.bottom(), b.x, b.bottom() - r);
    pb.line_to(b.x, b.y + r);
    pb.quad_to(b.x, b.y, b.x + r, b.y);
    pb.close();
    pb.finish()
}

fn diamond(b: NodeBox) -> Option<Path> {
    let (cx, cy) = b.center();
    polygon(&[(cx, b.y), (b.right(), cy), (cx, b.bottom()), (b.x, cy)])
}

fn hexagon(b: NodeBox) -> Option<Path> {
    let inset = (b.height / 2.0).min(b.width / 4.0);
    let cy = b.y + b.height / 2.0;
    polygon(&[
        (b.x + inset, b.y),
        (b.right() - inset, b.y),
        (b.right(), cy),
        (b.right() - inset, b.bottom()),
        (b.x + inset, b.bottom()),
        (b.x, cy),
    ])
}

fn parallelogram(b: NodeBox) -> Option<Path> {
    let skew = (b.height / 3.0).min(b.width / 4.0);
    polygon(&[
        (b.x + skew, b.y),
        (b.right(), b.y),
        (b.right() - skew, b.bottom()),
        (b.x, b.bottom()),
    ])
}

fn polygon(points: &[(f32, f32)]) -> Option<Path> {
    let (first, rest) = points.split_first()?;
    let mut pb = PathBuilder::new();
    pb.move_to(first.0, first.1);
    for (x, y) in rest {
        pb.line_to(*x, *y);
    }
    pb.close();
    pb.finish()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    const BOX: NodeBox = NodeBox::new(10.0, 20.0, 160.0, 100.0);

    #[test]
    fn test_every_shape_stays_inside_its_box() {
        let shapes = [
            NodeShape::Pill,
            NodeShape::Rectangle,
            NodeShape::Diamond,
            NodeShape::FramedRectangle,
            NodeShape::RoundedRectangle,
            NodeShape::Hexagon,
            NodeShape::Parallelogram,
        ];

        for shape in shapes {
            let bounds = outline(shape, BOX).unwrap().bounds();
            assert!(bounds.left() >= 10.0 - 0.01, "{shape:?}");
            assert!(bounds.top() >= 20.0 - 0.01, "{shape:?}");
            assert!(bounds.right() <= 170.0 + 0.01, "{shape:?}");
            assert!(bounds.bottom() <= 120.0 + 0.01, "{shape:?}");
        }
    }

    #[test]
    fn test_diamond_touches_midpoints() {
        let bounds = outline(NodeShape::Diamond, BOX).unwrap().bounds();
        assert!((bounds.width() - 160.0).abs() < 0.01);
        assert!((bounds.height() - 100.0).abs() < 0.01);
    }

    #[test]
    fn test_degenerate_box_has_no_outline() {
        assert!(outline(NodeShape::Rectangle, NodeBox::new(0.0, 0.0, 0.0, 10.0)).is_none());
    }

    #[test]
    fn test_only_framed_rectangle_has_decorations() {
        assert!(decorations(NodeShape::FramedRectangle, BOX).is_some());
        assert!(decorations(NodeShape::Rectangle, BOX).is_none());
    }

    #[test]
    fn test_anchors() {
        assert_eq!(BOX.source_anchor(), (90.0, 120.0));
        assert_eq!(BOX.target_anchor(), (90.0, 20.0));
    }
}

//! Node kind dispatch table
//!
//! Every [`NodeKind`] has exactly one [`NodeVisual`] entry. Renderers call
//! [`visual`] instead of matching on kinds, so adding a node type means
//! adding one variant and one row here.

use crate::models::{Node, NodeKind, RgbColor, colors::darken_color};

/// Outline used to draw a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeShape {
    /// Fully rounded ends (terminators)
    Pill,
    Rectangle,
    Diamond,
    /// Rectangle with inner vertical bars
    FramedRectangle,
    RoundedRectangle,
    Hexagon,
    Parallelogram,
}

/// How one node kind looks by default
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeVisual {
    pub kind: NodeKind,
    pub shape: NodeShape,
    pub fill: RgbColor,
    pub border: RgbColor,
    pub border_width: f64,
    pub width: f64,
    pub height: f64,
    pub default_label: &'static str,
}

const fn entry(
    kind: NodeKind,
    shape: NodeShape,
    fill: RgbColor,
    border: RgbColor,
    size: (f64, f64),
    default_label: &'static str,
) -> NodeVisual {
    NodeVisual {
        kind,
        shape,
        fill,
        border,
        border_width: 2.0,
        width: size.0,
        height: size.1,
        default_label,
    }
}

static VISUALS: [NodeVisual; 8] = [
    entry(
        NodeKind::Start,
        NodeShape::Pill,
        RgbColor::new(200, 230, 201),
        RgbColor::new(46, 125, 50),
        (150.0, 50.0),
        "Start",
    ),
    entry(
        NodeKind::End,
        NodeShape::Pill,
        RgbColor::new(255, 205, 210),
        RgbColor::new(198, 40, 40),
        (150.0, 50.0),
        "End",
    ),
    entry(
        NodeKind::Step,
        NodeShape::Rectangle,
        RgbColor::new(227, 242, 253),
        RgbColor::new(21, 101, 192),
        (180.0, 60.0),
        "Step",
    ),
    entry(
        NodeKind::Decision,
        NodeShape::Diamond,
        RgbColor::new(255, 243, 224),
        RgbColor::new(239, 108, 0),
        (160.0, 100.0),
        "Decision",
    ),
    entry(
        NodeKind::Subprocess,
        NodeShape::FramedRectangle,
        RgbColor::new(243, 229, 245),
        RgbColor::new(106, 27, 154),
        (180.0, 60.0),
        "Subprocess",
    ),
    entry(
        NodeKind::Linked,
        NodeShape::RoundedRectangle,
        RgbColor::new(224, 242, 241),
        RgbColor::new(0, 105, 92),
        (180.0, 60.0),
        "Linked Item",
    ),
    entry(
        NodeKind::ApiCall,
        NodeShape::Hexagon,
        RgbColor::new(232, 234, 246),
        RgbColor::new(40, 53, 147),
        (180.0, 60.0),
        "API Call",
    ),
    entry(
        NodeKind::ExternalSystem,
        NodeShape::Parallelogram,
        RgbColor::new(236, 239, 241),
        RgbColor::new(55, 71, 79),
        (180.0, 60.0),
        "External System",
    ),
];

/// The table row for `kind`
#[must_use]
pub fn visual(kind: NodeKind) -> &'static NodeVisual {
    VISUALS
        .iter()
        .find(|entry| entry.kind == kind)
        .unwrap_or(&VISUALS[2])
}

/// Fill and border for a node, honoring its style overrides
#[must_use]
pub fn node_colors(node: &Node) -> (RgbColor, RgbColor, f64) {
    let base = visual(node.kind);
    let style = node.style.as_ref();

    let fill = style.and_then(|s| s.background_color()).unwrap_or(base.fill);
    let border = style
        .and_then(|s| s.border_rgb())
        .or_else(|| style.and_then(|s| s.background_color()).map(|c| darken_color(&c, 0.4)))
        .unwrap_or(base.border);
    let width = style
        .and_then(|s| s.border_width)
        .filter(|w| w.is_finite() && *w >= 0.0)
        .unwrap_or(base.border_width);

    (fill, border, width)
}

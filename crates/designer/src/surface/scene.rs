//! Headless render surface backed by tiny-skia.

use std::cell::RefCell;
use std::collections::HashMap;

use async_trait::async_trait;
use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Stroke, Transform};
use tracing::debug;

use super::{
    EdgeStroke, LabelPlacement, LayoutBox, RasterImage, RasterOptions, RenderSurface,
    SurfaceError, SurfaceStyle, composite_over_white,
};
use crate::drag::DragFlag;
use crate::models::{Edge, EdgeId, Node, NodeId, Position, RgbColor};
use crate::render::arrows::{arrow_head, direction, marker_dimensions};
use crate::render::curves::connector_curve;
use crate::render::shapes::{NodeBox, decorations, outline};
use crate::render::visuals::{node_colors, visual};

/// Blank space kept around the outermost nodes
const PADDING: f64 = 40.0;

const EDGE_COLOR: RgbColor = RgbColor::new(177, 177, 183);
const EDGE_WIDTH: f64 = 1.0;
const LABEL_SIZE: f64 = 12.0;

/// Largest raster edge we agree to allocate, in device pixels
const MAX_RASTER_SIDE: f64 = 16_384.0;

#[derive(Debug, Clone)]
struct RenderedNode {
    node: Node,
    translated: Option<Position>,
    transitions: bool,
}

impl RenderedNode {
    fn position(&self) -> Position {
        self.translated.unwrap_or(self.node.position)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn node_box(&self) -> NodeBox {
        let visual = visual(self.node.kind);
        let position = self.position();
        NodeBox::new(
            position.x as f32,
            position.y as f32,
            visual.width as f32,
            visual.height as f32,
        )
    }
}

#[derive(Debug, Default)]
struct Scene {
    nodes: Vec<RenderedNode>,
    edges: Vec<Edge>,
    strokes: Vec<EdgeStroke>,
    style: SurfaceStyle,
}

impl Scene {
    fn rendered(&self, id: &NodeId) -> Option<&RenderedNode> {
        self.nodes.iter().find(|rendered| &rendered.node.id == id)
    }

    fn rendered_mut(&mut self, id: &NodeId) -> Option<&mut RenderedNode> {
        self.nodes.iter_mut().find(|rendered| &rendered.node.id == id)
    }

    /// Top-left corner and size of the content, padding included
    fn content_bounds(&self) -> (Position, LayoutBox) {
        let boxes = self.nodes.iter().map(|rendered| {
            let visual = visual(rendered.node.kind);
            let p = rendered.position();
            (p.x, p.y, p.x + visual.width, p.y + visual.height)
        });

        let (min_x, min_y, max_x, max_y) = boxes.fold(
            (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
            |acc, b| (acc.0.min(b.0), acc.1.min(b.1), acc.2.max(b.2), acc.3.max(b.3)),
        );

        if !min_x.is_finite() {
            return (
                Position::origin(),
                LayoutBox::new(PADDING * 2.0, PADDING * 2.0),
            );
        }

        (
            Position {
                x: min_x - PADDING,
                y: min_y - PADDING,
            },
            LayoutBox::new(max_x - min_x + PADDING * 2.0, max_y - min_y + PADDING * 2.0),
        )
    }

    fn stroke_for(&self, id: &EdgeId) -> (RgbColor, f64) {
        let stroke = self.strokes.iter().find(|stroke| &stroke.edge == id);
        let color = stroke
            .and_then(|s| s.color.as_deref())
            .and_then(RgbColor::parse_hex)
            .unwrap_or(EDGE_COLOR);
        let width = stroke
            .and_then(|s| s.width)
            .filter(|w| w.is_finite() && *w > 0.0)
            .unwrap_or(EDGE_WIDTH);
        (color, width)
    }
}

/// Render surface that keeps the scene in memory and rasterizes with tiny-skia.
///
/// Nodes are drawn with their per-kind outline, connectors as curves with
/// closed arrowheads. Labels are not rasterized; they come back as
/// [`LabelPlacement`]s for the page composer to overlay as text.
#[derive(Debug, Default)]
pub struct SceneSurface {
    scene: RefCell<Scene>,
    drag: DragFlag,
}

impl SceneSurface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A surface sharing the designer's drag flag.
    ///
    /// While the flag is set, [`RenderSurface::sync`] keeps fast-path
    /// translations instead of snapping nodes back to store positions.
    #[must_use]
    pub fn with_drag_flag(drag: DragFlag) -> Self {
        Self {
            scene: RefCell::default(),
            drag,
        }
    }

    /// Where the node is currently drawn
    #[must_use]
    pub fn rendered_position(&self, id: &NodeId) -> Option<Position> {
        self.scene.borrow().rendered(id).map(RenderedNode::position)
    }

    /// Whether position transitions are enabled on the node
    #[must_use]
    pub fn transitions_enabled(&self, id: &NodeId) -> Option<bool> {
        self.scene.borrow().rendered(id).map(|rendered| rendered.transitions)
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.scene.borrow().nodes.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.scene.borrow().edges.len()
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn raster_size(options: &RasterOptions) -> Result<(u32, u32), SurfaceError> {
        let to_px = |css: f64| (css * options.pixel_ratio).ceil();
        let (w, h) = (to_px(options.width), to_px(options.height));

        if !(w.is_finite() && h.is_finite()) || w < 1.0 || h < 1.0 {
            return Err(SurfaceError::EmptyLayout {
                width: w.max(0.0) as u32,
                height: h.max(0.0) as u32,
            });
        }
        if w > MAX_RASTER_SIDE || h > MAX_RASTER_SIDE {
            return Err(SurfaceError::Rasterize(format!(
                "requested {w}x{h} pixels exceeds the {MAX_RASTER_SIDE} pixel limit"
            )));
        }
        Ok((w as u32, h as u32))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn draw(&self, pixmap: &mut Pixmap, options: &RasterOptions) -> Vec<LabelPlacement> {
        let scene = self.scene.borrow();
        let (origin, _) = scene.content_bounds();
        let ratio = options.pixel_ratio;
        let transform = Transform::from_scale(ratio as f32, ratio as f32)
            .pre_translate(-origin.x as f32, -origin.y as f32);

        if let Some(background) = scene.style.background.as_deref().and_then(RgbColor::parse_hex) {
            pixmap.fill(tiny_skia::Color::from_rgba8(background.r, background.g, background.b, 255));
        }

        let boxes: HashMap<&NodeId, NodeBox> = scene
            .nodes
            .iter()
            .map(|rendered| (&rendered.node.id, rendered.node_box()))
            .collect();

        let mut lanes: HashMap<(&NodeId, &NodeId), usize> = HashMap::new();
        for edge in &scene.edges {
            let (Some(source), Some(target)) = (boxes.get(&edge.source), boxes.get(&edge.target))
            else {
                continue;
            };

            // A->B and B->A share lanes so they bow to opposite sides
            let key = if edge.source <= edge.target {
                (&edge.source, &edge.target)
            } else {
                (&edge.target, &edge.source)
            };
            let lane = lanes.entry(key).or_insert(0);
            let (color, width) = scene.stroke_for(&edge.id);
            draw_edge(pixmap, transform, edge, *source, *target, *lane, color, width);
            *lane += 1;
        }

        let mut labels = Vec::with_capacity(scene.nodes.len());
        for rendered in &scene.nodes {
            let node_box = rendered.node_box();
            draw_node(pixmap, transform, &rendered.node, node_box);

            let (cx, cy) = node_box.center();
            let text = if rendered.node.data.label.trim().is_empty() {
                visual(rendered.node.kind).default_label.to_string()
            } else {
                rendered.node.data.label.clone()
            };
            labels.push(LabelPlacement {
                text,
                x: (f64::from(cx) - origin.x) * ratio,
                y: (f64::from(cy) - origin.y) * ratio,
                size: LABEL_SIZE * ratio,
            });
        }
        labels
    }
}

fn paint(color: RgbColor) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(color.r, color.g, color.b, 255);
    paint.anti_alias = true;
    paint
}

#[allow(clippy::cast_possible_truncation, clippy::too_many_arguments)]
fn draw_edge(
    pixmap: &mut Pixmap,
    transform: Transform,
    edge: &Edge,
    source: NodeBox,
    target: NodeBox,
    lane: usize,
    color: RgbColor,
    width: f64,
) {
    let (sx, sy) = source.source_anchor();
    let (tx, ty) = target.target_anchor();
    let start = (f64::from(sx), f64::from(sy));
    let end = (f64::from(tx), f64::from(ty));

    let Ok(curve) = connector_curve(start, end, 0.0, lane) else {
        debug!(edge_id = %edge.id, "Skipping zero-length connector");
        return;
    };

    let mut pb = PathBuilder::new();
    pb.move_to(curve.start.0 as f32, curve.start.1 as f32);
    pb.quad_to(
        curve.control.0 as f32,
        curve.control.1 as f32,
        curve.end.0 as f32,
        curve.end.1 as f32,
    );
    if let Some(path) = pb.finish() {
        let stroke = Stroke {
            width: width as f32,
            ..Stroke::default()
        };
        pixmap.stroke_path(&path, &paint(color), &stroke, transform, None);
    }

    let (length, arrow_width) = marker_dimensions(&edge.marker_end);
    let head = direction(curve.control, curve.end)
        .and_then(|dir| arrow_head(curve.end, dir, length, arrow_width));
    if let Ok(head) = head {
        let mut pb = PathBuilder::new();
        pb.move_to(head.tip.0 as f32, head.tip.1 as f32);
        pb.line_to(head.wing1.0 as f32, head.wing1.1 as f32);
        pb.line_to(head.wing2.0 as f32, head.wing2.1 as f32);
        pb.close();
        if let Some(path) = pb.finish() {
            let marker_color = edge
                .marker_end
                .color
                .as_deref()
                .and_then(RgbColor::parse_hex)
                .unwrap_or(color);
            pixmap.fill_path(&path, &paint(marker_color), FillRule::Winding, transform, None);
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn draw_node(pixmap: &mut Pixmap, transform: Transform, node: &Node, node_box: NodeBox) {
    let shape = visual(node.kind).shape;
    let (fill, border, border_width) = node_colors(node);

    let Some(path) = outline(shape, node_box) else {
        return;
    };
    pixmap.fill_path(&path, &paint(fill), FillRule::Winding, transform, None);

    if border_width > 0.0 {
        let stroke = Stroke {
            width: border_width as f32,
            ..Stroke::default()
        };
        pixmap.stroke_path(&path, &paint(border), &stroke, transform, None);
        if let Some(bars) = decorations(shape, node_box) {
            pixmap.stroke_path(&bars, &paint(border), &stroke, transform, None);
        }
    }
}

#[async_trait(?Send)]
impl RenderSurface for SceneSurface {
    fn layout_box(&self) -> LayoutBox {
        self.scene.borrow().content_bounds().1
    }

    fn style(&self) -> SurfaceStyle {
        self.scene.borrow().style.clone()
    }

    fn set_style(&self, style: &SurfaceStyle) {
        self.scene.borrow_mut().style = style.clone();
    }

    fn edge_strokes(&self) -> Vec<EdgeStroke> {
        self.scene.borrow().strokes.clone()
    }

    fn set_edge_strokes(&self, strokes: &[EdgeStroke]) {
        let mut scene = self.scene.borrow_mut();
        for update in strokes {
            if let Some(slot) = scene.strokes.iter_mut().find(|s| s.edge == update.edge) {
                slot.clone_from(update);
            }
        }
    }

    fn translate_node(&self, id: &NodeId, position: Position) -> Result<(), SurfaceError> {
        let mut scene = self.scene.borrow_mut();
        let rendered = scene
            .rendered_mut(id)
            .ok_or_else(|| SurfaceError::NodeNotRendered(id.clone()))?;
        rendered.translated = Some(position);
        Ok(())
    }

    fn set_transitions(&self, id: &NodeId, enabled: bool) {
        if let Some(rendered) = self.scene.borrow_mut().rendered_mut(id) {
            rendered.transitions = enabled;
        }
    }

    fn sync(&self, nodes: &[Node], edges: &[Edge]) {
        let dragging = self.drag.is_dragging();
        let mut scene = self.scene.borrow_mut();

        let previous: HashMap<NodeId, (Option<Position>, bool)> = scene
            .nodes
            .iter()
            .map(|r| (r.node.id.clone(), (r.translated, r.transitions)))
            .collect();

        scene.nodes = nodes
            .iter()
            .map(|node| {
                let (translated, transitions) =
                    previous.get(&node.id).copied().unwrap_or((None, true));
                RenderedNode {
                    node: node.clone(),
                    translated: if dragging { translated } else { None },
                    transitions,
                }
            })
            .collect();

        let strokes: Vec<EdgeStroke> = edges
            .iter()
            .map(|edge| {
                scene
                    .strokes
                    .iter()
                    .find(|s| s.edge == edge.id)
                    .cloned()
                    .unwrap_or_else(|| EdgeStroke {
                        edge: edge.id.clone(),
                        color: None,
                        width: None,
                    })
            })
            .collect();
        scene.strokes = strokes;
        scene.edges = edges.to_vec();
    }

    async fn rasterize(&self, options: &RasterOptions) -> Result<RasterImage, SurfaceError> {
        let (width, height) = Self::raster_size(options)?;
        let mut pixmap = Pixmap::new(width, height).ok_or_else(|| {
            SurfaceError::Rasterize(format!("cannot allocate a {width}x{height} pixmap"))
        })?;

        let labels = self.draw(&mut pixmap, options);
        debug!(width, height, labels = labels.len(), "Rasterized scene");

        Ok(RasterImage {
            width,
            height,
            rgb: composite_over_white(pixmap.data()),
            labels,
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]
    #![allow(clippy::indexing_slicing)]

    use super::*;
    use crate::store::{DEFAULT_END_ID, DEFAULT_START_ID, default_document};

    fn id(s: &str) -> NodeId {
        NodeId::new(s).unwrap()
    }

    fn default_surface() -> SceneSurface {
        let surface = SceneSurface::new();
        let doc = default_document();
        surface.sync(&doc.nodes, &doc.edges);
        surface
    }

    #[test]
    fn test_layout_box_covers_nodes_with_padding() {
        let surface = default_surface();
        let layout = surface.layout_box();
        // Start (250,50) and End (250,250), both 150x50
        assert!((layout.width - (150.0 + PADDING * 2.0)).abs() < 1e-9);
        assert!((layout.height - (250.0 + PADDING * 2.0)).abs() < 1e-9);
    }

    #[test]
    fn test_sync_resets_translation() {
        let surface = default_surface();
        let moved = Position::new(400.0, 400.0).unwrap();
        surface.translate_node(&id(DEFAULT_END_ID), moved).unwrap();
        assert_eq!(surface.rendered_position(&id(DEFAULT_END_ID)), Some(moved));

        let doc = default_document();
        surface.sync(&doc.nodes, &doc.edges);
        assert_eq!(
            surface.rendered_position(&id(DEFAULT_END_ID)),
            Some(doc.nodes[1].position)
        );
    }

    #[test]
    fn test_sync_while_dragging_keeps_translation() {
        let drag = DragFlag::new();
        let surface = SceneSurface::with_drag_flag(drag.clone());
        let doc = default_document();
        surface.sync(&doc.nodes, &doc.edges);

        let moved = Position::new(10.0, 10.0).unwrap();
        drag.set(true);
        surface.translate_node(&id(DEFAULT_START_ID), moved).unwrap();
        surface.sync(&doc.nodes, &doc.edges);
        assert_eq!(surface.rendered_position(&id(DEFAULT_START_ID)), Some(moved));
    }

    #[test]
    fn test_translate_unknown_node_fails() {
        let surface = default_surface();
        let err = surface
            .translate_node(&id("ghost"), Position::origin())
            .unwrap_err();
        assert_eq!(err, SurfaceError::NodeNotRendered(id("ghost")));
    }

    #[test]
    fn test_set_edge_strokes_by_id() {
        let surface = default_surface();
        let mut strokes = surface.edge_strokes();
        assert_eq!(strokes.len(), 1);
        assert_eq!(strokes[0].width, None);

        strokes[0].width = Some(2.0);
        strokes[0].color = Some("#333333".to_string());
        surface.set_edge_strokes(&strokes);
        assert_eq!(surface.edge_strokes(), strokes);
    }

    #[tokio::test]
    async fn test_rasterize_matches_requested_size() {
        let surface = default_surface();
        surface.set_style(&SurfaceStyle::print());
        let layout = surface.layout_box();

        let image = surface
            .rasterize(&RasterOptions {
                pixel_ratio: 2.0,
                width: layout.width,
                height: layout.height,
            })
            .await
            .unwrap();

        assert_eq!(image.width, 460);
        assert_eq!(image.height, 660);
        assert_eq!(image.rgb.len(), 460 * 660 * 3);
        assert_eq!(image.labels.len(), 2);
        assert_eq!(image.labels[0].text, "Start");
        // Corner is background, the Start node center is not
        assert_eq!(&image.rgb[0..3], &[255, 255, 255]);
        let cx = image.labels[0].x as usize;
        let cy = image.labels[0].y as usize;
        let at = (cy * 460 + cx) * 3;
        assert_ne!(&image.rgb[at..at + 3], &[255, 255, 255]);
    }

    #[tokio::test]
    async fn test_rasterize_empty_size_fails() {
        let surface = default_surface();
        let err = surface
            .rasterize(&RasterOptions {
                pixel_ratio: 3.0,
                width: 0.0,
                height: 100.0,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SurfaceError::EmptyLayout { .. }));
    }
}

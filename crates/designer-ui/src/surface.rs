//! DOM-backed render surface.
//!
//! Node elements carry `data-node-id`; the drag fast path moves them with a
//! CSS transform so the reactive view is not re-rendered mid-gesture. Style
//! and stroke overrides go straight onto the DOM, and are read back from it,
//! so a restore writes back exactly what the view had rendered.
//! Rasterization is done from the mirrored scene, which draws the same
//! shapes the view shows.

use std::cell::RefCell;

use async_trait::async_trait;
use flowdesign_designer::drag::DragFlag;
use flowdesign_designer::models::{Edge, EdgeId, Node, NodeId, Position};
use flowdesign_designer::surface::{
    EdgeStroke, LayoutBox, RasterImage, RasterOptions, RenderSurface, SceneSurface, SurfaceError, SurfaceStyle,
};
use wasm_bindgen::JsCast;
use web_sys::{Element, HtmlElement};

pub struct DomSurface {
    container: RefCell<Option<HtmlElement>>,
    scene: SceneSurface,
}

impl std::fmt::Debug for DomSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomSurface")
            .field("mounted", &self.container.borrow().is_some())
            .field("scene", &self.scene)
            .finish()
    }
}

impl DomSurface {
    #[must_use]
    pub fn new(drag: DragFlag) -> Self {
        Self {
            container: RefCell::new(None),
            scene: SceneSurface::with_drag_flag(drag),
        }
    }

    pub fn set_container(&self, element: Option<HtmlElement>) {
        *self.container.borrow_mut() = element;
    }

    fn node_element(&self, id: &NodeId) -> Option<HtmlElement> {
        let container = self.container.borrow();
        let selector = format!("[data-node-id=\"{}\"]", id.as_str().replace('"', "\\\""));
        container
            .as_ref()?
            .query_selector(&selector)
            .ok()
            .flatten()?
            .dyn_into::<HtmlElement>()
            .ok()
    }

    fn css(element: &HtmlElement, property: &str) -> Option<String> {
        element
            .style()
            .get_property_value(property)
            .ok()
            .filter(|value| !value.is_empty())
    }

    /// Strokes as the rendered `<path>` elements currently carry them
    fn dom_strokes(container: &HtmlElement) -> Vec<EdgeStroke> {
        let Ok(paths) = container.query_selector_all("[data-edge-id]") else {
            return Vec::new();
        };
        (0..paths.length())
            .filter_map(|i| paths.item(i)?.dyn_into::<Element>().ok())
            .filter_map(|path| {
                let edge = EdgeId::new(path.get_attribute("data-edge-id")?).ok()?;
                Some(EdgeStroke {
                    edge,
                    color: path.get_attribute("stroke"),
                    width: path
                        .get_attribute("stroke-width")
                        .and_then(|w| w.trim().parse::<f64>().ok()),
                })
            })
            .collect()
    }

    fn set_css(element: &HtmlElement, property: &str, value: Option<&str>) {
        let style = element.style();
        let _ = match value {
            Some(value) => style.set_property(property, value),
            None => style.remove_property(property).map(|_| ()),
        };
    }
}

#[async_trait(?Send)]
impl RenderSurface for DomSurface {
    fn layout_box(&self) -> LayoutBox {
        self.scene.layout_box()
    }

    fn style(&self) -> SurfaceStyle {
        match self.container.borrow().as_ref() {
            Some(container) => SurfaceStyle {
                background: Self::css(container, "background"),
                overflow: Self::css(container, "overflow"),
            },
            None => self.scene.style(),
        }
    }

    fn set_style(&self, style: &SurfaceStyle) {
        if let Some(container) = self.container.borrow().as_ref() {
            Self::set_css(container, "background", style.background.as_deref());
            Self::set_css(container, "overflow", style.overflow.as_deref());
        }
        self.scene.set_style(style);
    }

    fn edge_strokes(&self) -> Vec<EdgeStroke> {
        match self.container.borrow().as_ref() {
            Some(container) => Self::dom_strokes(container),
            None => self.scene.edge_strokes(),
        }
    }

    fn set_edge_strokes(&self, strokes: &[EdgeStroke]) {
        if let Some(container) = self.container.borrow().as_ref() {
            for stroke in strokes {
                let selector = format!("[data-edge-id=\"{}\"]", stroke.edge.as_str().replace('"', "\\\""));
                if let Ok(Some(path)) = container.query_selector(&selector) {
                    let _ = match &stroke.color {
                        Some(color) => path.set_attribute("stroke", color),
                        None => path.remove_attribute("stroke"),
                    };
                    let _ = match stroke.width {
                        Some(width) => path.set_attribute("stroke-width", &width.to_string()),
                        None => path.remove_attribute("stroke-width"),
                    };
                }
            }
        }
        self.scene.set_edge_strokes(strokes);
    }

    fn translate_node(&self, id: &NodeId, position: Position) -> Result<(), SurfaceError> {
        self.scene.translate_node(id, position)?;
        let element = self
            .node_element(id)
            .ok_or_else(|| SurfaceError::NodeNotRendered(id.clone()))?;
        Self::set_css(
            &element,
            "transform",
            Some(&format!("translate({}px, {}px)", position.x, position.y)),
        );
        Ok(())
    }

    fn set_transitions(&self, id: &NodeId, enabled: bool) {
        if let Some(element) = self.node_element(id) {
            Self::set_css(&element, "transition", (!enabled).then_some("none"));
        }
        self.scene.set_transitions(id, enabled);
    }

    fn sync(&self, nodes: &[Node], edges: &[Edge]) {
        self.scene.sync(nodes, edges);
    }

    async fn rasterize(&self, options: &RasterOptions) -> Result<RasterImage, SurfaceError> {
        if self.container.borrow().is_none() {
            return Err(SurfaceError::NotMounted);
        }
        self.scene.rasterize(options).await
    }
}

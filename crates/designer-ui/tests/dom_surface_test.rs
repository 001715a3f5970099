//! DOM surface behavior in a real browser
//!
//! Run with: wasm-pack test --headless --firefox crates/designer-ui

#![cfg(target_arch = "wasm32")]
#![allow(clippy::panic)]

use std::rc::Rc;

use async_trait::async_trait;
use flowdesign_designer::drag::DragFlag;
use flowdesign_designer::export::{Delivery, DeliveryError};
use flowdesign_designer::models::{Node, NodeId, NodeKind, Position};
use flowdesign_designer::store::DEFAULT_EDGE_ID;
use flowdesign_designer::surface::{RasterOptions, RenderSurface, SurfaceError};
use flowdesign_designer::{Designer, DesignerOptions, ManualClock, MemoryNotifier};
use flowdesign_ui::surface::DomSurface;
use wasm_bindgen::JsCast;
use wasm_bindgen_test::*;
use web_sys::{Element, HtmlElement};

const SVG_NS: &str = "http://www.w3.org/2000/svg";

wasm_bindgen_test_configure!(run_in_browser);

fn mounted_node(id: &str) -> Option<(HtmlElement, HtmlElement)> {
    let document = web_sys::window()?.document()?;
    let container = document.create_element("div").ok()?;
    let node = document.create_element("div").ok()?;
    node.set_attribute("data-node-id", id).ok()?;
    container.append_child(&node).ok()?;
    document.body()?.append_child(&container).ok()?;
    Some((
        container.dyn_into::<HtmlElement>().ok()?,
        node.dyn_into::<HtmlElement>().ok()?,
    ))
}

fn step(id: &str) -> Node {
    let Ok(id) = NodeId::new(id) else {
        panic!("valid node id");
    };
    Node::new(id, NodeKind::Step, "Step", Position::origin())
}

#[wasm_bindgen_test]
async fn test_rasterize_requires_container() {
    let surface = DomSurface::new(DragFlag::new());
    let options = RasterOptions {
        pixel_ratio: 1.0,
        width: 200.0,
        height: 100.0,
    };
    assert_eq!(surface.rasterize(&options).await, Err(SurfaceError::NotMounted));
}

#[wasm_bindgen_test]
fn test_translate_moves_node_element() {
    let Some((container, element)) = mounted_node("dom-a") else {
        panic!("browser document available");
    };
    let surface = DomSurface::new(DragFlag::new());
    let node = step("dom-a");
    surface.sync(std::slice::from_ref(&node), &[]);
    surface.set_container(Some(container));

    let Ok(target) = Position::new(40.0, 60.0) else {
        panic!("finite position");
    };
    assert_eq!(surface.translate_node(&node.id, target), Ok(()));
    assert_eq!(
        element.style().get_property_value("transform").ok().as_deref(),
        Some("translate(40px, 60px)")
    );
}

#[wasm_bindgen_test]
fn test_transitions_toggle_on_element() {
    let Some((container, element)) = mounted_node("dom-b") else {
        panic!("browser document available");
    };
    let surface = DomSurface::new(DragFlag::new());
    let node = step("dom-b");
    surface.sync(std::slice::from_ref(&node), &[]);
    surface.set_container(Some(container));

    surface.set_transitions(&node.id, false);
    assert_eq!(
        element.style().get_property_value("transition").ok().as_deref(),
        Some("none")
    );
    surface.set_transitions(&node.id, true);
    assert_eq!(
        element.style().get_property_value("transition").ok().as_deref(),
        Some("")
    );
}

struct RefusingDelivery;

#[async_trait(?Send)]
impl Delivery for RefusingDelivery {
    async fn download(&self, file_name: &str, _bytes: &[u8]) -> Result<String, DeliveryError> {
        Err(DeliveryError::Download {
            file_name: file_name.to_string(),
            reason: "blocked".to_string(),
        })
    }

    async fn open_in_viewer(&self, file_name: &str, _bytes: &[u8]) -> Result<String, DeliveryError> {
        Err(DeliveryError::Viewer {
            file_name: file_name.to_string(),
            reason: "popup blocked".to_string(),
        })
    }
}

fn mounted_edge(edge_id: &str) -> Option<(HtmlElement, Element)> {
    let document = web_sys::window()?.document()?;
    let container = document.create_element("div").ok()?;
    let svg = document.create_element_ns(Some(SVG_NS), "svg").ok()?;
    let path = document.create_element_ns(Some(SVG_NS), "path").ok()?;
    path.set_attribute("data-edge-id", edge_id).ok()?;
    path.set_attribute("stroke", "#b1b1b7").ok()?;
    path.set_attribute("stroke-width", "1.5").ok()?;
    svg.append_child(&path).ok()?;
    container.append_child(&svg).ok()?;
    document.body()?.append_child(&container).ok()?;
    Some((container.dyn_into::<HtmlElement>().ok()?, path))
}

fn stroke_attributes(path: &Element) -> (Option<String>, Option<String>) {
    (path.get_attribute("stroke"), path.get_attribute("stroke-width"))
}

#[wasm_bindgen_test]
fn test_strokes_are_read_from_the_dom() {
    let Some((container, _path)) = mounted_edge("dom-e1") else {
        panic!("browser document available");
    };
    let surface = DomSurface::new(DragFlag::new());
    surface.set_container(Some(container));

    let strokes = surface.edge_strokes();

    assert_eq!(strokes.len(), 1);
    assert_eq!(strokes.first().map(|s| s.edge.as_str()), Some("dom-e1"));
    assert_eq!(strokes.first().and_then(|s| s.color.clone()).as_deref(), Some("#b1b1b7"));
    assert_eq!(strokes.first().and_then(|s| s.width), Some(1.5));
}

#[wasm_bindgen_test]
async fn test_failed_export_leaves_rendered_strokes_and_style_alone() {
    let Some((container, path)) = mounted_edge(DEFAULT_EDGE_ID) else {
        panic!("browser document available");
    };
    let designer = Designer::new(
        DesignerOptions::new(1, Rc::new(RefusingDelivery))
            .notifier(Rc::new(MemoryNotifier::new()))
            .clock(Rc::new(ManualClock::new())),
    );
    let surface = Rc::new(DomSurface::new(designer.drag_flag()));
    designer.attach_surface(surface.clone());
    surface.set_container(Some(container.clone()));
    let strokes_before = stroke_attributes(&path);
    let background_before = container.style().get_property_value("background").ok();

    assert!(designer.export_pdf().await.is_err());

    assert_eq!(stroke_attributes(&path), strokes_before);
    assert_eq!(container.style().get_property_value("background").ok(), background_before);
}

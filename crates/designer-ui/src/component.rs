//! The `<FlowDesigner/>` component.
//!
//! Owns one [`Designer`] for its lifetime. Graph state is read back through
//! a revision counter: every designer call that may have changed the store
//! bumps `revision`, and dialog or menu changes bump `ui_revision`, so text
//! inputs are not rebuilt while the graph re-renders.
//!
//! The drag fast path never bumps either counter. Node elements are moved by
//! the [`DomSurface`] directly and the view catches up on release.

use std::rc::Rc;

use flowdesign_designer::controller::drop::{LABEL_KEY, TYPE_KEY};
use flowdesign_designer::controller::{Connection, DropPayload, EditDialog, MenuItem};
use flowdesign_designer::drag::{EdgeChange, NodeChange};
use flowdesign_designer::models::{Edge, EdgeId, LinkedItemType};
use flowdesign_designer::persistence::CallbackSink;
use flowdesign_designer::render::curves::connector_curve;
use flowdesign_designer::render::visual;
use flowdesign_designer::render::visuals::node_colors;
use flowdesign_designer::viewport::{CanvasBounds, ClientPoint};
use flowdesign_designer::{Designer, DesignerOptions, DiagramDocument, HandleSlot, Node, NodeId, NodeKind, Position};
use gloo_timers::callback::Interval;
use leptos::callback::{Callable, UnsyncCallback};
use leptos::html;
use leptos::prelude::*;
use wasm_bindgen_futures::spawn_local;

use crate::clock::PerformanceClock;
use crate::delivery::BrowserDelivery;
use crate::surface::DomSurface;
use crate::toast::{Toast, ToastList, ToastNotifier};

/// How often pending clicks and debounced changes are checked
const TICK_MILLIS: u32 = 25;

/// A node being dragged, with the grab point relative to its corner
#[derive(Debug, Clone, PartialEq)]
struct Gesture {
    node: NodeId,
    grab: (f64, f64),
    moved: bool,
}

fn client_point(ev: &web_sys::MouseEvent) -> ClientPoint {
    ClientPoint::new(f64::from(ev.client_x()), f64::from(ev.client_y()))
}

fn canvas_bounds(container: NodeRef<html::Div>) -> Option<CanvasBounds> {
    let element = container.get_untracked()?;
    let rect = element.get_bounding_client_rect();
    Some(CanvasBounds::new(rect.left(), rect.top(), rect.width(), rect.height()))
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn linked_type_tag(item: Option<LinkedItemType>) -> &'static str {
    match item {
        Some(LinkedItemType::TestCase) => "testCase",
        Some(LinkedItemType::Requirement) => "requirement",
        Some(LinkedItemType::Bug) => "bug",
        None => "",
    }
}

fn parse_linked_type(tag: &str) -> Option<LinkedItemType> {
    match tag {
        "testCase" => Some(LinkedItemType::TestCase),
        "requirement" => Some(LinkedItemType::Requirement),
        "bug" => Some(LinkedItemType::Bug),
        _ => None,
    }
}

/// SVG path data for every edge, fanning out parallel connectors
fn edge_paths(document: &DiagramDocument) -> Vec<(EdgeId, String)> {
    let mut seen: Vec<(&NodeId, &NodeId)> = Vec::new();
    document
        .edges
        .iter()
        .filter_map(|edge: &Edge| {
            let source = document.nodes.iter().find(|n| n.id == edge.source)?;
            let target = document.nodes.iter().find(|n| n.id == edge.target)?;
            let lane = seen
                .iter()
                .filter(|(a, b)| {
                    (*a == &edge.source && *b == &edge.target) || (*a == &edge.target && *b == &edge.source)
                })
                .count();
            seen.push((&edge.source, &edge.target));

            let from = anchor(source, true);
            let to = anchor(target, false);
            let curve = connector_curve(from, to, 0.0, lane).ok()?;
            let d = format!(
                "M {} {} Q {} {} {} {}",
                curve.start.0, curve.start.1, curve.control.0, curve.control.1, curve.end.0, curve.end.1
            );
            Some((edge.id.clone(), d))
        })
        .collect()
}

/// Bottom-centre for outgoing connectors, top-centre for incoming
fn anchor(node: &Node, outgoing: bool) -> (f64, f64) {
    let look = visual(node.kind);
    let x = node.position.x + look.width / 2.0;
    let y = if outgoing {
        node.position.y + look.height
    } else {
        node.position.y
    };
    (x, y)
}

#[component]
pub fn FlowDesigner(
    project_id: i64,
    /// Document pushed by the owner; `None` shows the default diagram
    #[prop(optional, into)]
    flow_data: MaybeProp<DiagramDocument>,
    /// Debounced change notification
    #[prop(optional)]
    on_change: Option<UnsyncCallback<DiagramDocument>>,
    /// Explicit save with `(name, description)`
    #[prop(optional)]
    on_save: Option<UnsyncCallback<(String, String)>>,
    /// Receives the imperative handle while mounted
    #[prop(optional)]
    handle: Option<HandleSlot>,
) -> impl IntoView {
    let toasts = RwSignal::new(Vec::<Toast>::new());
    let revision = RwSignal::new(0_u64);
    let ui_revision = RwSignal::new(0_u64);
    let exporting = RwSignal::new(false);
    let gesture = RwSignal::new(None::<Gesture>);
    let connecting = RwSignal::new(None::<NodeId>);
    let suppress_click = RwSignal::new(false);
    let container = NodeRef::<html::Div>::new();

    let bump = move || revision.update(|r| *r = r.wrapping_add(1));
    let bump_ui = move || ui_revision.update(|r| *r = r.wrapping_add(1));

    let sink = CallbackSink::new(
        move |document: &DiagramDocument| {
            if let Some(callback) = &on_change {
                callback.run(document.clone());
            }
        },
        move |name: &str, description: &str| {
            if let Some(callback) = &on_save {
                callback.run((name.to_string(), description.to_string()));
            }
        },
    );

    let mut options = DesignerOptions::new(project_id, Rc::new(BrowserDelivery))
        .sink(Rc::new(sink))
        .notifier(Rc::new(ToastNotifier::new(toasts)))
        .clock(Rc::new(PerformanceClock::new()));
    if let Some(document) = flow_data.get_untracked() {
        options = options.flow_data(document);
    }
    let instance = Designer::new(options);
    let dom = Rc::new(DomSurface::new(instance.drag_flag()));
    instance.attach_surface(dom.clone());
    let guard = handle.map(|slot| instance.mount(&slot));

    let designer = StoredValue::new_local(instance);
    let surface = StoredValue::new_local(dom);
    let _guard = StoredValue::new_local(guard);

    let ticker = Interval::new(TICK_MILLIS, move || {
        let _ = designer.try_with_value(|d| {
            let before = d.selected();
            if d.tick() && d.selected() != before {
                bump_ui();
            }
        });
    });
    let _ticker = StoredValue::new_local(ticker);

    Effect::new(move |_| {
        if let Some(element) = container.get() {
            let element: web_sys::HtmlElement = element.into();
            surface.with_value(|s| s.set_container(Some(element)));
        }
    });

    Effect::new(move |_| {
        let document = flow_data.get();
        if designer.with_value(|d| d.set_flow_data(document)) {
            bump();
            bump_ui();
        }
    });

    on_cleanup(move || {
        let _ = surface.try_with_value(|s| s.set_container(None));
        let _ = designer.try_with_value(Designer::detach_surface);
    });

    let document = Memo::new(move |_| {
        revision.track();
        designer.with_value(Designer::snapshot)
    });

    let project = move |ev: &web_sys::MouseEvent| -> Option<Position> {
        let bounds = canvas_bounds(container)?;
        designer
            .with_value(Designer::viewport)
            .project(client_point(ev), bounds)
            .ok()
    };

    let on_mouse_move = move |ev: web_sys::MouseEvent| {
        let Some(current) = gesture.get_untracked() else {
            return;
        };
        let Some(pointer) = project(&ev) else {
            return;
        };
        let Ok(position) = Position::new(pointer.x - current.grab.0, pointer.y - current.grab.1) else {
            return;
        };
        designer.with_value(|d| {
            d.on_node_changes(vec![NodeChange::Position {
                id: current.node.clone(),
                position: Some(position),
                dragging: true,
            }])
        });
        if !current.moved {
            gesture.update(|g| {
                if let Some(g) = g {
                    g.moved = true;
                }
            });
        }
    };

    let on_mouse_up = move |_ev: web_sys::MouseEvent| {
        if let Some(finished) = gesture.get_untracked() {
            gesture.set(None);
            if finished.moved {
                suppress_click.set(true);
                let changed = designer.with_value(|d| {
                    d.on_node_changes(vec![NodeChange::Position {
                        id: finished.node,
                        position: None,
                        dragging: false,
                    }])
                });
                if changed {
                    bump();
                }
            }
        }
        connecting.set(None);
    };

    let on_pane_click = move |_ev: web_sys::MouseEvent| {
        designer.with_value(Designer::on_pane_click);
        bump_ui();
    };

    let on_context_menu = move |ev: web_sys::MouseEvent| {
        ev.prevent_default();
        if let Some(bounds) = canvas_bounds(container) {
            if designer.with_value(|d| d.open_context_menu(client_point(&ev), bounds)) {
                bump_ui();
            }
        }
    };

    let on_drag_over = move |ev: web_sys::DragEvent| {
        ev.prevent_default();
        if let Some(transfer) = ev.data_transfer() {
            transfer.set_drop_effect("move");
        }
    };

    let on_drop = move |ev: web_sys::DragEvent| {
        ev.prevent_default();
        let payload = match ev.data_transfer() {
            Some(transfer) => DropPayload::from_transfer(|key| transfer.get_data(key).ok()),
            None => DropPayload::from_transfer(|_| None),
        };
        let added = designer.with_value(|d| d.on_drop(&payload, client_point(&ev), canvas_bounds(container)));
        if added.is_some() {
            bump();
        }
    };

    let choose = move |item: MenuItem| {
        if item == MenuItem::ExportPdf {
            exporting.set(true);
        }
        spawn_local(async move {
            let Some(instance) = designer.try_get_value() else {
                return;
            };
            instance.choose(item).await;
            exporting.set(false);
            bump();
            bump_ui();
        });
    };

    let export = move |_ev: web_sys::MouseEvent| {
        if exporting.get_untracked() {
            return;
        }
        exporting.set(true);
        spawn_local(async move {
            let Some(instance) = designer.try_get_value() else {
                return;
            };
            match instance.export_pdf().await {
                Ok(outcome) => web_sys::console::debug_1(
                    &format!("Exported {} ({} bytes)", outcome.file_name, outcome.size).into(),
                ),
                // Already shown as a toast
                Err(e) => web_sys::console::debug_1(&format!("Export ended without a PDF: {e}").into()),
            }
            exporting.set(false);
            bump();
        });
    };

    let palette = NodeKind::ALL
        .into_iter()
        .map(|kind| {
            let look = visual(kind);
            let label = look.default_label;
            let on_drag_start = move |ev: web_sys::DragEvent| {
                if let Some(transfer) = ev.data_transfer() {
                    let _ = transfer.set_data(TYPE_KEY, kind.tag());
                    let _ = transfer.set_data(LABEL_KEY, label);
                    transfer.set_effect_allowed("move");
                }
            };
            view! {
                <div
                    class="palette-item"
                    draggable="true"
                    style=format!("border-color: {}; background: {}", look.border.to_css(), look.fill.to_css())
                    on:dragstart=on_drag_start
                >
                    {label}
                </div>
            }
        })
        .collect_view();

    let nodes = move || {
        document
            .get()
            .nodes
            .into_iter()
            .map(|node| {
                let look = visual(node.kind);
                let (fill, border, border_width) = node_colors(&node);
                let id = node.id.clone();
                let style = format!(
                    "transform: translate({}px, {}px); width: {}px; height: {}px; background: {}; border: {}px solid {};",
                    node.position.x,
                    node.position.y,
                    look.width,
                    look.height,
                    fill.to_css(),
                    border_width,
                    border.to_css(),
                );
                let class = format!("flow-node flow-node-{}", node.kind.tag());
                let origin = node.position;

                let down_id = id.clone();
                let on_mouse_down = move |ev: web_sys::MouseEvent| {
                    if ev.button() != 0 {
                        return;
                    }
                    ev.stop_propagation();
                    if let Some(pointer) = project(&ev) {
                        gesture.set(Some(Gesture {
                            node: down_id.clone(),
                            grab: (pointer.x - origin.x, pointer.y - origin.y),
                            moved: false,
                        }));
                    }
                };

                let click_id = id.clone();
                let on_click = move |ev: web_sys::MouseEvent| {
                    ev.stop_propagation();
                    if suppress_click.get_untracked() {
                        suppress_click.set(false);
                        return;
                    }
                    designer.with_value(|d| d.on_node_click(click_id.clone()));
                };

                let up_id = id.clone();
                let on_node_mouse_up = move |_ev: web_sys::MouseEvent| {
                    let Some(source) = connecting.get_untracked() else {
                        return;
                    };
                    connecting.set(None);
                    let connection = Connection::new(source, up_id.clone());
                    if designer.with_value(|d| d.on_connect(&connection)).is_some() {
                        bump();
                    }
                };

                let handle_id = id.clone();
                let on_handle_down = move |ev: web_sys::MouseEvent| {
                    ev.stop_propagation();
                    connecting.set(Some(handle_id.clone()));
                };

                view! {
                    <div
                        class=class
                        data-node-id=id.as_str().to_string()
                        style=style
                        on:mousedown=on_mouse_down
                        on:click=on_click
                        on:mouseup=on_node_mouse_up
                    >
                        <span class="flow-node-label">{node.data.label.clone()}</span>
                        <div class="flow-node-handle" on:mousedown=on_handle_down></div>
                    </div>
                }
            })
            .collect_view()
    };

    let edges = move || {
        edge_paths(&document.get())
            .into_iter()
            .map(|(id, d)| {
                let remove_id = id.clone();
                let on_double_click = move |ev: web_sys::MouseEvent| {
                    ev.stop_propagation();
                    let change = EdgeChange::Remove { id: remove_id.clone() };
                    if designer.with_value(|d| d.on_edge_changes(vec![change])) {
                        bump();
                    }
                };
                view! {
                    <path
                        class="flow-edge"
                        data-edge-id=id.as_str().to_string()
                        d=d
                        fill="none"
                        stroke="#b1b1b7"
                        stroke-width="1.5"
                        marker-end="url(#flow-arrow)"
                        on:dblclick=on_double_click
                    />
                }
            })
            .collect_view()
    };

    let context_menu = move || {
        ui_revision.track();
        designer.with_value(Designer::context_menu).map(|menu| {
            let style = format!("left: {}px; top: {}px;", menu.client.x, menu.client.y);
            let entries = MenuItem::ALL
                .into_iter()
                .map(|item| {
                    view! {
                        <li
                            class="context-menu-item"
                            on:click=move |ev: web_sys::MouseEvent| {
                                ev.stop_propagation();
                                choose(item);
                            }
                        >
                            {item.label()}
                        </li>
                    }
                })
                .collect_view();
            view! { <ul class="context-menu" style=style>{entries}</ul> }
        })
    };

    let edit_dialog = move || {
        ui_revision.track();
        designer.with_value(Designer::edit_dialog).map(|dialog| {
            let draft = dialog.draft().clone();
            let kind = draft.kind;
            let data = draft.data;

            let update = move |f: Box<dyn FnOnce(&mut EditDialog)>| {
                designer.with_value(|d| d.update_edit(f));
            };

            let extra = match kind {
                NodeKind::Decision => view! {
                    <label>
                        "Condition"
                        <input
                            type="text"
                            prop:value=data.condition.clone().unwrap_or_default()
                            on:input=move |ev| {
                                let value = non_blank(event_target_value(&ev));
                                update(Box::new(move |e| e.set_condition(value)));
                            }
                        />
                    </label>
                }
                .into_any(),
                NodeKind::Linked => {
                    let item_id = RwSignal::new(data.linked_item_id.clone());
                    let item_type = RwSignal::new(data.linked_item_type);
                    let push = move || {
                        let (t, i) = (item_type.get_untracked(), item_id.get_untracked());
                        update(Box::new(move |e| e.set_link(t, i)));
                    };
                    view! {
                        <label>
                            "Linked item"
                            <select
                                prop:value=linked_type_tag(data.linked_item_type)
                                on:change=move |ev| {
                                    item_type.set(parse_linked_type(&event_target_value(&ev)));
                                    push();
                                }
                            >
                                <option value="">"None"</option>
                                <option value="testCase">"Test case"</option>
                                <option value="requirement">"Requirement"</option>
                                <option value="bug">"Bug"</option>
                            </select>
                            <input
                                type="text"
                                prop:value=data.linked_item_id.clone().unwrap_or_default()
                                on:input=move |ev| {
                                    item_id.set(non_blank(event_target_value(&ev)));
                                    push();
                                }
                            />
                        </label>
                    }
                    .into_any()
                }
                NodeKind::ApiCall => {
                    let endpoint = RwSignal::new(data.endpoint.clone());
                    let method = RwSignal::new(data.method.clone());
                    let push = move || {
                        let (e, m) = (endpoint.get_untracked(), method.get_untracked());
                        update(Box::new(move |dialog| dialog.set_endpoint(e, m)));
                    };
                    view! {
                        <label>
                            "Endpoint"
                            <input
                                type="text"
                                prop:value=data.method.clone().unwrap_or_default()
                                placeholder="GET"
                                on:input=move |ev| {
                                    method.set(non_blank(event_target_value(&ev)));
                                    push();
                                }
                            />
                            <input
                                type="text"
                                prop:value=data.endpoint.clone().unwrap_or_default()
                                placeholder="/api/..."
                                on:input=move |ev| {
                                    endpoint.set(non_blank(event_target_value(&ev)));
                                    push();
                                }
                            />
                        </label>
                    }
                    .into_any()
                }
                NodeKind::ExternalSystem => view! {
                    <label>
                        "System"
                        <input
                            type="text"
                            prop:value=data.system.clone().unwrap_or_default()
                            on:input=move |ev| {
                                let value = non_blank(event_target_value(&ev));
                                update(Box::new(move |e| e.set_system(value)));
                            }
                        />
                    </label>
                }
                .into_any(),
                _ => ().into_any(),
            };

            view! {
                <div class="dialog-backdrop">
                    <div class="dialog" on:click=|ev: web_sys::MouseEvent| ev.stop_propagation()>
                        <h3>"Edit " {visual(kind).default_label}</h3>
                        <label>
                            "Label"
                            <input
                                type="text"
                                prop:value=data.label.clone()
                                on:input=move |ev| {
                                    let value = event_target_value(&ev);
                                    update(Box::new(move |e| e.set_label(value)));
                                }
                            />
                        </label>
                        <label>
                            "Description"
                            <textarea
                                prop:value=data.description.clone()
                                on:input=move |ev| {
                                    let value = event_target_value(&ev);
                                    update(Box::new(move |e| e.set_description(value)));
                                }
                            ></textarea>
                        </label>
                        {extra}
                        <div class="dialog-actions">
                            <button
                                class="danger"
                                on:click=move |_| {
                                    if designer.with_value(Designer::delete_selected) {
                                        bump();
                                    }
                                    bump_ui();
                                }
                            >
                                "Delete"
                            </button>
                            <button on:click=move |_| {
                                designer.with_value(Designer::cancel_edit);
                                bump_ui();
                            }>"Cancel"</button>
                            <button
                                class="primary"
                                on:click=move |_| {
                                    if designer.with_value(Designer::save_edit) {
                                        bump();
                                    }
                                    bump_ui();
                                }
                            >
                                "Save"
                            </button>
                        </div>
                    </div>
                </div>
            }
        })
    };

    let save_dialog = move || {
        ui_revision.track();
        designer.with_value(Designer::save_dialog).map(|dialog| {
            view! {
                <div class="dialog-backdrop">
                    <div class="dialog">
                        <h3>"Save Diagram"</h3>
                        <label>
                            "Name"
                            <input
                                type="text"
                                prop:value=dialog.name.clone()
                                on:input=move |ev| {
                                    let value = event_target_value(&ev);
                                    designer.with_value(|d| d.update_save_dialog(|s| s.name = value));
                                }
                            />
                        </label>
                        <label>
                            "Description"
                            <textarea
                                prop:value=dialog.description.clone()
                                on:input=move |ev| {
                                    let value = event_target_value(&ev);
                                    designer.with_value(|d| d.update_save_dialog(|s| s.description = value));
                                }
                            ></textarea>
                        </label>
                        <div class="dialog-actions">
                            <button on:click=move |_| {
                                designer.with_value(Designer::cancel_save_dialog);
                                bump_ui();
                            }>"Cancel"</button>
                            <button
                                class="primary"
                                on:click=move |_| {
                                    if designer.with_value(Designer::confirm_save) {
                                        bump();
                                        bump_ui();
                                    }
                                }
                            >
                                "Save"
                            </button>
                        </div>
                    </div>
                </div>
            }
        })
    };

    view! {
        <div class="flow-designer">
            <aside class="palette">
                <h4>"Nodes"</h4>
                {palette}
                <div class="toolbar">
                    <button on:click=move |_| {
                        designer.with_value(Designer::show_save_dialog);
                        bump_ui();
                    }>"Save"</button>
                    <button on:click=move |_| {
                        designer.with_value(Designer::reset_designer);
                        bump();
                        bump_ui();
                    }>"Reset"</button>
                    <button on:click=export disabled=move || exporting.get()>
                        {move || if exporting.get() { "Exporting..." } else { "Export PDF" }}
                    </button>
                </div>
            </aside>
            <div
                class="flow-canvas"
                node_ref=container
                on:mousemove=on_mouse_move
                on:mouseup=on_mouse_up
                on:click=on_pane_click
                on:contextmenu=on_context_menu
                on:dragover=on_drag_over
                on:drop=on_drop
            >
                <svg class="flow-edges">
                    <defs>
                        <marker
                            id="flow-arrow"
                            viewBox="0 0 10 10"
                            refX="10"
                            refY="5"
                            markerWidth="8"
                            markerHeight="8"
                            orient="auto-start-reverse"
                        >
                            <path d="M 0 0 L 10 5 L 0 10 z" fill="#b1b1b7" />
                        </marker>
                    </defs>
                    {edges}
                </svg>
                {nodes}
            </div>
            {context_menu}
            {edit_dialog}
            {save_dialog}
            <ToastList toasts=toasts />
        </div>
    }
}

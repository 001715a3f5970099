//! Interaction controller
//!
//! Translates canvas gestures into [`GraphStore`] calls. Two concerns get
//! special handling:
//!
//! - **Drag fast path.** While a node is dragged, position events move the
//!   rendered element through the [`RenderSurface`] and never touch the
//!   store. The final position is committed once, on drag end. Edge change
//!   events are dropped while the drag flag is set.
//! - **Click vs. drag.** A click selects its node only after a short delay
//!   (see [`selection`]) so that a drag starting on the node wins.
//!
//! Time is passed in explicitly as `now`, a monotonic offset supplied by
//! the host, which keeps every gesture reproducible in tests.

pub mod dialog;
pub mod drop;
pub mod menu;
pub mod selection;

use std::time::Duration;

use tracing::{debug, warn};

use crate::drag::{DragFlag, EdgeChange, NodeChange};
use crate::models::{EdgeId, Metadata, Node, NodeId, NodeKind, NodePatch, Position};
use crate::notify::Notifier;
use crate::render::visuals::visual;
use crate::store::GraphStore;
use crate::surface::RenderSurface;
use crate::viewport::{CanvasBounds, ClientPoint, Viewport};

pub use dialog::{EditDialog, SaveDialog, SaveDialogError};
pub use drop::{DropError, DropPayload, ResolvedDrop, resolve_drop};
pub use menu::{ContextMenu, MenuItem, MenuOutcome};
pub use selection::ClickTimer;

/// A completed connection gesture between two handles
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Connection {
    pub source: Option<NodeId>,
    pub target: Option<NodeId>,
    pub source_handle: Option<String>,
    pub target_handle: Option<String>,
}

impl Connection {
    #[must_use]
    pub const fn new(source: NodeId, target: NodeId) -> Self {
        Self {
            source: Some(source),
            target: Some(target),
            source_handle: None,
            target_handle: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct ActiveDrag {
    node: NodeId,
    last: Option<Position>,
}

/// Gesture state for one designer instance
#[derive(Debug)]
pub struct InteractionController {
    drag: DragFlag,
    active_drag: Option<ActiveDrag>,
    clicks: ClickTimer,
    selected: Option<NodeId>,
    menu: Option<ContextMenu>,
    edit: Option<EditDialog>,
    save: Option<SaveDialog>,
}

impl InteractionController {
    #[must_use]
    pub const fn new(drag: DragFlag, click_delay: Duration) -> Self {
        Self {
            drag,
            active_drag: None,
            clicks: ClickTimer::new(click_delay),
            selected: None,
            menu: None,
            edit: None,
            save: None,
        }
    }

    #[must_use]
    pub const fn drag_flag(&self) -> &DragFlag {
        &self.drag
    }

    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    #[must_use]
    pub const fn selected(&self) -> Option<&NodeId> {
        self.selected.as_ref()
    }

    #[must_use]
    pub const fn context_menu(&self) -> Option<&ContextMenu> {
        self.menu.as_ref()
    }

    #[must_use]
    pub const fn edit_dialog(&self) -> Option<&EditDialog> {
        self.edit.as_ref()
    }

    pub fn edit_dialog_mut(&mut self) -> Option<&mut EditDialog> {
        self.edit.as_mut()
    }

    #[must_use]
    pub const fn save_dialog(&self) -> Option<&SaveDialog> {
        self.save.as_ref()
    }

    pub fn save_dialog_mut(&mut self) -> Option<&mut SaveDialog> {
        self.save.as_mut()
    }

    /// Earliest time [`InteractionController::tick`] has work to do
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.clicks.deadline()
    }

    // ------------------------------------------------------------------
    // Node and edge change streams
    // ------------------------------------------------------------------

    /// Apply a batch of node change events.
    ///
    /// Returns `true` when the store was mutated.
    pub fn apply_node_changes(
        &mut self,
        store: &mut GraphStore,
        surface: Option<&dyn RenderSurface>,
        changes: Vec<NodeChange>,
    ) -> bool {
        let mut mutated = false;
        for change in changes {
            mutated |= match change {
                NodeChange::Position {
                    id,
                    position,
                    dragging: true,
                } => {
                    self.drag_move(surface, id, position);
                    false
                }
                NodeChange::Position {
                    id,
                    position,
                    dragging: false,
                } => self.drag_end(store, surface, &id, position),
                NodeChange::Remove { id } => self.remove_node(store, &id),
                NodeChange::Select { .. } | NodeChange::Dimensions { .. } => false,
            };
        }
        mutated
    }

    fn drag_move(&mut self, surface: Option<&dyn RenderSurface>, id: NodeId, position: Option<Position>) {
        if !self.drag.is_dragging() {
            debug!(node_id = %id, "Drag started");
            self.drag.set(true);
            self.clicks.cancel_for(&id);
            if let Some(surface) = surface {
                surface.set_transitions(&id, false);
            }
        }

        if let (Some(surface), Some(position)) = (surface, position) {
            if let Err(e) = surface.translate_node(&id, position) {
                debug!(node_id = %id, error = %e, "Fast-path translate skipped");
            }
        }

        let last = position.or_else(|| {
            self.active_drag
                .as_ref()
                .filter(|drag| drag.node == id)
                .and_then(|drag| drag.last)
        });
        self.active_drag = Some(ActiveDrag { node: id, last });
    }

    fn drag_end(
        &mut self,
        store: &mut GraphStore,
        surface: Option<&dyn RenderSurface>,
        id: &NodeId,
        position: Option<Position>,
    ) -> bool {
        let tracked = self
            .active_drag
            .take()
            .filter(|drag| &drag.node == id)
            .and_then(|drag| drag.last);

        // Clear before the store update so the normal path is live again
        let was_dragging = self.drag.is_dragging();
        self.drag.set(false);
        if was_dragging {
            if let Some(surface) = surface {
                surface.set_transitions(id, true);
            }
        }

        let Some(final_position) = position.or(tracked) else {
            return false;
        };
        debug!(node_id = %id, x = final_position.x, y = final_position.y, "Drag committed");
        store.update_node(id, &NodePatch::position(final_position))
    }

    fn remove_node(&mut self, store: &mut GraphStore, id: &NodeId) -> bool {
        if self.selected.as_ref() == Some(id) {
            self.clear_selection();
        }
        self.clicks.cancel_for(id);
        store.delete_node(id)
    }

    /// Apply a batch of edge change events; ignored entirely while dragging.
    ///
    /// Returns `true` when the store was mutated.
    pub fn apply_edge_changes(&mut self, store: &mut GraphStore, changes: Vec<EdgeChange>) -> bool {
        if self.drag.is_dragging() {
            return false;
        }

        let mut mutated = false;
        for change in changes {
            if let EdgeChange::Remove { id } = change {
                mutated |= store.delete_edge(&id);
            }
        }
        mutated
    }

    /// Turn a completed connection into an edge; duplicates are ignored
    pub fn connect(&mut self, store: &mut GraphStore, connection: &Connection) -> Option<EdgeId> {
        let (Some(source), Some(target)) = (&connection.source, &connection.target) else {
            debug!("Incomplete connection ignored");
            return None;
        };
        store.add_edge(source, target)
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    /// A node was clicked at `now`; selection follows after the click delay
    pub fn node_clicked(&mut self, id: NodeId, now: Duration) {
        self.clicks.click(id, now);
    }

    /// Resolve a due click: select the node and open its edit dialog.
    ///
    /// Returns `true` when a dialog was opened.
    pub fn tick(&mut self, store: &GraphStore, now: Duration) -> bool {
        let Some(id) = self.clicks.poll(now) else {
            return false;
        };
        let Some(node) = store.node(&id) else {
            debug!(node_id = %id, "Clicked node vanished before selection");
            return false;
        };

        self.edit = Some(EditDialog::open(node));
        self.selected = Some(id);
        true
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
        self.edit = None;
        self.clicks.cancel();
    }

    // ------------------------------------------------------------------
    // Drop and context menu
    // ------------------------------------------------------------------

    /// Create a node from a palette drop.
    ///
    /// Malformed drops are ignored with a warning notification.
    pub fn drop_item(
        &mut self,
        store: &mut GraphStore,
        notifier: &dyn Notifier,
        payload: &DropPayload,
        client: ClientPoint,
        canvas: Option<CanvasBounds>,
        viewport: &Viewport,
    ) -> Option<NodeId> {
        match resolve_drop(payload, client, canvas, viewport) {
            Ok(drop) => store.add_node(drop.kind, drop.label, drop.position),
            Err(e) => {
                warn!(error = %e, "Ignoring drop");
                notifier.warning(&format!("Could not add node: {e}"));
                None
            }
        }
    }

    /// Open the context menu at a client point.
    ///
    /// Returns `false` (and opens nothing) when the point cannot be projected.
    pub fn open_context_menu(&mut self, client: ClientPoint, canvas: CanvasBounds, viewport: &Viewport) -> bool {
        match viewport.project(client, canvas) {
            Ok(position) => {
                self.menu = Some(ContextMenu { client, position });
                true
            }
            Err(e) => {
                debug!(error = %e, "Context menu position not projectable");
                false
            }
        }
    }

    pub fn close_context_menu(&mut self) {
        self.menu = None;
    }

    /// Run a menu entry and close the menu
    pub fn choose(&mut self, store: &mut GraphStore, item: MenuItem) -> MenuOutcome {
        let Some(menu) = self.menu.take() else {
            return MenuOutcome::Ignored;
        };

        let add = |store: &mut GraphStore, kind: NodeKind| {
            store
                .add_node(kind, visual(kind).default_label, menu.position)
                .map_or(MenuOutcome::Ignored, MenuOutcome::NodeAdded)
        };

        match item {
            MenuItem::AddStep => add(store, NodeKind::Step),
            MenuItem::AddDecision => add(store, NodeKind::Decision),
            MenuItem::ClearCanvas => {
                store.reset();
                self.clear_selection();
                MenuOutcome::Cleared
            }
            MenuItem::ExportPdf => MenuOutcome::ExportRequested,
        }
    }

    // ------------------------------------------------------------------
    // Edit dialog
    // ------------------------------------------------------------------

    /// Open the edit dialog for a node directly, skipping the click delay
    pub fn edit_node(&mut self, store: &GraphStore, id: &NodeId) -> bool {
        let Some(node) = store.node(id) else {
            return false;
        };
        self.edit = Some(EditDialog::open(node));
        self.selected = Some(id.clone());
        true
    }

    /// Commit the draft. Returns `true` when the store changed.
    pub fn save_edit(&mut self, store: &mut GraphStore) -> bool {
        let Some(dialog) = self.edit.take() else {
            return false;
        };
        self.selected = None;

        let patch = dialog.patch();
        if patch.is_empty() {
            return false;
        }
        store.update_node(dialog.node_id(), &patch)
    }

    /// Delete the node being edited (and its edges), closing the dialog
    pub fn delete_selected(&mut self, store: &mut GraphStore) -> bool {
        let target = self
            .edit
            .as_ref()
            .map(|dialog| dialog.node_id().clone())
            .or_else(|| self.selected.clone());
        self.clear_selection();

        target.is_some_and(|id| store.delete_node(&id))
    }

    /// Close the edit dialog without touching the store
    pub fn cancel_edit(&mut self) {
        self.edit = None;
        self.selected = None;
    }

    // ------------------------------------------------------------------
    // Save dialog
    // ------------------------------------------------------------------

    pub fn open_save_dialog(&mut self, store: &GraphStore) {
        self.save = Some(SaveDialog::open(store.metadata()));
    }

    /// Validate the save prompt.
    ///
    /// On success the dialog closes and the metadata to save is returned.
    /// A blank name leaves the dialog open and raises a warning.
    pub fn submit_save_dialog(&mut self, notifier: &dyn Notifier) -> Option<Metadata> {
        let dialog = self.save.as_ref()?;
        match dialog.submit() {
            Ok(metadata) => {
                self.save = None;
                Some(metadata)
            }
            Err(e) => {
                notifier.warning(&e.to_string());
                None
            }
        }
    }

    pub fn cancel_save_dialog(&mut self) {
        self.save = None;
    }

    /// Close every dialog and menu and forget the selection
    pub fn reset(&mut self) {
        self.clear_selection();
        self.menu = None;
        self.save = None;
        self.active_drag = None;
        self.drag.set(false);
    }

    /// The node currently being edited, as stored
    #[must_use]
    pub fn selected_node<'a>(&self, store: &'a GraphStore) -> Option<&'a Node> {
        self.selected.as_ref().and_then(|id| store.node(id))
    }
}

//! One mounted designer instance.
//!
//! [`Designer`] owns the store, the interaction controller, the persistence
//! adapter, and the export pipeline, and routes host events between them.
//! After every store mutation the change is offered to persistence and the
//! mounted surface is re-rendered.
//!
//! No `RefCell` borrow is held across an `.await`: export clones what it
//! needs out of the cells first. Owner callbacks run only after every
//! borrow is released, so they may call back into the designer.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

use chrono::Local;
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::config::DesignerConfig;
use crate::controller::{
    Connection, ContextMenu, DropPayload, EditDialog, InteractionController, MenuItem, MenuOutcome, SaveDialog,
};
use crate::drag::{DragFlag, EdgeChange, NodeChange};
use crate::export::{Delivery, ExportError, ExportOutcome, ExportPipeline, ExportRequest};
use crate::handle::{DesignerHandle, HandleSlot, MountGuard};
use crate::models::{DiagramDocument, EdgeId, Node, NodeId};
use crate::notify::{Notifier, TracingNotifier};
use crate::persistence::{ChangeSink, NullSink, Outgoing, PersistenceAdapter};
use crate::store::GraphStore;
use crate::surface::RenderSurface;
use crate::viewport::{CanvasBounds, ClientPoint, Viewport};

/// What the owner provides when creating a designer
pub struct DesignerOptions {
    pub config: DesignerConfig,
    pub project_id: i64,
    /// Initial document; `None` bootstraps the default diagram
    pub flow_data: Option<DiagramDocument>,
    pub sink: Rc<dyn ChangeSink>,
    pub notifier: Rc<dyn Notifier>,
    pub delivery: Rc<dyn Delivery>,
    pub clock: Rc<dyn Clock>,
}

impl DesignerOptions {
    /// Defaults: no callbacks, notifications to the log, system clock
    pub fn new(project_id: i64, delivery: Rc<dyn Delivery>) -> Self {
        Self {
            config: DesignerConfig::default(),
            project_id,
            flow_data: None,
            sink: Rc::new(NullSink),
            notifier: Rc::new(TracingNotifier),
            delivery,
            clock: Rc::new(SystemClock::new()),
        }
    }

    #[must_use]
    pub fn config(mut self, config: DesignerConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn flow_data(mut self, document: DiagramDocument) -> Self {
        self.flow_data = Some(document);
        self
    }

    #[must_use]
    pub fn sink(mut self, sink: Rc<dyn ChangeSink>) -> Self {
        self.sink = sink;
        self
    }

    #[must_use]
    pub fn notifier(mut self, notifier: Rc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: Rc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl std::fmt::Debug for DesignerOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DesignerOptions")
            .field("config", &self.config)
            .field("project_id", &self.project_id)
            .field("flow_data", &self.flow_data.is_some())
            .finish_non_exhaustive()
    }
}

pub(crate) struct Inner {
    config: DesignerConfig,
    project_id: i64,
    drag: DragFlag,
    store: RefCell<GraphStore>,
    controller: RefCell<InteractionController>,
    persistence: RefCell<PersistenceAdapter>,
    export: ExportPipeline,
    surface: RefCell<Option<Rc<dyn RenderSurface>>>,
    viewport: Cell<Viewport>,
    notifier: Rc<dyn Notifier>,
    delivery: Rc<dyn Delivery>,
    clock: Rc<dyn Clock>,
}

/// A designer instance. Clones share the same state.
#[derive(Clone)]
pub struct Designer {
    inner: Rc<Inner>,
}

impl std::fmt::Debug for Designer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Designer")
            .field("project_id", &self.inner.project_id)
            .field("store", &self.inner.store)
            .field("exporting", &self.inner.export.is_exporting())
            .finish_non_exhaustive()
    }
}

impl Designer {
    #[must_use]
    pub fn new(options: DesignerOptions) -> Self {
        let DesignerOptions {
            config,
            project_id,
            flow_data,
            sink,
            notifier,
            delivery,
            clock,
        } = options;

        let drag = DragFlag::new();
        let mut store = GraphStore::new();
        store.initialize(flow_data);

        let mut persistence = PersistenceAdapter::new(config.debounce_window(), sink);
        persistence.observe(&store, clock.now());

        info!(project_id, nodes = store.nodes().len(), "Designer created");

        Self {
            inner: Rc::new(Inner {
                controller: RefCell::new(InteractionController::new(drag.clone(), config.click_delay())),
                export: ExportPipeline::new(config.clone()),
                config,
                project_id,
                drag,
                store: RefCell::new(store),
                persistence: RefCell::new(persistence),
                surface: RefCell::new(None),
                viewport: Cell::new(Viewport::default()),
                notifier,
                delivery,
                clock,
            }),
        }
    }

    pub(crate) fn downgrade(&self) -> Weak<Inner> {
        Rc::downgrade(&self.inner)
    }

    pub(crate) const fn from_inner(inner: Rc<Inner>) -> Self {
        Self { inner }
    }

    #[must_use]
    pub fn config(&self) -> &DesignerConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn project_id(&self) -> i64 {
        self.inner.project_id
    }

    /// The flag a render surface must share to honor the drag fast path
    #[must_use]
    pub fn drag_flag(&self) -> DragFlag {
        self.inner.drag.clone()
    }

    // ------------------------------------------------------------------
    // Mounting
    // ------------------------------------------------------------------

    /// Attach the rendered surface and draw the current state on it
    pub fn attach_surface(&self, surface: Rc<dyn RenderSurface>) {
        {
            let store = self.inner.store.borrow();
            surface.sync(store.nodes(), store.edges());
        }
        *self.inner.surface.borrow_mut() = Some(surface);
    }

    pub fn detach_surface(&self) {
        *self.inner.surface.borrow_mut() = None;
    }

    /// Publish this designer's handle into the owner's slot.
    ///
    /// The slot is cleared again when the returned guard drops.
    #[must_use]
    pub fn mount(&self, slot: &HandleSlot) -> MountGuard {
        MountGuard::register(slot, DesignerHandle::new(self.downgrade()))
    }

    // ------------------------------------------------------------------
    // Reading state
    // ------------------------------------------------------------------

    /// Copy of the current document
    #[must_use]
    pub fn snapshot(&self) -> DiagramDocument {
        self.inner.store.borrow().snapshot()
    }

    /// Run `f` against the store
    pub fn with_store<R>(&self, f: impl FnOnce(&GraphStore) -> R) -> R {
        f(&self.inner.store.borrow())
    }

    #[must_use]
    pub fn selected(&self) -> Option<NodeId> {
        self.inner.controller.borrow().selected().cloned()
    }

    #[must_use]
    pub fn selected_node(&self) -> Option<Node> {
        let store = self.inner.store.borrow();
        self.inner.controller.borrow().selected_node(&store).cloned()
    }

    #[must_use]
    pub fn context_menu(&self) -> Option<ContextMenu> {
        self.inner.controller.borrow().context_menu().copied()
    }

    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.inner.drag.is_dragging()
    }

    #[must_use]
    pub fn is_exporting(&self) -> bool {
        self.inner.export.is_exporting()
    }

    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.inner.viewport.get()
    }

    pub fn set_viewport(&self, viewport: Viewport) {
        self.inner.viewport.set(viewport);
    }

    /// Earliest time [`Designer::tick`] has work to do
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        let click = self.inner.controller.borrow().next_deadline();
        let change = self.inner.persistence.borrow().deadline();
        match (click, change) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    // ------------------------------------------------------------------
    // Owner input
    // ------------------------------------------------------------------

    /// The owner pushed a (possibly unchanged) document
    pub fn set_flow_data(&self, document: Option<DiagramDocument>) -> bool {
        let changed = self.inner.store.borrow_mut().initialize(document);
        if changed {
            self.inner.controller.borrow_mut().reset();
            self.after_mutation();
        }
        changed
    }

    /// Fire whatever is due: a delayed click selection, a debounced change.
    ///
    /// Returns `true` when anything happened.
    pub fn tick(&self) -> bool {
        let now = self.inner.clock.now();
        let selected = {
            let store = self.inner.store.borrow();
            self.inner.controller.borrow_mut().tick(&store, now)
        };
        let due = self.inner.persistence.borrow_mut().flush_due(now);
        let flushed = due.map(Outgoing::deliver).is_some();
        selected || flushed
    }

    // ------------------------------------------------------------------
    // Graph gestures
    // ------------------------------------------------------------------

    pub fn on_node_changes(&self, changes: Vec<NodeChange>) -> bool {
        let surface = self.surface();
        let mutated = {
            let mut store = self.inner.store.borrow_mut();
            self.inner
                .controller
                .borrow_mut()
                .apply_node_changes(&mut store, surface.as_deref(), changes)
        };
        if mutated {
            self.after_mutation();
        }
        mutated
    }

    pub fn on_edge_changes(&self, changes: Vec<EdgeChange>) -> bool {
        let mutated = {
            let mut store = self.inner.store.borrow_mut();
            self.inner
                .controller
                .borrow_mut()
                .apply_edge_changes(&mut store, changes)
        };
        if mutated {
            self.after_mutation();
        }
        mutated
    }

    pub fn on_connect(&self, connection: &Connection) -> Option<EdgeId> {
        let edge = {
            let mut store = self.inner.store.borrow_mut();
            self.inner.controller.borrow_mut().connect(&mut store, connection)
        };
        if edge.is_some() {
            self.after_mutation();
        }
        edge
    }

    pub fn on_node_click(&self, id: NodeId) {
        let now = self.inner.clock.now();
        self.inner.controller.borrow_mut().node_clicked(id, now);
    }

    pub fn on_pane_click(&self) {
        let mut controller = self.inner.controller.borrow_mut();
        controller.clear_selection();
        controller.close_context_menu();
    }

    pub fn on_drop(
        &self,
        payload: &DropPayload,
        client: ClientPoint,
        canvas: Option<CanvasBounds>,
    ) -> Option<NodeId> {
        let viewport = self.viewport();
        let added = {
            let mut store = self.inner.store.borrow_mut();
            self.inner.controller.borrow_mut().drop_item(
                &mut store,
                self.inner.notifier.as_ref(),
                payload,
                client,
                canvas,
                &viewport,
            )
        };
        if added.is_some() {
            self.after_mutation();
        }
        added
    }

    // ------------------------------------------------------------------
    // Context menu
    // ------------------------------------------------------------------

    pub fn open_context_menu(&self, client: ClientPoint, canvas: CanvasBounds) -> bool {
        let viewport = self.viewport();
        self.inner
            .controller
            .borrow_mut()
            .open_context_menu(client, canvas, &viewport)
    }

    pub fn close_context_menu(&self) {
        self.inner.controller.borrow_mut().close_context_menu();
    }

    /// Run a menu entry. "Export as PDF" runs the export before returning.
    pub async fn choose(&self, item: MenuItem) -> MenuOutcome {
        let outcome = {
            let mut store = self.inner.store.borrow_mut();
            self.inner.controller.borrow_mut().choose(&mut store, item)
        };
        match &outcome {
            MenuOutcome::NodeAdded(_) | MenuOutcome::Cleared => self.after_mutation(),
            MenuOutcome::ExportRequested => match self.export_pdf().await {
                Ok(outcome) => debug!(file_name = %outcome.file_name, "Menu export finished"),
                // Already reported through the notifier
                Err(e) => debug!(error = %e, "Menu export ended without a PDF"),
            },
            MenuOutcome::Ignored => {}
        }
        outcome
    }

    // ------------------------------------------------------------------
    // Edit dialog
    // ------------------------------------------------------------------

    /// Open the edit dialog for `id` without waiting for the click delay
    pub fn edit_node(&self, id: &NodeId) -> bool {
        let store = self.inner.store.borrow();
        self.inner.controller.borrow_mut().edit_node(&store, id)
    }

    #[must_use]
    pub fn edit_dialog(&self) -> Option<EditDialog> {
        self.inner.controller.borrow().edit_dialog().cloned()
    }

    /// Change the open draft. Returns `false` when no dialog is open.
    pub fn update_edit(&self, f: impl FnOnce(&mut EditDialog)) -> bool {
        self.inner
            .controller
            .borrow_mut()
            .edit_dialog_mut()
            .map(f)
            .is_some()
    }

    pub fn save_edit(&self) -> bool {
        let mutated = {
            let mut store = self.inner.store.borrow_mut();
            self.inner.controller.borrow_mut().save_edit(&mut store)
        };
        if mutated {
            self.after_mutation();
        }
        mutated
    }

    pub fn delete_selected(&self) -> bool {
        let mutated = {
            let mut store = self.inner.store.borrow_mut();
            self.inner.controller.borrow_mut().delete_selected(&mut store)
        };
        if mutated {
            self.after_mutation();
        }
        mutated
    }

    pub fn cancel_edit(&self) {
        self.inner.controller.borrow_mut().cancel_edit();
    }

    // ------------------------------------------------------------------
    // Save dialog
    // ------------------------------------------------------------------

    pub fn show_save_dialog(&self) {
        let store = self.inner.store.borrow();
        self.inner.controller.borrow_mut().open_save_dialog(&store);
    }

    #[must_use]
    pub fn save_dialog(&self) -> Option<SaveDialog> {
        self.inner.controller.borrow().save_dialog().cloned()
    }

    pub fn update_save_dialog(&self, f: impl FnOnce(&mut SaveDialog)) -> bool {
        self.inner
            .controller
            .borrow_mut()
            .save_dialog_mut()
            .map(f)
            .is_some()
    }

    /// Confirm the save prompt. Returns `true` when `on_save` was called.
    pub fn confirm_save(&self) -> bool {
        let Some(metadata) = self
            .inner
            .controller
            .borrow_mut()
            .submit_save_dialog(self.inner.notifier.as_ref())
        else {
            return false;
        };

        let now = self.inner.clock.now();
        let outgoing = {
            let mut store = self.inner.store.borrow_mut();
            self.inner.persistence.borrow_mut().save(&mut store, metadata, now)
        };
        self.sync_surface();
        self.inner.notifier.success("Diagram saved");
        outgoing.deliver();
        true
    }

    pub fn cancel_save_dialog(&self) {
        self.inner.controller.borrow_mut().cancel_save_dialog();
    }

    // ------------------------------------------------------------------
    // Whole-diagram actions
    // ------------------------------------------------------------------

    /// Back to the default two-node diagram, with no selection or dialogs
    pub fn reset_designer(&self) {
        info!("Resetting designer");
        self.inner.store.borrow_mut().reset();
        self.inner.controller.borrow_mut().reset();
        self.after_mutation();
    }

    /// Export the mounted surface to PDF.
    ///
    /// # Errors
    ///
    /// Returns the export failure after it has been notified.
    pub async fn export_pdf(&self) -> Result<ExportOutcome, ExportError> {
        let surface = self.surface();
        let document = self.snapshot();
        let delivery = Rc::clone(&self.inner.delivery);
        let notifier = Rc::clone(&self.inner.notifier);

        self.inner
            .export
            .run(
                ExportRequest {
                    surface: surface.as_deref(),
                    document: &document,
                    project_id: self.inner.project_id,
                    generated_at: Local::now(),
                },
                delivery.as_ref(),
                notifier.as_ref(),
            )
            .await
    }

    fn surface(&self) -> Option<Rc<dyn RenderSurface>> {
        self.inner.surface.borrow().clone()
    }

    fn sync_surface(&self) {
        if let Some(surface) = self.surface() {
            let store = self.inner.store.borrow();
            surface.sync(store.nodes(), store.edges());
        }
    }

    fn after_mutation(&self) {
        let now = self.inner.clock.now();
        let pending = {
            let store = self.inner.store.borrow();
            self.inner.persistence.borrow_mut().observe(&store, now)
        };
        debug!(pending, "Store mutated");
        self.sync_surface();
    }
}

//! Persistence adapter
//!
//! Keeps the owning page informed of the current diagram without flooding
//! it during rapid interaction. Store changes are fed to a [`Debouncer`];
//! `on_change` fires once per burst, after a quiet window, with the final
//! document. An explicit [`PersistenceAdapter::save`] bypasses the debounce
//! and reaches the owner through `on_save`.
//!
//! The debouncer itself is a pure state machine over caller-supplied time.
//! Hosts drive it from whatever timer they have: a browser timeout, or the
//! tokio task in [`runtime`].

use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, info};

use crate::models::{DiagramDocument, Metadata};
use crate::store::GraphStore;

/// The owner's callbacks
pub trait ChangeSink {
    /// A debounced burst of changes settled on `document`
    fn on_change(&self, document: &DiagramDocument);

    /// The user explicitly saved under `name`
    fn on_save(&self, name: &str, description: &str);
}

type ChangeFn = Box<dyn Fn(&DiagramDocument)>;
type SaveFn = Box<dyn Fn(&str, &str)>;

/// [`ChangeSink`] from a pair of closures
pub struct CallbackSink {
    on_change: ChangeFn,
    on_save: SaveFn,
}

impl CallbackSink {
    pub fn new(
        on_change: impl Fn(&DiagramDocument) + 'static,
        on_save: impl Fn(&str, &str) + 'static,
    ) -> Self {
        Self {
            on_change: Box::new(on_change),
            on_save: Box::new(on_save),
        }
    }
}

impl std::fmt::Debug for CallbackSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackSink").finish_non_exhaustive()
    }
}

impl ChangeSink for CallbackSink {
    fn on_change(&self, document: &DiagramDocument) {
        (self.on_change)(document);
    }

    fn on_save(&self, name: &str, description: &str) {
        (self.on_save)(name, description);
    }
}

/// Sink that ignores everything, for owners without callbacks
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ChangeSink for NullSink {
    fn on_change(&self, _document: &DiagramDocument) {}

    fn on_save(&self, _name: &str, _description: &str) {}
}

#[derive(Debug, Clone, PartialEq)]
struct Pending {
    due: Duration,
    document: DiagramDocument,
}

/// Trailing-edge debounce of diagram documents.
///
/// Every observed document restarts the quiet window. A document with no
/// nodes and no edges cancels whatever is pending and schedules nothing.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    pending: Option<Pending>,
}

impl Debouncer {
    #[must_use]
    pub const fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }

    /// Record a new state at `now`. Returns `true` if a notification is now scheduled.
    pub fn observe(&mut self, now: Duration, document: DiagramDocument) -> bool {
        if document.is_empty() {
            self.pending = None;
            return false;
        }
        self.pending = Some(Pending {
            due: now.saturating_add(self.window),
            document,
        });
        true
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Duration> {
        self.pending.as_ref().map(|p| p.due)
    }

    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Take the settled document once the quiet window has elapsed
    pub fn poll(&mut self, now: Duration) -> Option<DiagramDocument> {
        match &self.pending {
            Some(pending) if now >= pending.due => self.pending.take().map(|p| p.document),
            _ => None,
        }
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

enum Call {
    Change(DiagramDocument),
    Save(Metadata),
}

/// An owner callback ready to run.
///
/// The adapter hands these out instead of calling the sink itself, so the
/// caller can release its borrows first and the owner may call straight
/// back into the designer.
#[must_use = "the owner is only notified by `deliver`"]
pub struct Outgoing {
    sink: Rc<dyn ChangeSink>,
    call: Call,
}

impl std::fmt::Debug for Outgoing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.call {
            Call::Change(_) => "change",
            Call::Save(_) => "save",
        };
        f.debug_struct("Outgoing").field("call", &kind).finish_non_exhaustive()
    }
}

impl Outgoing {
    pub fn deliver(self) {
        match self.call {
            Call::Change(document) => self.sink.on_change(&document),
            Call::Save(metadata) => self.sink.on_save(&metadata.name, &metadata.description),
        }
    }
}

/// Bridges the store to the owner's callbacks
pub struct PersistenceAdapter {
    debouncer: Debouncer,
    sink: Rc<dyn ChangeSink>,
    last_revision: Option<u64>,
}

impl std::fmt::Debug for PersistenceAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceAdapter")
            .field("debouncer", &self.debouncer)
            .field("last_revision", &self.last_revision)
            .finish_non_exhaustive()
    }
}

impl PersistenceAdapter {
    pub fn new(window: Duration, sink: Rc<dyn ChangeSink>) -> Self {
        Self {
            debouncer: Debouncer::new(window),
            sink,
            last_revision: None,
        }
    }

    /// Look at the store; schedule a notification if it changed since last time.
    ///
    /// Returns `true` when a notification is pending afterwards.
    pub fn observe(&mut self, store: &GraphStore, now: Duration) -> bool {
        if self.last_revision == Some(store.revision()) {
            return self.debouncer.is_pending();
        }
        self.last_revision = Some(store.revision());
        self.debouncer.observe(now, store.snapshot())
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Duration> {
        self.debouncer.deadline()
    }

    /// The `on_change` call for the pending document, once its window has elapsed
    pub fn flush_due(&mut self, now: Duration) -> Option<Outgoing> {
        let document = self.debouncer.poll(now)?;
        debug!(
            nodes = document.nodes.len(),
            edges = document.edges.len(),
            "Reporting diagram change"
        );
        Some(self.outgoing(Call::Change(document)))
    }

    /// Explicit save: write metadata into the store and return the `on_save` call.
    ///
    /// The metadata change also flows through the regular debounced path.
    pub fn save(&mut self, store: &mut GraphStore, metadata: Metadata, now: Duration) -> Outgoing {
        info!(name = %metadata.name, "Saving diagram");
        store.set_metadata(metadata.clone());
        self.observe(store, now);
        self.outgoing(Call::Save(metadata))
    }

    fn outgoing(&self, call: Call) -> Outgoing {
        Outgoing {
            sink: Rc::clone(&self.sink),
            call,
        }
    }
}

/// Tokio-driven debounce for native owners
#[cfg(feature = "runtime")]
pub mod runtime {
    use std::time::Duration;

    use tokio::sync::mpsc;
    use tokio::task::JoinHandle;
    use tokio::time::Instant;
    use tracing::debug;

    use super::Debouncer;
    use crate::models::DiagramDocument;

    /// Feeds documents to a running debounce task
    #[derive(Debug, Clone)]
    pub struct DebounceSender {
        tx: mpsc::UnboundedSender<DiagramDocument>,
    }

    impl DebounceSender {
        /// Queue a new state. Returns `false` once the task has stopped.
        pub fn send(&self, document: DiagramDocument) -> bool {
            self.tx.send(document).is_ok()
        }
    }

    /// Spawn a task that calls `on_change` once per quiet period.
    ///
    /// The task ends when every sender is dropped, flushing nothing further.
    pub fn spawn_debounced<F>(window: Duration, mut on_change: F) -> (DebounceSender, JoinHandle<()>)
    where
        F: FnMut(DiagramDocument) + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<DiagramDocument>();

        let handle = tokio::spawn(async move {
            let epoch = Instant::now();
            let mut debouncer = Debouncer::new(window);

            loop {
                let deadline = debouncer.deadline();
                tokio::select! {
                    received = rx.recv() => {
                        let Some(document) = received else {
                            debug!("Debounce task stopping");
                            break;
                        };
                        debouncer.observe(epoch.elapsed(), document);
                    }
                    () = sleep_until_deadline(epoch, deadline) => {
                        if let Some(document) = debouncer.poll(epoch.elapsed()) {
                            on_change(document);
                        }
                    }
                }
            }
        });

        (DebounceSender { tx }, handle)
    }

    async fn sleep_until_deadline(epoch: Instant, deadline: Option<Duration>) {
        match deadline {
            Some(due) => tokio::time::sleep_until(epoch + due).await,
            None => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]
    #![allow(clippy::indexing_slicing)]

    use std::cell::RefCell;

    use super::*;
    use crate::models::{NodeKind, Position};

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[derive(Default)]
    struct Recorder {
        changes: RefCell<Vec<DiagramDocument>>,
        saves: RefCell<Vec<(String, String)>>,
    }

    impl ChangeSink for Recorder {
        fn on_change(&self, document: &DiagramDocument) {
            self.changes.borrow_mut().push(document.clone());
        }

        fn on_save(&self, name: &str, description: &str) {
            self.saves
                .borrow_mut()
                .push((name.to_string(), description.to_string()));
        }
    }

    #[test]
    fn test_debouncer_restarts_window() {
        let mut debouncer = Debouncer::new(ms(100));
        let doc = crate::store::default_document();

        debouncer.observe(ms(0), doc.clone());
        debouncer.observe(ms(80), doc.clone());
        assert_eq!(debouncer.poll(ms(150)), None);
        assert_eq!(debouncer.poll(ms(180)), Some(doc));
        assert_eq!(debouncer.poll(ms(500)), None);
    }

    #[test]
    fn test_empty_document_cancels_pending() {
        let mut debouncer = Debouncer::new(ms(100));
        debouncer.observe(ms(0), crate::store::default_document());
        assert!(!debouncer.observe(ms(10), DiagramDocument::default()));
        assert_eq!(debouncer.poll(ms(1000)), None);
    }

    #[test]
    fn test_burst_yields_one_change_with_final_state() {
        let recorder = Rc::new(Recorder::default());
        let mut adapter = PersistenceAdapter::new(ms(100), recorder.clone());
        let mut store = GraphStore::with_default_diagram();

        for i in 0..10u32 {
            store.add_node(NodeKind::Step, format!("Step {i}"), Position::origin());
            adapter.observe(&store, ms(u64::from(i) * 10));
            assert!(adapter.flush_due(ms(u64::from(i) * 10 + 5)).is_none());
        }

        adapter.flush_due(ms(190)).unwrap().deliver();
        let changes = recorder.changes.borrow();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].nodes.len(), 12);
    }

    #[test]
    fn test_unchanged_store_does_not_reschedule() {
        let recorder = Rc::new(Recorder::default());
        let mut adapter = PersistenceAdapter::new(ms(100), recorder.clone());
        let store = GraphStore::with_default_diagram();

        adapter.observe(&store, ms(0));
        adapter.flush_due(ms(100)).unwrap().deliver();
        assert!(!adapter.observe(&store, ms(200)));
        assert!(adapter.flush_due(ms(400)).is_none());
        assert_eq!(recorder.changes.borrow().len(), 1);
    }

    #[test]
    fn test_save_calls_on_save_immediately() {
        let recorder = Rc::new(Recorder::default());
        let mut adapter = PersistenceAdapter::new(ms(100), recorder.clone());
        let mut store = GraphStore::with_default_diagram();

        let outgoing = adapter.save(&mut store, Metadata::new("Checkout", "Happy path"), ms(0));
        assert!(recorder.saves.borrow().is_empty());
        outgoing.deliver();

        assert_eq!(
            recorder.saves.borrow().as_slice(),
            &[("Checkout".to_string(), "Happy path".to_string())]
        );
        assert_eq!(store.metadata().name, "Checkout");
        assert!(recorder.changes.borrow().is_empty());
        adapter.flush_due(ms(100)).unwrap().deliver();
        assert_eq!(recorder.changes.borrow()[0].metadata.name, "Checkout");
    }

    #[test]
    fn test_callback_sink_forwards() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_change = Rc::clone(&seen);
        let seen_save = Rc::clone(&seen);
        let sink = CallbackSink::new(
            move |doc| seen_change.borrow_mut().push(format!("change:{}", doc.nodes.len())),
            move |name, _| seen_save.borrow_mut().push(format!("save:{name}")),
        );

        sink.on_change(&crate::store::default_document());
        sink.on_save("Flow", "");
        assert_eq!(*seen.borrow(), vec!["change:2", "save:Flow"]);
    }
}

//! Graph state store
//!
//! The single source of truth for nodes, edges, and diagram metadata. Every
//! operation is total: stale or unknown ids are tolerated as no-ops, since a
//! UI routinely races a double-click against a delete.
//!
//! Each effective mutation bumps [`GraphStore::revision`]; observers compare
//! revisions to decide whether anything changed.

use tracing::debug;

use crate::ids::IdGenerator;
use crate::models::{DiagramDocument, Edge, EdgeId, Metadata, Node, NodeId, NodeKind, NodePatch, Position};

/// Id of the Start node created by the default bootstrap
pub const DEFAULT_START_ID: &str = "start";
/// Id of the End node created by the default bootstrap
pub const DEFAULT_END_ID: &str = "end";
/// Id of the edge joining the default Start and End nodes
pub const DEFAULT_EDGE_ID: &str = "e-start-end";

const DEFAULT_START_POSITION: Position = Position { x: 250.0, y: 50.0 };
const DEFAULT_END_POSITION: Position = Position { x: 250.0, y: 250.0 };

/// In-memory nodes, edges, and metadata of one diagram
#[derive(Debug, Default)]
pub struct GraphStore {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    metadata: Metadata,
    revision: u64,
    ids: IdGenerator,
}

/// The two-node, one-edge diagram every new designer starts from
#[must_use]
pub fn default_document() -> DiagramDocument {
    let start = NodeId::from_generated(DEFAULT_START_ID.to_string());
    let end = NodeId::from_generated(DEFAULT_END_ID.to_string());

    DiagramDocument {
        nodes: vec![
            Node::new(start.clone(), NodeKind::Start, "Start", DEFAULT_START_POSITION),
            Node::new(end.clone(), NodeKind::End, "End", DEFAULT_END_POSITION),
        ],
        edges: vec![Edge::new(
            EdgeId::from_generated(DEFAULT_EDGE_ID.to_string()),
            start,
            end,
        )],
        metadata: Metadata::default(),
    }
}

impl GraphStore {
    /// An empty store (no nodes, no edges)
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding the default bootstrap diagram
    #[must_use]
    pub fn with_default_diagram() -> Self {
        let mut store = Self::new();
        store.replace(default_document());
        store
    }

    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    #[must_use]
    pub const fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Monotonic counter bumped by every effective mutation
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|node| &node.id == id)
    }

    #[must_use]
    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.node(id).is_some()
    }

    /// The current state as a document
    #[must_use]
    pub fn snapshot(&self) -> DiagramDocument {
        DiagramDocument {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
            metadata: self.metadata.clone(),
        }
    }

    /// True when `document` equals the current state field by field
    #[must_use]
    pub fn matches(&self, document: &DiagramDocument) -> bool {
        self.nodes == document.nodes
            && self.edges == document.edges
            && self.metadata == document.metadata
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    fn replace(&mut self, document: DiagramDocument) {
        self.nodes = document.nodes;
        self.edges = document.edges;
        self.metadata = document.metadata;
        self.touch();
    }

    /// Load a document supplied by the owner, or bootstrap when there is none.
    ///
    /// A document equal to the current state is ignored so repeated pushes of
    /// the same value cause no state transition. With `None`, an empty store
    /// receives the default diagram and a populated store is left alone.
    ///
    /// Returns `true` when the state changed.
    pub fn initialize(&mut self, document: Option<DiagramDocument>) -> bool {
        match document {
            Some(document) if self.matches(&document) => {
                debug!("Incoming document equals current state, skipping load");
                false
            }
            Some(document) => {
                debug!(
                    nodes = document.nodes.len(),
                    edges = document.edges.len(),
                    "Loading diagram document"
                );
                self.replace(document);
                true
            }
            None if self.is_empty() => {
                debug!("No document supplied, bootstrapping default diagram");
                self.replace(default_document());
                true
            }
            None => false,
        }
    }

    /// Append an already-built node unless its id is taken.
    ///
    /// Returns `true` when the node was added.
    pub fn insert_node(&mut self, node: Node) -> bool {
        if self.contains_node(&node.id) {
            debug!(node_id = %node.id, "Node id already present, ignoring insert");
            return false;
        }
        debug!(node_id = %node.id, kind = %node.kind, "Adding node");
        self.nodes.push(node);
        self.touch();
        true
    }

    /// Create a node with a freshly generated id.
    ///
    /// Returns the new id, or `None` in the (unexpected) event of a collision.
    pub fn add_node(
        &mut self,
        kind: NodeKind,
        label: impl Into<String>,
        position: Position,
    ) -> Option<NodeId> {
        let id = self.ids.node_id(kind);
        let node = Node::new(id.clone(), kind, label, position);
        self.insert_node(node).then_some(id)
    }

    /// Replace the node with a copy that has `patch` merged in.
    ///
    /// Returns `true` when a node was found and actually changed.
    pub fn update_node(&mut self, id: &NodeId, patch: &NodePatch) -> bool {
        let Some(slot) = self.nodes.iter_mut().find(|node| &node.id == id) else {
            debug!(node_id = %id, "Update for unknown node ignored");
            return false;
        };

        let next = slot.patched(patch);
        if next == *slot {
            return false;
        }
        *slot = next;
        self.touch();
        true
    }

    /// Remove a node and every edge that starts or ends at it.
    ///
    /// Returns `true` when the node existed.
    pub fn delete_node(&mut self, id: &NodeId) -> bool {
        let before = self.nodes.len();
        self.nodes.retain(|node| &node.id != id);
        if self.nodes.len() == before {
            debug!(node_id = %id, "Delete for unknown node ignored");
            return false;
        }

        let cascaded = self.remove_edges_where(|edge| edge.touches(id));
        debug!(node_id = %id, cascaded, "Deleted node");
        self.touch();
        true
    }

    /// Connect `source` to `target` with a default-styled edge.
    ///
    /// Ignored when an edge with the same direction already exists or when
    /// either endpoint is not in the store. Returns the new edge id.
    pub fn add_edge(&mut self, source: &NodeId, target: &NodeId) -> Option<EdgeId> {
        if self.edges.iter().any(|edge| edge.connects(source, target)) {
            debug!(%source, %target, "Duplicate connection ignored");
            return None;
        }
        if !self.contains_node(source) || !self.contains_node(target) {
            debug!(%source, %target, "Connection to unknown node ignored");
            return None;
        }

        let id = self.ids.edge_id();
        debug!(edge_id = %id, %source, %target, "Adding edge");
        self.edges
            .push(Edge::new(id.clone(), source.clone(), target.clone()));
        self.touch();
        Some(id)
    }

    fn remove_edges_where(&mut self, predicate: impl Fn(&Edge) -> bool) -> usize {
        let before = self.edges.len();
        self.edges.retain(|edge| !predicate(edge));
        before - self.edges.len()
    }

    /// Remove every edge matching `predicate`, returning how many went
    pub fn delete_edges(&mut self, predicate: impl Fn(&Edge) -> bool) -> usize {
        let removed = self.remove_edges_where(predicate);
        if removed > 0 {
            debug!(removed, "Deleted edges");
            self.touch();
        }
        removed
    }

    /// Remove one edge by id
    pub fn delete_edge(&mut self, id: &EdgeId) -> bool {
        self.delete_edges(|edge| &edge.id == id) > 0
    }

    /// Replace diagram name and description
    pub fn set_metadata(&mut self, metadata: Metadata) -> bool {
        if self.metadata == metadata {
            return false;
        }
        self.metadata = metadata;
        self.touch();
        true
    }

    /// Restore the default diagram and clear metadata
    pub fn reset(&mut self) {
        debug!("Resetting to default diagram");
        self.replace(default_document());
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]
    #![allow(clippy::indexing_slicing)]

    use super::*;

    fn id(s: &str) -> NodeId {
        NodeId::new(s).unwrap()
    }

    fn pos(x: f64, y: f64) -> Position {
        Position::new(x, y).unwrap()
    }

    #[test]
    fn test_bootstrap_on_empty_store() {
        let mut store = GraphStore::new();
        assert!(store.initialize(None));

        assert_eq!(store.nodes().len(), 2);
        assert_eq!(store.edges().len(), 1);
        assert_eq!(store.nodes()[0].kind, NodeKind::Start);
        assert_eq!(store.nodes()[1].kind, NodeKind::End);
        assert!(store.nodes()[1].position.y > store.nodes()[0].position.y);
        assert!(store.edges()[0].connects(&id(DEFAULT_START_ID), &id(DEFAULT_END_ID)));
    }

    #[test]
    fn test_initialize_none_keeps_populated_store() {
        let mut store = GraphStore::with_default_diagram();
        store.add_node(NodeKind::Step, "Step", pos(0.0, 0.0));
        let revision = store.revision();

        assert!(!store.initialize(None));
        assert_eq!(store.nodes().len(), 3);
        assert_eq!(store.revision(), revision);
    }

    #[test]
    fn test_initialize_same_document_is_idempotent() {
        let mut store = GraphStore::new();
        let mut doc = default_document();
        doc.metadata = Metadata::new("Login", "Happy path");

        assert!(store.initialize(Some(doc.clone())));
        let revision = store.revision();
        assert!(!store.initialize(Some(doc)));
        assert_eq!(store.revision(), revision);
    }

    #[test]
    fn test_initialize_replaces_different_document() {
        let mut store = GraphStore::with_default_diagram();
        let doc = DiagramDocument {
            nodes: vec![Node::new(id("only"), NodeKind::Step, "Only", pos(1.0, 2.0))],
            edges: Vec::new(),
            metadata: Metadata::new("Other", ""),
        };

        assert!(store.initialize(Some(doc.clone())));
        assert_eq!(store.snapshot(), doc);
    }

    #[test]
    fn test_add_node_generates_prefixed_id() {
        let mut store = GraphStore::new();
        let new_id = store.add_node(NodeKind::Decision, "Valid?", pos(10.0, 20.0)).unwrap();

        assert!(new_id.as_str().starts_with("decisionNode_"));
        let node = store.node(&new_id).unwrap();
        assert_eq!(node.data.label, "Valid?");
        assert_eq!(node.position, pos(10.0, 20.0));
    }

    #[test]
    fn test_insert_node_with_taken_id_is_noop() {
        let mut store = GraphStore::with_default_diagram();
        let clash = Node::new(id(DEFAULT_START_ID), NodeKind::Step, "Clash", pos(0.0, 0.0));

        assert!(!store.insert_node(clash));
        assert_eq!(store.nodes().len(), 2);
        assert_eq!(store.node(&id(DEFAULT_START_ID)).unwrap().kind, NodeKind::Start);
    }

    #[test]
    fn test_update_node_merges_patch() {
        let mut store = GraphStore::with_default_diagram();
        assert!(store.update_node(&id(DEFAULT_END_ID), &NodePatch::label("Done")));

        let node = store.node(&id(DEFAULT_END_ID)).unwrap();
        assert_eq!(node.data.label, "Done");
        assert_eq!(node.kind, NodeKind::End);
    }

    #[test]
    fn test_update_unknown_node_is_noop() {
        let mut store = GraphStore::with_default_diagram();
        let before = store.snapshot();
        assert!(!store.update_node(&id("ghost"), &NodePatch::label("x")));
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn test_update_without_change_keeps_revision() {
        let mut store = GraphStore::with_default_diagram();
        let revision = store.revision();
        assert!(!store.update_node(&id(DEFAULT_START_ID), &NodePatch::label("Start")));
        assert_eq!(store.revision(), revision);
    }

    #[test]
    fn test_delete_node_cascades_edges() {
        let mut store = GraphStore::new();
        for name in ["a", "b", "c"] {
            store.insert_node(Node::new(id(name), NodeKind::Step, name, pos(0.0, 0.0)));
        }
        store.add_edge(&id("a"), &id("b")).unwrap();
        store.add_edge(&id("b"), &id("c")).unwrap();

        assert!(store.delete_node(&id("b")));

        let remaining: Vec<_> = store.nodes().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(remaining, vec!["a", "c"]);
        assert!(store.edges().is_empty());
    }

    #[test]
    fn test_delete_unknown_node_is_noop() {
        let mut store = GraphStore::with_default_diagram();
        let revision = store.revision();
        assert!(!store.delete_node(&id("ghost")));
        assert_eq!(store.revision(), revision);
    }

    #[test]
    fn test_duplicate_edge_rejected() {
        let mut store = GraphStore::with_default_diagram();
        let (a, b) = (id(DEFAULT_START_ID), id(DEFAULT_END_ID));

        assert!(store.add_edge(&a, &b).is_none());
        assert_eq!(store.edges().len(), 1);
    }

    #[test]
    fn test_reverse_edge_is_distinct() {
        let mut store = GraphStore::with_default_diagram();
        let (a, b) = (id(DEFAULT_START_ID), id(DEFAULT_END_ID));

        assert!(store.add_edge(&b, &a).is_some());
        assert_eq!(store.edges().len(), 2);
    }

    #[test]
    fn test_edge_to_unknown_node_ignored() {
        let mut store = GraphStore::with_default_diagram();
        assert!(store.add_edge(&id(DEFAULT_START_ID), &id("ghost")).is_none());
        assert_eq!(store.edges().len(), 1);
    }

    #[test]
    fn test_delete_edges_by_predicate() {
        let mut store = GraphStore::with_default_diagram();
        let start = id(DEFAULT_START_ID);
        assert_eq!(store.delete_edges(|edge| edge.source == start), 1);
        assert_eq!(store.delete_edges(|_| true), 0);
        assert!(store.edges().is_empty());
    }

    #[test]
    fn test_reset_restores_default_and_clears_metadata() {
        let mut store = GraphStore::with_default_diagram();
        let a = store.add_node(NodeKind::Step, "A", pos(1.0, 1.0)).unwrap();
        let b = store.add_node(NodeKind::Step, "B", pos(2.0, 2.0)).unwrap();
        store.add_edge(&a, &b).unwrap();
        store.set_metadata(Metadata::new("Named", "Described"));

        store.reset();

        assert_eq!(store.snapshot(), default_document());
        assert!(store.metadata().is_blank());
    }
}

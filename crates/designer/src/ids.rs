//! Identifier generation for new nodes and edges.
//!
//! Ids are `<prefix>_<ulid>`: a millisecond timestamp followed by random bits.
//! The monotonic generator guarantees distinct ids even when many are minted
//! within the same millisecond.

use ulid::{Generator, Ulid};

use crate::models::{EdgeId, NodeId, NodeKind};

/// Mints unique node and edge ids
pub struct IdGenerator {
    generator: Generator,
}

impl std::fmt::Debug for IdGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdGenerator").finish_non_exhaustive()
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            generator: Generator::new(),
        }
    }

    fn next_ulid(&mut self) -> Ulid {
        // The monotonic generator only fails when the random part overflows
        // within one millisecond; a fresh ulid is still unique in practice.
        self.generator.generate().unwrap_or_else(|_| Ulid::new())
    }

    /// A new id for a node of the given kind, e.g. `stepNode_01J9...`
    pub fn node_id(&mut self, kind: NodeKind) -> NodeId {
        NodeId::from_generated(format!("{}_{}", kind.tag(), self.next_ulid()))
    }

    /// A new edge id, e.g. `edge_01J9...`
    pub fn edge_id(&mut self) -> EdgeId {
        EdgeId::from_generated(format!("edge_{}", self.next_ulid()))
    }
}

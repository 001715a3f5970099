//! Drag state shared between the interaction controller and the renderer.
//!
//! While a node is dragged, position updates bypass the store and move the
//! rendered element directly. The flag tells every participant which path
//! is active; it is set before the first fast-path write and cleared before
//! the committing store update.

use std::cell::Cell;
use std::rc::Rc;

use crate::models::{EdgeId, NodeId, Position};

/// Shared "a node is being dragged" signal.
///
/// Clones observe the same flag; separate `DragFlag::new()` calls are
/// independent, so each designer instance owns its own.
#[derive(Debug, Clone, Default)]
pub struct DragFlag(Rc<Cell<bool>>);

impl DragFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.0.get()
    }

    pub fn set(&self, dragging: bool) {
        self.0.set(dragging);
    }
}

/// Node change events emitted by the canvas
#[derive(Debug, Clone, PartialEq)]
pub enum NodeChange {
    /// Pointer moved a node. `position` may be absent on the terminal event.
    Position {
        id: NodeId,
        position: Option<Position>,
        dragging: bool,
    },
    Remove {
        id: NodeId,
    },
    Select {
        id: NodeId,
        selected: bool,
    },
    /// The renderer measured a node; carries no graph data
    Dimensions {
        id: NodeId,
        width: f64,
        height: f64,
    },
}

impl NodeChange {
    #[must_use]
    pub const fn id(&self) -> &NodeId {
        match self {
            Self::Position { id, .. }
            | Self::Remove { id }
            | Self::Select { id, .. }
            | Self::Dimensions { id, .. } => id,
        }
    }
}

/// Edge change events emitted by the canvas
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeChange {
    Remove { id: EdgeId },
    Select { id: EdgeId, selected: bool },
}

//! Edit and save dialogs
//!
//! The edit dialog works on a private copy of the selected node. Nothing
//! reaches the store until Save, which sends only the fields that differ.

use thiserror::Error;

use crate::models::{LinkedItemType, Metadata, Node, NodeId, NodeKind, NodePatch, NodeStyle};

/// Edit dialog state for one node
#[derive(Debug, Clone, PartialEq)]
pub struct EditDialog {
    original: Node,
    draft: Node,
}

impl EditDialog {
    #[must_use]
    pub fn open(node: &Node) -> Self {
        Self {
            original: node.clone(),
            draft: node.clone(),
        }
    }

    #[must_use]
    pub const fn node_id(&self) -> &NodeId {
        &self.original.id
    }

    /// The node as edited so far
    #[must_use]
    pub const fn draft(&self) -> &Node {
        &self.draft
    }

    pub fn set_kind(&mut self, kind: NodeKind) {
        self.draft.kind = kind;
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.draft.data.label = label.into();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.draft.data.description = description.into();
    }

    pub fn set_condition(&mut self, condition: Option<String>) {
        self.draft.data.condition = condition;
    }

    /// Point a Linked node at a test case, requirement, or bug
    pub fn set_link(&mut self, item_type: Option<LinkedItemType>, item_id: Option<String>) {
        self.draft.data.linked_item_type = item_type;
        self.draft.data.linked_item_id = item_id;
    }

    pub fn set_endpoint(&mut self, endpoint: Option<String>, method: Option<String>) {
        self.draft.data.endpoint = endpoint;
        self.draft.data.method = method;
    }

    pub fn set_system(&mut self, system: Option<String>) {
        self.draft.data.system = system;
    }

    pub fn set_style(&mut self, style: Option<NodeStyle>) {
        self.draft.style = style;
    }

    /// Fields changed since the dialog opened
    #[must_use]
    pub fn patch(&self) -> NodePatch {
        NodePatch::diff(&self.original, &self.draft)
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.original != self.draft
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SaveDialogError {
    #[error("Please enter a name for the diagram")]
    EmptyName,
}

/// Name/description prompt for an explicit save
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveDialog {
    pub name: String,
    pub description: String,
}

impl SaveDialog {
    /// Prompt pre-filled from the current metadata
    #[must_use]
    pub fn open(metadata: &Metadata) -> Self {
        Self {
            name: metadata.name.clone(),
            description: metadata.description.clone(),
        }
    }

    /// The metadata to save, with surrounding whitespace trimmed.
    ///
    /// # Errors
    ///
    /// Returns `SaveDialogError::EmptyName` when the name is blank.
    pub fn submit(&self) -> Result<Metadata, SaveDialogError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(SaveDialogError::EmptyName);
        }
        Ok(Metadata::new(name, self.description.trim()))
    }
}

//! Canvas context menu

use crate::models::{NodeId, Position};
use crate::viewport::ClientPoint;

/// Entries offered on right-click
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MenuItem {
    AddStep,
    AddDecision,
    ClearCanvas,
    ExportPdf,
}

impl MenuItem {
    /// Entries in display order
    pub const ALL: [Self; 4] = [Self::AddStep, Self::AddDecision, Self::ClearCanvas, Self::ExportPdf];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::AddStep => "Add Step",
            Self::AddDecision => "Add Decision",
            Self::ClearCanvas => "Clear Canvas",
            Self::ExportPdf => "Export as PDF",
        }
    }
}

/// An open context menu
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContextMenu {
    /// Where the menu is drawn, in client pixels
    pub client: ClientPoint,
    /// Where nodes added from the menu are placed, in diagram space
    pub position: Position,
}

/// What choosing a menu entry did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuOutcome {
    NodeAdded(NodeId),
    Cleared,
    /// The caller should run the export pipeline
    ExportRequested,
    /// No menu was open, or the node could not be created
    Ignored,
}

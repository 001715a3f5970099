//! Data models for the flow diagram: nodes, edges, and the persisted document

pub mod colors;
pub mod document;
pub mod edge;
pub mod node;

pub use colors::RgbColor;
pub use document::{DiagramDocument, Metadata};
pub use edge::{Edge, EdgeId, EdgeType, MarkerEnd, MarkerType};
pub use node::{LinkedItemType, Node, NodeData, NodeId, NodeKind, NodePatch, NodeStyle, Position};

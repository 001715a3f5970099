//! Node data structures for the flow diagram

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::colors::RgbColor;

/// Type-safe wrapper for node identifiers
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Creates a new `NodeId` with validation
    ///
    /// # Errors
    ///
    /// Returns an error if the identifier is empty.
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.is_empty() {
            return Err("Node ID cannot be empty".to_string());
        }
        Ok(Self(id))
    }

    /// Wraps an id minted by the id generator (never empty)
    pub(crate) const fn from_generated(id: String) -> Self {
        Self(id)
    }

    /// Returns the ID as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Position in diagram space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    /// Creates a new Position with validation
    ///
    /// # Errors
    ///
    /// Returns an error if either coordinate is NaN or infinite.
    pub fn new(x: f64, y: f64) -> Result<Self, String> {
        if !x.is_finite() {
            return Err(format!("X coordinate must be finite, got: {x}"));
        }
        if !y.is_finite() {
            return Err(format!("Y coordinate must be finite, got: {y}"));
        }
        Ok(Self { x, y })
    }

    /// Creates a position at the origin
    #[must_use]
    pub const fn origin() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    /// Returns this position shifted by the given delta
    #[must_use]
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::origin()
    }
}

/// The closed set of node variants the designer can place on the canvas.
///
/// Serialized with the tag names the diagram document uses (`stepNode`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    #[serde(rename = "startNode")]
    Start,
    #[serde(rename = "endNode")]
    End,
    #[serde(rename = "stepNode")]
    Step,
    #[serde(rename = "decisionNode")]
    Decision,
    #[serde(rename = "subprocessNode")]
    Subprocess,
    #[serde(rename = "linkedNode")]
    Linked,
    #[serde(rename = "apiCallNode")]
    ApiCall,
    #[serde(rename = "externalSystemNode")]
    ExternalSystem,
}

impl NodeKind {
    /// Every variant, in palette order
    pub const ALL: [Self; 8] = [
        Self::Start,
        Self::End,
        Self::Step,
        Self::Decision,
        Self::Subprocess,
        Self::Linked,
        Self::ApiCall,
        Self::ExternalSystem,
    ];

    /// The document tag for this kind (`stepNode`, `decisionNode`, ...)
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Start => "startNode",
            Self::End => "endNode",
            Self::Step => "stepNode",
            Self::Decision => "decisionNode",
            Self::Subprocess => "subprocessNode",
            Self::Linked => "linkedNode",
            Self::ApiCall => "apiCallNode",
            Self::ExternalSystem => "externalSystemNode",
        }
    }

    /// Parses a document tag back into a kind
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Entity types a Linked node may reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LinkedItemType {
    TestCase,
    Requirement,
    Bug,
}

/// Free-form node attributes.
///
/// Known fields are typed; anything else the document carries is kept in
/// `extra` so a load/save round trip never drops data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeData {
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_item_type: Option<LinkedItemType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_item_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NodeData {
    /// Data carrying only a label
    #[must_use]
    pub fn labeled(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }
}

/// Optional visual overrides
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_width: Option<f64>,
}

impl NodeStyle {
    /// Parsed background override, ignoring values that are not `#RRGGBB`
    #[must_use]
    pub fn background_color(&self) -> Option<RgbColor> {
        self.background.as_deref().and_then(RgbColor::parse_hex)
    }

    /// Parsed border color override, ignoring values that are not `#RRGGBB`
    #[must_use]
    pub fn border_rgb(&self) -> Option<RgbColor> {
        self.border_color.as_deref().and_then(RgbColor::parse_hex)
    }
}

/// A typed, positioned vertex in the flow graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub data: NodeData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<NodeStyle>,
}

impl Node {
    /// Creates a node with a label and no style overrides
    #[must_use]
    pub fn new(id: NodeId, kind: NodeKind, label: impl Into<String>, position: Position) -> Self {
        Self {
            id,
            kind,
            position,
            data: NodeData::labeled(label),
            style: None,
        }
    }

    /// Returns a copy of this node with the patch applied
    #[must_use]
    pub fn patched(&self, patch: &NodePatch) -> Self {
        let mut next = self.clone();
        patch.apply_to(&mut next);
        next
    }
}

/// A partial node update.
///
/// `None` leaves a field untouched; `Some` replaces it. Nested options
/// (`Some(None)`) clear optional fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodePatch {
    pub kind: Option<NodeKind>,
    pub position: Option<Position>,
    pub label: Option<String>,
    pub description: Option<String>,
    pub condition: Option<Option<String>>,
    pub linked_item_type: Option<Option<LinkedItemType>>,
    pub linked_item_id: Option<Option<String>>,
    pub endpoint: Option<Option<String>>,
    pub method: Option<Option<String>>,
    pub system: Option<Option<String>>,
    pub style: Option<Option<NodeStyle>>,
}

impl NodePatch {
    /// A patch that only moves the node
    #[must_use]
    pub fn position(position: Position) -> Self {
        Self {
            position: Some(position),
            ..Self::default()
        }
    }

    /// A patch that only relabels the node
    #[must_use]
    pub fn label(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }

    /// True when applying this patch changes nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// The patch that turns `before` into `after`, field by field
    #[must_use]
    pub fn diff(before: &Node, after: &Node) -> Self {
        fn changed<T: Clone + PartialEq>(a: &T, b: &T) -> Option<T> {
            (a != b).then(|| b.clone())
        }

        Self {
            kind: changed(&before.kind, &after.kind),
            position: changed(&before.position, &after.position),
            label: changed(&before.data.label, &after.data.label),
            description: changed(&before.data.description, &after.data.description),
            condition: changed(&before.data.condition, &after.data.condition),
            linked_item_type: changed(&before.data.linked_item_type, &after.data.linked_item_type),
            linked_item_id: changed(&before.data.linked_item_id, &after.data.linked_item_id),
            endpoint: changed(&before.data.endpoint, &after.data.endpoint),
            method: changed(&before.data.method, &after.data.method),
            system: changed(&before.data.system, &after.data.system),
            style: changed(&before.style, &after.style),
        }
    }

    fn apply_to(&self, node: &mut Node) {
        if let Some(kind) = self.kind {
            node.kind = kind;
        }
        if let Some(position) = self.position {
            node.position = position;
        }
        if let Some(label) = &self.label {
            node.data.label.clone_from(label);
        }
        if let Some(description) = &self.description {
            node.data.description.clone_from(description);
        }
        if let Some(condition) = &self.condition {
            node.data.condition.clone_from(condition);
        }
        if let Some(linked_item_type) = self.linked_item_type {
            node.data.linked_item_type = linked_item_type;
        }
        if let Some(linked_item_id) = &self.linked_item_id {
            node.data.linked_item_id.clone_from(linked_item_id);
        }
        if let Some(endpoint) = &self.endpoint {
            node.data.endpoint.clone_from(endpoint);
        }
        if let Some(method) = &self.method {
            node.data.method.clone_from(method);
        }
        if let Some(system) = &self.system {
            node.data.system.clone_from(system);
        }
        if let Some(style) = &self.style {
            node.style.clone_from(style);
        }
    }
}

//! Edge data structure for directed connections between nodes

use serde::{Deserialize, Serialize};

use super::node::NodeId;

/// Type-safe wrapper for edge identifiers
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(String);

impl EdgeId {
    /// Creates a new `EdgeId` with validation
    ///
    /// # Errors
    ///
    /// Returns an error if the identifier is empty.
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.is_empty() {
            return Err("Edge ID cannot be empty".to_string());
        }
        Ok(Self(id))
    }

    /// Wraps an id minted by the id generator (never empty)
    pub(crate) const fn from_generated(id: String) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EdgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Connector rendering style tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeType {
    #[default]
    SmoothStep,
    Step,
    Bezier,
    Straight,
    #[serde(other)]
    Default,
}

/// Arrowhead shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerType {
    #[default]
    ArrowClosed,
    Arrow,
}

/// Arrowhead style at the target end of an edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerEnd {
    #[serde(rename = "type", default)]
    pub marker_type: MarkerType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Default for MarkerEnd {
    fn default() -> Self {
        Self {
            marker_type: MarkerType::ArrowClosed,
            width: Some(20.0),
            height: Some(20.0),
            color: None,
        }
    }
}

/// A directed connection between two node ids
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    #[serde(rename = "type", default)]
    pub edge_type: EdgeType,
    #[serde(default)]
    pub marker_end: MarkerEnd,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
}

impl Edge {
    /// Creates an edge with the default connector and arrowhead
    #[must_use]
    pub fn new(id: EdgeId, source: NodeId, target: NodeId) -> Self {
        Self {
            id,
            source,
            target,
            edge_type: EdgeType::default(),
            marker_end: MarkerEnd::default(),
            source_handle: None,
            target_handle: None,
        }
    }

    /// True when this edge runs from `source` to `target` (direction matters)
    #[must_use]
    pub fn connects(&self, source: &NodeId, target: &NodeId) -> bool {
        &self.source == source && &self.target == target
    }

    /// True when either end of this edge is `node`
    #[must_use]
    pub fn touches(&self, node: &NodeId) -> bool {
        &self.source == node || &self.target == node
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]

    use super::*;

    fn id(s: &str) -> NodeId {
        NodeId::new(s).unwrap()
    }

    #[test]
    fn test_edge_defaults() {
        let edge = Edge::new(EdgeId::new("e1").unwrap(), id("a"), id("b"));
        assert_eq!(edge.edge_type, EdgeType::SmoothStep);
        assert_eq!(edge.marker_end.marker_type, MarkerType::ArrowClosed);
    }

    #[test]
    fn test_connects_is_directed() {
        let edge = Edge::new(EdgeId::new("e1").unwrap(), id("a"), id("b"));
        assert!(edge.connects(&id("a"), &id("b")));
        assert!(!edge.connects(&id("b"), &id("a")));
    }

    #[test]
    fn test_touches_either_end() {
        let edge = Edge::new(EdgeId::new("e1").unwrap(), id("a"), id("b"));
        assert!(edge.touches(&id("a")));
        assert!(edge.touches(&id("b")));
        assert!(!edge.touches(&id("c")));
    }

    #[test]
    fn test_edge_document_shape() {
        let edge = Edge::new(EdgeId::new("e1").unwrap(), id("a"), id("b"));
        let json = serde_json::to_value(&edge).unwrap();
        assert_eq!(json["type"], "smoothstep");
        assert_eq!(json["markerEnd"]["type"], "arrowclosed");
        assert_eq!(json["source"], "a");
    }

    #[test]
    fn test_unknown_edge_type_falls_back() {
        let json = r#"{"id":"e","source":"a","target":"b","type":"floating"}"#;
        let edge: Edge = serde_json::from_str(json).unwrap();
        assert_eq!(edge.edge_type, EdgeType::Default);
        assert_eq!(edge.marker_end, MarkerEnd::default());
    }

    #[test]
    fn test_empty_edge_id_rejected() {
        assert!(EdgeId::new("").is_err());
    }
}

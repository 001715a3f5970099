//! Palette drag-and-drop onto the canvas

use thiserror::Error;

use crate::models::{NodeKind, Position};
use crate::viewport::{CanvasBounds, ClientPoint, Viewport};

/// Data-transfer key carrying the node type tag
pub const TYPE_KEY: &str = "application/reactflow";
/// Data-transfer key carrying the node label
pub const LABEL_KEY: &str = "application/label";

/// Why a drop was ignored
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DropError {
    #[error("dropped item has no node type")]
    MissingType,

    #[error("unknown node type '{0}'")]
    UnknownType(String),

    #[error("dropped item has no label")]
    MissingLabel,

    #[error("canvas is not available")]
    NoCanvas,

    #[error("drop position is outside the diagram ({0})")]
    InvalidPosition(String),
}

/// What a palette item carries through the drag
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DropPayload {
    pub node_type: Option<String>,
    pub label: Option<String>,
}

impl DropPayload {
    #[must_use]
    pub fn new(node_type: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            node_type: Some(node_type.into()),
            label: Some(label.into()),
        }
    }

    /// Build from a data-transfer lookup (`getData`-style)
    pub fn from_transfer(get: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| get(key).filter(|value| !value.trim().is_empty());
        Self {
            node_type: non_empty(TYPE_KEY),
            label: non_empty(LABEL_KEY),
        }
    }

    /// Validate the payload into a kind and label.
    ///
    /// # Errors
    ///
    /// Returns an error when the type is missing or unknown, or the label is missing.
    pub fn parse(&self) -> Result<(NodeKind, String), DropError> {
        let tag = self
            .node_type
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(DropError::MissingType)?;
        let kind = NodeKind::from_tag(tag).ok_or_else(|| DropError::UnknownType(tag.to_string()))?;
        let label = self
            .label
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .ok_or(DropError::MissingLabel)?;
        Ok((kind, label.to_string()))
    }
}

/// A drop resolved to what should be created and where
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedDrop {
    pub kind: NodeKind,
    pub label: String,
    pub position: Position,
}

/// Validate a drop and project its pointer position into diagram space.
///
/// # Errors
///
/// Returns a [`DropError`] for a malformed payload, a missing canvas, or a
/// non-finite projection.
pub fn resolve_drop(
    payload: &DropPayload,
    client: ClientPoint,
    canvas: Option<CanvasBounds>,
    viewport: &Viewport,
) -> Result<ResolvedDrop, DropError> {
    let (kind, label) = payload.parse()?;
    let bounds = canvas.ok_or(DropError::NoCanvas)?;
    let position = viewport
        .project(client, bounds)
        .map_err(DropError::InvalidPosition)?;
    Ok(ResolvedDrop {
        kind,
        label,
        position,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::collections::HashMap;

    use super::*;

    const BOUNDS: CanvasBounds = CanvasBounds::new(100.0, 50.0, 800.0, 600.0);

    #[test]
    fn test_resolves_kind_label_and_position() {
        let payload = DropPayload::new("decisionNode", "Approved?");
        let drop = resolve_drop(
            &payload,
            ClientPoint::new(300.0, 250.0),
            Some(BOUNDS),
            &Viewport::default(),
        )
        .unwrap();

        assert_eq!(drop.kind, NodeKind::Decision);
        assert_eq!(drop.label, "Approved?");
        assert_eq!(drop.position, Position::new(200.0, 200.0).unwrap());
    }

    #[test]
    fn test_missing_type() {
        let payload = DropPayload {
            node_type: None,
            label: Some("x".to_string()),
        };
        assert_eq!(payload.parse(), Err(DropError::MissingType));
    }

    #[test]
    fn test_unknown_type() {
        let payload = DropPayload::new("widgetNode", "x");
        assert_eq!(payload.parse(), Err(DropError::UnknownType("widgetNode".to_string())));
    }

    #[test]
    fn test_blank_label() {
        let payload = DropPayload::new("stepNode", "   ");
        assert_eq!(payload.parse(), Err(DropError::MissingLabel));
    }

    #[test]
    fn test_no_canvas() {
        let payload = DropPayload::new("stepNode", "Step");
        let err = resolve_drop(&payload, ClientPoint::new(0.0, 0.0), None, &Viewport::default())
            .unwrap_err();
        assert_eq!(err, DropError::NoCanvas);
    }

    #[test]
    fn test_from_transfer_ignores_empty_values() {
        let data: HashMap<&str, &str> = [(TYPE_KEY, "stepNode"), (LABEL_KEY, "")].into_iter().collect();
        let payload = DropPayload::from_transfer(|key| data.get(key).map(|v| (*v).to_string()));
        assert_eq!(payload.node_type.as_deref(), Some("stepNode"));
        assert_eq!(payload.label, None);
    }
}

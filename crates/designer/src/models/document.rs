//! The externally persisted diagram document

use std::collections::HashSet;
use std::path::Path;

use flowdesign_core::{Error, Result};
use serde::{Deserialize, Serialize};

use super::edge::Edge;
use super::node::{Node, NodeId};

/// Diagram name and description
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl Metadata {
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }

    /// True when neither name nor description is set
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.name.trim().is_empty() && self.description.trim().is_empty()
    }
}

/// `{ nodes, edges, metadata }` as stored by the owning page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagramDocument {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl DiagramDocument {
    /// True when the document has neither nodes nor edges
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    /// Parse a document from JSON text
    ///
    /// # Errors
    ///
    /// Returns `Error::JsonParseFailed` if the text is not a valid document.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serialize as pretty-printed JSON
    ///
    /// # Errors
    ///
    /// Returns `Error::JsonParseFailed` if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read a document from a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not parse.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::file_read_failed(path, e.to_string()))?;
        Self::from_json(&text)
    }

    /// Write this document as pretty JSON
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = self.to_json_pretty()?;
        std::fs::write(path, text).map_err(|e| Error::file_write_failed(path, e.to_string()))
    }

    /// Edges whose source or target does not name a node in this document
    #[must_use]
    pub fn dangling_edges(&self) -> Vec<&Edge> {
        let ids: HashSet<&NodeId> = self.nodes.iter().map(|node| &node.id).collect();
        self.edges
            .iter()
            .filter(|edge| !ids.contains(&edge.source) || !ids.contains(&edge.target))
            .collect()
    }

    /// Checks node-id uniqueness and directed edge uniqueness
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidDocument` naming the first violation found.
    pub fn validate(&self) -> Result<()> {
        let mut seen_nodes = HashSet::new();
        if let Some(dup) = self.nodes.iter().find(|node| !seen_nodes.insert(&node.id)) {
            return Err(Error::invalid_document(format!(
                "duplicate node id '{}'",
                dup.id
            )));
        }

        let mut seen_pairs = HashSet::new();
        if let Some(dup) = self
            .edges
            .iter()
            .find(|edge| !seen_pairs.insert((&edge.source, &edge.target)))
        {
            return Err(Error::invalid_document(format!(
                "duplicate edge {} -> {}",
                dup.source, dup.target
            )));
        }

        Ok(())
    }

    /// File name for an exported artifact: the diagram name with whitespace
    /// runs replaced by underscores, or `default_stem` when unnamed.
    ///
    /// Path separators, characters reserved on common filesystems, and
    /// control characters become `_`, so the result is always one plain
    /// file name.
    #[must_use]
    pub fn export_file_name(&self, default_stem: &str) -> String {
        let name = self.metadata.name.trim();
        let stem = if name.is_empty() {
            default_stem.to_string()
        } else {
            name.split_whitespace().collect::<Vec<_>>().join("_")
        };
        let stem: String = stem
            .chars()
            .map(|c| if is_reserved(c) { '_' } else { c })
            .collect();
        let stem = stem.trim_start_matches('.');
        if stem.is_empty() {
            format!("{default_stem}.pdf")
        } else {
            format!("{stem}.pdf")
        }
    }
}

fn is_reserved(c: char) -> bool {
    matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') || c.is_control()
}

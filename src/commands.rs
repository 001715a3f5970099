//! CLI command handlers.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context, Result, bail};
use itertools::Itertools;
use serde_json::json;
use tracing::info;

use flowdesign_designer::export::{ExportOutcome, FileDelivery};
use flowdesign_designer::store::default_document;
use flowdesign_designer::surface::SceneSurface;
use flowdesign_designer::{Designer, DesignerConfig, DesignerOptions, DiagramDocument, Metadata};

use crate::cli::Commands;

/// Execute a CLI command.
///
/// # Errors
///
/// Returns the failure of the selected command with context attached.
pub async fn execute_command(command: Commands) -> Result<()> {
    match command {
        Commands::New {
            out,
            name,
            description,
            force,
        } => {
            let path = cmd_new(&out, name, description, force)?;
            println!("Created {}", path.display());
            Ok(())
        }

        Commands::Inspect { input, json } => {
            let report = cmd_inspect(&input)?;
            if json {
                println!("{}", report.to_json()?);
            } else {
                print!("{}", report.render());
            }
            Ok(())
        }

        Commands::Export {
            input,
            project_id,
            out_dir,
            config,
        } => {
            let outcome = cmd_export(&input, project_id, &out_dir, config.as_deref()).await?;
            println!("{}", outcome.delivered.location());
            Ok(())
        }
    }
}

/// Write the bootstrap diagram to `out`.
///
/// # Errors
///
/// Fails if `out` exists and `force` is not set, or the write fails.
pub fn cmd_new(
    out: &Path,
    name: Option<String>,
    description: Option<String>,
    force: bool,
) -> Result<PathBuf> {
    if out.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", out.display());
    }

    let document = DiagramDocument {
        metadata: Metadata::new(name.unwrap_or_default(), description.unwrap_or_default()),
        ..default_document()
    };
    document
        .save(out)
        .with_context(|| format!("Failed to write {}", out.display()))?;

    info!(path = %out.display(), "Wrote default diagram");
    Ok(out.to_path_buf())
}

/// What `inspect` reports about a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectReport {
    pub name: String,
    /// Node counts per kind tag, sorted by tag
    pub nodes_by_kind: Vec<(String, usize)>,
    pub node_count: usize,
    pub edge_count: usize,
    /// Edges whose source or target node is missing, as "id: source -> target"
    pub dangling: Vec<String>,
    /// Structural problem found by validation, if any
    pub problem: Option<String>,
}

impl InspectReport {
    fn from_document(document: &DiagramDocument) -> Self {
        let nodes_by_kind = document
            .nodes
            .iter()
            .counts_by(|node| node.kind.tag())
            .into_iter()
            .map(|(tag, count)| (tag.to_string(), count))
            .sorted()
            .collect();

        let dangling = document
            .dangling_edges()
            .into_iter()
            .map(|edge| format!("{}: {} -> {}", edge.id, edge.source, edge.target))
            .collect();

        Self {
            name: document.metadata.name.clone(),
            nodes_by_kind,
            node_count: document.nodes.len(),
            edge_count: document.edges.len(),
            dangling,
            problem: document.validate().err().map(|e| e.to_string()),
        }
    }

    /// Plain-text rendering, one fact per line
    #[must_use]
    pub fn render(&self) -> String {
        let name = if self.name.is_empty() {
            "(unnamed)"
        } else {
            &self.name
        };
        // Writing into a String cannot fail
        let mut out = String::new();
        let _ = writeln!(out, "Diagram: {name}");
        let _ = writeln!(out, "Nodes: {}", self.node_count);
        for (tag, count) in &self.nodes_by_kind {
            let _ = writeln!(out, "  {tag}: {count}");
        }
        let _ = writeln!(out, "Edges: {}", self.edge_count);
        for edge in &self.dangling {
            let _ = writeln!(out, "  dangling {edge}");
        }
        if let Some(problem) = &self.problem {
            let _ = writeln!(out, "Problem: {problem}");
        }
        out
    }

    /// JSON rendering
    ///
    /// # Errors
    ///
    /// Fails only if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        let kinds: serde_json::Map<String, serde_json::Value> = self
            .nodes_by_kind
            .iter()
            .map(|(tag, count)| (tag.clone(), json!(count)))
            .collect();
        let value = json!({
            "name": self.name,
            "nodes": self.node_count,
            "nodesByKind": kinds,
            "edges": self.edge_count,
            "danglingEdges": self.dangling,
            "problem": self.problem,
        });
        serde_json::to_string_pretty(&value).context("Failed to serialize report")
    }
}

/// Load and summarize a document.
///
/// # Errors
///
/// Fails if the file cannot be read or parsed.
pub fn cmd_inspect(input: &Path) -> Result<InspectReport> {
    let document = DiagramDocument::load(input)
        .with_context(|| format!("Failed to load {}", input.display()))?;
    Ok(InspectReport::from_document(&document))
}

/// Run the export pipeline headlessly over a document file.
///
/// # Errors
///
/// Fails if the configuration or document cannot be loaded, or the export fails.
pub async fn cmd_export(
    input: &Path,
    project_id: i64,
    out_dir: &Path,
    config: Option<&Path>,
) -> Result<ExportOutcome> {
    let config = match config {
        Some(path) => DesignerConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => DesignerConfig::from_env().context("Invalid FLOWDESIGN_* environment")?,
    };
    let document = DiagramDocument::load(input)
        .with_context(|| format!("Failed to load {}", input.display()))?;

    let designer = Designer::new(
        DesignerOptions::new(project_id, Rc::new(FileDelivery::new(out_dir)))
            .config(config)
            .flow_data(document),
    );
    designer.attach_surface(Rc::new(SceneSurface::with_drag_flag(designer.drag_flag())));

    designer
        .export_pdf()
        .await
        .with_context(|| format!("Failed to export {}", input.display()))
}

//! Command handlers against real files.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use flowdesign::commands::{cmd_export, cmd_inspect, cmd_new};
use flowdesign_designer::DiagramDocument;
use flowdesign_designer::store::default_document;

#[test]
fn new_writes_default_diagram_with_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("flow.json");

    cmd_new(&out, Some("Checkout".to_string()), None, false).unwrap();

    let doc = DiagramDocument::load(&out).unwrap();
    assert_eq!(doc.nodes, default_document().nodes);
    assert_eq!(doc.metadata.name, "Checkout");
}

#[test]
fn new_refuses_to_overwrite_without_force() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("flow.json");
    std::fs::write(&out, "{}").unwrap();

    assert!(cmd_new(&out, None, None, false).is_err());
    assert!(cmd_new(&out, None, None, true).is_ok());
}

#[test]
fn inspect_counts_kinds_and_dangling_edges() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("flow.json");
    let mut doc = default_document();
    doc.nodes.retain(|node| node.id.as_str() != "end");
    doc.save(&input).unwrap();

    let report = cmd_inspect(&input).unwrap();

    assert_eq!(report.nodes_by_kind, vec![("startNode".to_string(), 1)]);
    assert_eq!(report.edge_count, 1);
    assert_eq!(report.dangling, vec!["e-start-end: start -> end".to_string()]);
    assert!(report.render().contains("dangling e-start-end"));
    assert!(report.to_json().unwrap().contains("\"danglingEdges\""));
}

#[test]
fn inspect_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    assert!(cmd_inspect(&dir.path().join("missing.json")).is_err());
}

#[tokio::test]
async fn export_writes_pdf_into_out_dir() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("flow.json");
    cmd_new(&input, Some("Order intake".to_string()), Some("v2".to_string()), false).unwrap();
    let config = dir.path().join("designer.toml");
    std::fs::write(&config, "pixel_ratio = 1.0\n").unwrap();

    let outcome = cmd_export(&input, 1234, &dir.path().join("pdf"), Some(&config)).await.unwrap();

    assert_eq!(outcome.file_name, "Order_intake.pdf");
    let bytes = std::fs::read(dir.path().join("pdf/Order_intake.pdf")).unwrap();
    assert!(bytes.starts_with(b"%PDF"));
    assert!(bytes.windows(16).any(|w| w == b"Project ID: 1234"));
}

#[tokio::test]
async fn export_with_bad_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("flow.json");
    cmd_new(&input, None, None, false).unwrap();
    let config = dir.path().join("designer.yaml");
    std::fs::write(&config, "pixel_ratio: 1").unwrap();

    assert!(cmd_export(&input, 1, dir.path(), Some(&config)).await.is_err());
}

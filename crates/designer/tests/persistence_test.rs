//! Debounce timing against the tokio clock.
//!
//! Time is paused, so `sleep` advances the clock instantly and the
//! assertions about quiet windows are exact.

#![allow(clippy::unwrap_used)]
#![allow(clippy::indexing_slicing)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use flowdesign_designer::models::{NodeKind, Position};
use flowdesign_designer::persistence::runtime::spawn_debounced;
use flowdesign_designer::store::default_document;
use flowdesign_designer::{DiagramDocument, GraphStore};

fn recorder() -> (Arc<Mutex<Vec<DiagramDocument>>>, impl FnMut(DiagramDocument) + Send + 'static) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    (seen, move |doc| sink.lock().unwrap().push(doc))
}

#[tokio::test(start_paused = true)]
async fn rapid_updates_coalesce_into_one_callback() {
    let (seen, on_change) = recorder();
    let (sender, _task) = spawn_debounced(Duration::from_millis(100), on_change);
    let mut store = GraphStore::with_default_diagram();

    for i in 0..20 {
        store.add_node(NodeKind::Step, format!("Step {i}"), Position::origin());
        assert!(sender.send(store.snapshot()));
        tokio::time::sleep(Duration::from_millis(30)).await;
    }
    assert!(seen.lock().unwrap().is_empty());

    tokio::time::sleep(Duration::from_millis(100)).await;

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].nodes.len(), 22);
}

#[tokio::test(start_paused = true)]
async fn separated_updates_each_report() {
    let (seen, on_change) = recorder();
    let (sender, _task) = spawn_debounced(Duration::from_millis(100), on_change);

    sender.send(default_document());
    tokio::time::sleep(Duration::from_millis(150)).await;
    sender.send(default_document());
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert_eq!(seen.lock().unwrap().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn empty_document_cancels_pending_report() {
    let (seen, on_change) = recorder();
    let (sender, _task) = spawn_debounced(Duration::from_millis(100), on_change);

    sender.send(default_document());
    tokio::time::sleep(Duration::from_millis(50)).await;
    sender.send(DiagramDocument::default());
    tokio::time::sleep(Duration::from_millis(500)).await;

    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn task_ends_when_sender_dropped() {
    let (_seen, on_change) = recorder();
    let (sender, task) = spawn_debounced(Duration::from_millis(100), on_change);

    drop(sender);

    tokio::time::timeout(Duration::from_secs(1), task).await.unwrap().unwrap();
}

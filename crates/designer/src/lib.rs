//! Functional flow diagram designer
//!
//! The designer is split into four cooperating parts:
//!
//! - [`store`]: the graph state store, the single source of truth for nodes,
//!   edges, and diagram metadata.
//! - [`controller`]: translates pointer gestures, menu picks, and dialog
//!   actions into store mutations, including the drag fast path.
//! - [`persistence`]: debounced change notification and explicit save.
//! - [`export`]: rasterize the rendered surface and compose a PDF.
//!
//! [`designer::Designer`] wires them together for one mounted instance and
//! [`handle::DesignerHandle`] is the imperative handle handed to the owner.
//!
//! Everything here is single-threaded. Shared state uses `Rc`/`RefCell`,
//! and async work (rasterization, delivery) runs on the caller's local executor.

#![forbid(unsafe_code)]

pub mod clock;
pub mod config;
pub mod controller;
pub mod designer;
pub mod drag;
pub mod export;
pub mod handle;
pub mod ids;
pub mod models;
pub mod notify;
pub mod persistence;
pub mod render;
pub mod store;
pub mod surface;
pub mod viewport;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, DesignerConfig};
pub use designer::{Designer, DesignerOptions};
pub use handle::{DesignerHandle, HandleError, HandleSlot, MountGuard};
pub use models::{DiagramDocument, Edge, Metadata, Node, NodeId, NodeKind, NodePatch, Position};
pub use notify::{Level, MemoryNotifier, Notification, Notifier, TracingNotifier};
pub use store::GraphStore;

//! Export pipeline: rasterize the rendered diagram and deliver it as a PDF.
//!
//! ```text
//! Idle ──export──▶ Exporting ──ok──▶ Idle
//!                      └────err───▶ Idle (notified)
//! ```
//!
//! - [`layout`]: page orientation and image placement
//! - [`pdf`]: page composition with lopdf
//! - [`delivery`]: download with a viewer fallback
//! - [`pipeline`]: the state machine tying them together

pub mod delivery;
pub mod layout;
pub mod pdf;
pub mod pipeline;

use thiserror::Error;

use crate::surface::SurfaceError;

pub use delivery::{Delivery, DeliveryError, DeliveryOutcome};
#[cfg(feature = "runtime")]
pub use delivery::FileDelivery;
pub use layout::{Orientation, PageLayout, layout_page};
pub use pdf::{PageContent, compose_pdf};
pub use pipeline::{ExportOutcome, ExportPipeline, ExportRequest, ExportState};

/// Export failures, reported to the user as notifications
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Diagram surface not found")]
    SurfaceMissing,

    #[error("An export is already in progress")]
    AlreadyRunning,

    #[error(transparent)]
    Surface(#[from] SurfaceError),

    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error("Failed to build PDF: {0}")]
    Pdf(String),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

//! Export state machine.
//!
//! One export at a time. While an export runs the surface is temporarily
//! restyled for print; [`StyleGuard`] puts the live look back on every exit
//! path, including errors and dropped futures.

use std::cell::Cell;

use chrono::{DateTime, Local};
use tracing::{error, info, warn};

use super::ExportError;
use super::delivery::{Delivery, DeliveryOutcome};
use super::layout::layout_page;
use super::pdf::{PageContent, compose_pdf};
use crate::config::DesignerConfig;
use crate::models::DiagramDocument;
use crate::notify::Notifier;
use crate::surface::{EdgeStroke, RasterImage, RasterOptions, RenderSurface, SurfaceStyle};

const PRINT_EDGE_COLOR: &str = "#555555";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportState {
    #[default]
    Idle,
    Exporting,
}

/// Inputs for one export
#[derive(Clone, Copy)]
pub struct ExportRequest<'a> {
    /// `None` when the diagram is not mounted
    pub surface: Option<&'a dyn RenderSurface>,
    pub document: &'a DiagramDocument,
    pub project_id: i64,
    pub generated_at: DateTime<Local>,
}

impl std::fmt::Debug for ExportRequest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportRequest")
            .field("mounted", &self.surface.is_some())
            .field("project_id", &self.project_id)
            .field("generated_at", &self.generated_at)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOutcome {
    pub file_name: String,
    pub size: usize,
    pub delivered: DeliveryOutcome,
}

#[derive(Debug)]
pub struct ExportPipeline {
    config: DesignerConfig,
    state: Cell<ExportState>,
}

/// Resets the pipeline to `Idle` when an export ends, however it ends
struct Running<'a>(&'a Cell<ExportState>);

impl Drop for Running<'_> {
    fn drop(&mut self) {
        self.0.set(ExportState::Idle);
    }
}

/// Print styling applied to a surface for the lifetime of the guard
struct StyleGuard<'a> {
    surface: &'a dyn RenderSurface,
    style: SurfaceStyle,
    strokes: Vec<EdgeStroke>,
}

impl<'a> StyleGuard<'a> {
    fn apply(surface: &'a dyn RenderSurface, stroke_width: f64) -> Self {
        let style = surface.style();
        let strokes = surface.edge_strokes();

        surface.set_style(&SurfaceStyle::print());
        let enhanced: Vec<EdgeStroke> = strokes
            .iter()
            .map(|stroke| EdgeStroke {
                edge: stroke.edge.clone(),
                color: Some(PRINT_EDGE_COLOR.to_string()),
                width: Some(stroke.width.map_or(stroke_width, |w| w.max(stroke_width))),
            })
            .collect();
        surface.set_edge_strokes(&enhanced);

        Self {
            surface,
            style,
            strokes,
        }
    }
}

impl Drop for StyleGuard<'_> {
    fn drop(&mut self) {
        self.surface.set_style(&self.style);
        self.surface.set_edge_strokes(&self.strokes);
    }
}

impl ExportPipeline {
    #[must_use]
    pub const fn new(config: DesignerConfig) -> Self {
        Self {
            config,
            state: Cell::new(ExportState::Idle),
        }
    }

    #[must_use]
    pub fn state(&self) -> ExportState {
        self.state.get()
    }

    /// Whether the export trigger should be disabled
    #[must_use]
    pub fn is_exporting(&self) -> bool {
        self.state.get() == ExportState::Exporting
    }

    /// Run one export and report the result through `notifier`.
    ///
    /// # Errors
    ///
    /// Returns `ExportError::AlreadyRunning` if another export is in flight.
    /// Every other failure is also notified as an error before returning.
    pub async fn run(
        &self,
        request: ExportRequest<'_>,
        delivery: &dyn Delivery,
        notifier: &dyn Notifier,
    ) -> Result<ExportOutcome, ExportError> {
        if self.is_exporting() {
            warn!("Export requested while another is running");
            return Err(ExportError::AlreadyRunning);
        }
        self.state.set(ExportState::Exporting);
        let _running = Running(&self.state);

        match self.export(request, delivery, notifier).await {
            Ok(outcome) => {
                info!(
                    file = %outcome.file_name,
                    location = outcome.delivered.location(),
                    bytes = outcome.size,
                    "Exported PDF"
                );
                if !outcome.delivered.is_fallback() {
                    notifier.success("PDF exported successfully");
                }
                Ok(outcome)
            }
            Err(e) => {
                error!(error = %e, "PDF export failed");
                notifier.error(&format!("Failed to export PDF: {e}"));
                Err(e)
            }
        }
    }

    async fn export(
        &self,
        request: ExportRequest<'_>,
        delivery: &dyn Delivery,
        notifier: &dyn Notifier,
    ) -> Result<ExportOutcome, ExportError> {
        let surface = request.surface.ok_or(ExportError::SurfaceMissing)?;
        let image = self.capture(surface).await?;

        let layout = layout_page(
            image.width,
            image.height,
            self.config.page_margin_mm,
            self.config.vertical_allowance_mm,
        );
        let bytes = compose_pdf(&PageContent {
            metadata: &request.document.metadata,
            project_id: request.project_id,
            generated_at: request.generated_at,
            image: &image,
            layout: &layout,
        })?;

        let file_name = request
            .document
            .export_file_name(&self.config.default_file_stem);
        let delivered = match delivery.download(&file_name, &bytes).await {
            Ok(location) => DeliveryOutcome::Downloaded { location },
            Err(e) => {
                warn!(error = %e, "Download failed, opening in viewer instead");
                let location = delivery.open_in_viewer(&file_name, &bytes).await?;
                notifier.info("Download was blocked, so the PDF was opened in a new window instead");
                DeliveryOutcome::OpenedInViewer { location }
            }
        };

        Ok(ExportOutcome {
            file_name,
            size: bytes.len(),
            delivered,
        })
    }

    async fn capture(&self, surface: &dyn RenderSurface) -> Result<RasterImage, ExportError> {
        let _guard = StyleGuard::apply(surface, self.config.enhanced_edge_stroke_width);
        let layout = surface.layout_box();
        let image = surface
            .rasterize(&RasterOptions {
                pixel_ratio: self.config.pixel_ratio,
                width: layout.width,
                height: layout.height,
            })
            .await?;
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]
    #![allow(clippy::indexing_slicing)]

    use std::cell::RefCell;
    use std::future::Future;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use async_trait::async_trait;
    use chrono::TimeZone;
    use futures::executor::block_on;

    use super::*;
    use crate::export::DeliveryError;
    use crate::models::{Edge, EdgeId, Node, NodeId, Position};
    use crate::notify::{Level, MemoryNotifier};
    use crate::surface::{LayoutBox, SceneSurface, SurfaceError};

    /// Completes on the second poll, so an export can be caught mid-flight
    #[derive(Default)]
    struct YieldOnce(bool);

    impl Future for YieldOnce {
        type Output = ();

        fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
            if self.0 {
                Poll::Ready(())
            } else {
                self.0 = true;
                cx.waker().wake_by_ref();
                Poll::Pending
            }
        }
    }

    /// Surface whose rasterization is scripted
    struct StubSurface {
        style: RefCell<SurfaceStyle>,
        strokes: RefCell<Vec<EdgeStroke>>,
        seen_during_capture: RefCell<Option<(SurfaceStyle, Vec<EdgeStroke>)>>,
        fail: bool,
    }

    impl StubSurface {
        fn new(fail: bool) -> Self {
            Self {
                style: RefCell::new(SurfaceStyle {
                    background: Some("#f5f5f5".to_string()),
                    overflow: Some("hidden".to_string()),
                }),
                strokes: RefCell::new(vec![EdgeStroke {
                    edge: EdgeId::new("e-1").unwrap(),
                    color: Some("#b1b1b7".to_string()),
                    width: Some(1.0),
                }]),
                seen_during_capture: RefCell::new(None),
                fail,
            }
        }
    }

    #[async_trait(?Send)]
    impl RenderSurface for StubSurface {
        fn layout_box(&self) -> LayoutBox {
            LayoutBox::new(20.0, 10.0)
        }

        fn style(&self) -> SurfaceStyle {
            self.style.borrow().clone()
        }

        fn set_style(&self, style: &SurfaceStyle) {
            *self.style.borrow_mut() = style.clone();
        }

        fn edge_strokes(&self) -> Vec<EdgeStroke> {
            self.strokes.borrow().clone()
        }

        fn set_edge_strokes(&self, strokes: &[EdgeStroke]) {
            *self.strokes.borrow_mut() = strokes.to_vec();
        }

        fn translate_node(&self, id: &NodeId, _position: Position) -> Result<(), SurfaceError> {
            Err(SurfaceError::NodeNotRendered(id.clone()))
        }

        fn set_transitions(&self, _id: &NodeId, _enabled: bool) {}

        fn sync(&self, _nodes: &[Node], _edges: &[Edge]) {}

        async fn rasterize(&self, options: &RasterOptions) -> Result<RasterImage, SurfaceError> {
            *self.seen_during_capture.borrow_mut() = Some((self.style(), self.edge_strokes()));
            YieldOnce::default().await;
            if self.fail {
                return Err(SurfaceError::Rasterize("canvas tainted".to_string()));
            }
            assert!((options.pixel_ratio - 3.0).abs() < f64::EPSILON);
            Ok(RasterImage {
                width: 60,
                height: 30,
                rgb: vec![255; 60 * 30 * 3],
                labels: Vec::new(),
            })
        }
    }

    /// Delivery with scripted download/viewer results
    #[derive(Default)]
    struct StubDelivery {
        reject_download: bool,
        reject_viewer: bool,
        calls: RefCell<Vec<String>>,
    }

    #[async_trait(?Send)]
    impl Delivery for StubDelivery {
        async fn download(&self, file_name: &str, _bytes: &[u8]) -> Result<String, DeliveryError> {
            self.calls.borrow_mut().push(format!("download:{file_name}"));
            if self.reject_download {
                return Err(DeliveryError::Download {
                    file_name: file_name.to_string(),
                    reason: "save dialog dismissed".to_string(),
                });
            }
            Ok(format!("downloads/{file_name}"))
        }

        async fn open_in_viewer(&self, file_name: &str, _bytes: &[u8]) -> Result<String, DeliveryError> {
            self.calls.borrow_mut().push(format!("viewer:{file_name}"));
            if self.reject_viewer {
                return Err(DeliveryError::Viewer {
                    file_name: file_name.to_string(),
                    reason: "popup blocked".to_string(),
                });
            }
            Ok(format!("viewer/{file_name}"))
        }
    }

    fn request<'a>(surface: Option<&'a dyn RenderSurface>, document: &'a DiagramDocument) -> ExportRequest<'a> {
        ExportRequest {
            surface,
            document,
            project_id: 7,
            generated_at: Local.with_ymd_and_hms(2024, 5, 2, 12, 0, 0).unwrap(),
        }
    }

    fn named_document() -> DiagramDocument {
        let mut document = crate::store::default_document();
        document.metadata.name = "Order flow".to_string();
        document
    }

    #[test]
    fn test_success_downloads_and_restores_style() {
        let pipeline = ExportPipeline::new(DesignerConfig::default());
        let surface = StubSurface::new(false);
        let before = (surface.style(), surface.edge_strokes());
        let delivery = StubDelivery::default();
        let notifier = MemoryNotifier::new();
        let document = named_document();

        let outcome = block_on(pipeline.run(request(Some(&surface), &document), &delivery, &notifier)).unwrap();

        assert_eq!(outcome.file_name, "Order_flow.pdf");
        assert_eq!(
            outcome.delivered,
            DeliveryOutcome::Downloaded {
                location: "downloads/Order_flow.pdf".to_string()
            }
        );
        assert_eq!((surface.style(), surface.edge_strokes()), before);
        assert_eq!(notifier.messages(Level::Success).len(), 1);
        assert_eq!(pipeline.state(), ExportState::Idle);
    }

    #[test]
    fn test_capture_sees_print_style() {
        let pipeline = ExportPipeline::new(DesignerConfig::default());
        let surface = StubSurface::new(false);
        let document = named_document();

        block_on(pipeline.run(
            request(Some(&surface), &document),
            &StubDelivery::default(),
            &MemoryNotifier::new(),
        ))
        .unwrap();

        let (style, strokes) = surface.seen_during_capture.borrow().clone().unwrap();
        assert_eq!(style, SurfaceStyle::print());
        assert_eq!(strokes[0].width, Some(2.0));
        assert_eq!(strokes[0].color.as_deref(), Some(PRINT_EDGE_COLOR));
    }

    #[test]
    fn test_rasterize_failure_restores_style_and_notifies() {
        let pipeline = ExportPipeline::new(DesignerConfig::default());
        let surface = StubSurface::new(true);
        let before = (surface.style(), surface.edge_strokes());
        let delivery = StubDelivery::default();
        let notifier = MemoryNotifier::new();
        let document = named_document();

        let result = block_on(pipeline.run(request(Some(&surface), &document), &delivery, &notifier));

        assert!(matches!(result, Err(ExportError::Surface(SurfaceError::Rasterize(_)))));
        assert_eq!((surface.style(), surface.edge_strokes()), before);
        assert!(delivery.calls.borrow().is_empty());
        assert_eq!(notifier.messages(Level::Error).len(), 1);
        assert_eq!(pipeline.state(), ExportState::Idle);
    }

    #[test]
    fn test_missing_surface_is_notified() {
        let pipeline = ExportPipeline::new(DesignerConfig::default());
        let notifier = MemoryNotifier::new();
        let document = named_document();

        let result = block_on(pipeline.run(request(None, &document), &StubDelivery::default(), &notifier));

        assert!(matches!(result, Err(ExportError::SurfaceMissing)));
        assert_eq!(
            notifier.messages(Level::Error),
            vec!["Failed to export PDF: Diagram surface not found".to_string()]
        );
    }

    #[test]
    fn test_download_failure_falls_back_to_viewer() {
        let pipeline = ExportPipeline::new(DesignerConfig::default());
        let surface = StubSurface::new(false);
        let delivery = StubDelivery {
            reject_download: true,
            ..StubDelivery::default()
        };
        let notifier = MemoryNotifier::new();
        let document = crate::store::default_document();

        let outcome = block_on(pipeline.run(request(Some(&surface), &document), &delivery, &notifier)).unwrap();

        assert!(outcome.delivered.is_fallback());
        assert_eq!(outcome.file_name, "functional_flow_diagram.pdf");
        assert_eq!(
            *delivery.calls.borrow(),
            vec![
                "download:functional_flow_diagram.pdf".to_string(),
                "viewer:functional_flow_diagram.pdf".to_string()
            ]
        );
        assert_eq!(notifier.messages(Level::Info).len(), 1);
        assert!(notifier.messages(Level::Error).is_empty());
    }

    #[test]
    fn test_viewer_failure_is_an_error() {
        let pipeline = ExportPipeline::new(DesignerConfig::default());
        let surface = StubSurface::new(false);
        let delivery = StubDelivery {
            reject_download: true,
            reject_viewer: true,
            ..StubDelivery::default()
        };
        let notifier = MemoryNotifier::new();
        let document = named_document();

        let result = block_on(pipeline.run(request(Some(&surface), &document), &delivery, &notifier));

        assert!(matches!(result, Err(ExportError::Delivery(DeliveryError::Viewer { .. }))));
        assert_eq!(notifier.messages(Level::Error).len(), 1);
    }

    #[test]
    fn test_second_export_rejected_while_running() {
        let pipeline = ExportPipeline::new(DesignerConfig::default());
        let surface = StubSurface::new(false);
        let delivery = StubDelivery::default();
        let notifier = MemoryNotifier::new();
        let document = named_document();

        let (first, second) = block_on(async {
            futures::join!(
                pipeline.run(request(Some(&surface), &document), &delivery, &notifier),
                pipeline.run(request(Some(&surface), &document), &delivery, &notifier),
            )
        });

        assert!(first.is_ok());
        assert!(matches!(second, Err(ExportError::AlreadyRunning)));
        assert_eq!(pipeline.state(), ExportState::Idle);
    }

    #[test]
    fn test_scene_surface_exports_default_diagram() {
        let pipeline = ExportPipeline::new(DesignerConfig::default().pixel_ratio(1.0));
        let surface = SceneSurface::new();
        let document = crate::store::default_document();
        surface.sync(&document.nodes, &document.edges);
        let before = surface.edge_strokes();

        let outcome = block_on(pipeline.run(
            request(Some(&surface), &document),
            &StubDelivery::default(),
            &MemoryNotifier::new(),
        ))
        .unwrap();

        assert!(outcome.size > 0);
        assert_eq!(surface.edge_strokes(), before);
        assert_eq!(surface.style(), SurfaceStyle::default());
    }
}

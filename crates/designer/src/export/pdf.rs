//! Single-page PDF composition.

use std::io::Write;

use chrono::{DateTime, Local};
use flate2::Compression;
use flate2::write::ZlibEncoder;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, StringFormat, dictionary};

use super::ExportError;
use super::layout::PageLayout;
use crate::models::Metadata;
use crate::surface::RasterImage;

const PT_PER_MM: f64 = 72.0 / 25.4;
const TITLE_SIZE: f64 = 16.0;
const DESCRIPTION_SIZE: f64 = 10.0;
const FOOTER_SIZE: f64 = 8.0;
const MIN_LABEL_SIZE: f64 = 4.0;
const FALLBACK_TITLE: &str = "Functional Flow Diagram";

/// Everything that ends up on the page
#[derive(Debug, Clone, Copy)]
pub struct PageContent<'a> {
    pub metadata: &'a Metadata,
    pub project_id: i64,
    pub generated_at: DateTime<Local>,
    pub image: &'a RasterImage,
    pub layout: &'a PageLayout,
}

/// Build the PDF bytes for one diagram page.
///
/// # Errors
///
/// Returns `ExportError::Encode` if the image cannot be compressed and
/// `ExportError::Pdf` if the document cannot be serialized.
pub fn compose_pdf(page: &PageContent<'_>) -> Result<Vec<u8>, ExportError> {
    let layout = page.layout;
    let page_w = layout.page_width * PT_PER_MM;
    let page_h = layout.page_height * PT_PER_MM;

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });

    // The filter is declared by hand, so the stream must stay out of
    // lopdf's own compression.
    let image_stream = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(page.image.width),
            "Height" => i64::from(page.image.height),
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "FlateDecode",
        },
        deflate(&page.image.rgb)?,
    )
    .with_compression(false);
    let image_id = doc.add_object(image_stream);

    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
        "XObject" => dictionary! { "Im1" => image_id },
    });

    let content = Content {
        operations: page_operations(page, page_h),
    };
    let encoded = content
        .encode()
        .map_err(|e| ExportError::Pdf(e.to_string()))?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![real(0.0), real(0.0), real(page_w), real(page_h)],
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| ExportError::Pdf(e.to_string()))?;
    Ok(bytes)
}

fn page_operations(page: &PageContent<'_>, page_h: f64) -> Vec<Operation> {
    let layout = page.layout;
    let margin = layout.margin * PT_PER_MM;
    let mut ops = Vec::new();

    let title = if page.metadata.name.trim().is_empty() {
        FALLBACK_TITLE
    } else {
        page.metadata.name.as_str()
    };
    ops.extend(text(title, TITLE_SIZE, margin, page_h - 15.0 * PT_PER_MM));
    if !page.metadata.description.trim().is_empty() {
        ops.extend(text(
            &page.metadata.description,
            DESCRIPTION_SIZE,
            margin,
            page_h - 21.0 * PT_PER_MM,
        ));
    }

    let image = layout.image;
    let image_w = image.width * PT_PER_MM;
    let image_h = image.height * PT_PER_MM;
    let image_x = image.x * PT_PER_MM;
    let image_top = page_h - image.y * PT_PER_MM;
    ops.push(Operation::new("q", vec![]));
    ops.push(Operation::new(
        "cm",
        vec![
            real(image_w),
            real(0.0),
            real(0.0),
            real(image_h),
            real(image_x),
            real(image_top - image_h),
        ],
    ));
    ops.push(Operation::new("Do", vec!["Im1".into()]));
    ops.push(Operation::new("Q", vec![]));

    // Raster pixels to points
    let scale = if page.image.width == 0 {
        0.0
    } else {
        image_w / f64::from(page.image.width)
    };
    for label in &page.image.labels {
        let size = (label.size * scale).max(MIN_LABEL_SIZE);
        let approx_width = label.text.chars().count() as f64 * size * 0.5;
        let x = image_x + label.x * scale - approx_width / 2.0;
        let baseline = image_top - label.y * scale - size * 0.35;
        ops.extend(text(&label.text, size, x, baseline));
    }

    let footer = format!(
        "Generated: {} | Project ID: {}",
        page.generated_at.format("%Y-%m-%d %H:%M:%S"),
        page.project_id
    );
    ops.extend(text(&footer, FOOTER_SIZE, margin, 10.0 * PT_PER_MM));

    ops
}

fn text(value: &str, size: f64, x: f64, y: f64) -> [Operation; 5] {
    [
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), real(size)]),
        Operation::new("Td", vec![real(x), real(y)]),
        Operation::new(
            "Tj",
            vec![Object::String(win_ansi(value), StringFormat::Literal)],
        ),
        Operation::new("ET", vec![]),
    ]
}

/// Latin-1 subset of `value`; anything outside it becomes `?`
fn win_ansi(value: &str) -> Vec<u8> {
    value
        .chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

#[allow(clippy::cast_possible_truncation)]
fn real(value: f64) -> Object {
    Object::Real(value as _)
}

fn deflate(bytes: &[u8]) -> Result<Vec<u8>, ExportError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(bytes)
        .map_err(|e| ExportError::Encode(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| ExportError::Encode(e.to_string()))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::io::Read;

    use chrono::TimeZone;
    use flate2::read::ZlibDecoder;

    use super::*;
    use crate::export::layout::layout_page;
    use crate::surface::LabelPlacement;

    fn image() -> RasterImage {
        RasterImage {
            width: 4,
            height: 2,
            rgb: vec![200; 4 * 2 * 3],
            labels: vec![LabelPlacement {
                text: "Start".to_string(),
                x: 2.0,
                y: 1.0,
                size: 1.0,
            }],
        }
    }

    fn contains(haystack: &[u8], needle: &str) -> bool {
        haystack
            .windows(needle.len())
            .any(|w| w == needle.as_bytes())
    }

    fn compose(metadata: &Metadata) -> Vec<u8> {
        let image = image();
        let layout = layout_page(image.width, image.height, 10.0, 40.0);
        let generated_at = Local.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        compose_pdf(&PageContent {
            metadata,
            project_id: 42,
            generated_at,
            image: &image,
            layout: &layout,
        })
        .unwrap()
    }

    #[test]
    fn test_pdf_has_one_page_with_header_and_footer() {
        let bytes = compose(&Metadata::new("Checkout", "Happy path"));

        assert!(bytes.starts_with(b"%PDF-1.5"));
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
        assert!(contains(&bytes, "(Checkout)"));
        assert!(contains(&bytes, "(Happy path)"));
        assert!(contains(&bytes, "Generated: 2024-03-01 09:30:00 | Project ID: 42"));
        assert!(contains(&bytes, "(Start)"));
    }

    #[test]
    fn test_unnamed_diagram_uses_fallback_title() {
        let bytes = compose(&Metadata::default());
        assert!(contains(&bytes, FALLBACK_TITLE));
    }

    #[test]
    fn test_deflate_is_zlib() {
        let raw = vec![7u8; 300];
        let mut decoded = Vec::new();
        ZlibDecoder::new(deflate(&raw).unwrap().as_slice())
            .read_to_end(&mut decoded)
            .unwrap();
        assert_eq!(decoded, raw);
    }

    #[test]
    fn test_win_ansi_replaces_wide_chars() {
        assert_eq!(win_ansi("é→a"), vec![0xE9, b'?', b'a']);
    }
}

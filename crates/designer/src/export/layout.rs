//! Page geometry for the exported document.
//!
//! A4 pages, landscape when the captured image is wider than tall. The
//! image fills the width between the margins first; if that would run into
//! the footer it is capped by height instead. Aspect ratio is always kept.

/// A4 short side (millimetres)
pub const A4_SHORT_MM: f64 = 210.0;
/// A4 long side (millimetres)
pub const A4_LONG_MM: f64 = 297.0;
/// Distance from the top edge to the top of the image (millimetres)
pub const IMAGE_TOP_MM: f64 = 25.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Portrait,
    Landscape,
}

/// A rectangle on the page, in millimetres from the top-left corner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLayout {
    pub orientation: Orientation,
    pub page_width: f64,
    pub page_height: f64,
    pub margin: f64,
    pub image: Placement,
}

/// Lay out an image of `width` x `height` pixels on an A4 page.
///
/// `vertical_allowance` is the total height kept free for header and footer.
#[must_use]
pub fn layout_page(width: u32, height: u32, margin: f64, vertical_allowance: f64) -> PageLayout {
    let orientation = if width > height {
        Orientation::Landscape
    } else {
        Orientation::Portrait
    };
    let (page_width, page_height) = match orientation {
        Orientation::Landscape => (A4_LONG_MM, A4_SHORT_MM),
        Orientation::Portrait => (A4_SHORT_MM, A4_LONG_MM),
    };

    let aspect = if height == 0 {
        1.0
    } else {
        f64::from(width.max(1)) / f64::from(height)
    };

    let max_width = (page_width - margin * 2.0).max(1.0);
    let max_height = (page_height - vertical_allowance).max(1.0);

    let mut image_width = max_width;
    let mut image_height = image_width / aspect;
    if image_height > max_height {
        image_height = max_height;
        image_width = image_height * aspect;
    }

    PageLayout {
        orientation,
        page_width,
        page_height,
        margin,
        image: Placement {
            x: (page_width - image_width) / 2.0,
            y: IMAGE_TOP_MM,
            width: image_width,
            height: image_height,
        },
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_wide_image_is_landscape_and_fills_width() {
        let layout = layout_page(3000, 1000, 10.0, 40.0);
        assert_eq!(layout.orientation, Orientation::Landscape);
        assert!(close(layout.page_width, 297.0));
        assert!(close(layout.image.width, 277.0));
        assert!(close(layout.image.height, 277.0 / 3.0));
        assert!(close(layout.image.x, 10.0));
    }

    #[test]
    fn test_tall_image_is_height_capped_and_centered() {
        let layout = layout_page(1000, 3000, 10.0, 40.0);
        assert_eq!(layout.orientation, Orientation::Portrait);
        assert!(close(layout.image.height, 257.0));
        assert!(close(layout.image.width, 257.0 / 3.0));
        assert!(close(layout.image.x, (210.0 - 257.0 / 3.0) / 2.0));
        assert!(close(layout.image.y, IMAGE_TOP_MM));
    }

    #[test]
    fn test_square_image_is_portrait() {
        let layout = layout_page(500, 500, 10.0, 40.0);
        assert_eq!(layout.orientation, Orientation::Portrait);
        assert!(close(layout.image.width, 190.0));
        assert!(close(layout.image.height, 190.0));
    }

    proptest! {
        #[test]
        fn prop_image_keeps_aspect_and_fits(w in 1u32..10_000, h in 1u32..10_000) {
            let layout = layout_page(w, h, 10.0, 40.0);
            let image = layout.image;
            let expected = f64::from(w) / f64::from(h);

            prop_assert!((image.width / image.height - expected).abs() < 1e-6 * expected.max(1.0));
            prop_assert!(image.width <= layout.page_width - 20.0 + 1e-9);
            prop_assert!(image.height <= layout.page_height - 40.0 + 1e-9);
            prop_assert!(image.x >= 10.0 - 1e-9);
        }
    }
}

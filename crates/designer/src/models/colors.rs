//! RGB colors for node fills, borders, and connectors

/// RGB color representation (0-255 per channel)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RgbColor {
    pub const WHITE: Self = Self::new(255, 255, 255);
    pub const BLACK: Self = Self::new(0, 0, 0);

    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Convert to CSS rgb() string
    #[must_use]
    pub fn to_css(&self) -> String {
        format!("rgb({}, {}, {})", self.r, self.g, self.b)
    }

    /// Convert to hex string (#RRGGBB)
    #[must_use]
    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// Parse `#RRGGBB` or `#RGB` (case-insensitive)
    #[must_use]
    pub fn parse_hex(value: &str) -> Option<Self> {
        let hex = value.trim().strip_prefix('#')?;
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();

        match hex.len() {
            6 => Some(Self::new(
                channel(hex.get(0..2)?)?,
                channel(hex.get(2..4)?)?,
                channel(hex.get(4..6)?)?,
            )),
            3 => {
                let expand = |s: &str| channel(s).map(|v| v * 17);
                Some(Self::new(
                    expand(hex.get(0..1)?)?,
                    expand(hex.get(1..2)?)?,
                    expand(hex.get(2..3)?)?,
                ))
            }
            _ => None,
        }
    }
}

/// Darken a color by a fraction (for borders)
///
/// # Examples
///
/// ```
/// use flowdesign_designer::models::colors::{RgbColor, darken_color};
///
/// let color = RgbColor::new(200, 200, 200);
/// let darker = darken_color(&color, 0.3);
/// assert!(darker.r < color.r);
/// ```
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn darken_color(color: &RgbColor, amount: f32) -> RgbColor {
    let factor = 1.0 - amount.clamp(0.0, 1.0);
    RgbColor::new(
        (f32::from(color.r) * factor) as u8,
        (f32::from(color.g) * factor) as u8,
        (f32::from(color.b) * factor) as u8,
    )
}

//! Designer configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prefix shared by every environment override
pub const ENV_PREFIX: &str = "FLOWDESIGN_";

/// Configuration loading failures
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("unsupported config format '{0}' (expected .toml or .json)")]
    UnsupportedFormat(String),

    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Tunables for the designer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignerConfig {
    /// Quiet window before a burst of changes is reported (milliseconds).
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Delay before a node click selects the node (milliseconds).
    #[serde(default = "default_click_delay_ms")]
    pub click_delay_ms: u64,

    /// Pixel density multiplier for export rasterization.
    #[serde(default = "default_pixel_ratio")]
    pub pixel_ratio: f64,

    /// Left/right page margin (millimetres).
    #[serde(default = "default_page_margin_mm")]
    pub page_margin_mm: f64,

    /// Space reserved above and below the image for header and footer (millimetres).
    #[serde(default = "default_vertical_allowance_mm")]
    pub vertical_allowance_mm: f64,

    /// Exported file stem used when the diagram has no name.
    #[serde(default = "default_file_stem")]
    pub default_file_stem: String,

    /// Edge stroke width applied while rasterizing.
    #[serde(default = "default_enhanced_edge_stroke_width")]
    pub enhanced_edge_stroke_width: f64,
}

impl Default for DesignerConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            click_delay_ms: default_click_delay_ms(),
            pixel_ratio: default_pixel_ratio(),
            page_margin_mm: default_page_margin_mm(),
            vertical_allowance_mm: default_vertical_allowance_mm(),
            default_file_stem: default_file_stem(),
            enhanced_edge_stroke_width: default_enhanced_edge_stroke_width(),
        }
    }
}

impl DesignerConfig {
    #[must_use]
    pub const fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    #[must_use]
    pub const fn click_delay(&self) -> Duration {
        Duration::from_millis(self.click_delay_ms)
    }

    /// Set the debounce window.
    #[must_use]
    pub const fn debounce_ms(mut self, ms: u64) -> Self {
        self.debounce_ms = ms;
        self
    }

    /// Set the export pixel ratio.
    #[must_use]
    pub const fn pixel_ratio(mut self, ratio: f64) -> Self {
        self.pixel_ratio = ratio;
        self
    }

    /// Reject values the export layout cannot work with.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, reason: &str| {
            Err(ConfigError::InvalidValue {
                key: key.to_string(),
                reason: reason.to_string(),
            })
        };

        if !self.pixel_ratio.is_finite() || self.pixel_ratio <= 0.0 {
            return invalid("pixel_ratio", "must be a positive number");
        }
        if !self.page_margin_mm.is_finite() || !(0.0..100.0).contains(&self.page_margin_mm) {
            return invalid("page_margin_mm", "must be between 0 and 100");
        }
        if !self.vertical_allowance_mm.is_finite()
            || !(0.0..200.0).contains(&self.vertical_allowance_mm)
        {
            return invalid("vertical_allowance_mm", "must be between 0 and 200");
        }
        if self.default_file_stem.trim().is_empty() {
            return invalid("default_file_stem", "must not be empty");
        }
        if !self.enhanced_edge_stroke_width.is_finite() || self.enhanced_edge_stroke_width <= 0.0 {
            return invalid("enhanced_edge_stroke_width", "must be a positive number");
        }
        Ok(())
    }

    /// Load configuration from environment variables over the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(|key| std::env::var(format!("{ENV_PREFIX}{key}")).ok())
    }

    /// Apply overrides from a lookup keyed by upper-case field name.
    ///
    /// # Errors
    ///
    /// Returns an error if a value is present but does not parse.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        fn parse<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError>
        where
            T::Err: std::fmt::Display,
        {
            raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
                key: format!("{ENV_PREFIX}{key}"),
                reason: e.to_string(),
            })
        }

        if let Some(raw) = lookup("DEBOUNCE_MS") {
            self.debounce_ms = parse("DEBOUNCE_MS", &raw)?;
        }
        if let Some(raw) = lookup("CLICK_DELAY_MS") {
            self.click_delay_ms = parse("CLICK_DELAY_MS", &raw)?;
        }
        if let Some(raw) = lookup("PIXEL_RATIO") {
            self.pixel_ratio = parse("PIXEL_RATIO", &raw)?;
        }
        if let Some(raw) = lookup("PAGE_MARGIN_MM") {
            self.page_margin_mm = parse("PAGE_MARGIN_MM", &raw)?;
        }
        if let Some(raw) = lookup("VERTICAL_ALLOWANCE_MM") {
            self.vertical_allowance_mm = parse("VERTICAL_ALLOWANCE_MM", &raw)?;
        }
        if let Some(raw) = lookup("DEFAULT_FILE_STEM") {
            self.default_file_stem = raw;
        }
        if let Some(raw) = lookup("ENHANCED_EDGE_STROKE_WIDTH") {
            self.enhanced_edge_stroke_width = parse("ENHANCED_EDGE_STROKE_WIDTH", &raw)?;
        }

        self.validate()?;
        Ok(self)
    }

    /// Load configuration from a `.toml` or `.json` file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, has another extension,
    /// does not parse, or holds invalid values.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let config: Self = match extension.as_str() {
            "json" => serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?,
            "toml" => toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?,
            other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
        };

        config.validate()?;
        Ok(config)
    }
}

const fn default_debounce_ms() -> u64 {
    100
}

const fn default_click_delay_ms() -> u64 {
    50
}

const fn default_pixel_ratio() -> f64 {
    3.0
}

const fn default_page_margin_mm() -> f64 {
    10.0
}

const fn default_vertical_allowance_mm() -> f64 {
    40.0
}

fn default_file_stem() -> String {
    "functional_flow_diagram".to_string()
}

const fn default_enhanced_edge_stroke_width() -> f64 {
    2.0
}

//! Reflow configuration
//!
//! Every knob has a default matching the behavior of the tool without a
//! configuration file. A TOML file may override any subset of them, and the
//! CLI may override the file.
//!
//! ```toml
//! font_path = "fonts/FiraGO-Regular.ttf"
//! base_font_size = 14.0
//! min_font_size = 8.0
//! line_spacing = 1.2
//! ```

use std::path::{Path, PathBuf};
use serde::Deserialize;
use crate::error::{Error, Result};

/// Layout and font parameters for one reflow run
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReflowConfig {
    /// TrueType/OpenType file used for the replacement text
    pub font_path: Option<PathBuf>,
    /// Font size given to every line before overlap adjustment
    pub base_font_size: f32,
    /// Overlap adjustment never shrinks a line below this size
    pub min_font_size: f32,
    /// How much an overlapping line shrinks, in points
    pub size_step: f32,
    /// Line height as a multiple of font size
    pub line_spacing: f32,
    /// Spans whose tops differ by less than this share a line
    pub line_tolerance: f32,
    /// Horizontal gap between spans that becomes a space
    pub span_gap: f32,
    /// Vertical overlap (points) above which a line is shrunk
    pub overlap_threshold: f32,
    /// Gap left below the previous line when a shrunk line is pushed down
    pub push_down_gap: f32,
    /// Lower clamp of the horizontal morph scale
    pub min_scale: f32,
    /// Upper clamp of the horizontal morph scale
    pub max_scale: f32,
    /// Baseline offset below the line top, as a fraction of font size
    pub baseline_ratio: f32,
}

impl Default for ReflowConfig {
    fn default() -> Self {
        Self {
            font_path: None,
            base_font_size: 14.0,
            min_font_size: 8.0,
            size_step: 2.0,
            line_spacing: 1.2,
            line_tolerance: 5.0,
            span_gap: 2.0,
            overlap_threshold: 2.0,
            push_down_gap: 2.0,
            min_scale: 0.7,
            max_scale: 1.3,
            baseline_ratio: 0.8,
        }
    }
}

impl ReflowConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&content)?;

        // Relative font paths are resolved against the config file's directory
        if let (Some(font), Some(dir)) = (config.font_path.as_ref(), path.parent()) {
            if font.is_relative() {
                config.font_path = Some(dir.join(font));
            }
        }

        Ok(config)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| Error::Config(format!("TOML parsing error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Line height for a given font size
    pub fn line_height(&self, font_size: f32) -> f32 {
        font_size * self.line_spacing
    }

    /// Check that the values describe a usable layout
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("base_font_size", self.base_font_size),
            ("min_font_size", self.min_font_size),
            ("line_spacing", self.line_spacing),
            ("min_scale", self.min_scale),
            ("max_scale", self.max_scale),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::Config(format!("{} must be a positive number, got {}", name, value)));
            }
        }

        let non_negative = [
            ("size_step", self.size_step),
            ("line_tolerance", self.line_tolerance),
            ("span_gap", self.span_gap),
            ("overlap_threshold", self.overlap_threshold),
            ("push_down_gap", self.push_down_gap),
            ("baseline_ratio", self.baseline_ratio),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(Error::Config(format!("{} must not be negative, got {}", name, value)));
            }
        }

        if self.min_font_size > self.base_font_size {
            return Err(Error::Config(format!(
                "min_font_size ({}) is larger than base_font_size ({})",
                self.min_font_size, self.base_font_size
            )));
        }

        if self.min_scale > self.max_scale {
            return Err(Error::Config(format!(
                "min_scale ({}) is larger than max_scale ({})",
                self.min_scale, self.max_scale
            )));
        }

        Ok(())
    }
}

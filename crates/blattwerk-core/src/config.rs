// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{BlattwerkError, Result};

/// Smallest header band that holds the title, two summary lines, and the
/// separator rule.
pub const MIN_HEADER_BAND_MM: f32 = 31.0;

/// Page layout and execution settings for a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Canvas size for every page.
    pub paper_size: crate::PaperSize,
    /// Minimum horizontal page margin, in millimetres.
    pub margin_mm: f32,
    /// Height of the annotation header band on page 1, in millimetres.
    pub header_band_mm: f32,
    /// Draw a "Page i of N" label in the bottom-right corner.
    pub page_labels: bool,
    /// Decode, enhance, and encode images on the rayon thread pool.
    pub parallel: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            paper_size: crate::PaperSize::A4,
            margin_mm: 10.0,
            header_band_mm: 32.0,
            page_labels: true,
            parallel: false,
        }
    }
}

impl PipelineConfig {
    /// Load settings from a JSON file. Missing keys take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject layouts that leave no room for page content.
    pub fn validate(&self) -> Result<()> {
        let (width_mm, height_mm) = self.paper_size.dimensions_mm();
        if !(width_mm > 0.0 && height_mm > 0.0) {
            return Err(BlattwerkError::InvalidInput(format!(
                "paper size must be positive, got {width_mm}x{height_mm} mm"
            )));
        }
        if !(self.margin_mm >= 0.0 && self.margin_mm * 2.0 < width_mm) {
            return Err(BlattwerkError::InvalidInput(format!(
                "margin {} mm does not fit a {width_mm} mm wide page",
                self.margin_mm
            )));
        }
        if !(self.header_band_mm >= MIN_HEADER_BAND_MM) {
            return Err(BlattwerkError::InvalidInput(format!(
                "header band {} mm is too short for the header text (minimum {MIN_HEADER_BAND_MM} mm)",
                self.header_band_mm
            )));
        }
        if self.header_band_mm >= height_mm {
            return Err(BlattwerkError::InvalidInput(format!(
                "header band {} mm does not fit a {height_mm} mm tall page",
                self.header_band_mm
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PaperSize;

    #[test]
    fn defaults_are_valid() {
        let config = PipelineConfig::default();
        assert_eq!(config.paper_size, PaperSize::A4);
        assert!(config.page_labels);
        assert!(!config.parallel);
        config.validate().unwrap();
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blattwerk.json");
        std::fs::write(&path, r#"{"paper_size": "Letter", "parallel": true}"#).unwrap();

        let config = PipelineConfig::from_file(&path).unwrap();
        assert_eq!(config.paper_size, PaperSize::Letter);
        assert!(config.parallel);
        assert_eq!(config.margin_mm, 10.0);
    }

    #[test]
    fn oversized_margin_rejected() {
        let config = PipelineConfig {
            margin_mm: 120.0,
            ..PipelineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(BlattwerkError::InvalidInput(_))
        ));
    }

    #[test]
    fn header_band_must_hold_header_text() {
        for header_band_mm in [0.0, 12.5, MIN_HEADER_BAND_MM - 0.5, f32::NAN] {
            let config = PipelineConfig {
                header_band_mm,
                ..PipelineConfig::default()
            };
            assert!(
                matches!(config.validate(), Err(BlattwerkError::InvalidInput(_))),
                "band {header_band_mm}"
            );
        }
        let config = PipelineConfig {
            header_band_mm: MIN_HEADER_BAND_MM,
            ..PipelineConfig::default()
        };
        config.validate().unwrap();
    }

    #[test]
    fn header_band_taller_than_page_rejected() {
        let config = PipelineConfig {
            paper_size: PaperSize::A5,
            header_band_mm: 250.0,
            ..PipelineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(BlattwerkError::InvalidInput(_))
        ));
    }

    #[test]
    fn malformed_file_is_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            PipelineConfig::from_file(&path),
            Err(BlattwerkError::Serialization(_))
        ));
    }
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Blattwerk scan-to-PDF pipeline.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{BlattwerkError, Result};

/// Points per millimetre (1 pt = 1/72 in, 1 in = 25.4 mm).
pub const PT_PER_MM: f32 = 72.0 / 25.4;

/// Output quality presets trading file size against fidelity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QualityTier {
    /// Smallest file size. Good for text documents.
    Low,
    /// Balanced. Best for email sharing.
    #[default]
    Medium,
    /// Highest detail. Best for printing.
    High,
}

impl QualityTier {
    pub const ALL: [QualityTier; 3] = [Self::Low, Self::Medium, Self::High];

    /// Upper bound, in pixels, for the larger raster dimension.
    pub fn max_width(&self) -> u32 {
        match self {
            Self::Low => 1000,
            Self::Medium => 1600,
            Self::High => 2400,
        }
    }

    /// Lossy compression factor in `(0, 1]`.
    pub fn compression_factor(&self) -> f32 {
        match self {
            Self::Low => 0.50,
            Self::Medium => 0.75,
            Self::High => 0.92,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

impl FromStr for QualityTier {
    type Err = BlattwerkError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(BlattwerkError::InvalidInput(format!(
                "unknown quality tier '{other}' (expected low, medium, or high)"
            ))),
        }
    }
}

/// Visual filter applied to every page before compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VisualMode {
    /// Pixels pass through untouched.
    #[default]
    Original,
    /// Perceptual luminance on all three channels.
    Grayscale,
    /// Luminance with a strong contrast curve and brightness lift.
    DocumentContrast,
    /// Shading correction against a blurred background estimate, followed by
    /// a black/white point stretch.
    #[serde(alias = "shadow-removal")]
    ShadowRemovalEnhanced,
}

impl VisualMode {
    pub const ALL: [VisualMode; 4] = [
        Self::Original,
        Self::Grayscale,
        Self::DocumentContrast,
        Self::ShadowRemovalEnhanced,
    ];

    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::Grayscale => "grayscale",
            Self::DocumentContrast => "document-contrast",
            Self::ShadowRemovalEnhanced => "shadow-removal",
        }
    }
}

impl fmt::Display for VisualMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

impl FromStr for VisualMode {
    type Err = BlattwerkError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "original" => Ok(Self::Original),
            "grayscale" | "greyscale" | "gray" | "grey" => Ok(Self::Grayscale),
            "document-contrast" | "contrast" => Ok(Self::DocumentContrast),
            "shadow-removal" | "shadow-removal-enhanced" | "shadow" => {
                Ok(Self::ShadowRemovalEnhanced)
            }
            other => Err(BlattwerkError::InvalidInput(format!(
                "unknown visual mode '{other}' (expected original, grayscale, \
                 document-contrast, or shadow-removal)"
            ))),
        }
    }
}

/// Standard paper sizes.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum PaperSize {
    #[default]
    A4,
    A3,
    A5,
    Letter,
    Legal,
    Custom { width_mm: f32, height_mm: f32 },
}

impl PaperSize {
    /// Dimensions in millimetres (width, height).
    pub fn dimensions_mm(&self) -> (f32, f32) {
        match self {
            Self::A4 => (210.0, 297.0),
            Self::A3 => (297.0, 420.0),
            Self::A5 => (148.0, 210.0),
            Self::Letter => (215.9, 279.4),
            Self::Legal => (215.9, 355.6),
            Self::Custom {
                width_mm,
                height_mm,
            } => (*width_mm, *height_mm),
        }
    }

    /// Dimensions in PDF points (width, height).
    pub fn dimensions_pt(&self) -> (f32, f32) {
        let (w, h) = self.dimensions_mm();
        (w * PT_PER_MM, h * PT_PER_MM)
    }
}

/// MIME types the rasterizer can decode.
pub const SUPPORTED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/webp",
    "image/gif",
    "image/bmp",
    "image/tiff",
];

/// A raw page photograph as handed over by the uploader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    data: Vec<u8>,
    /// Declared MIME type; empty means "sniff from content".
    mime_type: String,
}

impl SourceImage {
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
        }
    }

    /// Image with no declared type; the decoder sniffs the format.
    pub fn sniffed(data: Vec<u8>) -> Self {
        Self::new(data, String::new())
    }

    /// Read an image file, inferring the MIME type from its extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let mime = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(mime_from_extension)
            .unwrap_or_default();
        Ok(Self::new(data, mime))
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Whether the declared type is one the pipeline accepts. Undeclared
    /// types are accepted and left to the decoder.
    pub fn has_supported_type(&self) -> bool {
        let declared = self.mime_type.trim();
        declared.is_empty()
            || SUPPORTED_MIME_TYPES
                .iter()
                .any(|mime| mime.eq_ignore_ascii_case(declared))
    }
}

/// Infer an image MIME type from a file extension.
pub fn mime_from_extension(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        "tif" | "tiff" => Some("image/tiff"),
        _ => None,
    }
}

/// A single label/value pair read off the document by the AI collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedField {
    pub label: String,
    pub value: String,
}

/// Classification result supplied by the external vision service.
///
/// Field names follow the service's JSON (`documentType`, `extractedData`).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub document_type: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_filename: Option<String>,
    #[serde(default)]
    pub extracted_data: Vec<ExtractedField>,
}

impl Annotation {
    pub fn new(document_type: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            document_type: document_type.into(),
            summary: summary.into(),
            suggested_filename: None,
            extracted_data: Vec::new(),
        }
    }

    pub fn with_field(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.extracted_data.push(ExtractedField {
            label: label.into(),
            value: value.into(),
        });
        self
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Document-level metadata derived from this annotation.
    pub fn metadata(&self) -> DocumentMetadata {
        DocumentMetadata {
            title: self.document_type.clone(),
            subject: self.summary.clone(),
            keywords: self
                .extracted_data
                .iter()
                .map(|field| field.label.trim().to_string())
                .filter(|label| !label.is_empty())
                .collect(),
        }
    }

    /// The suggested filename reduced to `[A-Za-z0-9_-]`, with `.pdf`
    /// appended. `None` when nothing usable remains.
    pub fn output_file_name(&self) -> Option<String> {
        let raw = self.suggested_filename.as_deref()?.trim();
        let stem = raw
            .strip_suffix(".pdf")
            .or_else(|| raw.strip_suffix(".PDF"))
            .unwrap_or(raw);
        let cleaned: String = stem
            .chars()
            .map(|c| match c {
                'A'..='Z' | 'a'..='z' | '0'..='9' | '_' | '-' => c,
                _ => '_',
            })
            .collect();
        let cleaned = cleaned.trim_matches('_');
        if cleaned.is_empty() {
            None
        } else {
            Some(format!("{cleaned}.pdf"))
        }
    }
}

/// Standard document metadata embedded in the PDF `/Info` dictionary.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: String,
    pub subject: String,
    pub keywords: Vec<String>,
}

impl DocumentMetadata {
    /// Keywords in the comma-separated form used by `/Keywords`.
    pub fn keywords_joined(&self) -> String {
        self.keywords.join(", ")
    }
}

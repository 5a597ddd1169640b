// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Blattwerk.

use thiserror::Error;

/// Top-level error type for all Blattwerk operations.
#[derive(Debug, Error)]
pub enum BlattwerkError {
    // -- Input validation --
    #[error("invalid input: {0}")]
    InvalidInput(String),

    // -- Per-image stages --
    #[error("image could not be decoded: {0}")]
    Decode(String),

    #[error("image encoding failed: {0}")]
    Encoding(String),

    /// A per-image failure tagged with the 0-based position of the image in
    /// the input batch.
    #[error("image at position {index} failed: {source}")]
    Image {
        index: usize,
        #[source]
        source: Box<BlattwerkError>,
    },

    // -- Document assembly --
    #[error("PDF emission failed: {0}")]
    Emission(String),

    #[error("PDF could not be read: {0}")]
    PdfRead(String),

    #[error("document generation cancelled")]
    Cancelled,

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BlattwerkError {
    /// Tag this error with the position of the image that produced it.
    ///
    /// Errors that are already tagged keep their original index.
    pub fn at_image(self, index: usize) -> Self {
        match self {
            tagged @ Self::Image { .. } => tagged,
            other => Self::Image {
                index,
                source: Box::new(other),
            },
        }
    }

    /// Position of the offending image, if this error is tied to one.
    pub fn image_index(&self) -> Option<usize> {
        match self {
            Self::Image { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// The underlying error with any image tagging peeled off.
    pub fn root(&self) -> &BlattwerkError {
        match self {
            Self::Image { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BlattwerkError>;

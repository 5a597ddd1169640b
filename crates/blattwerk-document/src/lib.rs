// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// blattwerk-document — Document processing for Blattwerk.
//
// Turns photographed pages into a paginated PDF: decode and resample
// (image), visual enhancement (scan), JPEG encoding, page layout and PDF
// assembly (pdf), tied together by the document pipeline.

pub mod image;
pub mod pdf;
pub mod pipeline;
pub mod scan;

// Re-export the primary entry points so callers can use `blattwerk_document::PdfReader` etc.
pub use image::{EncodedImage, Raster, Rasterizer};
pub use pdf::{PageCompositor, PdfReader, PdfWriter};
pub use pipeline::{CancellationFlag, DocumentPipeline, generate_document, process_image};
pub use scan::enhance;

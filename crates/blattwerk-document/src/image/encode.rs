// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Encoder — baseline JPEG compression of a finished raster.

use blattwerk_core::error::{BlattwerkError, Result};
use image::ExtendedColorType;
use image::codecs::jpeg::JpegEncoder;
use tracing::{debug, instrument};

use super::raster::Raster;

/// A compressed page image ready to be placed in a PDF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    /// Baseline JPEG stream (JFIF).
    pub data: Vec<u8>,
    /// Pixel width of the encoded image.
    pub width: u32,
    /// Pixel height of the encoded image.
    pub height: u32,
}

impl EncodedImage {
    /// Width divided by height.
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

/// Map a compression factor in `(0, 1]` to a JPEG quality in `1..=100`.
pub fn jpeg_quality(factor: f32) -> Result<u8> {
    if !(factor > 0.0 && factor <= 1.0) {
        return Err(BlattwerkError::InvalidInput(format!(
            "compression factor must be in (0, 1], got {factor}"
        )));
    }
    Ok((factor * 100.0).round().clamp(1.0, 100.0) as u8)
}

/// Compress `raster` as a baseline JPEG.
///
/// Higher factors produce larger, more faithful output. The same raster and
/// factor always produce byte-identical output.
#[instrument(skip(raster), fields(width = raster.width(), height = raster.height()))]
pub fn encode(raster: Raster, factor: f32) -> Result<EncodedImage> {
    let quality = jpeg_quality(factor)?;
    if raster.layout().has_alpha() {
        return Err(BlattwerkError::Encoding(format!(
            "{:?} rasters cannot be stored in a baseline JPEG; flatten alpha first",
            raster.layout()
        )));
    }

    let (width, height) = (raster.width(), raster.height());
    let mut buffer = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    encoder
        .encode(raster.as_bytes(), width, height, ExtendedColorType::Rgb8)
        .map_err(|err| BlattwerkError::Encoding(format!("JPEG encoding failed: {err}")))?;

    debug!(quality, bytes = buffer.len(), "Raster encoded");
    Ok(EncodedImage {
        data: buffer,
        width,
        height,
    })
}

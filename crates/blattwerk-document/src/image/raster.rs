// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raster — an owned, row-major RGB or RGBA pixel buffer handed by value from
// one pipeline stage to the next.

use blattwerk_core::error::{BlattwerkError, Result};
use image::{GrayImage, Luma, RgbImage, RgbaImage};

/// Channel layout of a [`Raster`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelLayout {
    Rgb,
    Rgba,
}

impl PixelLayout {
    pub fn channels(&self) -> usize {
        match self {
            Self::Rgb => 3,
            Self::Rgba => 4,
        }
    }

    pub fn has_alpha(&self) -> bool {
        matches!(self, Self::Rgba)
    }
}

/// Perceptual luminance of an sRGB pixel (ITU-R BT.601 weights), unrounded.
pub fn luminance(r: u8, g: u8, b: u8) -> f32 {
    0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32
}

/// Round and clamp a channel value into `0..=255`.
pub fn clamp_channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Decoded pixel grid.
///
/// Invariant: `data.len() == width * height * layout.channels()` and both
/// dimensions are non-zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    layout: PixelLayout,
    data: Vec<u8>,
}

impl Raster {
    // -- Construction ---------------------------------------------------------

    /// Wrap a raw buffer, checking the size invariant.
    pub fn new(width: u32, height: u32, layout: PixelLayout, data: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(BlattwerkError::InvalidInput(format!(
                "raster dimensions must be positive, got {width}x{height}"
            )));
        }
        let expected = width as usize * height as usize * layout.channels();
        if data.len() != expected {
            return Err(BlattwerkError::InvalidInput(format!(
                "raster buffer holds {} bytes, expected {expected} for {width}x{height} {layout:?}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            layout,
            data,
        })
    }

    /// A raster where every pixel equals `pixel` (3 or 4 bytes, per layout).
    pub fn filled(width: u32, height: u32, layout: PixelLayout, pixel: &[u8]) -> Result<Self> {
        if pixel.len() != layout.channels() {
            return Err(BlattwerkError::InvalidInput(format!(
                "fill pixel has {} channels, layout {layout:?} needs {}",
                pixel.len(),
                layout.channels()
            )));
        }
        let count = width as usize * height as usize;
        Self::new(width, height, layout, pixel.repeat(count))
    }

    pub fn from_rgb_image(image: RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            layout: PixelLayout::Rgb,
            data: image.into_raw(),
        }
    }

    pub fn from_rgba_image(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            layout: PixelLayout::Rgba,
            data: image.into_raw(),
        }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Channel values of the pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let channels = self.layout.channels();
        let start = (y as usize * self.width as usize + x as usize) * channels;
        &self.data[start..start + channels]
    }

    /// Iterate over pixels in row-major order.
    pub fn pixels(&self) -> std::slice::ChunksExact<'_, u8> {
        self.data.chunks_exact(self.layout.channels())
    }

    pub fn pixels_mut(&mut self) -> std::slice::ChunksExactMut<'_, u8> {
        let channels = self.layout.channels();
        self.data.chunks_exact_mut(channels)
    }

    // -- Conversions ----------------------------------------------------------

    /// Rounded luminance of every pixel as a grayscale image. Alpha is ignored.
    pub fn luminance_plane(&self) -> GrayImage {
        let luma: Vec<u8> = self
            .pixels()
            .map(|px| clamp_channel(luminance(px[0], px[1], px[2])))
            .collect();
        GrayImage::from_raw(self.width, self.height, luma)
            .unwrap_or_else(|| GrayImage::from_pixel(self.width, self.height, Luma([0])))
    }

    /// Convert into an `image` RGB buffer, dropping alpha if present.
    pub fn into_rgb_image(self) -> RgbImage {
        let (width, height) = (self.width, self.height);
        let data = match self.layout {
            PixelLayout::Rgb => self.data,
            PixelLayout::Rgba => self
                .data
                .chunks_exact(4)
                .flat_map(|px| [px[0], px[1], px[2]])
                .collect(),
        };
        RgbImage::from_raw(width, height, data)
            .unwrap_or_else(|| RgbImage::new(width, height))
    }
}

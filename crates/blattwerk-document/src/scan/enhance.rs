// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan enhancement — grayscale conversion, document contrast remapping, and
// shadow removal by shading correction for photographed document pages.

use blattwerk_core::VisualMode;
use image::GrayImage;
use imageproc::filter::box_filter;
use tracing::{debug, info, instrument};

use crate::image::raster::{Raster, clamp_channel, luminance};

/// Contrast parameter `C` of the document contrast curve.
pub const DOCUMENT_CONTRAST: f32 = 120.0;

/// Flat brightness lift applied after the contrast curve.
pub const DOCUMENT_BRIGHTNESS: f32 = 25.0;

/// Values at or above this snap to white after shading correction.
pub const WHITE_POINT: f32 = 230.0;

/// Values at or below this snap to black after shading correction.
pub const BLACK_POINT: f32 = 50.0;

/// Smallest box radius used for the background estimate.
pub const MIN_BACKGROUND_RADIUS: u32 = 15;

/// Apply the filter for `mode`. The output always has the input's dimensions
/// and layout; alpha, when present, is left untouched.
#[instrument(skip(raster), fields(width = raster.width(), height = raster.height()))]
pub fn enhance(raster: Raster, mode: VisualMode) -> Raster {
    info!(%mode, "Enhancing page");
    match mode {
        VisualMode::Original => raster,
        VisualMode::Grayscale => grayscale(raster),
        VisualMode::DocumentContrast => document_contrast(raster),
        VisualMode::ShadowRemovalEnhanced => remove_shadows(raster),
    }
}

// -- Grayscale ----------------------------------------------------------------

/// Replace each pixel's colour channels with its rounded perceptual luminance.
pub fn grayscale(raster: Raster) -> Raster {
    map_luminance(raster, |luma| luma)
}

// -- Document contrast --------------------------------------------------------

/// Slope of the contrast curve for contrast parameter `c`.
pub fn contrast_factor(c: f32) -> f32 {
    259.0 * (c + 255.0) / (255.0 * (259.0 - c))
}

/// Push ink toward black and paper toward white.
///
/// `gray' = factor * (gray - 128) + 128 + 25` with `C = 120`, clamped.
pub fn document_contrast(raster: Raster) -> Raster {
    let factor = contrast_factor(DOCUMENT_CONTRAST);
    debug!(factor, "Document contrast curve");
    map_luminance(raster, |luma| {
        factor * (luma - 128.0) + 128.0 + DOCUMENT_BRIGHTNESS
    })
}

// -- Shadow removal -------------------------------------------------------------

/// Box radius of the background estimate for an image `width` pixels wide.
pub fn background_radius(width: u32) -> u32 {
    MIN_BACKGROUND_RADIUS.max((width as f64 * 0.025).floor() as u32)
}

/// Blurred luminance of `raster`, wide enough to erase text strokes while
/// keeping slow illumination gradients.
pub fn estimate_background(raster: &Raster) -> GrayImage {
    let radius = background_radius(raster.width());
    debug!(radius, "Estimating page background");
    box_filter(&raster.luminance_plane(), radius, radius)
}

/// Black/white point stretch applied after shading correction.
pub fn stretch_levels(value: f32) -> f32 {
    if value >= WHITE_POINT {
        255.0
    } else if value <= BLACK_POINT {
        0.0
    } else {
        (value - BLACK_POINT) * 255.0 / (WHITE_POINT - BLACK_POINT)
    }
}

/// Remove large-scale shadows and vignetting.
///
/// Each pixel's luminance is divided by the local background estimate, which
/// flattens uneven illumination, and the result is stretched back to full
/// black-on-white contrast.
pub fn remove_shadows(mut raster: Raster) -> Raster {
    let background = estimate_background(&raster);
    let background = background.as_raw();

    for (pixel, &bg) in raster.pixels_mut().zip(background.iter()) {
        let luma = luminance(pixel[0], pixel[1], pixel[2]);
        let ratio = if bg <= 1 {
            255.0
        } else {
            (luma / bg as f32 * 255.0).min(255.0)
        };
        let value = clamp_channel(stretch_levels(ratio));
        pixel[0] = value;
        pixel[1] = value;
        pixel[2] = value;
    }

    debug!("Shadow removal complete");
    raster
}

// -- Helpers --------------------------------------------------------------------

/// Set every pixel's colour channels to `curve(luminance)`, rounded and
/// clamped.
fn map_luminance(mut raster: Raster, curve: impl Fn(f32) -> f32) -> Raster {
    for pixel in raster.pixels_mut() {
        let value = clamp_channel(curve(luminance(pixel[0], pixel[1], pixel[2])));
        pixel[0] = value;
        pixel[1] = value;
        pixel[2] = value;
    }
    raster
}

// -- Tests --------------------------------------------------------------------

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rasterizer — decode a page photograph, flatten any transparency onto white
// paper, and downscale it to the bound of a quality tier.

use std::io::Cursor;

use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::{QualityTier, SourceImage};
use image::imageops::FilterType;
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageReader, Rgb, RgbImage};
use tracing::{debug, info, instrument};

use super::raster::Raster;

/// Bicubic resampling. Photographed text aliases badly under
/// nearest-neighbour, and Catmull-Rom keeps stroke edges crisp.
const RESAMPLE_FILTER: FilterType = FilterType::CatmullRom;

/// Turns encoded source images into print-ready RGB rasters.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rasterizer {
    quality: QualityTier,
}

impl Rasterizer {
    pub fn new(quality: QualityTier) -> Self {
        Self { quality }
    }

    /// Decode `source` and resample it to this rasterizer's tier.
    #[instrument(skip(self, source), fields(data_len = source.data().len(), mime = source.mime_type()))]
    pub fn rasterize(&self, source: &SourceImage) -> Result<Raster> {
        let decoded = decode(source.data())?;
        info!(
            width = decoded.width(),
            height = decoded.height(),
            tier = %self.quality,
            "Source image decoded"
        );
        let flattened = flatten_onto_white(decoded);
        let resized = self.resample(flattened);
        Ok(Raster::from_rgb_image(resized))
    }

    /// Downscale so the larger side fits the tier bound. Never upscales.
    pub fn resample(&self, image: RgbImage) -> RgbImage {
        let (from_w, from_h) = image.dimensions();
        let (to_w, to_h) = target_dimensions(from_w, from_h, self.quality.max_width());
        if (to_w, to_h) == (from_w, from_h) {
            debug!(from_w, from_h, "Within tier bound; no resampling");
            return image;
        }

        let resized = image::imageops::resize(&image, to_w, to_h, RESAMPLE_FILTER);
        debug!(from_w, from_h, to_w, to_h, "Resample complete");
        resized
    }
}

/// Output dimensions for an image whose larger side must not exceed `bound`.
///
/// The aspect ratio is kept to within rounding and neither side drops below
/// one pixel.
pub fn target_dimensions(width: u32, height: u32, bound: u32) -> (u32, u32) {
    let larger = width.max(height);
    if larger <= bound {
        return (width, height);
    }
    let scale = bound as f64 / larger as f64;
    let scaled = |side: u32| ((side as f64 * scale).round() as u32).clamp(1, bound);
    (scaled(width), scaled(height))
}

/// Decode raw bytes, sniffing the format from the content, and turn the
/// result upright according to any EXIF orientation tag.
fn decode(data: &[u8]) -> Result<DynamicImage> {
    if data.is_empty() {
        return Err(BlattwerkError::Decode("image data is empty".into()));
    }
    let decode_err = |err: image::ImageError| BlattwerkError::Decode(err.to_string());

    let mut decoder = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|err| BlattwerkError::Decode(err.to_string()))?
        .into_decoder()
        .map_err(decode_err)?;
    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
    let mut image = DynamicImage::from_decoder(decoder).map_err(decode_err)?;

    if orientation != Orientation::NoTransforms {
        debug!(?orientation, "Applying EXIF orientation");
        image.apply_orientation(orientation);
    }
    Ok(image)
}

/// Composite any alpha channel over an opaque white background.
fn flatten_onto_white(image: DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }

    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut output = RgbImage::new(width, height);
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = a as u32;
        let blend = |channel: u8| -> u8 {
            ((channel as u32 * alpha + 255 * (255 - alpha) + 127) / 255) as u8
        };
        output.put_pixel(x, y, Rgb([blend(r), blend(g), blend(b)]));
    }
    debug!(width, height, "Transparency flattened onto white");
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};

    fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buffer = Vec::new();
        image.write_to(&mut Cursor::new(&mut buffer), format).unwrap();
        buffer
    }

    fn png_source(width: u32, height: u32) -> SourceImage {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        SourceImage::new(
            encode(DynamicImage::ImageRgb8(img), ImageFormat::Png),
            "image/png",
        )
    }

    /// Splice an EXIF APP1 segment carrying only an orientation tag into a
    /// JPEG, after its JFIF header.
    fn with_exif_orientation(jpeg: Vec<u8>, orientation: u16) -> Vec<u8> {
        let mut tiff = b"MM\x00\x2A\x00\x00\x00\x08".to_vec();
        tiff.extend_from_slice(&1u16.to_be_bytes());
        tiff.extend_from_slice(&0x0112u16.to_be_bytes());
        tiff.extend_from_slice(&3u16.to_be_bytes());
        tiff.extend_from_slice(&1u32.to_be_bytes());
        tiff.extend_from_slice(&orientation.to_be_bytes());
        tiff.extend_from_slice(&[0, 0]);
        tiff.extend_from_slice(&0u32.to_be_bytes());

        let mut payload = b"Exif\x00\x00".to_vec();
        payload.extend_from_slice(&tiff);
        let mut segment = vec![0xFF, 0xE1];
        segment.extend_from_slice(&(payload.len() as u16 + 2).to_be_bytes());
        segment.extend_from_slice(&payload);

        let insert_at = if jpeg[2..4] == [0xFF, 0xE0] {
            4 + u16::from_be_bytes([jpeg[4], jpeg[5]]) as usize
        } else {
            2
        };
        let mut out = jpeg[..insert_at].to_vec();
        out.extend_from_slice(&segment);
        out.extend_from_slice(&jpeg[insert_at..]);
        out
    }

    #[test]
    fn exif_rotation_is_applied() {
        // Red on the left, blue on the right, stored sideways.
        let img = RgbImage::from_fn(40, 20, |x, _| {
            if x < 20 { Rgb([220, 20, 20]) } else { Rgb([20, 20, 220]) }
        });
        let jpeg = encode(DynamicImage::ImageRgb8(img), ImageFormat::Jpeg);
        let source = SourceImage::new(with_exif_orientation(jpeg, 6), "image/jpeg");

        let raster = Rasterizer::new(QualityTier::Medium).rasterize(&source).unwrap();
        assert_eq!((raster.width(), raster.height()), (20, 40));
        // A quarter turn clockwise brings the left edge to the top.
        let top = raster.pixel(10, 3);
        let bottom = raster.pixel(10, 36);
        assert!(top[0] > 150 && top[2] < 100, "top {top:?}");
        assert!(bottom[2] > 150 && bottom[0] < 100, "bottom {bottom:?}");
    }

    #[test]
    fn untagged_jpeg_keeps_orientation() {
        let img = RgbImage::from_pixel(40, 20, Rgb([128, 128, 128]));
        let source = SourceImage::new(
            encode(DynamicImage::ImageRgb8(img), ImageFormat::Jpeg),
            "image/jpeg",
        );
        let raster = Rasterizer::default().rasterize(&source).unwrap();
        assert_eq!((raster.width(), raster.height()), (40, 20));
    }

    #[test]
    fn target_dimensions_never_upscale() {
        assert_eq!(target_dimensions(800, 600, 1600), (800, 600));
        assert_eq!(target_dimensions(1600, 1200, 1600), (1600, 1200));
    }

    #[test]
    fn target_dimensions_bound_larger_side() {
        assert_eq!(target_dimensions(3200, 2400, 1600), (1600, 1200));
        assert_eq!(target_dimensions(3000, 4000, 2400), (1800, 2400));
        assert_eq!(target_dimensions(10_000, 3, 1000), (1000, 1));
    }

    #[test]
    fn output_width_within_source_and_tier() {
        for tier in QualityTier::ALL {
            for (w, h) in [(500, 700), (2000, 1500), (4000, 3000), (1200, 5000)] {
                let (out_w, out_h) = target_dimensions(w, h, tier.max_width());
                assert!(out_w <= w.min(tier.max_width()), "{tier}: {w}x{h} -> {out_w}");
                let in_ratio = w as f64 / h as f64;
                let out_ratio = out_w as f64 / out_h as f64;
                // Half a pixel of rounding on either side.
                let tolerance = in_ratio * (1.0 / out_w as f64 + 1.0 / out_h as f64);
                assert!(
                    (in_ratio - out_ratio).abs() <= tolerance,
                    "{tier}: {w}x{h} ratio {in_ratio} vs {out_ratio}"
                );
            }
        }
    }

    #[test]
    fn rasterize_downscales_png() {
        let raster = Rasterizer::new(QualityTier::Low)
            .rasterize(&png_source(2000, 1000))
            .unwrap();
        assert_eq!((raster.width(), raster.height()), (1000, 500));
    }

    #[test]
    fn rasterize_keeps_small_jpeg() {
        let img = RgbImage::from_pixel(320, 240, Rgb([200, 180, 160]));
        let source = SourceImage::new(
            encode(DynamicImage::ImageRgb8(img), ImageFormat::Jpeg),
            "image/jpeg",
        );
        let raster = Rasterizer::new(QualityTier::High).rasterize(&source).unwrap();
        assert_eq!((raster.width(), raster.height()), (320, 240));
    }

    #[test]
    fn transparent_pixels_become_white() {
        let mut img = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 0]));
        img.put_pixel(1, 1, Rgba([0, 0, 0, 255]));
        img.put_pixel(2, 2, Rgba([0, 0, 0, 128]));
        let source = SourceImage::sniffed(encode(DynamicImage::ImageRgba8(img), ImageFormat::Png));

        let raster = Rasterizer::new(QualityTier::Medium).rasterize(&source).unwrap();
        assert_eq!(raster.pixel(0, 0), &[255, 255, 255]);
        assert_eq!(raster.pixel(1, 1), &[0, 0, 0]);
        assert_eq!(raster.pixel(2, 2), &[127, 127, 127]);
    }

    #[test]
    fn garbage_is_decode_error() {
        let source = SourceImage::new(b"definitely not an image".to_vec(), "image/png");
        let err = Rasterizer::new(QualityTier::Medium).rasterize(&source).unwrap_err();
        assert!(matches!(err, BlattwerkError::Decode(_)));

        let empty = SourceImage::new(Vec::new(), "image/jpeg");
        assert!(matches!(
            Rasterizer::default().rasterize(&empty),
            Err(BlattwerkError::Decode(_))
        ));
    }
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module — the raster type, decode + resample, and JPEG encoding.

pub mod encode;
pub mod raster;
pub mod resample;

pub use encode::{EncodedImage, encode};
pub use raster::{PixelLayout, Raster};
pub use resample::Rasterizer;

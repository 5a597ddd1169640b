// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document pipeline — drive every source image through rasterize → enhance →
// encode, lay the results out as pages, and assemble one PDF.
//
// Images are processed one at a time in input order by default, each page
// appended to the writer as soon as it is ready. With `parallel` set in the
// configuration the per-image work runs on the rayon pool and pages are
// appended afterwards, still in input order.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::{Annotation, PipelineConfig, QualityTier, SourceImage, VisualMode};
use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

use crate::image::{EncodedImage, Rasterizer, encode};
use crate::pdf::layout::PageCompositor;
use crate::pdf::writer::PdfWriter;
use crate::scan::enhance;

/// Shared flag for cooperative cancellation of a running pipeline.
///
/// Clones observe the same flag, so one handle can be given to the caller
/// and another to the pipeline.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that the pipeline stop before its next image.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Turn one source image into a compressed page image.
#[instrument(skip(source), fields(data_len = source.data().len()))]
pub fn process_image(
    source: &SourceImage,
    quality: QualityTier,
    mode: VisualMode,
) -> Result<EncodedImage> {
    let raster = Rasterizer::new(quality).rasterize(source)?;
    let enhanced = enhance(raster, mode);
    encode(enhanced, quality.compression_factor())
}

/// Assemble a PDF from `images` with the default configuration.
pub fn generate_document(
    images: &[SourceImage],
    quality: QualityTier,
    mode: VisualMode,
    annotation: Option<&Annotation>,
) -> Result<Vec<u8>> {
    DocumentPipeline::default().generate(images, quality, mode, annotation)
}

/// Configured image-to-PDF pipeline.
#[derive(Debug, Clone, Default)]
pub struct DocumentPipeline {
    config: PipelineConfig,
    cancellation: Option<CancellationFlag>,
}

impl DocumentPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            cancellation: None,
        }
    }

    /// Observe `flag` before each image is processed.
    pub fn with_cancellation(mut self, flag: CancellationFlag) -> Self {
        self.cancellation = Some(flag);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Produce one PDF with a page per image, in input order.
    ///
    /// Any failure aborts the whole run; per-image failures carry the
    /// 0-based position of the offending image.
    #[instrument(skip_all, fields(images = images.len(), %quality, %mode, annotated = annotation.is_some()))]
    pub fn generate(
        &self,
        images: &[SourceImage],
        quality: QualityTier,
        mode: VisualMode,
        annotation: Option<&Annotation>,
    ) -> Result<Vec<u8>> {
        self.validate(images)?;
        info!(parallel = self.config.parallel, "Generating document");

        let compositor = PageCompositor::from_config(&self.config);
        let mut writer = PdfWriter::new(compositor.canvas());
        let total = images.len();

        if self.config.parallel {
            let encoded = self.process_parallel(images, quality, mode)?;
            for (index, image) in encoded.into_iter().enumerate() {
                writer.add_page(compositor.compose_page(index, total, image, annotation))?;
            }
        } else {
            for (index, source) in images.iter().enumerate() {
                self.check_cancelled()?;
                let image =
                    process_image(source, quality, mode).map_err(|err| err.at_image(index))?;
                writer.add_page(compositor.compose_page(index, total, image, annotation))?;
            }
        }

        // A cancel that lands after the last image still discards the document.
        self.check_cancelled()?;

        let metadata = annotation.map(Annotation::metadata);
        writer.finish(metadata.as_ref())
    }

    /// Decode, enhance, and encode every image on the rayon pool.
    ///
    /// All results are gathered before the first failure in input order is
    /// reported, so the lowest failing index wins.
    fn process_parallel(
        &self,
        images: &[SourceImage],
        quality: QualityTier,
        mode: VisualMode,
    ) -> Result<Vec<EncodedImage>> {
        debug!(threads = rayon::current_num_threads(), "Processing images in parallel");
        let results: Vec<Result<EncodedImage>> = images
            .par_iter()
            .enumerate()
            .map(|(index, source)| {
                self.check_cancelled()?;
                process_image(source, quality, mode).map_err(|err| err.at_image(index))
            })
            .collect();
        results.into_iter().collect()
    }

    fn validate(&self, images: &[SourceImage]) -> Result<()> {
        if images.is_empty() {
            return Err(BlattwerkError::InvalidInput(
                "at least one image is required".into(),
            ));
        }
        if let Some((index, source)) = images
            .iter()
            .enumerate()
            .find(|(_, source)| !source.has_supported_type())
        {
            return Err(BlattwerkError::InvalidInput(format!(
                "image at position {index} has unsupported type '{}'",
                source.mime_type()
            )));
        }
        self.config.validate()
    }

    fn check_cancelled(&self) -> Result<()> {
        match &self.cancellation {
            Some(flag) if flag.is_cancelled() => {
                warn!("Document generation cancelled");
                Err(BlattwerkError::Cancelled)
            }
            _ => Ok(()),
        }
    }
}

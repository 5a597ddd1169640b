// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Build command — run page images through the document pipeline and write
// the resulting PDF.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use tracing::{debug, info};

use blattwerk_core::{Annotation, PipelineConfig, QualityTier, SourceImage, VisualMode};
use blattwerk_document::DocumentPipeline;

/// Output file used when neither `--output` nor a suggested filename is given.
const DEFAULT_OUTPUT: &str = "document.pdf";

/// Arguments for the build command.
#[derive(Args)]
pub struct BuildArgs {
    /// Page images, in page order
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// Quality tier: low, medium, or high
    #[arg(short, long, default_value = "medium")]
    quality: QualityTier,

    /// Visual mode: original, grayscale, document-contrast, or shadow-removal
    #[arg(short, long, default_value = "original")]
    mode: VisualMode,

    /// Annotation JSON (documentType, summary, extractedData)
    #[arg(short, long)]
    annotation: Option<PathBuf>,

    /// Output PDF (default: the annotation's suggested filename, else document.pdf)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Process images on all cores
    #[arg(long)]
    parallel: bool,

    /// Pipeline configuration JSON
    #[arg(long)]
    config: Option<PathBuf>,
}

pub fn run(args: BuildArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if args.parallel {
        config.parallel = true;
    }

    let annotation = args
        .annotation
        .as_deref()
        .map(|path| {
            Annotation::from_file(path)
                .with_context(|| format!("failed to load annotation {}", path.display()))
        })
        .transpose()?;

    let images = args
        .images
        .iter()
        .map(|path| {
            SourceImage::from_path(path)
                .with_context(|| format!("failed to read image {}", path.display()))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let pipeline = DocumentPipeline::new(config);
    debug!(config = ?pipeline.config(), "Pipeline configuration");

    let pdf = pipeline
        .generate(&images, args.quality, args.mode, annotation.as_ref())
        .map_err(|err| {
            let culprit = err.image_index().and_then(|index| args.images.get(index));
            match culprit {
                Some(path) => anyhow::Error::new(err)
                    .context(format!("failed to process {}", path.display())),
                None => anyhow::Error::new(err).context("failed to generate document"),
            }
        })?;

    let output = output_path(args.output, annotation.as_ref());
    fs::write(&output, &pdf).with_context(|| format!("failed to write {}", output.display()))?;

    info!(output = %output.display(), bytes = pdf.len(), "Document written");
    println!(
        "Wrote {} ({} pages, {} bytes)",
        output.display(),
        images.len(),
        pdf.len()
    );
    Ok(())
}

/// Explicit output path, else the annotation's suggested name, else the default.
fn output_path(explicit: Option<PathBuf>, annotation: Option<&Annotation>) -> PathBuf {
    explicit
        .or_else(|| annotation.and_then(Annotation::output_file_name).map(PathBuf::from))
        .unwrap_or_else(|| Path::new(DEFAULT_OUTPUT).to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_output_wins() {
        let mut annotation = Annotation::new("Invoice", "");
        annotation.suggested_filename = Some("invoice-october".into());
        let path = output_path(Some(PathBuf::from("out.pdf")), Some(&annotation));
        assert_eq!(path, PathBuf::from("out.pdf"));
    }

    #[test]
    fn suggested_name_used_when_no_output() {
        let mut annotation = Annotation::new("Invoice", "");
        annotation.suggested_filename = Some("invoice october".into());
        assert_eq!(
            output_path(None, Some(&annotation)),
            PathBuf::from("invoice_october.pdf")
        );
    }

    #[test]
    fn falls_back_to_default_name() {
        assert_eq!(output_path(None, None), PathBuf::from(DEFAULT_OUTPUT));
        let annotation = Annotation::new("Receipt", "");
        assert_eq!(
            output_path(None, Some(&annotation)),
            PathBuf::from(DEFAULT_OUTPUT)
        );
    }
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Inspect command — print the page count and metadata of a PDF.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use blattwerk_document::PdfReader;

/// Arguments for the inspect command.
#[derive(Args)]
pub struct InspectArgs {
    /// PDF file to inspect
    #[arg(required = true)]
    input: PathBuf,

    /// Also list the text drawn on each page
    #[arg(long)]
    text: bool,
}

pub fn run(args: InspectArgs) -> anyhow::Result<()> {
    let reader = PdfReader::open(&args.input)
        .with_context(|| format!("failed to inspect {}", args.input.display()))?;
    let info = reader.info();

    println!("File:     {}", args.input.display());
    println!("Pages:    {}", reader.page_count());
    for (label, value) in [
        ("Title", &info.title),
        ("Subject", &info.subject),
        ("Keywords", &info.keywords),
        ("Producer", &info.producer),
    ] {
        if let Some(value) = value {
            println!("{:<10}{value}", format!("{label}:"));
        }
    }

    if args.text {
        for page in 1..=reader.page_count() as u32 {
            for run in reader.page_text(page)? {
                println!("[{page}] {run}");
            }
        }
    }

    Ok(())
}

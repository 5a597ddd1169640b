// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — page layout, document assembly, and inspection of the result.

pub mod layout;
pub mod reader;
pub mod writer;

pub use layout::{Page, PageCanvas, PageCompositor, Rect};
pub use reader::{DocumentInfo, ImagePlacement, PdfReader};
pub use writer::{PdfWriter, emit};

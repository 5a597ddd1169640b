// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan enhancement — visual filters applied to photographed pages before
// they are compressed and placed into the PDF.

pub mod enhance;

pub use enhance::enhance;

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader — open an assembled document and inspect its page count, `/Info`
// metadata, drawn text, and image placements using the `lopdf` crate.

use std::path::Path;

use blattwerk_core::error::{BlattwerkError, Result};
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, info, instrument};

use super::writer::WIN_ANSI_HIGH;

/// Text entries of a document's `/Info` dictionary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentInfo {
    pub title: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub producer: Option<String>,
}

/// Where an image XObject is drawn, in PDF user space (origin bottom-left).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImagePlacement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Read-only view of an existing PDF.
pub struct PdfReader {
    /// The underlying lopdf document.
    document: Document,
}

impl PdfReader {
    // -- Construction ---------------------------------------------------------

    /// Open a PDF from the filesystem.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_ref = path.as_ref();
        info!("Opening PDF: {}", path_ref.display());

        let document = Document::load(path_ref).map_err(|err| {
            BlattwerkError::PdfRead(format!("failed to open {}: {}", path_ref.display(), err))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded");

        Ok(Self { document })
    }

    /// Create a reader from raw PDF bytes already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data).map_err(|err| {
            BlattwerkError::PdfRead(format!("failed to load PDF from memory: {}", err))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");

        Ok(Self { document })
    }

    // -- Inspection -----------------------------------------------------------

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// Text entries of the `/Info` dictionary. Missing entries are `None`.
    pub fn info(&self) -> DocumentInfo {
        let Some(dict) = self.info_dictionary() else {
            return DocumentInfo::default();
        };
        let text = |key: &[u8]| dict.get(key).ok().and_then(decode_text_string);
        DocumentInfo {
            title: text(b"Title"),
            subject: text(b"Subject"),
            keywords: text(b"Keywords"),
            producer: text(b"Producer"),
        }
    }

    /// Width and height of page `page_number` (1-indexed) in points.
    pub fn page_size(&self, page_number: u32) -> Result<(f32, f32)> {
        let page_id = self.page_id(page_number)?;
        let media_box = self
            .document
            .get_dictionary(page_id)
            .and_then(|page| page.get(b"MediaBox"))
            .map_err(|err| {
                BlattwerkError::PdfRead(format!("page {page_number} has no /MediaBox: {err}"))
            })?;

        match media_box {
            Object::Array(values) if values.len() == 4 => {
                let numbers = values.iter().filter_map(number).collect::<Vec<_>>();
                match numbers.as_slice() {
                    [x0, y0, x1, y1] => Ok((x1 - x0, y1 - y0)),
                    _ => Err(BlattwerkError::PdfRead(format!(
                        "page {page_number} has a non-numeric /MediaBox"
                    ))),
                }
            }
            _ => Err(BlattwerkError::PdfRead(format!(
                "page {page_number} has a malformed /MediaBox"
            ))),
        }
    }

    /// Strings shown with `Tj` on page `page_number` (1-indexed), in drawing
    /// order. Assumes the WinAnsiEncoding of the standard fonts.
    pub fn page_text(&self, page_number: u32) -> Result<Vec<String>> {
        let content = self.page_content(page_number)?;
        Ok(content
            .operations
            .iter()
            .filter(|op| op.operator == "Tj")
            .filter_map(|op| op.operands.first())
            .filter_map(decode_win_ansi)
            .collect())
    }

    /// Rectangles of every image drawn on page `page_number` (1-indexed),
    /// taken from the `cm` that precedes each `Do`.
    pub fn image_placements(&self, page_number: u32) -> Result<Vec<ImagePlacement>> {
        let content = self.page_content(page_number)?;
        let mut placements = Vec::new();
        let mut matrix: Option<[f32; 6]> = None;

        for op in &content.operations {
            match op.operator.as_str() {
                "cm" => {
                    let values = op.operands.iter().filter_map(number).collect::<Vec<_>>();
                    matrix = <[f32; 6]>::try_from(values.as_slice()).ok();
                }
                "Do" => {
                    if let Some([a, _, _, d, e, f]) = matrix {
                        placements.push(ImagePlacement {
                            x: e,
                            y: f,
                            width: a,
                            height: d,
                        });
                    }
                }
                "Q" => matrix = None,
                _ => {}
            }
        }

        Ok(placements)
    }

    // -- Helpers --------------------------------------------------------------

    fn page_id(&self, page_number: u32) -> Result<ObjectId> {
        let pages = self.document.get_pages();
        pages.get(&page_number).copied().ok_or_else(|| {
            BlattwerkError::PdfRead(format!(
                "page {} out of range (document has {} pages)",
                page_number,
                pages.len()
            ))
        })
    }

    fn page_content(&self, page_number: u32) -> Result<Content> {
        let page_id = self.page_id(page_number)?;
        let raw = self.document.get_page_content(page_id).map_err(|err| {
            BlattwerkError::PdfRead(format!("cannot read content of page {page_number}: {err}"))
        })?;
        Content::decode(&raw).map_err(|err| {
            BlattwerkError::PdfRead(format!("cannot parse content of page {page_number}: {err}"))
        })
    }

    fn info_dictionary(&self) -> Option<&Dictionary> {
        match self.document.trailer.get(b"Info").ok()? {
            Object::Reference(id) => self.document.get_dictionary(*id).ok(),
            Object::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value as f32),
        _ => None,
    }
}

/// Decode a string shown in a WinAnsiEncoding font.
fn decode_win_ansi(object: &Object) -> Option<String> {
    let Object::String(bytes, _) = object else {
        return None;
    };
    Some(
        bytes
            .iter()
            .map(|&byte| {
                WIN_ANSI_HIGH
                    .iter()
                    .find(|&&(code, _)| code == byte)
                    .map_or(byte as char, |&(_, c)| c)
            })
            .collect(),
    )
}

/// Decode a PDF text string: UTF-16BE when it carries a byte-order mark,
/// single-byte Latin-1 otherwise.
fn decode_text_string(object: &Object) -> Option<String> {
    let Object::String(bytes, _) = object else {
        return None;
    };
    match bytes.as_slice() {
        [0xFE, 0xFF, rest @ ..] => {
            let units = rest
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect::<Vec<_>>();
            String::from_utf16(&units).ok()
        }
        latin1 => Some(latin1.iter().map(|&byte| byte as char).collect()),
    }
}

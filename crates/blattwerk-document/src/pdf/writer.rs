// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF writer — serialise composed pages and document metadata into a single
// self-contained PDF using `lopdf`.
//
// Pages are appended one at a time to a growing `lopdf::Document`; page
// images are embedded as-is as `DCTDecode` XObjects, so the JPEG produced by
// the encoder is never decoded or recompressed again.

use blattwerk_core::DocumentMetadata;
use blattwerk_core::error::{BlattwerkError, Result};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat, dictionary};
use tracing::{debug, info, instrument};

use super::layout::{Page, PageCanvas, Rule, StandardFont, TextRun};

/// Value written to the `/Producer` entry of every document.
pub const PRODUCER: &str = "Blattwerk";

/// Resource name of the page image in each page's `/XObject` dictionary.
const IMAGE_RESOURCE: &str = "Im1";

/// Incrementally builds a multi-page PDF.
///
/// ```ignore
/// let mut writer = PdfWriter::new(compositor.canvas());
/// for page in pages {
///     writer.add_page(page)?;
/// }
/// let bytes = writer.finish(Some(&annotation.metadata()))?;
/// ```
pub struct PdfWriter {
    document: Document,
    canvas: PageCanvas,
    /// Object id reserved for the `/Pages` tree root.
    pages_id: ObjectId,
    regular_font_id: ObjectId,
    bold_font_id: ObjectId,
    kids: Vec<Object>,
}

impl PdfWriter {
    /// Start an empty document whose pages all use `canvas`.
    pub fn new(canvas: PageCanvas) -> Self {
        let mut document = Document::with_version("1.7");
        let pages_id = document.new_object_id();
        let regular_font_id = document.add_object(font_dictionary("Helvetica"));
        let bold_font_id = document.add_object(font_dictionary("Helvetica-Bold"));

        Self {
            document,
            canvas,
            pages_id,
            regular_font_id,
            bold_font_id,
            kids: Vec::new(),
        }
    }

    /// Number of pages appended so far.
    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    // -- Page assembly ----------------------------------------------------------

    /// Append `page` as the last page of the document.
    #[instrument(skip_all, fields(number = page.number, image_bytes = page.image.data.len()))]
    pub fn add_page(&mut self, page: Page) -> Result<()> {
        let operations = self.page_operations(&page);
        let content = Content { operations }.encode().map_err(|err| {
            BlattwerkError::Emission(format!(
                "failed to encode content stream for page {}: {err}",
                page.number
            ))
        })?;

        let image_dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => Object::Integer(i64::from(page.image.width)),
            "Height" => Object::Integer(i64::from(page.image.height)),
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => Object::Integer(8),
            "Filter" => "DCTDecode",
        };
        let image_id = self
            .document
            .add_object(Stream::new(image_dict, page.image.data));
        let content_id = self
            .document
            .add_object(Stream::new(Dictionary::new(), content));

        let resources = dictionary! {
            "Font" => dictionary! {
                font_resource(StandardFont::Helvetica) => self.regular_font_id,
                font_resource(StandardFont::HelveticaBold) => self.bold_font_id,
            },
            "XObject" => dictionary! {
                IMAGE_RESOURCE => image_id,
            },
        };

        let page_id = self.document.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => self.media_box(),
            "Resources" => resources,
            "Contents" => content_id,
        });
        self.kids.push(Object::Reference(page_id));

        debug!(page_count = self.kids.len(), "Page appended");
        Ok(())
    }

    /// Drawing operations for one page: image first, then the header band,
    /// then the page label on top.
    fn page_operations(&self, page: &Page) -> Vec<Operation> {
        let placement = page.placement;
        let mut ops = vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    placement.width.into(),
                    0.into(),
                    0.into(),
                    placement.height.into(),
                    placement.x.into(),
                    self.flip_y(placement.y + placement.height).into(),
                ],
            ),
            Operation::new("Do", vec![IMAGE_RESOURCE.into()]),
            Operation::new("Q", vec![]),
        ];

        if let Some(header) = &page.header {
            for line in &header.lines {
                ops.extend(self.text_operations(line));
            }
            ops.extend(self.rule_operations(&header.rule));
        }

        if let Some(label) = &page.label {
            ops.extend(self.text_operations(label));
        }

        ops
    }

    fn text_operations(&self, run: &TextRun) -> Vec<Operation> {
        vec![
            Operation::new("BT", vec![]),
            Operation::new("g", vec![run.gray.into()]),
            Operation::new(
                "Tf",
                vec![font_resource(run.font).into(), run.size.into()],
            ),
            Operation::new(
                "Td",
                vec![run.x.into(), self.flip_y(run.baseline).into()],
            ),
            Operation::new("Tj", vec![win_ansi_string(&run.text)]),
            Operation::new("ET", vec![]),
        ]
    }

    fn rule_operations(&self, rule: &Rule) -> Vec<Operation> {
        let y = self.flip_y(rule.y);
        vec![
            Operation::new("q", vec![]),
            Operation::new("G", vec![rule.gray.into()]),
            Operation::new("w", vec![rule.width.into()]),
            Operation::new("m", vec![rule.x1.into(), y.into()]),
            Operation::new("l", vec![rule.x2.into(), y.into()]),
            Operation::new("S", vec![]),
            Operation::new("Q", vec![]),
        ]
    }

    /// Convert a top-origin y coordinate to PDF's bottom-origin space.
    fn flip_y(&self, y_from_top: f32) -> f32 {
        self.canvas.height - y_from_top
    }

    fn media_box(&self) -> Object {
        Object::Array(vec![
            0.into(),
            0.into(),
            self.canvas.width.into(),
            self.canvas.height.into(),
        ])
    }

    // -- Serialisation ------------------------------------------------------------

    /// Close the page tree, attach `/Info` metadata, and serialise the
    /// document to bytes.
    #[instrument(skip_all, fields(pages = self.kids.len(), has_metadata = metadata.is_some()))]
    pub fn finish(mut self, metadata: Option<&DocumentMetadata>) -> Result<Vec<u8>> {
        if self.kids.is_empty() {
            return Err(BlattwerkError::InvalidInput(
                "a document needs at least one page".into(),
            ));
        }

        let page_count = self.kids.len() as i64;
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => Object::Array(std::mem::take(&mut self.kids)),
            "Count" => Object::Integer(page_count),
            "MediaBox" => self.media_box(),
        };
        self.document
            .objects
            .insert(self.pages_id, Object::Dictionary(pages));

        let catalog_id = self.document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.document.trailer.set("Root", catalog_id);

        let info_id = self.document.add_object(info_dictionary(metadata));
        self.document.trailer.set("Info", info_id);

        let mut output = Vec::new();
        self.document.save_to(&mut output).map_err(|err| {
            BlattwerkError::Emission(format!("failed to serialise PDF: {err}"))
        })?;

        info!(pages = page_count, bytes = output.len(), "PDF emitted");
        Ok(output)
    }
}

/// Serialise `pages` in order into one PDF.
pub fn emit(
    canvas: PageCanvas,
    pages: Vec<Page>,
    metadata: Option<&DocumentMetadata>,
) -> Result<Vec<u8>> {
    let mut writer = PdfWriter::new(canvas);
    for page in pages {
        writer.add_page(page)?;
    }
    writer.finish(metadata)
}

// -- Helpers ------------------------------------------------------------------

fn font_dictionary(base_font: &str) -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base_font,
        "Encoding" => "WinAnsiEncoding",
    }
}

fn font_resource(font: StandardFont) -> &'static str {
    match font {
        StandardFont::Helvetica => "F1",
        StandardFont::HelveticaBold => "F2",
    }
}

fn info_dictionary(metadata: Option<&DocumentMetadata>) -> Dictionary {
    let mut info = Dictionary::new();
    if let Some(metadata) = metadata {
        if !metadata.title.is_empty() {
            info.set("Title", text_string(&metadata.title));
        }
        if !metadata.subject.is_empty() {
            info.set("Subject", text_string(&metadata.subject));
        }
        if !metadata.keywords.is_empty() {
            info.set("Keywords", text_string(&metadata.keywords_joined()));
        }
    }
    info.set("Producer", text_string(PRODUCER));
    info
}

/// A PDF text string: plain literal for ASCII, UTF-16BE with BOM otherwise.
pub(crate) fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::string_literal(text);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

/// WinAnsiEncoding bytes 0x80..=0x9F that differ from Latin-1. The five
/// unassigned positions are absent.
pub(crate) const WIN_ANSI_HIGH: [(u8, char); 27] = [
    (0x80, '\u{20AC}'),
    (0x82, '\u{201A}'),
    (0x83, '\u{0192}'),
    (0x84, '\u{201E}'),
    (0x85, '\u{2026}'),
    (0x86, '\u{2020}'),
    (0x87, '\u{2021}'),
    (0x88, '\u{02C6}'),
    (0x89, '\u{2030}'),
    (0x8A, '\u{0160}'),
    (0x8B, '\u{2039}'),
    (0x8C, '\u{0152}'),
    (0x8E, '\u{017D}'),
    (0x91, '\u{2018}'),
    (0x92, '\u{2019}'),
    (0x93, '\u{201C}'),
    (0x94, '\u{201D}'),
    (0x95, '\u{2022}'),
    (0x96, '\u{2013}'),
    (0x97, '\u{2014}'),
    (0x98, '\u{02DC}'),
    (0x99, '\u{2122}'),
    (0x9A, '\u{0161}'),
    (0x9B, '\u{203A}'),
    (0x9C, '\u{0153}'),
    (0x9E, '\u{017E}'),
    (0x9F, '\u{0178}'),
];

/// Text for the standard fonts under WinAnsiEncoding. Characters the
/// encoding cannot represent become '?'.
pub(crate) fn win_ansi_string(text: &str) -> Object {
    let bytes = text
        .chars()
        .map(|c| match c as u32 {
            code @ (0x20..=0x7E | 0xA0..=0xFF) => code as u8,
            _ => WIN_ANSI_HIGH
                .iter()
                .find(|&&(_, mapped)| mapped == c)
                .map_or(b'?', |&(byte, _)| byte),
        })
        .collect::<Vec<u8>>();
    Object::String(bytes, StringFormat::Literal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::encode::{EncodedImage, encode};
    use crate::image::raster::Raster;
    use crate::pdf::layout::PageCompositor;
    use crate::pdf::reader::PdfReader;
    use blattwerk_core::Annotation;
    use image::{Rgb, RgbImage};

    fn jpeg(width: u32, height: u32) -> EncodedImage {
        let raster = Raster::from_rgb_image(RgbImage::from_pixel(width, height, Rgb([240, 240, 230])));
        encode(raster, 0.75).unwrap()
    }

    #[test]
    fn emits_one_page_per_image() {
        let compositor = PageCompositor::default();
        let pages = compositor.compose(vec![jpeg(30, 40), jpeg(40, 30), jpeg(20, 20)], None);
        let bytes = emit(compositor.canvas(), pages, None).unwrap();

        assert!(bytes.starts_with(b"%PDF-1.7"));
        let reader = PdfReader::from_bytes(&bytes).unwrap();
        assert_eq!(reader.page_count(), 3);
        assert_eq!(reader.info().producer.as_deref(), Some(PRODUCER));
        assert_eq!(reader.info().title, None);
    }

    #[test]
    fn metadata_lands_in_info_dictionary() {
        let annotation = Annotation::new("Invoice", "Hosting, October")
            .with_field("Total", "$42.00")
            .with_field("Due", "2026-11-01");
        let compositor = PageCompositor::default();
        let pages = compositor.compose(vec![jpeg(30, 40)], Some(&annotation));
        let bytes = emit(compositor.canvas(), pages, Some(&annotation.metadata())).unwrap();

        let info = PdfReader::from_bytes(&bytes).unwrap().info();
        assert_eq!(info.title.as_deref(), Some("Invoice"));
        assert_eq!(info.subject.as_deref(), Some("Hosting, October"));
        assert_eq!(info.keywords.as_deref(), Some("Total, Due"));
    }

    #[test]
    fn non_ascii_metadata_round_trips() {
        let metadata = DocumentMetadata {
            title: "Überweisung für Miete".into(),
            subject: String::new(),
            keywords: Vec::new(),
        };
        let compositor = PageCompositor::default();
        let pages = compositor.compose(vec![jpeg(10, 10)], None);
        let bytes = emit(compositor.canvas(), pages, Some(&metadata)).unwrap();

        let info = PdfReader::from_bytes(&bytes).unwrap().info();
        assert_eq!(info.title.as_deref(), Some("Überweisung für Miete"));
        assert_eq!(info.subject, None);
    }

    #[test]
    fn image_drawn_at_placement() {
        let compositor = PageCompositor::default();
        let canvas = compositor.canvas();
        let pages = compositor.compose(vec![jpeg(100, 50)], None);
        let expected = pages[0].placement;
        let bytes = emit(canvas, pages, None).unwrap();

        let reader = PdfReader::from_bytes(&bytes).unwrap();
        let placements = reader.image_placements(1).unwrap();
        assert_eq!(placements.len(), 1);
        let drawn = placements[0];
        assert!((drawn.x - expected.x).abs() < 0.01);
        assert!((drawn.width - expected.width).abs() < 0.01);
        assert!((drawn.height - expected.height).abs() < 0.01);
        // PDF space has its origin at the bottom.
        let top = canvas.height - (drawn.y + drawn.height);
        assert!((top - expected.y).abs() < 0.01);
    }

    #[test]
    fn label_drawn_after_image() {
        let compositor = PageCompositor::default();
        let pages = compositor.compose(vec![jpeg(10, 10), jpeg(10, 10)], None);
        let writer = PdfWriter::new(compositor.canvas());
        let ops = writer.page_operations(&pages[1]);

        let draw = ops.iter().position(|op| op.operator == "Do").unwrap();
        let text = ops.iter().position(|op| op.operator == "Tj").unwrap();
        assert!(text > draw);
    }

    #[test]
    fn finishing_without_pages_fails() {
        let writer = PdfWriter::new(PageCompositor::default().canvas());
        assert!(matches!(
            writer.finish(None),
            Err(BlattwerkError::InvalidInput(_))
        ));
    }

    #[test]
    fn win_ansi_keeps_typographic_punctuation() {
        match win_ansi_string("\u{201C}Paid\u{201D} \u{2013} it\u{2019}s done\u{2026}") {
            Object::String(bytes, _) => {
                assert_eq!(bytes, b"\x93Paid\x94 \x96 it\x92s done\x85".to_vec());
            }
            other => panic!("unexpected object {other:?}"),
        }
    }

    #[test]
    fn summary_punctuation_survives_into_page_text() {
        let summary = "\u{201C}Final\u{201D} notice \u{2014} pay by Friday";
        let annotation = Annotation::new("Reminder", summary);
        let compositor = PageCompositor::default();
        let pages = compositor.compose(vec![jpeg(20, 20)], Some(&annotation));
        let bytes = emit(compositor.canvas(), pages, None).unwrap();

        let text = PdfReader::from_bytes(&bytes).unwrap().page_text(1).unwrap();
        assert!(text.iter().any(|run| run == summary), "{text:?}");
    }

    #[test]
    fn win_ansi_replaces_unmappable_characters() {
        match win_ansi_string("Größe €5 ✓ 丁") {
            Object::String(bytes, _) => {
                assert_eq!(bytes, b"Gr\xF6\xDFe \x805 ? ?".to_vec());
            }
            other => panic!("unexpected object {other:?}"),
        }
    }
}

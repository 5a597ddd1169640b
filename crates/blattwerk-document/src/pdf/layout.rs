// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page compositor — fit each encoded page image onto a fixed canvas, reserve
// the annotation header band on page 1, and place the page labels.
//
// All geometry is in PDF points with the origin at the TOP-left corner of the
// page; the writer flips to PDF's bottom-left origin when drawing.

use blattwerk_core::{Annotation, PT_PER_MM, PipelineConfig};
use tracing::{debug, instrument};

use crate::image::encode::EncodedImage;

/// Average glyph width of Helvetica as a fraction of the font size.
const AVG_GLYPH_WIDTH: f32 = 0.5;

/// Distance from the top of the page to the top of the title line.
const HEADER_TOP_INSET_MM: f32 = 10.0;
const TITLE_SIZE: f32 = 16.0;
const SUMMARY_SIZE: f32 = 10.0;
const SUMMARY_LEADING: f32 = 13.0;
const SUMMARY_MAX_LINES: usize = 2;
const LABEL_SIZE: f32 = 10.0;
/// 150 on a 0..=255 scale.
const LABEL_GRAY: f32 = 150.0 / 255.0;
const RULE_GRAY: f32 = 0.6;
const RULE_WIDTH: f32 = 0.75;
/// Gap between the bottom of the header band and its rule.
const RULE_OFFSET: f32 = 6.0;
/// Label anchor: right edge inset and baseline height above the page bottom.
const LABEL_RIGHT_INSET_MM: f32 = 20.0;
const LABEL_BOTTOM_INSET_MM: f32 = 10.0;

/// Axis-aligned rectangle, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn aspect_ratio(&self) -> f32 {
        self.width / self.height
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Whether `other` lies within this rectangle (with a small tolerance for
    /// floating point error).
    pub fn contains(&self, other: &Rect) -> bool {
        const EPS: f32 = 1e-3;
        other.x >= self.x - EPS
            && other.y >= self.y - EPS
            && other.right() <= self.right() + EPS
            && other.bottom() <= self.bottom() + EPS
    }
}

/// Page size and minimum horizontal margin, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageCanvas {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
}

impl PageCanvas {
    pub fn from_config(config: &PipelineConfig) -> Self {
        let (width, height) = config.paper_size.dimensions_pt();
        Self {
            width,
            height,
            margin: config.margin_mm * PT_PER_MM,
        }
    }

    pub fn full_page(&self) -> Rect {
        Rect {
            x: 0.0,
            y: 0.0,
            width: self.width,
            height: self.height,
        }
    }
}

/// Standard PDF fonts used for page text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
}

/// A single line of text. `baseline` is measured from the top of the page.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub x: f32,
    pub baseline: f32,
    pub size: f32,
    pub font: StandardFont,
    /// Fill gray level, 0 = black, 1 = white.
    pub gray: f32,
}

/// A horizontal separator line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rule {
    pub x1: f32,
    pub x2: f32,
    pub y: f32,
    pub width: f32,
    pub gray: f32,
}

/// The annotation header reserved at the top of page 1.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderBand {
    pub height: f32,
    /// Title line followed by up to two summary lines.
    pub lines: Vec<TextRun>,
    pub rule: Rule,
}

/// One composed page, ready for the writer.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// 1-based position in the document.
    pub number: usize,
    pub image: EncodedImage,
    pub placement: Rect,
    pub header: Option<HeaderBand>,
    /// Drawn after the image so it is never covered.
    pub label: Option<TextRun>,
}

/// Lays out pages on a fixed canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageCompositor {
    canvas: PageCanvas,
    header_band_height: f32,
    page_labels: bool,
}

impl Default for PageCompositor {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl PageCompositor {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            canvas: PageCanvas::from_config(config),
            header_band_height: config.header_band_mm * PT_PER_MM,
            page_labels: config.page_labels,
        }
    }

    pub fn canvas(&self) -> PageCanvas {
        self.canvas
    }

    pub fn header_band_height(&self) -> f32 {
        self.header_band_height
    }

    // -- Geometry -------------------------------------------------------------

    /// Region available to the page image. A header band, when present,
    /// takes the top of the page.
    pub fn content_area(&self, with_header: bool) -> Rect {
        let page = self.canvas.full_page();
        if !with_header {
            return page;
        }
        Rect {
            x: 0.0,
            y: self.header_band_height,
            width: page.width,
            height: page.height - self.header_band_height,
        }
    }

    /// Scale an image of the given aspect ratio to fit `area`, centred.
    ///
    /// Images that would come closer than the margin to the left and right
    /// page edges are shrunk until they respect it.
    pub fn fit(&self, image_aspect: f32, area: Rect) -> Rect {
        let (mut width, mut height) = if image_aspect > area.aspect_ratio() {
            (area.width, area.width / image_aspect)
        } else {
            (area.height * image_aspect, area.height)
        };

        let max_width = self.canvas.width - 2.0 * self.canvas.margin;
        if width > max_width {
            let scale = max_width / width;
            width *= scale;
            height *= scale;
        }

        Rect {
            x: area.x + (area.width - width) / 2.0,
            y: area.y + (area.height - height) / 2.0,
            width,
            height,
        }
    }

    // -- Composition ----------------------------------------------------------

    /// Compose the page at 0-based `index` of a `total`-page document.
    pub fn compose_page(
        &self,
        index: usize,
        total: usize,
        image: EncodedImage,
        annotation: Option<&Annotation>,
    ) -> Page {
        let header = match annotation {
            Some(annotation) if index == 0 => Some(self.header_band(annotation)),
            _ => None,
        };
        let area = self.content_area(header.is_some());
        let placement = self.fit(image.aspect_ratio(), area);
        let number = index + 1;

        debug!(
            number,
            x = placement.x,
            y = placement.y,
            width = placement.width,
            height = placement.height,
            header = header.is_some(),
            "Page composed"
        );

        Page {
            number,
            image,
            placement,
            header,
            label: self.page_labels.then(|| self.page_label(number, total)),
        }
    }

    /// Compose every image in order, one page per image.
    #[instrument(skip_all, fields(pages = images.len(), annotated = annotation.is_some()))]
    pub fn compose(&self, images: Vec<EncodedImage>, annotation: Option<&Annotation>) -> Vec<Page> {
        let total = images.len();
        images
            .into_iter()
            .enumerate()
            .map(|(index, image)| self.compose_page(index, total, image, annotation))
            .collect()
    }

    /// Title, wrapped summary, and separator rule for page 1.
    pub fn header_band(&self, annotation: &Annotation) -> HeaderBand {
        let margin = self.canvas.margin;
        let text_width = self.canvas.width - 2.0 * margin;

        let title_baseline = HEADER_TOP_INSET_MM * PT_PER_MM + TITLE_SIZE;
        let mut lines = vec![TextRun {
            text: truncate_to(annotation.document_type.trim(), max_chars(text_width, TITLE_SIZE)),
            x: margin,
            baseline: title_baseline,
            size: TITLE_SIZE,
            font: StandardFont::HelveticaBold,
            gray: 0.0,
        }];

        let summary = summary_lines(&annotation.summary, max_chars(text_width, SUMMARY_SIZE));
        for (i, line) in summary.into_iter().enumerate() {
            lines.push(TextRun {
                text: line,
                x: margin,
                baseline: title_baseline + 6.0 + SUMMARY_LEADING * (i + 1) as f32,
                size: SUMMARY_SIZE,
                font: StandardFont::Helvetica,
                gray: 0.25,
            });
        }

        HeaderBand {
            height: self.header_band_height,
            lines,
            rule: Rule {
                x1: margin,
                x2: self.canvas.width - margin,
                y: self.header_band_height - RULE_OFFSET,
                width: RULE_WIDTH,
                gray: RULE_GRAY,
            },
        }
    }

    /// "Page i of N", right-aligned near the bottom-right corner.
    pub fn page_label(&self, number: usize, total: usize) -> TextRun {
        let text = format!("Page {number} of {total}");
        let right = self.canvas.width - LABEL_RIGHT_INSET_MM * PT_PER_MM;
        TextRun {
            x: right - estimated_width(&text, LABEL_SIZE),
            baseline: self.canvas.height - LABEL_BOTTOM_INSET_MM * PT_PER_MM,
            size: LABEL_SIZE,
            font: StandardFont::Helvetica,
            gray: LABEL_GRAY,
            text,
        }
    }
}

// -- Text helpers ---------------------------------------------------------------

fn estimated_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * AVG_GLYPH_WIDTH * size
}

fn max_chars(width: f32, size: f32) -> usize {
    ((width / (AVG_GLYPH_WIDTH * size)).floor() as usize).max(4)
}

/// Cut `text` to at most `max` characters, ending in "..." when shortened.
fn truncate_to(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept.trim_end())
}

/// Wrap the summary and keep the first two lines. The second line ends in
/// "..." when text was dropped.
fn summary_lines(summary: &str, max_width: usize) -> Vec<String> {
    let wrapped: Vec<String> = wrap_text(summary.trim(), max_width)
        .into_iter()
        .filter(|line| !line.is_empty())
        .collect();
    if wrapped.len() <= SUMMARY_MAX_LINES {
        return wrapped;
    }

    let mut kept: Vec<String> = wrapped[..SUMMARY_MAX_LINES].to_vec();
    if let Some(last) = kept.last_mut() {
        let room = max_width.saturating_sub(3);
        let cut: String = last.chars().take(room).collect();
        *last = format!("{}...", cut.trim_end());
    }
    kept
}

/// Wrap a multi-line string so that no line exceeds `max_width` characters.
///
/// Splits on existing newlines first, then performs simple word-wrap within each
/// paragraph. Words longer than `max_width` are force-broken.
fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    let mut result = Vec::new();

    for paragraph in text.split('\n') {
        let words: Vec<&str> = paragraph.split_whitespace().collect();
        if words.is_empty() {
            result.push(String::new());
            continue;
        }

        let mut current_line = String::new();
        let mut current_len = 0usize;

        for word in words {
            let word_len = word.chars().count();
            if word_len > max_width {
                if !current_line.is_empty() {
                    result.push(std::mem::take(&mut current_line));
                }
                let chars: Vec<char> = word.chars().collect();
                let mut chunks = chars.chunks(max_width).peekable();
                while let Some(chunk) = chunks.next() {
                    if chunks.peek().is_some() {
                        result.push(chunk.iter().collect());
                    } else {
                        current_line = chunk.iter().collect();
                        current_len = chunk.len();
                    }
                }
            } else if current_line.is_empty() {
                current_line.push_str(word);
                current_len = word_len;
            } else if current_len + 1 + word_len <= max_width {
                current_line.push(' ');
                current_line.push_str(word);
                current_len += 1 + word_len;
            } else {
                result.push(std::mem::take(&mut current_line));
                current_line.push_str(word);
                current_len = word_len;
            }
        }

        if !current_line.is_empty() {
            result.push(current_line);
        }
    }

    result
}

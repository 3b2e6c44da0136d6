//! Single-column flowing layout on top of printpdf operations.
//!
//! Blocks are appended top to bottom; when a block does not fit in what is
//! left of the page, the layout starts a new page before placing it.

use printpdf::graphics::{LinePoint, PaintMode, Point, Polygon, PolygonRing, WindingOrder};
use printpdf::xobject::XObjectTransform;
use printpdf::{Mm, Op, PdfPage, Pt, Rgb, TextMatrix, XObjectId};

use crate::config::DocumentOptions;
use crate::services::pdf_fonts::{PdfFont, PdfFonts, Weight};

const LINE_SPACING: f32 = 1.35;
const CELL_PADDING: f32 = 6.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shade(pub f32, pub f32, pub f32);

impl Shade {
    pub const BLACK: Shade = Shade(0.0, 0.0, 0.0);
    pub const GREY: Shade = Shade(0.4, 0.4, 0.4);
    pub const HEADER: Shade = Shade(0.85, 0.88, 0.92);
    pub const RULE: Shade = Shade(0.6, 0.6, 0.6);

    fn to_pdf(self) -> printpdf::color::Color {
        printpdf::color::Color::Rgb(Rgb::new(self.0, self.1, self.2, None))
    }
}

/// A run of text in one of the document's faces.
#[derive(Debug, Clone, Copy)]
pub struct TextStyle {
    pub weight: Weight,
    pub size: f32,
    pub color: Shade,
}

impl TextStyle {
    pub fn regular(size: f32) -> Self {
        Self { weight: Weight::Regular, size, color: Shade::BLACK }
    }

    pub fn bold(size: f32) -> Self {
        Self { weight: Weight::Bold, size, color: Shade::BLACK }
    }

    pub fn with_color(mut self, color: Shade) -> Self {
        self.color = color;
        self
    }

    fn line_height(&self) -> f32 {
        self.size * LINE_SPACING
    }
}

pub struct FlowLayout {
    fonts: PdfFonts,
    page_width: f32,
    page_height: f32,
    margin: f32,
    /// Distance of the next block's top edge from the top of the page.
    cursor: f32,
    ops: Vec<Op>,
    pages: Vec<PdfPage>,
}

impl FlowLayout {
    pub fn new(options: &DocumentOptions, fonts: PdfFonts) -> Self {
        Self {
            fonts,
            page_width: options.page_width,
            page_height: options.page_height,
            margin: options.margin,
            cursor: options.margin,
            ops: Vec::new(),
            pages: Vec::new(),
        }
    }

    pub fn content_width(&self) -> f32 {
        self.page_width - 2.0 * self.margin
    }

    fn content_height(&self) -> f32 {
        self.page_height - 2.0 * self.margin
    }

    fn remaining(&self) -> f32 {
        self.page_height - self.margin - self.cursor
    }

    /// Starts a new page unless `height` still fits. A block taller than a
    /// whole page is placed at the top of a fresh page and allowed to overflow.
    fn ensure_space(&mut self, height: f32) {
        let at_page_top = self.cursor <= self.margin;
        if height > self.remaining() && !at_page_top {
            self.break_page();
        }
    }

    fn break_page(&mut self) {
        let ops = std::mem::take(&mut self.ops);
        self.pages.push(PdfPage::new(
            Mm::from(Pt(self.page_width)),
            Mm::from(Pt(self.page_height)),
            ops,
        ));
        self.cursor = self.margin;
    }

    /// Converts a distance from the top of the page into a PDF y coordinate.
    fn pdf_y(&self, top: f32) -> f32 {
        self.page_height - top
    }

    pub fn space(&mut self, height: f32) {
        if height >= self.remaining() {
            self.break_page();
        } else {
            self.cursor += height;
        }
    }

    /// One line of text with no wrapping.
    pub fn text_line(&mut self, text: &str, style: TextStyle) {
        let height = style.line_height();
        self.ensure_space(height);
        let baseline = self.pdf_y(self.cursor + style.size);
        self.write_text(text, self.margin, baseline, style);
        self.cursor += height;
    }

    /// Text wrapped to the content width.
    pub fn paragraph(&mut self, text: &str, style: TextStyle) {
        let font = self.fonts.get(style.weight);
        for line in wrap_text(text, font, style.size, self.content_width()) {
            self.text_line(&line, style);
        }
    }

    /// Places an image scaled to fit `max_width` x `max_height` (keeping its
    /// aspect ratio) at the left margin.
    pub fn image(&mut self, id: XObjectId, pixels: (usize, usize), max_width: f32, max_height: f32) {
        let (px_w, px_h) = (pixels.0.max(1) as f32, pixels.1.max(1) as f32);
        let max_width = max_width.min(self.content_width());
        let max_height = max_height.min(self.content_height());
        let scale = (max_width / px_w).min(max_height / px_h);
        let height = px_h * scale;

        self.ensure_space(height);
        let bottom = self.pdf_y(self.cursor + height);
        self.ops.push(Op::UseXobject {
            id,
            transform: XObjectTransform {
                translate_x: Some(Pt(self.margin)),
                translate_y: Some(Pt(bottom)),
                scale_x: Some(scale),
                scale_y: Some(scale),
                rotate: None,
                dpi: Some(72.0),
            },
        });
        self.cursor += height;
    }

    /// A grid with equal-width columns and a shaded header row. Cell text
    /// wraps inside its column; a row never splits across pages.
    pub fn table(&mut self, header: &[&str], rows: &[Vec<String>], size: f32) {
        let columns = header.len().max(1);
        let col_width = self.content_width() / columns as f32;

        let header_cells: Vec<String> = header.iter().map(|h| h.to_string()).collect();
        self.table_row(&header_cells, col_width, TextStyle::bold(size), Some(Shade::HEADER));
        for row in rows {
            self.table_row(row, col_width, TextStyle::regular(size), None);
        }
    }

    fn table_row(&mut self, cells: &[String], col_width: f32, style: TextStyle, fill: Option<Shade>) {
        let text_width = col_width - 2.0 * CELL_PADDING;
        let font = self.fonts.get(style.weight);
        let wrapped: Vec<Vec<String>> = cells
            .iter()
            .map(|cell| wrap_text(cell, font, style.size, text_width))
            .collect();
        let lines = wrapped.iter().map(Vec::len).max().unwrap_or(1).max(1);
        let height = lines as f32 * style.line_height() + 2.0 * CELL_PADDING;

        self.ensure_space(height);
        let top = self.cursor;
        for (idx, cell_lines) in wrapped.iter().enumerate() {
            let left = self.margin + idx as f32 * col_width;
            self.rectangle(left, top, col_width, height, fill, Shade::RULE);
            for (line_idx, line) in cell_lines.iter().enumerate() {
                let line_top = top + CELL_PADDING + line_idx as f32 * style.line_height();
                let baseline = self.pdf_y(line_top + style.size);
                self.write_text(line, left + CELL_PADDING, baseline, style);
            }
        }
        self.cursor += height;
    }

    /// A thin horizontal rule across the content width.
    pub fn rule(&mut self) {
        self.ensure_space(1.0);
        let top = self.cursor;
        self.rectangle(self.margin, top, self.content_width(), 0.75, Some(Shade::RULE), Shade::RULE);
        self.cursor += 1.0;
    }

    fn rectangle(&mut self, left: f32, top: f32, width: f32, height: f32, fill: Option<Shade>, stroke: Shade) {
        let bottom = self.pdf_y(top + height);
        let corner = |x: f32, y: f32| LinePoint { p: Point { x: Pt(x), y: Pt(y) }, bezier: false };
        let points = vec![
            corner(left, bottom),
            corner(left + width, bottom),
            corner(left + width, bottom + height),
            corner(left, bottom + height),
        ];

        let mode = match fill {
            Some(shade) => {
                self.ops.push(Op::SetFillColor { col: shade.to_pdf() });
                PaintMode::FillStroke
            }
            None => PaintMode::Stroke,
        };
        self.ops.push(Op::SetOutlineColor { col: stroke.to_pdf() });
        self.ops.push(Op::SetOutlineThickness { pt: Pt(0.5) });
        self.ops.push(Op::DrawPolygon {
            polygon: Polygon {
                rings: vec![PolygonRing { points }],
                mode,
                winding_order: WindingOrder::NonZero,
            },
        });
    }

    fn write_text(&mut self, text: &str, x: f32, baseline: f32, style: TextStyle) {
        let font = self.fonts.get(style.weight);
        let (id, items) = (font.id().clone(), font.text_items(text));

        self.ops.push(Op::StartTextSection);
        self.ops.push(Op::SetFillColor { col: style.color.to_pdf() });
        self.ops.push(Op::SetFontSize { size: Pt(style.size), font: id.clone() });
        self.ops.push(Op::SetTextMatrix { matrix: TextMatrix::Translate(Pt(x), Pt(baseline)) });
        self.ops.push(Op::WriteText { items, font: id });
        self.ops.push(Op::EndTextSection);
    }

    /// Closes the last page and returns every page in order.
    pub fn finish(mut self) -> Vec<PdfPage> {
        if !self.ops.is_empty() || self.pages.is_empty() {
            self.break_page();
        }
        self.pages
    }
}

/// Greedy word wrap. Words wider than the line are split by character.
pub fn wrap_text(text: &str, font: &PdfFont, size: f32, max_width: f32) -> Vec<String> {
    let fits = |line: &str| font.text_width(line, size) <= max_width;

    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", current, word)
            };

            if fits(&candidate) {
                current = candidate;
                continue;
            }

            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }

            if fits(word) {
                current = word.to_string();
            } else {
                for ch in word.chars() {
                    current.push(ch);
                    if !fits(&current) && current.chars().count() > 1 {
                        current.pop();
                        lines.push(std::mem::take(&mut current));
                        current.push(ch);
                    }
                }
            }
        }
        lines.push(current);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use printpdf::{PdfDocument, TextItem};

    fn small_page() -> DocumentOptions {
        DocumentOptions {
            page_width: 300.0,
            page_height: 200.0,
            margin: 20.0,
            ..DocumentOptions::default()
        }
    }

    fn fonts() -> PdfFonts {
        PdfFonts::embed(&mut PdfDocument::new("layout")).unwrap()
    }

    fn layout() -> FlowLayout {
        FlowLayout::new(&small_page(), fonts())
    }

    #[test]
    fn test_wrap_text_respects_width() {
        let fonts = fonts();
        let font = fonts.get(Weight::Regular);
        let text = "We identify companies whose share prices differ materially from intrinsic valuations.";
        let lines = wrap_text(text, font, 10.0, 150.0);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(font.text_width(line, 10.0) <= 150.0, "line too wide: {}", line);
        }
        assert_eq!(lines.join(" "), text);
    }

    #[test]
    fn test_wrap_text_splits_long_words() {
        let fonts = fonts();
        let lines = wrap_text(&"W".repeat(40), fonts.get(Weight::Regular), 10.0, 50.0);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), "W".repeat(40));
    }

    #[test]
    fn test_wrap_text_keeps_explicit_line_breaks() {
        let fonts = fonts();
        let font = fonts.get(Weight::Regular);
        assert_eq!(wrap_text("one\ntwo", font, 10.0, 500.0), vec!["one", "two"]);
        assert_eq!(wrap_text("", font, 10.0, 500.0), vec![""]);
    }

    #[test]
    fn test_text_is_written_with_the_embedded_face() {
        let fonts = fonts();
        let bold_id = fonts.get(Weight::Bold).id().clone();
        let mut layout = FlowLayout::new(&small_page(), fonts);
        layout.text_line("Société Générale", TextStyle::bold(12.0));
        let pages = layout.finish();

        let written: Vec<String> = pages[0]
            .ops
            .iter()
            .filter_map(|op| match op {
                Op::WriteText { items, font } if *font == bold_id => Some(
                    items
                        .iter()
                        .map(|item| match item {
                            TextItem::Text(t) => t.clone(),
                            TextItem::Offset(_) => " ".to_string(),
                        })
                        .collect(),
                ),
                _ => None,
            })
            .collect();
        assert_eq!(written, vec!["Société Générale"]);
        assert!(pages[0]
            .ops
            .iter()
            .any(|op| matches!(op, Op::SetFontSize { font, .. } if *font == bold_id)));
    }

    #[test]
    fn test_overflow_starts_new_pages() {
        let mut layout = layout();
        for i in 0..40 {
            layout.text_line(&format!("Line {}", i), TextStyle::regular(10.0));
        }
        let pages = layout.finish();
        // 160pt of content per page at 13.5pt per line
        assert_eq!(pages.len(), 4);
    }

    #[test]
    fn test_empty_layout_still_has_one_page() {
        assert_eq!(layout().finish().len(), 1);
    }

    #[test]
    fn test_table_rows_do_not_split() {
        let mut layout = layout();
        layout.space(150.0);
        let rows = vec![vec!["Management Fee".to_string(), "1.5% per annum".to_string()]];
        layout.table(&["Fee", "Rate"], &rows, 10.0);
        assert_eq!(layout.finish().len(), 2);
    }

    #[test]
    fn test_image_keeps_aspect_ratio() {
        let mut layout = layout();
        layout.image(XObjectId::new(), (400, 100), 100.0, 100.0);
        let pages = layout.finish();
        let scale = pages[0].ops.iter().find_map(|op| match op {
            Op::UseXobject { transform, .. } => transform.scale_x.zip(transform.scale_y),
            _ => None,
        });
        assert_eq!(scale, Some((0.25, 0.25)));
    }
}

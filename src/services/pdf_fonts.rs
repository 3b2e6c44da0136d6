//! Fonts embedded into each factsheet PDF, and text measurement from their
//! glyph metrics.

use printpdf::{BuiltinFont, FontId, ParsedFont, PdfDocument, TextItem};
use tracing::debug;

use crate::errors::FactsheetError;
use crate::services::fonts::{system_fonts, FontFace};

/// Space advance, in ems, for faces without a space glyph.
const MISSING_SPACE_EM: f32 = 0.278;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Weight {
    Regular,
    Bold,
}

/// One face registered with a document.
#[derive(Clone)]
pub struct PdfFont {
    id: FontId,
    face: ParsedFont,
    has_space: bool,
}

impl PdfFont {
    fn embed(doc: &mut PdfDocument, face: ParsedFont) -> Self {
        let id = doc.add_font(&face);
        let has_space = face.lookup_glyph_index(' ' as u32).is_some();
        Self { id, face, has_space }
    }

    pub fn id(&self) -> &FontId {
        &self.id
    }

    fn units_per_em(&self) -> f32 {
        f32::from(self.face.font_metrics.units_per_em.max(1))
    }

    fn space_advance(&self) -> f32 {
        self.face
            .get_space_width()
            .map(|w| w as f32)
            .unwrap_or(self.units_per_em() * MISSING_SPACE_EM)
    }

    /// Advance of a glyph in font units, read from `hmtx`.
    fn glyph_advance(&self, glyph: u16) -> f32 {
        let metrics = self.face.hhea_table.as_ref().map_or(0, |hhea| hhea.num_h_metrics);
        if metrics == 0 {
            return f32::from(self.face.get_horizontal_advance(glyph));
        }
        // Glyphs past the last long metric share its advance.
        let entry = usize::from(glyph.min(metrics - 1)) * 4;
        self.face
            .hmtx_data
            .get(entry..entry + 2)
            .map(|b| f32::from(u16::from_be_bytes([b[0], b[1]])))
            .unwrap_or_else(|| f32::from(self.face.get_horizontal_advance(glyph)))
    }

    fn char_advance(&self, c: char) -> f32 {
        if c == ' ' {
            return self.space_advance();
        }
        match self.face.lookup_glyph_index(c as u32) {
            Some(glyph) => self.glyph_advance(glyph),
            None => self.space_advance(),
        }
    }

    /// Width of `text` in points at `size`.
    pub fn text_width(&self, text: &str, size: f32) -> f32 {
        let units: f32 = text.chars().map(|c| self.char_advance(c)).sum();
        units / self.units_per_em() * size
    }

    /// Text items for one line. Spaces become positioning offsets when the
    /// face has no space glyph.
    pub fn text_items(&self, text: &str) -> Vec<TextItem> {
        if self.has_space {
            return vec![TextItem::Text(text.to_string())];
        }

        let gap = -(self.space_advance() / self.units_per_em() * 1000.0);
        let mut items = Vec::new();
        let mut word = String::new();
        for c in text.chars() {
            if c == ' ' {
                if !word.is_empty() {
                    items.push(TextItem::Text(std::mem::take(&mut word)));
                }
                items.push(TextItem::Offset(gap));
            } else {
                word.push(c);
            }
        }
        if !word.is_empty() {
            items.push(TextItem::Text(word));
        }
        items
    }
}

/// The regular and bold faces used for every line of a document.
#[derive(Clone)]
pub struct PdfFonts {
    regular: PdfFont,
    bold: PdfFont,
}

impl PdfFonts {
    /// Embeds the system sans-serif faces, or printpdf's bundled Helvetica
    /// when the host has none.
    pub fn embed(doc: &mut PdfDocument) -> Result<Self, FactsheetError> {
        if let Some(fonts) = system_fonts() {
            if let Some(regular) = parse_face(fonts.regular) {
                let regular = PdfFont::embed(doc, regular);
                let bold = match fonts.bold.and_then(parse_face) {
                    Some(face) => PdfFont::embed(doc, face),
                    None => regular.clone(),
                };
                return Ok(Self { regular, bold });
            }
            debug!("System font '{}' could not be embedded; using Helvetica", fonts.family);
        }
        Self::bundled(doc)
    }

    /// printpdf's Helvetica faces, embedded as regular TrueType fonts.
    pub fn bundled(doc: &mut PdfDocument) -> Result<Self, FactsheetError> {
        let regular = parse_builtin(BuiltinFont::Helvetica)?;
        let bold = parse_builtin(BuiltinFont::HelveticaBold)?;
        Ok(Self {
            regular: PdfFont::embed(doc, regular),
            bold: PdfFont::embed(doc, bold),
        })
    }

    pub fn get(&self, weight: Weight) -> &PdfFont {
        match weight {
            Weight::Regular => &self.regular,
            Weight::Bold => &self.bold,
        }
    }
}

fn parse_face(face: FontFace) -> Option<ParsedFont> {
    let mut warnings = Vec::new();
    ParsedFont::from_bytes(face.bytes, face.index, &mut warnings)
}

fn parse_builtin(font: BuiltinFont) -> Result<ParsedFont, FactsheetError> {
    let mut warnings = Vec::new();
    ParsedFont::from_bytes(&font.get_subset_font().bytes, 0, &mut warnings)
        .ok_or_else(|| FactsheetError::Render(format!("could not load font {}", font.get_id())))
}

//! System font discovery shared by the chart renderer and the PDF composer.

use std::sync::OnceLock;

use plotters::style::FontStyle;
use tracing::{info, warn};

/// Family name chart text is drawn with.
pub const CHART_FONT_FAMILY: &str = "sans-serif";

/// Raw bytes of one face, kept for the life of the process.
#[derive(Debug, Clone, Copy)]
pub struct FontFace {
    pub bytes: &'static [u8],
    /// Face index inside a font collection.
    pub index: usize,
}

#[derive(Debug)]
pub struct SystemFonts {
    pub family: String,
    pub regular: FontFace,
    pub bold: Option<FontFace>,
}

static SYSTEM_FONTS: OnceLock<Option<SystemFonts>> = OnceLock::new();
static CHART_FONT_READY: OnceLock<bool> = OnceLock::new();

/// The sans-serif faces found on this host, looked up once.
pub fn system_fonts() -> Option<&'static SystemFonts> {
    SYSTEM_FONTS.get_or_init(load_system_fonts).as_ref()
}

/// Registers the system faces for chart text the first time it is called.
/// Returns `false` when the host has no usable font, in which case charts
/// are drawn without text.
pub fn chart_fonts_available() -> bool {
    *CHART_FONT_READY.get_or_init(|| {
        let Some(fonts) = system_fonts() else {
            warn!("⚠️ No system font found; charts will be rendered without labels");
            return false;
        };

        let bold = fonts.bold.unwrap_or(fonts.regular);
        let registered = plotters::style::register_font(CHART_FONT_FAMILY, FontStyle::Normal, fonts.regular.bytes)
            .is_ok()
            && plotters::style::register_font(CHART_FONT_FAMILY, FontStyle::Bold, bold.bytes).is_ok();

        if registered {
            info!("🔤 Chart text uses system font '{}'", fonts.family);
        } else {
            warn!(
                "⚠️ System font '{}' could not be parsed; charts will be rendered without labels",
                fonts.family
            );
        }
        registered
    })
}

fn load_system_fonts() -> Option<SystemFonts> {
    let mut db = fontdb::Database::new();
    db.load_system_fonts();

    let id = db
        .query(&fontdb::Query {
            families: &[fontdb::Family::SansSerif],
            ..fontdb::Query::default()
        })
        .or_else(|| {
            db.faces()
                .find(|face| face.families.iter().any(|(name, _)| name.contains("Sans")))
                .map(|face| face.id)
        })
        .or_else(|| db.faces().next().map(|face| face.id))?;

    let family = db
        .face(id)
        .and_then(|face| face.families.first().map(|(name, _)| name.clone()))
        .unwrap_or_default();
    let regular = leak_face(&db, id)?;

    let bold = db
        .query(&fontdb::Query {
            families: &[fontdb::Family::Name(&family)],
            weight: fontdb::Weight::BOLD,
            ..fontdb::Query::default()
        })
        .filter(|bold_id| *bold_id != id)
        .filter(|bold_id| db.face(*bold_id).map_or(false, |face| face.weight >= fontdb::Weight::SEMIBOLD))
        .and_then(|bold_id| leak_face(&db, bold_id));

    Some(SystemFonts { family, regular, bold })
}

fn leak_face(db: &fontdb::Database, id: fontdb::ID) -> Option<FontFace> {
    let (bytes, index) = db.with_face_data(id, |data, index| (data.to_vec(), index as usize))?;
    Some(FontFace {
        bytes: Box::leak(bytes.into_boxed_slice()),
        index,
    })
}

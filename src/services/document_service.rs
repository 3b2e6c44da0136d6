use chrono::Utc;
use printpdf::image::RawImage;
use printpdf::xobject::XObject;
use printpdf::{PdfDocument, PdfSaveOptions, XObjectId};
use tracing::{debug, warn};

use crate::config::DocumentOptions;
use crate::errors::FactsheetError;
use crate::models::{ChartAsset, ChartSet, FactsheetInput};
use crate::services::pdf_fonts::PdfFonts;
use crate::services::pdf_layout::{FlowLayout, Shade, TextStyle};
use crate::utils::{format_amount, format_percentage};

const TITLE_SIZE: f32 = 20.0;
const HEADING_SIZE: f32 = 13.0;
const BODY_SIZE: f32 = 10.5;
const NOTE_SIZE: f32 = 8.5;
const SECTION_GAP: f32 = 12.0;

/// Lays out the factsheet and serializes it to PDF bytes.
///
/// Sections appear in a fixed order: logo, title, generation date,
/// objective, audience, fund details, fees, holdings, monthly performance,
/// performance chart and sector chart. Sections without data are left out.
/// The chart images are consumed here and dropped once embedded.
pub fn compose_document(
    input: &FactsheetInput,
    charts: ChartSet,
    logo: Option<&[u8]>,
    options: &DocumentOptions,
) -> Result<Vec<u8>, FactsheetError> {
    let title = input.title(&options.default_title);
    let mut doc = PdfDocument::new(&title);
    let fonts = PdfFonts::embed(&mut doc)?;
    let mut layout = FlowLayout::new(options, fonts);

    if let Some(bytes) = logo {
        check_logo_format(bytes)?;
        let (id, pixels) = embed_image(&mut doc, bytes, "logo")?;
        layout.image(id, pixels, options.logo_width, options.logo_height);
        layout.space(SECTION_GAP);
    }

    layout.paragraph(&title, TextStyle::bold(TITLE_SIZE));
    layout.text_line(
        &format!("Generated on {}", Utc::now().format("%d %B %Y")),
        TextStyle::regular(NOTE_SIZE).with_color(Shade::GREY),
    );
    layout.rule();
    layout.space(SECTION_GAP);

    if let Some(objective) = &input.objective {
        text_section(&mut layout, "Fund Objective", objective);
    }
    if let Some(audience) = &input.audience {
        text_section(&mut layout, "Who is it for", audience);
    }

    let details = fund_details(input);
    if !details.is_empty() {
        heading(&mut layout, "Fund Details");
        for line in &details {
            layout.paragraph(line, TextStyle::regular(BODY_SIZE));
        }
        layout.space(SECTION_GAP);
    }

    if !input.fees.is_empty() {
        heading(&mut layout, "Fees");
        let rows: Vec<Vec<String>> = input
            .fees
            .rows()
            .into_iter()
            .map(|(name, value)| vec![name.to_string(), value.to_string()])
            .collect();
        layout.table(&["Fee", "Rate"], &rows, BODY_SIZE);
        layout.space(SECTION_GAP);
    }

    if !input.holdings.is_empty() {
        heading(&mut layout, "Holdings");
        for holding in &input.holdings {
            layout.paragraph(&format!("- {}", holding), TextStyle::regular(BODY_SIZE));
        }
        layout.space(SECTION_GAP);
    }

    if input.has_performance() {
        heading(&mut layout, "Monthly Performance");
        let named = input.performance.len() > 1;
        for series in &input.performance {
            if named {
                layout.text_line(&series.name, TextStyle::bold(BODY_SIZE));
            }
            for (label, value) in &series.points {
                layout.text_line(
                    &format!("{}: {}", label, format_percentage(*value)),
                    TextStyle::regular(BODY_SIZE),
                );
            }
        }
        layout.space(SECTION_GAP);
    }

    let content_width = layout.content_width();
    let ChartSet { performance, sectors } = charts;
    if let Some(chart) = performance {
        embed_chart(&mut doc, &mut layout, chart, content_width, "performance chart")?;
        layout.space(SECTION_GAP);
    }
    if let Some(chart) = sectors {
        embed_chart(&mut doc, &mut layout, chart, content_width * 0.6, "sector chart")?;
    }

    let pages = layout.finish();
    debug!("Composed factsheet '{}' with {} page(s)", title, pages.len());
    doc.pages = pages;

    let mut warnings = Vec::new();
    let bytes = doc.save(&PdfSaveOptions::default(), &mut warnings);
    if !warnings.is_empty() {
        warn!("⚠️ PDF writer reported {} warning(s)", warnings.len());
    }
    if bytes.is_empty() {
        return Err(FactsheetError::Render("the PDF writer produced no output".to_string()));
    }
    Ok(bytes)
}

fn heading(layout: &mut FlowLayout, text: &str) {
    layout.text_line(text, TextStyle::bold(HEADING_SIZE));
}

fn text_section(layout: &mut FlowLayout, title: &str, body: &str) {
    heading(layout, title);
    layout.paragraph(body, TextStyle::regular(BODY_SIZE));
    layout.space(SECTION_GAP);
}

fn fund_details(input: &FactsheetInput) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(manager) = &input.fund_manager {
        lines.push(format!("Fund Manager: {}", manager));
    }
    if let Some(ratio) = input.expense_ratio {
        lines.push(format!("Expense Ratio: {}", format_percentage(ratio)));
    }
    if let Some(aum) = input.assets_under_management {
        lines.push(format!("Assets Under Management: {}", format_amount(aum)));
    }
    lines
}

pub(crate) fn check_logo_format(bytes: &[u8]) -> Result<(), FactsheetError> {
    match image::guess_format(bytes) {
        Ok(image::ImageFormat::Png) | Ok(image::ImageFormat::Jpeg) => Ok(()),
        Ok(other) => Err(FactsheetError::Render(format!(
            "logo must be a PNG or JPEG image, got {:?}",
            other
        ))),
        Err(_) => Err(FactsheetError::Render(
            "logo must be a PNG or JPEG image".to_string(),
        )),
    }
}

fn embed_image(
    doc: &mut PdfDocument,
    bytes: &[u8],
    what: &str,
) -> Result<(XObjectId, (usize, usize)), FactsheetError> {
    let mut warnings = Vec::new();
    let raw = RawImage::decode_from_bytes(bytes, &mut warnings)
        .map_err(|e| FactsheetError::Render(format!("could not decode {}: {}", what, e)))?;
    let pixels = (raw.width, raw.height);
    let id = XObjectId::new();
    doc.resources.xobjects.map.insert(id.clone(), XObject::Image(raw));
    Ok((id, pixels))
}

fn embed_chart(
    doc: &mut PdfDocument,
    layout: &mut FlowLayout,
    chart: ChartAsset,
    max_width: f32,
    what: &str,
) -> Result<(), FactsheetError> {
    let (id, pixels) = embed_image(doc, &chart.png, what)?;
    let aspect = chart.height as f32 / chart.width.max(1) as f32;
    layout.image(id, pixels, max_width, max_width * aspect);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChartOptions, PerformanceSeries};
    use crate::services::chart_service::render_performance_chart;

    fn sample_input() -> FactsheetInput {
        let mut series = PerformanceSeries::new("Portfolio");
        series.push("Jan", 1.5);
        series.push("Feb", 2.3);
        FactsheetInput {
            fund_name: Some("MSM Property Fund".to_string()),
            objective: Some("Long-term growth.".to_string()),
            holdings: vec!["A".to_string(), "B".to_string()],
            performance: vec![series],
            ..FactsheetInput::default()
        }
    }

    fn small_png() -> Vec<u8> {
        let img = image::RgbImage::from_pixel(4, 2, image::Rgb([200, 30, 30]));
        let mut out = std::io::Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_compose_without_charts_or_logo() {
        let bytes = compose_document(
            &sample_input(),
            ChartSet::default(),
            None,
            &DocumentOptions::default(),
        )
        .unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
    }

    #[test]
    fn test_compose_with_logo_and_chart() {
        let input = sample_input();
        let chart = render_performance_chart(
            &input.performance,
            &ChartOptions { width: 4.0, height: 2.0, dpi: 50 },
        )
        .unwrap();
        let charts = ChartSet { performance: Some(chart), sectors: None };
        let logo = small_png();

        let bytes =
            compose_document(&input, charts, Some(&logo), &DocumentOptions::default()).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
    }

    #[test]
    fn test_compose_rejects_unsupported_logo() {
        let err = compose_document(
            &sample_input(),
            ChartSet::default(),
            Some(b"GIF89a not really a gif"),
            &DocumentOptions::default(),
        )
        .unwrap_err();
        match err {
            FactsheetError::Render(msg) => assert!(msg.contains("logo"), "{}", msg),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_fund_details_formats_numbers() {
        let input = FactsheetInput {
            fund_manager: Some("Jane Doe".to_string()),
            expense_ratio: Some(1.65),
            assets_under_management: Some(1_250_000.0),
            ..FactsheetInput::default()
        };
        assert_eq!(
            fund_details(&input),
            vec![
                "Fund Manager: Jane Doe",
                "Expense Ratio: 1.65%",
                "Assets Under Management: 1,250,000.00"
            ]
        );
    }
}

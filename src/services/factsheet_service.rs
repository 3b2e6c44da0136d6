use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::{error, info, info_span, warn};
use uuid::Uuid;

use crate::config::FactsheetConfig;
use crate::errors::FactsheetError;
use crate::models::{ChartSet, FactsheetInput, FactsheetPreview};
use crate::services::chart_service::{render_performance_chart, render_sector_chart};
use crate::services::document_service::{check_logo_format, compose_document};
use crate::services::input_service::extract_input;
use crate::services::table_service::load_table;

pub const FACTSHEET_FILE_NAME: &str = "factsheet.pdf";
pub const FACTSHEET_CONTENT_TYPE: &str = "application/pdf";

/// A finished factsheet ready to be offered for download.
#[derive(Debug)]
pub struct GeneratedFactsheet {
    pub bytes: Vec<u8>,
    pub file_name: &'static str,
    pub content_type: &'static str,
}

/// Runs the whole pipeline: load, validate, chart, compose.
///
/// Either a complete PDF comes back or an error naming the failing step;
/// chart images never outlive the call.
pub fn generate_factsheet(
    csv: &[u8],
    logo: Option<&[u8]>,
    config: &FactsheetConfig,
) -> Result<GeneratedFactsheet, FactsheetError> {
    let span = info_span!("factsheet", request_id = %Uuid::new_v4());
    let _guard = span.enter();

    let result = (|| {
        let input = read_input(csv, config)?;
        let charts = render_charts(&input, config)?;
        compose_document(&input, charts, logo, &config.document)
    })();

    match result {
        Ok(bytes) => {
            info!("✅ Generated factsheet ({} bytes)", bytes.len());
            Ok(GeneratedFactsheet {
                bytes,
                file_name: FACTSHEET_FILE_NAME,
                content_type: FACTSHEET_CONTENT_TYPE,
            })
        }
        Err(e) => {
            error!("❌ Factsheet {} failed: {}", e.step(), e);
            Err(e)
        }
    }
}

/// Loads and validates the upload and renders its charts without composing
/// the PDF, so the caller can show what the factsheet will contain.
pub fn preview_factsheet(
    csv: &[u8],
    logo: Option<&[u8]>,
    config: &FactsheetConfig,
) -> Result<FactsheetPreview, FactsheetError> {
    let span = info_span!("preview", request_id = %Uuid::new_v4());
    let _guard = span.enter();

    if let Some(bytes) = logo {
        check_logo_format(bytes)?;
    }

    let table = load_table(csv)?;
    let input = extract_input(&table, &config.schema)?;
    let ChartSet { performance, sectors } = render_charts(&input, config)?;

    info!(
        "👀 Previewed {} rows, {} series, {} sectors",
        table.row_count(),
        input.performance.len(),
        input.sectors.sectors.len()
    );

    Ok(FactsheetPreview {
        table,
        input,
        performance_chart: performance.map(|chart| STANDARD.encode(chart.png)),
        sector_chart: sectors.map(|chart| STANDARD.encode(chart.png)),
        has_logo: logo.is_some(),
    })
}

fn read_input(csv: &[u8], config: &FactsheetConfig) -> Result<FactsheetInput, FactsheetError> {
    let table = load_table(csv)?;
    info!("📄 Loaded table: {} columns, {} rows", table.headers.len(), table.row_count());
    extract_input(&table, &config.schema)
}

/// Renders the performance chart when there is performance data and the
/// sector chart when there are sector weights.
pub fn render_charts(input: &FactsheetInput, config: &FactsheetConfig) -> Result<ChartSet, FactsheetError> {
    let performance = if input.has_performance() {
        Some(render_performance_chart(&input.performance, &config.line_chart)?)
    } else {
        warn!("⚠️ No performance data; the chart is left out");
        None
    };

    let sectors = if input.sectors.is_empty() {
        None
    } else {
        Some(render_sector_chart(&input.sectors, &config.pie_chart)?)
    };

    Ok(ChartSet { performance, sectors })
}

use serde::Serialize;

use crate::models::{FactsheetInput, Table};

/// What the upload page shows before a factsheet is generated.
#[derive(Debug, Serialize)]
pub struct FactsheetPreview {
    pub table: Table,
    pub input: FactsheetInput,
    /// Base64-encoded PNG.
    pub performance_chart: Option<String>,
    /// Base64-encoded PNG.
    pub sector_chart: Option<String>,
    pub has_logo: bool,
}

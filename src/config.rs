use std::net::SocketAddr;
use std::str::FromStr;

use serde::Serialize;

use crate::models::ChartOptions;

/// How performance data is laid out in the uploaded table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TableLayout {
    /// A single data row; one `<Series> (<Month>)` column per month.
    Wide,
    /// One row per month with `Month` and per-series value columns.
    Monthly,
}

impl FromStr for TableLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "wide" => Ok(TableLayout::Wide),
            "monthly" | "long" => Ok(TableLayout::Monthly),
            other => Err(format!("Invalid FACTSHEET_LAYOUT: {}. Must be 'wide' or 'monthly'", other)),
        }
    }
}

/// A performance series: the column (or column prefix, in the wide layout)
/// it is read from and the name shown in the legend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesColumn {
    pub column: String,
    pub label: String,
}

impl SeriesColumn {
    fn new(column: &str, label: &str) -> Self {
        Self {
            column: column.to_string(),
            label: label.to_string(),
        }
    }
}

/// Column names the factsheet is read from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactsheetSchema {
    pub layout: TableLayout,
    pub required_columns: Vec<String>,
    pub fund_name: String,
    pub fund_manager: String,
    pub objective: String,
    pub audience: String,
    pub management_fee: String,
    pub brokerage_fee: String,
    pub expense_ratio: String,
    pub assets_under_management: String,
    pub holdings: String,
    pub portfolio: SeriesColumn,
    pub benchmark: SeriesColumn,
    /// Monthly layout only.
    pub month: String,
    /// Wide layout: prefix of `Sector Allocation (<Sector>)` columns.
    pub sector_prefix: String,
    /// Monthly layout: sector name and weight columns.
    pub sector: String,
    pub allocation: String,
}

impl FactsheetSchema {
    pub fn wide() -> Self {
        Self {
            layout: TableLayout::Wide,
            required_columns: vec![
                "Fund Name".to_string(),
                "Fund Objective".to_string(),
                "Who is it for".to_string(),
                "Management Fee".to_string(),
                "Brokerage Fee".to_string(),
            ],
            holdings: "Principal Holdings".to_string(),
            ..Self::base(TableLayout::Wide)
        }
    }

    pub fn monthly() -> Self {
        Self {
            layout: TableLayout::Monthly,
            required_columns: vec![
                "Month".to_string(),
                "Portfolio Performance".to_string(),
                "Holdings".to_string(),
            ],
            holdings: "Holdings".to_string(),
            ..Self::base(TableLayout::Monthly)
        }
    }

    pub fn for_layout(layout: TableLayout) -> Self {
        match layout {
            TableLayout::Wide => Self::wide(),
            TableLayout::Monthly => Self::monthly(),
        }
    }

    fn base(layout: TableLayout) -> Self {
        Self {
            layout,
            required_columns: Vec::new(),
            fund_name: "Fund Name".to_string(),
            fund_manager: "Fund Manager".to_string(),
            objective: "Fund Objective".to_string(),
            audience: "Who is it for".to_string(),
            management_fee: "Management Fee".to_string(),
            brokerage_fee: "Brokerage Fee".to_string(),
            expense_ratio: "Expense Ratio".to_string(),
            assets_under_management: "Assets Under Management".to_string(),
            holdings: String::new(),
            portfolio: SeriesColumn::new("Portfolio Performance", "Portfolio"),
            benchmark: SeriesColumn::new("Benchmark Performance", "Benchmark"),
            month: "Month".to_string(),
            sector_prefix: "Sector Allocation".to_string(),
            sector: "Sector".to_string(),
            allocation: "Allocation".to_string(),
        }
    }
}

impl Default for FactsheetSchema {
    fn default() -> Self {
        Self::wide()
    }
}

/// Page and block sizes used by the document composer, in points.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentOptions {
    pub default_title: String,
    pub page_width: f32,
    pub page_height: f32,
    pub margin: f32,
    pub logo_width: f32,
    pub logo_height: f32,
}

impl Default for DocumentOptions {
    fn default() -> Self {
        // US Letter
        Self {
            default_title: "Fund Factsheet".to_string(),
            page_width: 612.0,
            page_height: 792.0,
            margin: 42.0,
            logo_width: 120.0,
            logo_height: 60.0,
        }
    }
}

/// Everything one pipeline run needs. Read-only and shared between requests.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactsheetConfig {
    pub schema: FactsheetSchema,
    pub line_chart: ChartOptions,
    pub pie_chart: ChartOptions,
    pub document: DocumentOptions,
}

impl Default for FactsheetConfig {
    fn default() -> Self {
        Self {
            schema: FactsheetSchema::default(),
            line_chart: ChartOptions::line_default(),
            pie_chart: ChartOptions::pie_default(),
            document: DocumentOptions::default(),
        }
    }
}

impl FactsheetConfig {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so tests do not touch the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let layout = match lookup("FACTSHEET_LAYOUT") {
            Some(value) => value.parse::<TableLayout>()?,
            None => TableLayout::Wide,
        };
        let mut schema = FactsheetSchema::for_layout(layout);

        if let Some(columns) = lookup("FACTSHEET_REQUIRED_COLUMNS") {
            let columns: Vec<String> = columns
                .split(',')
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect();
            if columns.is_empty() {
                return Err("FACTSHEET_REQUIRED_COLUMNS is set but lists no columns".to_string());
            }
            schema.required_columns = columns;
        }

        let line_chart = match lookup("FACTSHEET_LINE_CHART") {
            Some(value) => value.parse()?,
            None => ChartOptions::line_default(),
        };
        let pie_chart = match lookup("FACTSHEET_PIE_CHART") {
            Some(value) => value.parse()?,
            None => ChartOptions::pie_default(),
        };

        let mut document = DocumentOptions::default();
        if let Some(title) = lookup("FACTSHEET_DEFAULT_TITLE") {
            document.default_title = title;
        }

        Ok(Self {
            schema,
            line_chart,
            pie_chart,
            document,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub max_upload_bytes: usize,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("FACTSHEET_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = lookup("FACTSHEET_PORT").unwrap_or_else(|| "3000".to_string());
        let addr = format!("{}:{}", host, port)
            .parse::<SocketAddr>()
            .map_err(|e| format!("Invalid FACTSHEET_HOST/FACTSHEET_PORT '{}:{}': {}", host, port, e))?;

        let max_upload_mb = match lookup("FACTSHEET_MAX_UPLOAD_MB") {
            Some(value) => value
                .trim()
                .parse::<usize>()
                .map_err(|_| format!("Invalid FACTSHEET_MAX_UPLOAD_MB: {}", value))?,
            None => 10,
        };

        Ok(Self {
            addr,
            max_upload_bytes: max_upload_mb * 1024 * 1024,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_use_wide_layout() {
        let config = FactsheetConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, FactsheetConfig::default());
        assert_eq!(config.schema.layout, TableLayout::Wide);
        assert!(config.schema.required_columns.contains(&"Fund Objective".to_string()));
    }

    #[test]
    fn test_monthly_layout_and_required_override() {
        let config = FactsheetConfig::from_lookup(lookup(&[
            ("FACTSHEET_LAYOUT", "monthly"),
            ("FACTSHEET_REQUIRED_COLUMNS", "Month, Portfolio Performance"),
            ("FACTSHEET_LINE_CHART", "10x5@72"),
        ]))
        .unwrap();
        assert_eq!(config.schema.layout, TableLayout::Monthly);
        assert_eq!(config.schema.required_columns, vec!["Month", "Portfolio Performance"]);
        assert_eq!(config.line_chart.pixel_size(), (720, 360));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(FactsheetConfig::from_lookup(lookup(&[("FACTSHEET_LAYOUT", "tall")])).is_err());
        assert!(FactsheetConfig::from_lookup(lookup(&[("FACTSHEET_REQUIRED_COLUMNS", " , ")])).is_err());
        assert!(ServerConfig::from_lookup(lookup(&[("FACTSHEET_PORT", "http")])).is_err());
    }

    #[test]
    fn test_server_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.addr.port(), 3000);
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
    }
}

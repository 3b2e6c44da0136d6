use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

use crate::config::{FactsheetSchema, TableLayout};
use crate::errors::FactsheetError;
use crate::models::{FactsheetInput, FeeSchedule, PerformanceSeries, SectorAllocation, Table};
use crate::services::table_service::{validate_columns, validate_required_values};
use crate::utils::{non_empty, parse_amount, parse_percentage};

/// `Portfolio Performance (Jan)` -> ("Portfolio Performance", "Jan")
fn labelled_column_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(.+?)\s*\(([^()]+)\)\s*$").expect("valid column regex"))
}

/// Maps a loaded table onto the schema. Validation runs first so a table
/// with missing columns never gets as far as numeric parsing.
pub fn extract_input(table: &Table, schema: &FactsheetSchema) -> Result<FactsheetInput, FactsheetError> {
    validate_columns(table, &schema.required_columns)?;
    validate_required_values(table, &schema.required_columns)?;

    let mut input = FactsheetInput {
        fund_name: text_field(table, &schema.fund_name),
        fund_manager: text_field(table, &schema.fund_manager),
        objective: text_field(table, &schema.objective),
        audience: text_field(table, &schema.audience),
        fees: FeeSchedule {
            management_fee: text_field(table, &schema.management_fee),
            brokerage_fee: text_field(table, &schema.brokerage_fee),
        },
        ..Default::default()
    };

    if let Some(value) = text_field(table, &schema.expense_ratio) {
        input.expense_ratio = Some(parse_percentage(&value, &schema.expense_ratio, 1)?);
    }
    if let Some(value) = text_field(table, &schema.assets_under_management) {
        input.assets_under_management = Some(parse_amount(&value, &schema.assets_under_management, 1)?);
    }

    match schema.layout {
        TableLayout::Wide => extract_wide(table, schema, &mut input)?,
        TableLayout::Monthly => extract_monthly(table, schema, &mut input)?,
    }

    debug!(
        "Extracted factsheet input: {} series, {} holdings, {} sectors",
        input.performance.len(),
        input.holdings.len(),
        input.sectors.sectors.len()
    );
    Ok(input)
}

fn text_field(table: &Table, column: &str) -> Option<String> {
    table.cell(0, column).and_then(non_empty)
}

/// Columns named `<prefix> (<label>)`, in header order.
fn labelled_columns<'a>(table: &'a Table, prefix: &str) -> Vec<(&'a str, String)> {
    let re = labelled_column_regex();
    table
        .headers
        .iter()
        .filter_map(|header| {
            let caps = re.captures(header)?;
            if caps[1].trim() == prefix {
                Some((header.as_str(), caps[2].trim().to_string()))
            } else {
                None
            }
        })
        .collect()
}

fn extract_wide(table: &Table, schema: &FactsheetSchema, input: &mut FactsheetInput) -> Result<(), FactsheetError> {
    let portfolio_columns = labelled_columns(table, &schema.portfolio.column);
    if portfolio_columns.is_empty() {
        return Err(FactsheetError::MissingColumns(vec![format!(
            "{} (<Month>)",
            schema.portfolio.column
        )]));
    }

    let mut portfolio = PerformanceSeries::new(&schema.portfolio.label);
    for (column, label) in &portfolio_columns {
        let value = table.cell(0, column).unwrap_or_default();
        portfolio.push(label.clone(), parse_percentage(value, column, 1)?);
    }

    let benchmark_columns = labelled_columns(table, &schema.benchmark.column);
    let benchmark = if benchmark_columns.is_empty() {
        None
    } else {
        Some(aligned_wide_series(table, schema, &portfolio, &benchmark_columns)?)
    };

    input.performance.push(portfolio);
    input.performance.extend(benchmark);

    if let Some(holdings) = text_field(table, &schema.holdings) {
        input.holdings = holdings
            .split(',')
            .filter_map(non_empty)
            .collect();
    }

    let mut sectors = SectorAllocation::default();
    for (column, sector) in labelled_columns(table, &schema.sector_prefix) {
        let value = table.cell(0, column).unwrap_or_default();
        if value.trim().is_empty() {
            continue;
        }
        sectors.sectors.push((sector, parse_percentage(value, column, 1)?));
    }
    input.sectors = sectors;

    Ok(())
}

/// The benchmark must cover exactly the portfolio's months; its values are
/// read in the portfolio's label order.
fn aligned_wide_series(
    table: &Table,
    schema: &FactsheetSchema,
    portfolio: &PerformanceSeries,
    benchmark_columns: &[(&str, String)],
) -> Result<PerformanceSeries, FactsheetError> {
    let mut missing = Vec::new();
    let mut series = PerformanceSeries::new(&schema.benchmark.label);

    for label in portfolio.labels() {
        match benchmark_columns.iter().find(|(_, l)| l == label) {
            Some((column, _)) => {
                let value = table.cell(0, column).unwrap_or_default();
                series.push(label, parse_percentage(value, column, 1)?);
            }
            None => missing.push(format!("{} ({})", schema.benchmark.column, label)),
        }
    }

    for (_, label) in benchmark_columns {
        if !portfolio.labels().contains(&label.as_str()) {
            missing.push(format!("{} ({})", schema.portfolio.column, label));
        }
    }

    if missing.is_empty() {
        Ok(series)
    } else {
        Err(FactsheetError::MissingColumns(missing))
    }
}

fn extract_monthly(table: &Table, schema: &FactsheetSchema, input: &mut FactsheetInput) -> Result<(), FactsheetError> {
    let missing: Vec<String> = [&schema.month, &schema.portfolio.column]
        .into_iter()
        .filter(|column| !table.has_column(column))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(FactsheetError::MissingColumns(missing));
    }

    let has_benchmark = table.has_column(&schema.benchmark.column);
    let mut portfolio = PerformanceSeries::new(&schema.portfolio.label);
    let mut benchmark = PerformanceSeries::new(&schema.benchmark.label);

    for row in 0..table.row_count() {
        let month = table.cell(row, &schema.month).unwrap_or_default().trim();
        if month.is_empty() {
            continue;
        }
        let value = table.cell(row, &schema.portfolio.column).unwrap_or_default();
        portfolio.push(month, parse_percentage(value, &schema.portfolio.column, row + 1)?);

        if has_benchmark {
            let value = table.cell(row, &schema.benchmark.column).unwrap_or_default();
            benchmark.push(month, parse_percentage(value, &schema.benchmark.column, row + 1)?);
        }
    }

    input.performance.push(portfolio);
    if has_benchmark {
        input.performance.push(benchmark);
    }

    if let Some(cells) = table.column(&schema.holdings) {
        input.holdings = cells.into_iter().filter_map(non_empty).collect();
    }

    if table.has_column(&schema.sector) && table.has_column(&schema.allocation) {
        for row in 0..table.row_count() {
            let Some(sector) = table.cell(row, &schema.sector).and_then(non_empty) else {
                continue;
            };
            let value = table.cell(row, &schema.allocation).unwrap_or_default();
            input
                .sectors
                .sectors
                .push((sector, parse_percentage(value, &schema.allocation, row + 1)?));
        }
    }

    Ok(())
}

use csv::WriterBuilder;

use crate::config::{FactsheetSchema, TableLayout};
use crate::errors::FactsheetError;
use crate::models::Table;

pub const TEMPLATE_FILE_NAME: &str = "factsheet_template.csv";
pub const TEMPLATE_CONTENT_TYPE: &str = "text/csv";

const FUND_NAME: &str = "MSM Property Fund";
const FUND_MANAGER: &str = "MSM Asset Management";
const OBJECTIVE: &str =
    "We identify companies whose share prices differ materially from intrinsic valuations.";
const AUDIENCE: &str = "Investors seeking long-term capital growth from listed property, \
                        who can tolerate short-term volatility.";
const MANAGEMENT_FEE: &str = "1.5% per annum";
const BROKERAGE_FEE: &str = "0.60%";
const EXPENSE_RATIO: &str = "1.65%";
const AUM: &str = "1250000000";
const HOLDINGS: [&str; 4] = ["Growth Point", "Redefine", "Hyprop", "Investec Property"];
const MONTHS: [&str; 6] = ["Jan", "Feb", "Mar", "Apr", "May", "Jun"];
const PORTFOLIO: [&str; 6] = ["-0.1%", "0.94%", "8.49%", "1.46%", "-1.85%", "-1.56%"];
const BENCHMARK: [&str; 6] = ["-3.0%", "1.6%", "7.1%", "1.7%", "-4.09%", "-4.09%"];
const SECTORS: [(&str, &str); 4] = [
    ("Retail", "42"),
    ("Office", "28"),
    ("Industrial", "18"),
    ("Residential", "12"),
];

/// The fixed sample table for the configured layout. Column names come from
/// the schema so the template always passes its own validation.
pub fn template_table(schema: &FactsheetSchema) -> Table {
    let (mut headers, mut rows) = match schema.layout {
        TableLayout::Wide => wide_template(schema),
        TableLayout::Monthly => monthly_template(schema),
    };

    // Extra required columns configured by the operator get a placeholder value.
    for column in &schema.required_columns {
        if !headers.contains(column) {
            headers.push(column.clone());
            for (idx, row) in rows.iter_mut().enumerate() {
                row.push(if idx == 0 { "-".to_string() } else { String::new() });
            }
        }
    }

    Table::new(headers, rows)
}

/// The sample table serialized as CSV.
pub fn template_csv(schema: &FactsheetSchema) -> Result<Vec<u8>, FactsheetError> {
    let table = template_table(schema);
    let mut writer = WriterBuilder::new().from_writer(Vec::new());

    writer
        .write_record(&table.headers)
        .and_then(|_| table.rows.iter().try_for_each(|row| writer.write_record(row)))
        .map_err(|e| FactsheetError::Render(format!("could not write template: {}", e)))?;

    writer
        .into_inner()
        .map_err(|e| FactsheetError::Render(format!("could not write template: {}", e)))
}

fn labelled(prefix: &str, label: &str) -> String {
    format!("{} ({})", prefix, label)
}

fn wide_template(schema: &FactsheetSchema) -> (Vec<String>, Vec<Vec<String>>) {
    let mut cells: Vec<(String, String)> = vec![
        (schema.fund_name.clone(), FUND_NAME.to_string()),
        (schema.fund_manager.clone(), FUND_MANAGER.to_string()),
        (schema.objective.clone(), OBJECTIVE.to_string()),
        (schema.audience.clone(), AUDIENCE.to_string()),
        (schema.management_fee.clone(), MANAGEMENT_FEE.to_string()),
        (schema.brokerage_fee.clone(), BROKERAGE_FEE.to_string()),
        (schema.expense_ratio.clone(), EXPENSE_RATIO.to_string()),
        (schema.assets_under_management.clone(), AUM.to_string()),
        (schema.holdings.clone(), HOLDINGS.join(", ")),
    ];

    for (month, value) in MONTHS.iter().zip(PORTFOLIO) {
        cells.push((labelled(&schema.portfolio.column, month), value.to_string()));
    }
    for (month, value) in MONTHS.iter().zip(BENCHMARK) {
        cells.push((labelled(&schema.benchmark.column, month), value.to_string()));
    }
    for (sector, weight) in SECTORS {
        cells.push((labelled(&schema.sector_prefix, sector), weight.to_string()));
    }

    let (headers, row) = cells.into_iter().unzip();
    (headers, vec![row])
}

fn monthly_template(schema: &FactsheetSchema) -> (Vec<String>, Vec<Vec<String>>) {
    let headers = vec![
        schema.fund_name.clone(),
        schema.fund_manager.clone(),
        schema.objective.clone(),
        schema.audience.clone(),
        schema.management_fee.clone(),
        schema.brokerage_fee.clone(),
        schema.expense_ratio.clone(),
        schema.assets_under_management.clone(),
        schema.month.clone(),
        schema.portfolio.column.clone(),
        schema.benchmark.column.clone(),
        schema.holdings.clone(),
        schema.sector.clone(),
        schema.allocation.clone(),
    ];

    let rows = MONTHS
        .iter()
        .enumerate()
        .map(|(idx, month)| {
            let first = |value: &str| if idx == 0 { value.to_string() } else { String::new() };
            let holding = HOLDINGS.get(idx).copied().unwrap_or_default();
            let (sector, weight) = SECTORS.get(idx).copied().unwrap_or_default();
            vec![
                first(FUND_NAME),
                first(FUND_MANAGER),
                first(OBJECTIVE),
                first(AUDIENCE),
                first(MANAGEMENT_FEE),
                first(BROKERAGE_FEE),
                first(EXPENSE_RATIO),
                first(AUM),
                month.to_string(),
                PORTFOLIO[idx].to_string(),
                BENCHMARK[idx].to_string(),
                holding.to_string(),
                sector.to_string(),
                weight.to_string(),
            ]
        })
        .collect();

    (headers, rows)
}

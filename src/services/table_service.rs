use csv::ReaderBuilder;
use tracing::debug;

use crate::errors::FactsheetError;
use crate::models::Table;

/// Parses an uploaded comma-delimited file into a [`Table`].
///
/// Ragged rows, invalid UTF-8, a missing header and a file without data rows
/// all fail with [`FactsheetError::Parse`].
pub fn load_table(bytes: &[u8]) -> Result<Table, FactsheetError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| FactsheetError::Parse(describe_csv_error(&e)))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(FactsheetError::Parse("the file has no header row".to_string()));
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| FactsheetError::Parse(describe_csv_error(&e)))?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        rows.push(record.iter().map(|cell| cell.trim().to_string()).collect());
    }

    if rows.is_empty() {
        return Err(FactsheetError::Parse("the file has a header but no data rows".to_string()));
    }

    debug!("Loaded table with {} columns and {} rows", headers.len(), rows.len());
    Ok(Table::new(headers, rows))
}

/// Checks that every required column is present. The error lists exactly
/// the absent ones, in the order they were required.
pub fn validate_columns(table: &Table, required: &[String]) -> Result<(), FactsheetError> {
    let missing: Vec<String> = required
        .iter()
        .filter(|column| !table.has_column(column))
        .cloned()
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(FactsheetError::MissingColumns(missing))
    }
}

/// Checks that every required column has a value in the first data row.
pub fn validate_required_values(table: &Table, required: &[String]) -> Result<(), FactsheetError> {
    let empty: Vec<String> = required
        .iter()
        .filter(|column| table.cell(0, column).map_or(true, |v| v.trim().is_empty()))
        .cloned()
        .collect();

    if empty.is_empty() {
        Ok(())
    } else {
        Err(FactsheetError::EmptyFields(empty))
    }
}

fn describe_csv_error(err: &csv::Error) -> String {
    match err.kind() {
        csv::ErrorKind::UnequalLengths { pos, expected_len, len } => {
            let line = pos.as_ref().map(|p| p.line()).unwrap_or_default();
            format!(
                "line {} has {} fields but the header has {}",
                line, len, expected_len
            )
        }
        csv::ErrorKind::Utf8 { pos, .. } => {
            let line = pos.as_ref().map(|p| p.line()).unwrap_or_default();
            format!("line {} is not valid UTF-8 text", line)
        }
        _ => err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_table_reads_headers_and_rows() {
        let table = load_table(b"Month,Portfolio Performance\nJan,1.5\nFeb, 2.3 \n").unwrap();
        assert_eq!(table.headers, vec!["Month", "Portfolio Performance"]);
        assert_eq!(table.rows, vec![vec!["Jan", "1.5"], vec!["Feb", "2.3"]]);
    }

    #[test]
    fn test_load_table_strips_bom_and_blank_lines() {
        let table = load_table(b"\xEF\xBB\xBFMonth,Value\nJan,1\n,\n").unwrap();
        assert_eq!(table.headers[0], "Month");
        assert_eq!(table.row_count(), 1);
    }

    #[test]
    fn test_load_table_rejects_ragged_rows() {
        let err = load_table(b"Month,Value\nJan,1,extra\n").unwrap_err();
        match err {
            FactsheetError::Parse(msg) => assert!(msg.contains("3 fields"), "{}", msg),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_load_table_rejects_header_only_and_empty_files() {
        assert!(matches!(load_table(b"Month,Value\n"), Err(FactsheetError::Parse(_))));
        assert!(matches!(load_table(b""), Err(FactsheetError::Parse(_))));
    }

    #[test]
    fn test_load_table_rejects_invalid_utf8() {
        let err = load_table(b"Month,Value\nJan,\xFF\xFE\n").unwrap_err();
        assert!(matches!(err, FactsheetError::Parse(_)));
    }

    #[test]
    fn test_validate_columns_lists_exactly_the_missing_ones() {
        let table = load_table(b"Month,Holdings\nJan,A\n").unwrap();
        let required = vec![
            "Month".to_string(),
            "Portfolio Performance".to_string(),
            "Holdings".to_string(),
            "Fund Name".to_string(),
        ];
        let err = validate_columns(&table, &required).unwrap_err();
        assert_eq!(
            err,
            FactsheetError::MissingColumns(vec![
                "Portfolio Performance".to_string(),
                "Fund Name".to_string()
            ])
        );
    }

    #[test]
    fn test_validate_required_values() {
        let table = load_table(b"Fund Name,Fund Objective\nMSM,\n").unwrap();
        let required = vec!["Fund Name".to_string(), "Fund Objective".to_string()];
        assert!(validate_columns(&table, &required).is_ok());
        assert_eq!(
            validate_required_values(&table, &required).unwrap_err(),
            FactsheetError::EmptyFields(vec!["Fund Objective".to_string()])
        );
    }
}

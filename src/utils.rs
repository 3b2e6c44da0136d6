use crate::errors::FactsheetError;

/// Parses a percentage cell such as `"-1.85%"` or `"8.49"` into `-1.85` / `8.49`.
///
/// `column` and `row` (1-based data row) identify the cell in the error.
pub fn parse_percentage(value: &str, column: &str, row: usize) -> Result<f64, FactsheetError> {
    let cleaned = value.trim();
    let cleaned = cleaned.strip_suffix('%').unwrap_or(cleaned).trim();

    cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| FactsheetError::NumericFormat {
            column: column.to_string(),
            row,
            value: value.to_string(),
        })
}

/// Parses a monetary amount, ignoring currency symbols, spaces and thousands separators.
pub fn parse_amount(value: &str, column: &str, row: usize) -> Result<f64, FactsheetError> {
    let cleaned: String = value
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| FactsheetError::NumericFormat {
            column: column.to_string(),
            row,
            value: value.to_string(),
        })
}

/// Formats a percentage without trailing zeros: `1.5` -> `"1.5%"`, `-4.09` -> `"-4.09%"`.
pub fn format_percentage(value: f64) -> String {
    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    let trimmed = if trimmed == "-0" { "0" } else { trimmed };
    format!("{}%", trimmed)
}

/// Formats an amount with thousands separators and two decimals.
pub fn format_amount(value: f64) -> String {
    let formatted = format!("{:.2}", value.abs());
    let (whole, fraction) = formatted.split_once('.').unwrap_or((&formatted, "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, fraction)
}

/// Returns `None` for blank cells, the trimmed text otherwise.
pub fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_percentage_with_suffix() {
        assert_eq!(parse_percentage("-1.85%", "Jan", 1).unwrap(), -1.85);
        assert_eq!(parse_percentage(" 0.94 % ", "Feb", 1).unwrap(), 0.94);
    }

    #[test]
    fn test_parse_percentage_plain_number() {
        assert_eq!(parse_percentage("8.49", "Mar", 1).unwrap(), 8.49);
    }

    #[test]
    fn test_parse_percentage_rejects_text() {
        let err = parse_percentage("N/A", "Portfolio Performance (Apr)", 3).unwrap_err();
        assert_eq!(
            err,
            FactsheetError::NumericFormat {
                column: "Portfolio Performance (Apr)".into(),
                row: 3,
                value: "N/A".into(),
            }
        );
    }

    #[test]
    fn test_parse_percentage_rejects_empty_and_nan() {
        assert!(parse_percentage("", "Jan", 1).is_err());
        assert!(parse_percentage("%", "Jan", 1).is_err());
        assert!(parse_percentage("NaN", "Jan", 1).is_err());
    }

    #[test]
    fn test_parse_amount_strips_currency() {
        assert_eq!(parse_amount("R 1,250,000", "AUM", 1).unwrap(), 1_250_000.0);
        assert_eq!(parse_amount("$980.50", "AUM", 1).unwrap(), 980.5);
        assert!(parse_amount("unknown", "AUM", 1).is_err());
    }

    #[test]
    fn test_format_percentage() {
        assert_eq!(format_percentage(1.5), "1.5%");
        assert_eq!(format_percentage(-4.09), "-4.09%");
        assert_eq!(format_percentage(8.0), "8%");
        assert_eq!(format_percentage(-0.001), "0%");
    }

    #[test]
    fn test_format_amount_groups_thousands() {
        assert_eq!(format_amount(1_250_000.0), "1,250,000.00");
        assert_eq!(format_amount(999.5), "999.50");
        assert_eq!(format_amount(-12_345.678), "-12,345.68");
    }
}

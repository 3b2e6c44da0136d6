use serde::Serialize;

/// A parsed delimited file: one header row and equally wide data rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cell at `row` (0-based) of the named column.
    pub fn cell(&self, row: usize, name: &str) -> Option<&str> {
        let idx = self.column_index(name)?;
        self.rows.get(row)?.get(idx).map(String::as_str)
    }

    /// Every cell of the named column, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.column_index(name)?;
        Some(
            self.rows
                .iter()
                .filter_map(|row| row.get(idx).map(String::as_str))
                .collect(),
        )
    }
}

use serde::Serialize;

/// Ordered `(label, value)` points of one performance line. Labels keep the
/// order they were read in; they are never re-sorted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceSeries {
    pub name: String,
    pub points: Vec<(String, f64)>,
}

impl PerformanceSeries {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            points: Vec::new(),
        }
    }

    pub fn push(&mut self, label: impl Into<String>, value: f64) {
        self.points.push((label.into(), value));
    }

    pub fn labels(&self) -> Vec<&str> {
        self.points.iter().map(|(label, _)| label.as_str()).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|(_, value)| *value).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }
}

/// Sector weights as uploaded. The percentages are shown as-is and are not
/// required to add up to 100.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SectorAllocation {
    pub sectors: Vec<(String, f64)>,
}

impl SectorAllocation {
    pub fn is_empty(&self) -> bool {
        self.sectors.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.sectors.iter().map(|(_, pct)| pct).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeeSchedule {
    pub management_fee: Option<String>,
    pub brokerage_fee: Option<String>,
}

impl FeeSchedule {
    pub fn is_empty(&self) -> bool {
        self.management_fee.is_none() && self.brokerage_fee.is_none()
    }

    /// `(label, value)` rows for the fee table, skipping fees that were not supplied.
    pub fn rows(&self) -> Vec<(&'static str, &str)> {
        let mut rows = Vec::new();
        if let Some(fee) = &self.management_fee {
            rows.push(("Management Fee", fee.as_str()));
        }
        if let Some(fee) = &self.brokerage_fee {
            rows.push(("Brokerage Fee", fee.as_str()));
        }
        rows
    }
}

/// Everything the factsheet shows, extracted from one uploaded table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FactsheetInput {
    pub fund_name: Option<String>,
    pub fund_manager: Option<String>,
    pub objective: Option<String>,
    pub audience: Option<String>,
    pub fees: FeeSchedule,
    pub expense_ratio: Option<f64>,
    pub assets_under_management: Option<f64>,
    pub holdings: Vec<String>,
    /// Portfolio first, followed by any benchmark series sharing its labels.
    pub performance: Vec<PerformanceSeries>,
    pub sectors: SectorAllocation,
}

impl FactsheetInput {
    pub fn title(&self, default_title: &str) -> String {
        match &self.fund_name {
            Some(name) => format!("{} Factsheet", name),
            None => default_title.to_string(),
        }
    }

    pub fn has_performance(&self) -> bool {
        self.performance.iter().any(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_keeps_insertion_order() {
        let mut series = PerformanceSeries::new("Portfolio");
        series.push("Mar", 3.8);
        series.push("Jan", 1.5);
        assert_eq!(series.labels(), vec!["Mar", "Jan"]);
        assert_eq!(series.values(), vec![3.8, 1.5]);
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn test_fee_rows_skip_missing_fees() {
        let fees = FeeSchedule {
            management_fee: Some("1.5% per annum".into()),
            brokerage_fee: None,
        };
        assert_eq!(fees.rows(), vec![("Management Fee", "1.5% per annum")]);
        assert!(!fees.is_empty());
        assert!(FeeSchedule::default().is_empty());
    }

    #[test]
    fn test_title_falls_back_to_default() {
        let mut input = FactsheetInput::default();
        assert_eq!(input.title("Fund Factsheet"), "Fund Factsheet");
        input.fund_name = Some("MSM Property Fund".into());
        assert_eq!(input.title("Fund Factsheet"), "MSM Property Fund Factsheet");
    }

    #[test]
    fn test_sector_total_is_not_normalised() {
        let sectors = SectorAllocation {
            sectors: vec![("Retail".into(), 60.0), ("Office".into(), 50.0)],
        };
        assert_eq!(sectors.total(), 110.0);
    }
}

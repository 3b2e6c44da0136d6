mod chart;
mod factsheet;
mod preview;
mod table;

pub use chart::{ChartAsset, ChartOptions, ChartSet};
pub use factsheet::{FactsheetInput, FeeSchedule, PerformanceSeries, SectorAllocation};
pub use preview::FactsheetPreview;
pub use table::Table;

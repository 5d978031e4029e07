pub mod report;
pub mod thresholds;

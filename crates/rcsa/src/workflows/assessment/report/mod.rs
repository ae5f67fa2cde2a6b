mod insights;
mod summary;
pub mod views;

pub use summary::AssessmentReport;
pub use views::AssessmentSummary;

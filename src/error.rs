use thiserror::Error;

/// Failures that stop the dashboard before anything is aggregated.
///
/// Row-level defects (bad dates, missing amounts) never show up here; the
/// loader absorbs them into the data and counts them in its `LoadReport`.
#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("workbook read error: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("workbook contains no sheets")]
    EmptyWorkbook,

    #[error("missing expected columns in dataset: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("duplicate columns in dataset after trimming: {}", .0.join(", "))]
    DuplicateColumns(Vec<String>),
}

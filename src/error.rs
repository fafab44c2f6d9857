use thiserror::Error;

use crate::pipeline::types::SkippedSheet;

/// Per-sheet failures. The sheet aggregator turns these into
/// [`SkippedSheet`] warnings; they never abort a workbook.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SheetError {
    #[error("column not found: {0}")]
    ColumnNotFound(String),

    #[error("no valid rows")]
    NoValidRows,
}

/// Workbook-level failures, reported to the caller as a single terminal error.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("could not read spreadsheet: {0}")]
    LoadFailure(String),

    #[error("no sheet produced valid data ({} skipped)", .skipped.len())]
    NoValidData { skipped: Vec<SkippedSheet> },
}

impl From<calamine::Error> for PipelineError {
    fn from(err: calamine::Error) -> Self {
        PipelineError::LoadFailure(err.to_string())
    }
}

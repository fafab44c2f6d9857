pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod report;
pub mod workbook;

pub use error::{PipelineError, SheetError};
pub use pipeline::process_workbook;

//! Score extraction and tier classification.
//!
//! This module locates the name and score columns of each sheet, coerces
//! and validates scores, classifies every record into a tier, and aggregates
//! per-sheet and population statistics.

pub mod aggregate;
pub mod classify;
pub mod locator;
pub mod normalize;
pub mod types;
pub mod utility;

pub use aggregate::{aggregate, process_sheet, process_workbook};
pub use classify::classify;
pub use locator::locate;
pub use normalize::normalize;

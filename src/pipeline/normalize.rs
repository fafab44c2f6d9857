//! Score Normalizer: numeric coercion and row validation.

use tracing::trace;

use crate::pipeline::types::{Cell, LocatedColumns, RawSheet, ScoreRange};

/// Largest magnitude below which every integer-valued `f64` is exact (2^53).
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Extracts `(name, score)` pairs from the data rows of `sheet`.
///
/// Rows with an empty name or a score that is not a finite number are
/// dropped, as are rows outside `valid_range` when one is given. Retained
/// rows keep their original order.
pub fn normalize(
    sheet: &RawSheet,
    columns: &LocatedColumns,
    valid_range: Option<ScoreRange>,
) -> Vec<(String, f64)> {
    let mut rows = Vec::new();

    for row in columns.data_start..sheet.rows.len() {
        let Some(name) = coerce_name(sheet.cell(row, columns.name)) else {
            trace!(row, "Dropping row without name");
            continue;
        };
        let Some(score) = coerce_score(sheet.cell(row, columns.score)) else {
            trace!(row, name = %name, "Dropping row without numeric score");
            continue;
        };
        if let Some(range) = valid_range {
            if !range.contains(score) {
                trace!(row, score, "Dropping out-of-range score");
                continue;
            }
        }
        rows.push((name, score));
    }

    rows
}

/// Numeric value of a score cell, or `None` when it is missing or unparseable.
pub fn coerce_score(cell: &Cell) -> Option<f64> {
    let value = match cell {
        Cell::Number(n) => *n,
        Cell::Text(text) => text.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    value.is_finite().then_some(value)
}

/// Trimmed name of a cell, or `None` when it is blank.
pub fn coerce_name(cell: &Cell) -> Option<String> {
    let name = match cell {
        Cell::Text(text) => text.trim().to_string(),
        Cell::Number(n) if n.fract() == 0.0 && n.abs() < MAX_EXACT_INTEGER => {
            format!("{}", *n as i64)
        }
        Cell::Number(n) if n.is_finite() => n.to_string(),
        _ => return None,
    };
    (!name.is_empty()).then_some(name)
}

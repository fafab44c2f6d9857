//! Column Locator: finds the name and score columns of a sheet.

use tracing::debug;

use crate::error::SheetError;
use crate::pipeline::types::{
    AnalysisScale, Cell, InputMode, LocatedColumns, PreprocessedLayout, RawLayout, RawSheet,
};

/// Column C of the nómina export.
pub const DEFAULT_NAME_COLUMN: usize = 2;
/// Score column of the SIMCE nómina export (column FK).
pub const SIMCE_SCORE_COLUMN: usize = 166;
/// Score column of the PAES nómina export, one column to the left of SIMCE's.
pub const PAES_SCORE_COLUMN: usize = 165;
/// Rows above the first student in the nómina export.
pub const RAW_HEADER_ROWS: usize = 10;

pub const NAME_LABEL: &str = "Nombre";
pub const SCORE_LABELS: [&str; 2] = ["Puntaje SIMCE", "Puntaje PAES"];
pub const CANONICAL_SCORE_LABEL: &str = "Puntaje";

impl RawLayout {
    /// Layout of the nómina export for `scale`.
    pub fn for_scale(scale: AnalysisScale) -> Self {
        let score_column = match scale {
            AnalysisScale::Simce => SIMCE_SCORE_COLUMN,
            AnalysisScale::Paes => PAES_SCORE_COLUMN,
        };
        Self {
            name_column: DEFAULT_NAME_COLUMN,
            score_column,
        }
    }
}

impl Default for PreprocessedLayout {
    fn default() -> Self {
        Self {
            name_label: NAME_LABEL.to_string(),
            score_labels: SCORE_LABELS.iter().map(|l| l.to_string()).collect(),
            canonical_score_label: CANONICAL_SCORE_LABEL.to_string(),
        }
    }
}

/// Resolves the name and score columns of `sheet` under `mode`.
///
/// # Errors
///
/// Returns [`SheetError::ColumnNotFound`] when the sheet is narrower than a
/// raw layout, or when a preprocessed sheet lacks the name label or every
/// accepted score label.
pub fn locate(sheet: &RawSheet, mode: &InputMode) -> Result<LocatedColumns, SheetError> {
    match mode {
        InputMode::Raw(layout) => locate_raw(sheet, layout),
        InputMode::Preprocessed(layout) => locate_labelled(sheet, layout),
    }
}

fn locate_raw(sheet: &RawSheet, layout: &RawLayout) -> Result<LocatedColumns, SheetError> {
    let width = sheet.width();
    for (role, column) in [("name", layout.name_column), ("score", layout.score_column)] {
        if column >= width {
            return Err(SheetError::ColumnNotFound(format!(
                "{role} column {column} (sheet has {width} columns)"
            )));
        }
    }

    Ok(LocatedColumns {
        name: layout.name_column,
        score: layout.score_column,
        data_start: 0,
        score_label: CANONICAL_SCORE_LABEL.to_string(),
    })
}

fn locate_labelled(
    sheet: &RawSheet,
    layout: &PreprocessedLayout,
) -> Result<LocatedColumns, SheetError> {
    let labels: Vec<String> = sheet
        .rows
        .first()
        .map(|row| row.iter().map(label_of).collect())
        .unwrap_or_default();

    let find = |wanted: &str| {
        let wanted = wanted.trim().to_lowercase();
        labels.iter().position(|l| *l == wanted)
    };

    let name = find(layout.name_label.as_str())
        .ok_or_else(|| SheetError::ColumnNotFound(layout.name_label.clone()))?;

    let (score, matched) = layout
        .score_labels
        .iter()
        .find_map(|label| find(label.as_str()).map(|idx| (idx, label)))
        .ok_or_else(|| SheetError::ColumnNotFound(layout.score_labels.join(" / ")))?;

    debug!(
        sheet = %sheet.name,
        label = %matched,
        canonical = %layout.canonical_score_label,
        column = score,
        "Score column resolved"
    );

    Ok(LocatedColumns {
        name,
        score,
        data_start: 1,
        score_label: layout.canonical_score_label.clone(),
    })
}

fn label_of(cell: &Cell) -> String {
    match cell {
        Cell::Text(text) => text.trim().to_lowercase(),
        _ => String::new(),
    }
}

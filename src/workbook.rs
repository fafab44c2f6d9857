//! Spreadsheet loader for multi-sheet workbooks.

use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Range, Reader, Sheets};
use tracing::debug;

use crate::error::PipelineError;
use crate::pipeline::types::{Cell, RawSheet, Workbook};

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => Cell::Empty,
            Data::String(s) => Cell::Text(s.clone()),
            Data::Float(f) => Cell::Number(*f),
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Bool(b) => Cell::Bool(*b),
            _ => Cell::Other,
        }
    }
}

/// Opens the workbook at `path`, dropping `header_rows` leading rows from
/// every sheet.
///
/// # Errors
///
/// Returns [`PipelineError::LoadFailure`] if the file is missing or is not a
/// readable spreadsheet.
pub fn load_workbook(path: &Path, header_rows: usize) -> Result<Workbook, PipelineError> {
    let sheets = open_workbook_auto(path)?;
    read_sheets(sheets, header_rows)
}

/// Same as [`load_workbook`] for an in-memory upload.
pub fn load_workbook_from_bytes(
    bytes: Vec<u8>,
    header_rows: usize,
) -> Result<Workbook, PipelineError> {
    let sheets = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    read_sheets(sheets, header_rows)
}

fn read_sheets<RS>(mut sheets: Sheets<RS>, header_rows: usize) -> Result<Workbook, PipelineError>
where
    RS: std::io::Read + std::io::Seek,
{
    let names = sheets.sheet_names().to_owned();
    let mut workbook = Workbook::default();

    for name in names {
        let range = sheets.worksheet_range(&name)?;
        let sheet = to_raw_sheet(&name, &range, header_rows);
        debug!(
            sheet = %name,
            rows = sheet.rows.len(),
            columns = sheet.width(),
            "Sheet loaded"
        );
        workbook.sheets.push(sheet);
    }

    Ok(workbook)
}

/// Copies `range` into a grid anchored at A1, then drops the header rows.
fn to_raw_sheet(name: &str, range: &Range<Data>, header_rows: usize) -> RawSheet {
    let (start_row, start_col) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); start_row];
    for row in range.rows() {
        let mut cells = vec![Cell::Empty; start_col];
        cells.extend(row.iter().map(Cell::from));
        rows.push(cells);
    }

    RawSheet::new(name, rows.into_iter().skip(header_rows).collect())
}

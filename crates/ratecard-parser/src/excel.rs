//! Spreadsheet reader using calamine
//!
//! Decodes one worksheet of an uploaded workbook into a [`Grid`].

use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use chrono::{NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::{Cell, FileType, Grid, ParserError, Result};

/// Workbook reader
#[derive(Debug, Clone, Default)]
pub struct ExcelReader {
    /// Sheet to read (None = first sheet)
    pub sheet: Option<String>,
}

impl ExcelReader {
    /// Create a reader for the first worksheet
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a named worksheet instead of the first one
    pub fn with_sheet(mut self, sheet: impl Into<String>) -> Self {
        self.sheet = Some(sheet.into());
        self
    }

    /// Read an uploaded workbook held in memory
    ///
    /// `file_name` is only used to check the extension.
    pub fn read_bytes(&self, file_name: &str, bytes: &[u8]) -> Result<Grid> {
        let file_type = FileType::from_path(Path::new(file_name));
        if file_type == FileType::Unknown {
            return Err(ParserError::UnsupportedFormat(file_name.to_string()));
        }

        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
            .map_err(|e| ParserError::ExcelError(e.to_string()))?;

        let sheet_name = match &self.sheet {
            Some(name) => name.clone(),
            None => workbook
                .sheet_names()
                .first()
                .cloned()
                .ok_or_else(|| ParserError::NoWorksheet(file_name.to_string()))?,
        };

        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(|e| ParserError::ExcelError(format!("{sheet_name}: {e}")))?;

        let grid = range_to_grid(&sheet_name, &range);
        debug!(
            file = %file_name,
            %file_type,
            sheet = %sheet_name,
            rows = grid.height(),
            columns = grid.width(),
            "Workbook decoded"
        );
        Ok(grid)
    }

    /// Read a workbook from disk
    pub fn read_path(&self, path: &Path) -> Result<Grid> {
        let bytes = std::fs::read(path).map_err(|source| ParserError::IoError {
            path: path.display().to_string(),
            source,
        })?;
        self.read_bytes(&path.display().to_string(), &bytes)
    }
}

/// Convert a calamine range into a grid anchored at A1.
///
/// calamine ranges start at the first used cell, so leading blank rows and
/// columns are padded back in.
fn range_to_grid(sheet_name: &str, range: &Range<Data>) -> Grid {
    let (row_offset, col_offset) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); row_offset];
    for row in range.rows() {
        let mut cells = vec![Cell::Empty; col_offset];
        cells.extend(row.iter().map(convert_cell));
        rows.push(cells);
    }

    Grid::new(sheet_name, rows)
}

/// Convert a calamine cell
fn convert_cell(cell: &Data) -> Cell {
    match cell {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(f) => Cell::Float(*f),
        Data::Int(i) => Cell::Int(*i),
        Data::Bool(b) => Cell::Bool(*b),
        Data::Error(e) => Cell::Error(format!("{e:?}")),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(value) => Cell::DateTime(value),
            None => Cell::Float(dt.as_f64()),
        },
        Data::DateTimeIso(s) => parse_iso(s)
            .map(Cell::DateTime)
            .unwrap_or_else(|| Cell::Text(s.clone())),
        Data::DurationIso(s) => Cell::Text(s.clone()),
    }
}

fn parse_iso(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

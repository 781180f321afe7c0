//! Ratecard Parser - Spreadsheet reading and cell normalization
//!
//! Supports reading:
//! - Microsoft Excel (XLSX, XLSM, XLSB, XLS)
//! - OpenDocument spreadsheets (ODS)
//!
//! A workbook is decoded into a raw [`Grid`] of [`Cell`]s. The
//! [`header::HeaderResolver`] then decides whether headers run across the
//! first row or down the first column, and [`cell::normalize`] turns single
//! cells into typed values.

pub mod cell;
pub mod excel;
pub mod header;

pub use cell::{normalize, try_normalize, CellKind, RowConversionFailure, Value};
pub use excel::ExcelReader;
pub use header::{HeaderResolver, Orientation, Record, ResolvedSheet};

use chrono::{NaiveDateTime, Timelike};
use std::path::Path;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while reading a spreadsheet
#[derive(Error, Debug)]
pub enum ParserError {
    /// File format is not supported
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// IO error while reading the file
    #[error("IO error reading file: {path}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Spreadsheet codec error (corrupt or mislabelled file)
    #[error("Excel parsing error: {0}")]
    ExcelError(String),

    /// Workbook has no readable worksheet
    #[error("Workbook contains no worksheet: {0}")]
    NoWorksheet(String),

    /// Marker header found in neither orientation
    #[error("Missing required column: {marker}")]
    MissingRequiredColumn { marker: String },
}

pub type Result<T> = std::result::Result<T, ParserError>;

// ============================================================================
// File Types
// ============================================================================

/// Supported spreadsheet file types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Xlsx,
    Xlsm,
    Xlsb,
    Xls,
    Ods,
    Unknown,
}

impl FileType {
    /// Detect file type from extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "xlsx" => Self::Xlsx,
            "xlsm" => Self::Xlsm,
            "xlsb" => Self::Xlsb,
            "xls" => Self::Xls,
            "ods" => Self::Ods,
            _ => Self::Unknown,
        }
    }

    /// Detect file type from a path or uploaded file name
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Unknown)
    }

    /// Get MIME type
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Xlsm => "application/vnd.ms-excel.sheet.macroEnabled.12",
            Self::Xlsb => "application/vnd.ms-excel.sheet.binary.macroEnabled.12",
            Self::Xls => "application/vnd.ms-excel",
            Self::Ods => "application/vnd.oasis.opendocument.spreadsheet",
            Self::Unknown => "application/octet-stream",
        }
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Xlsx => write!(f, "xlsx"),
            Self::Xlsm => write!(f, "xlsm"),
            Self::Xlsb => write!(f, "xlsb"),
            Self::Xls => write!(f, "xls"),
            Self::Ods => write!(f, "ods"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

// ============================================================================
// Raw Cells
// ============================================================================

/// A raw spreadsheet cell, independent of the codec
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Float(f64),
    Int(i64),
    Bool(bool),
    DateTime(NaiveDateTime),
    Error(String),
}

impl Cell {
    /// Whether the cell holds the spreadsheet's notion of "missing"
    pub fn is_missing(&self) -> bool {
        match self {
            Self::Empty | Self::Error(_) => true,
            Self::Float(f) => f.is_nan(),
            Self::Text(s) => is_missing_text(s),
            Self::Int(_) | Self::Bool(_) | Self::DateTime(_) => false,
        }
    }

    /// Render the cell as text
    pub fn to_text(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(s) => s.clone(),
            Self::Float(f) => {
                // Format without unnecessary decimals
                if f.fract() == 0.0 && f.abs() < 1e15 {
                    format!("{}", *f as i64)
                } else {
                    format!("{f}")
                }
            }
            Self::Int(i) => format!("{i}"),
            Self::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            Self::DateTime(dt) => {
                if dt.num_seconds_from_midnight() == 0 {
                    dt.format("%Y-%m-%d").to_string()
                } else {
                    dt.format("%Y-%m-%d %H:%M:%S").to_string()
                }
            }
            Self::Error(e) => format!("#ERROR: {e}"),
        }
    }
}

/// Text placeholders that mean "no value"
fn is_missing_text(s: &str) -> bool {
    let trimmed = s.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") || trimmed == "#N/A"
}

// ============================================================================
// Grid
// ============================================================================

/// One worksheet as a rectangular-ish block of cells, anchored at A1
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grid {
    /// Worksheet name
    pub sheet: String,

    /// Rows of cells; rows may differ in length
    pub rows: Vec<Vec<Cell>>,
}

static EMPTY_CELL: Cell = Cell::Empty;

impl Grid {
    /// Create a grid from rows
    pub fn new(sheet: impl Into<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            sheet: sheet.into(),
            rows,
        }
    }

    /// Cell at (row, column), `Empty` when out of range
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }

    /// Number of rows
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Length of the longest row
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Whether every cell is missing
    pub fn is_blank(&self) -> bool {
        self.rows.iter().all(|row| row.iter().all(Cell::is_missing))
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Cell normalization
//!
//! Turns a raw [`Cell`] into a typed [`Value`] for a target column kind.
//! Missing cells (blank, error, `NaN`, `#N/A`) become [`Value::Null`], except
//! for booleans which default to `false`. Values that cannot be converted
//! become `Null` through [`normalize`], or a [`RowConversionFailure`] through
//! [`try_normalize`].

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use thiserror::Error;

use crate::Cell;

/// Target column kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Date,
    Float,
    Integer,
    Bool,
    Text {
        /// Maximum length in characters; longer values are truncated
        max_len: Option<usize>,
        /// Upper-case the value
        upper: bool,
    },
}

impl CellKind {
    /// Plain text with no length limit
    pub const TEXT: CellKind = CellKind::Text {
        max_len: None,
        upper: false,
    };

    /// Text truncated to `max_len` characters
    pub const fn text(max_len: usize) -> Self {
        CellKind::Text {
            max_len: Some(max_len),
            upper: false,
        }
    }

    /// Upper-cased text truncated to `max_len` characters
    pub const fn upper(max_len: usize) -> Self {
        CellKind::Text {
            max_len: Some(max_len),
            upper: true,
        }
    }
}

/// A normalized cell value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Float(f64),
    Int(i64),
    Bool(bool),
    Date(NaiveDate),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Booleans normalize to `Bool`; anything else reads as `false`
    pub fn as_bool(&self) -> bool {
        matches!(self, Value::Bool(true))
    }
}

/// A non-blank cell that could not be converted to its column kind
#[derive(Debug, Clone, PartialEq, Error)]
#[error("cannot read {raw:?} as {kind:?}")]
pub struct RowConversionFailure {
    pub kind: CellKind,
    pub raw: String,
}

/// Normalize a cell, mapping conversion failures to `Null`
pub fn normalize(cell: &Cell, kind: CellKind) -> Value {
    try_normalize(cell, kind).unwrap_or(Value::Null)
}

/// Normalize a cell, reporting conversion failures
pub fn try_normalize(cell: &Cell, kind: CellKind) -> Result<Value, RowConversionFailure> {
    let converted = match kind {
        CellKind::Bool => return Ok(Value::Bool(to_bool(cell))),
        _ if cell.is_missing() => return Ok(Value::Null),
        CellKind::Date => to_date(cell).map(Value::Date),
        CellKind::Float => to_float(cell).map(Value::Float),
        CellKind::Integer => to_integer(cell).map(Value::Int),
        CellKind::Text { max_len, upper } => Some(to_text(cell, max_len, upper)),
    };

    converted.ok_or_else(|| RowConversionFailure {
        kind,
        raw: cell.to_text(),
    })
}

/// Untyped conversion for dynamically-typed rows
pub fn to_json(cell: &Cell) -> serde_json::Value {
    if cell.is_missing() {
        return serde_json::Value::Null;
    }
    match cell {
        Cell::Int(i) => serde_json::Value::from(*i),
        Cell::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Cell::Bool(b) => serde_json::Value::Bool(*b),
        Cell::Text(s) => serde_json::Value::String(s.trim().to_string()),
        other => serde_json::Value::String(other.to_text()),
    }
}

// ============================================================================
// Conversions
// ============================================================================

const BOOL_TOKENS: [&str; 4] = ["yes", "true", "1", "t"];

fn to_bool(cell: &Cell) -> bool {
    match cell {
        Cell::Bool(b) => *b,
        Cell::Int(i) => *i == 1,
        Cell::Float(f) => *f == 1.0,
        Cell::Text(s) => {
            let token = s.trim().to_lowercase();
            BOOL_TOKENS.contains(&token.as_str())
        }
        _ => false,
    }
}

/// Day zero of the 1900 date system for serials from 61 on. Serials up to
/// 59 count from one day later because the system has a 1900-02-29.
fn excel_epoch(serial: i64) -> Option<NaiveDate> {
    if serial < 60 {
        NaiveDate::from_ymd_opt(1899, 12, 31)
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)
    }
}

/// 1900-02-29, which does not exist
const PHANTOM_LEAP_SERIAL: i64 = 60;

/// Largest serial that still lands in year 9999
const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

fn from_excel_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || !(1.0..=MAX_EXCEL_SERIAL).contains(&serial) {
        return None;
    }
    let days = serial.trunc() as i64;
    if days == PHANTOM_LEAP_SERIAL {
        return None;
    }
    excel_epoch(days)?.checked_add_signed(Duration::days(days))
}

/// Years a written workbook can hold
const SPREADSHEET_YEARS: std::ops::RangeInclusive<i32> = 1900..=9999;

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

const DATE_FORMATS: [&str; 9] = [
    "%Y-%m-%d",
    "%d/%m/%Y",
    "%Y/%m/%d",
    "%d.%m.%Y",
    "%d-%b-%y",
    "%d-%b-%Y",
    "%d %B %Y",
    "%d %b %Y",
    "%b %d, %Y",
];

fn parse_date_text(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.date())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        })
}

fn to_date(cell: &Cell) -> Option<NaiveDate> {
    let date = match cell {
        Cell::DateTime(dt) => Some(dt.date()),
        Cell::Float(f) => from_excel_serial(*f),
        Cell::Int(i) => from_excel_serial(*i as f64),
        Cell::Text(s) => parse_date_text(s),
        _ => None,
    }?;
    SPREADSHEET_YEARS.contains(&date.year()).then_some(date)
}

fn to_float(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Float(f) if f.is_finite() => Some(*f),
        Cell::Int(i) => Some(*i as f64),
        Cell::Text(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite()),
        _ => None,
    }
}

fn float_to_integer(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn to_integer(cell: &Cell) -> Option<i64> {
    match cell {
        Cell::Int(i) => Some(*i),
        Cell::Float(f) => float_to_integer(*f),
        Cell::Text(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(float_to_integer))
        }
        _ => None,
    }
}

fn to_text(cell: &Cell, max_len: Option<usize>, upper: bool) -> Value {
    let text = cell.to_text();
    let mut text = text.trim().to_string();
    if upper {
        text = text.to_uppercase();
    }
    if let Some(max) = max_len {
        if text.chars().count() > max {
            text = text.chars().take(max).collect();
        }
    }
    if text.is_empty() {
        Value::Null
    } else {
        Value::Text(text)
    }
}

// ============================================================================
// Tests
// ============================================================================

//! In-memory xlsx serialization of a single ratecard sheet

use chrono::{Datelike, NaiveDate};
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook, Worksheet, XlsxError};
use tracing::warn;

use crate::ExportError;

/// One output cell
#[derive(Debug, Clone, PartialEq)]
pub enum OutCell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl From<Option<String>> for OutCell {
    fn from(value: Option<String>) -> Self {
        value.map(OutCell::Text).unwrap_or(OutCell::Empty)
    }
}

impl From<Option<&str>> for OutCell {
    fn from(value: Option<&str>) -> Self {
        value
            .map(|s| OutCell::Text(s.to_string()))
            .unwrap_or(OutCell::Empty)
    }
}

impl From<Option<f64>> for OutCell {
    fn from(value: Option<f64>) -> Self {
        value.map(OutCell::Number).unwrap_or(OutCell::Empty)
    }
}

impl From<Option<NaiveDate>> for OutCell {
    fn from(value: Option<NaiveDate>) -> Self {
        value.map(OutCell::Date).unwrap_or(OutCell::Empty)
    }
}

/// A header row plus data rows, ready to write
#[derive(Debug, Clone, PartialEq)]
pub struct RatecardSheet {
    pub name: &'static str,
    pub headers: Vec<&'static str>,
    pub rows: Vec<Vec<OutCell>>,
    /// Excel number format for date cells
    pub date_format: &'static str,
}

fn write_err(e: XlsxError) -> ExportError {
    ExportError::ExcelWrite {
        detail: e.to_string(),
    }
}

fn write_cell(
    ws: &mut Worksheet,
    row: u32,
    col: u16,
    cell: &OutCell,
    date_format: &Format,
) -> Result<(), ExportError> {
    match cell {
        OutCell::Empty => {}
        OutCell::Text(s) => {
            ws.write_string(row, col, s).map_err(write_err)?;
        }
        OutCell::Number(n) => {
            ws.write_number(row, col, *n).map_err(write_err)?;
        }
        OutCell::Date(d) => match excel_date(*d) {
            Some(date) => {
                ws.write_datetime_with_format(row, col, &date, date_format)
                    .map_err(write_err)?;
            }
            None => {
                warn!(date = %d, row, col, "Date outside the workbook range, written as text");
                ws.write_string(row, col, d.format("%Y-%m-%d").to_string())
                    .map_err(write_err)?;
            }
        },
    }
    Ok(())
}

/// Workbooks hold dates from 1900 to 9999 only
fn excel_date(date: NaiveDate) -> Option<ExcelDateTime> {
    let year = u16::try_from(date.year()).ok()?;
    ExcelDateTime::from_ymd(year, date.month() as u8, date.day() as u8).ok()
}

impl RatecardSheet {
    pub fn new(name: &'static str, headers: Vec<&'static str>, date_format: &'static str) -> Self {
        Self {
            name,
            headers,
            rows: Vec::new(),
            date_format,
        }
    }

    pub fn push(&mut self, row: Vec<OutCell>) {
        self.rows.push(row);
    }

    /// Serialize to xlsx bytes
    pub fn to_xlsx(&self) -> Result<Vec<u8>, ExportError> {
        let mut workbook = Workbook::new();
        let header_format = Format::new().set_bold();
        let date_format = Format::new().set_num_format(self.date_format);

        let ws = workbook.add_worksheet();
        ws.set_name(self.name).map_err(write_err)?;

        for (col, header) in self.headers.iter().enumerate() {
            ws.write_string_with_format(0, col as u16, *header, &header_format)
                .map_err(write_err)?;
        }

        for (i, row) in self.rows.iter().enumerate() {
            let r = (i + 1) as u32;
            for (col, cell) in row.iter().enumerate() {
                write_cell(ws, r, col as u16, cell, &date_format)?;
            }
        }
        ws.autofit();

        workbook.save_to_buffer().map_err(write_err)
    }
}

//! Header orientation detection
//!
//! Ratesheets arrive either with headers across the first row (horizontal)
//! or down the first column with one record per following column
//! (vertical). The resolver looks for a marker header in row 0 first and
//! column 0 second, and always hands back a horizontal view.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::{Cell, Grid, ParserError, Result};

/// Where the headers were found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Horizontal => write!(f, "horizontal"),
            Self::Vertical => write!(f, "vertical"),
        }
    }
}

/// A sheet with one header list and one cell list per record
#[derive(Debug, Clone)]
pub struct ResolvedSheet {
    pub orientation: Orientation,

    /// Header texts in source order, duplicates suffixed `.1`, `.2`, ...
    pub headers: Vec<String>,

    /// Records, blank ones removed
    pub rows: Vec<Vec<Cell>>,

    /// Lower-cased header to column index
    index: HashMap<String, usize>,
}

static EMPTY_CELL: Cell = Cell::Empty;

impl ResolvedSheet {
    fn new(orientation: Orientation, raw_headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let headers = dedupe_headers(raw_headers);
        let mut index = HashMap::new();
        for (i, header) in headers.iter().enumerate() {
            if !header.is_empty() {
                index.entry(header.to_lowercase()).or_insert(i);
            }
        }
        Self {
            orientation,
            headers,
            rows,
            index,
        }
    }

    /// Column index of a header, matched case-insensitively
    pub fn column(&self, header: &str) -> Option<usize> {
        self.index.get(&header.trim().to_lowercase()).copied()
    }

    /// Iterate the records
    pub fn records(&self) -> impl Iterator<Item = Record<'_>> {
        self.rows.iter().map(move |cells| Record {
            sheet: self,
            cells,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One record of a resolved sheet
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    sheet: &'a ResolvedSheet,
    cells: &'a [Cell],
}

impl<'a> Record<'a> {
    /// Cell under a header, `Empty` when the header or cell is absent
    pub fn get(&self, header: &str) -> &'a Cell {
        self.sheet
            .column(header)
            .and_then(|i| self.cells.get(i))
            .unwrap_or(&EMPTY_CELL)
    }

    /// Non-empty headers with their cells, in source order
    pub fn fields(&self) -> impl Iterator<Item = (&'a str, &'a Cell)> {
        let cells = self.cells;
        self.sheet
            .headers
            .iter()
            .enumerate()
            .filter(|(_, header)| !header.is_empty())
            .map(move |(i, header)| (header.as_str(), cells.get(i).unwrap_or(&EMPTY_CELL)))
    }
}

/// Detects header orientation using a marker header
#[derive(Debug, Clone)]
pub struct HeaderResolver {
    marker: String,
}

impl HeaderResolver {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    fn is_marker(&self, cell: &Cell) -> bool {
        cell.to_text().trim().eq_ignore_ascii_case(self.marker.trim())
    }

    /// Resolve a grid into records
    pub fn resolve(&self, grid: &Grid) -> Result<ResolvedSheet> {
        let first_row = grid.rows.first().map(Vec::as_slice).unwrap_or(&[]);
        if first_row.iter().any(|c| self.is_marker(c)) {
            let sheet = horizontal(grid);
            debug!(marker = %self.marker, records = sheet.len(), "Headers found in first row");
            return Ok(sheet);
        }

        if grid.rows.iter().any(|row| row.first().is_some_and(|c| self.is_marker(c))) {
            let sheet = vertical(grid);
            debug!(marker = %self.marker, records = sheet.len(), "Headers found in first column");
            return Ok(sheet);
        }

        Err(ParserError::MissingRequiredColumn {
            marker: self.marker.clone(),
        })
    }
}

fn header_text(cell: &Cell) -> String {
    if cell.is_missing() {
        String::new()
    } else {
        cell.to_text().trim().to_string()
    }
}

fn is_blank_record(cells: &[Cell]) -> bool {
    cells.iter().all(Cell::is_missing)
}

fn horizontal(grid: &Grid) -> ResolvedSheet {
    let headers = grid
        .rows
        .first()
        .map(|row| row.iter().map(header_text).collect())
        .unwrap_or_default();

    let rows = grid
        .rows
        .iter()
        .skip(1)
        .filter(|row| !is_blank_record(row))
        .cloned()
        .collect();

    ResolvedSheet::new(Orientation::Horizontal, headers, rows)
}

fn vertical(grid: &Grid) -> ResolvedSheet {
    // Header block ends at the last row with a non-blank first cell
    let header_count = grid
        .rows
        .iter()
        .rposition(|row| row.first().is_some_and(|c| !c.is_missing()))
        .map(|i| i + 1)
        .unwrap_or(0);

    let headers = (0..header_count)
        .map(|r| header_text(grid.cell(r, 0)))
        .collect();

    let rows = (1..grid.width())
        .map(|col| {
            (0..header_count)
                .map(|r| grid.cell(r, col).clone())
                .collect::<Vec<_>>()
        })
        .filter(|record| !is_blank_record(record))
        .collect();

    ResolvedSheet::new(Orientation::Vertical, headers, rows)
}

/// Make header names unique the way dataframe readers do: `X`, `X.1`, `X.2`.
/// A suffixed name that is already taken gets the next free suffix.
fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();
    let mut next_suffix: HashMap<String, usize> = HashMap::new();
    headers
        .into_iter()
        .map(|header| {
            if header.is_empty() {
                return header;
            }
            let key = header.to_lowercase();
            if taken.insert(key.clone()) {
                return header;
            }
            let suffix = next_suffix.entry(key).or_insert(1);
            loop {
                let name = format!("{header}.{suffix}");
                *suffix += 1;
                if taken.insert(name.to_lowercase()) {
                    return name;
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn grid(rows: Vec<Vec<Cell>>) -> Grid {
        Grid::new("Sheet1", rows)
    }

    #[test]
    fn test_horizontal_sheet() {
        let g = grid(vec![
            vec![t("TAP-OUT"), t("Currency")],
            vec![t("FRAF1"), t("EUR")],
            vec![Cell::Empty, Cell::Empty],
            vec![t("DEUD1"), t("EUR")],
        ]);
        let sheet = HeaderResolver::new("TAP-OUT").resolve(&g).unwrap();
        assert_eq!(sheet.orientation, Orientation::Horizontal);
        assert_eq!(sheet.headers, vec!["TAP-OUT", "Currency"]);
        assert_eq!(sheet.len(), 2);

        let records: Vec<_> = sheet.records().collect();
        assert_eq!(records[1].get("tap-out"), &t("DEUD1"));
        assert_eq!(records[1].get("Missing"), &Cell::Empty);
    }

    #[test]
    fn test_marker_match_ignores_case_and_whitespace() {
        let g = grid(vec![vec![t("  tap-out ")], vec![t("FRAF1")]]);
        let sheet = HeaderResolver::new("TAP-OUT").resolve(&g).unwrap();
        assert_eq!(sheet.orientation, Orientation::Horizontal);
        assert_eq!(sheet.records().next().unwrap().get("TAP-OUT"), &t("FRAF1"));
    }

    #[test]
    fn test_vertical_sheet() {
        let g = grid(vec![
            vec![t("TAP-OUT"), t("FRAF1"), t("DEUD1"), Cell::Empty],
            vec![t("Currency"), t("EUR"), t("USD"), Cell::Empty],
            vec![t("Tax Value"), Cell::Float(0.2), Cell::Empty, Cell::Empty],
            vec![Cell::Empty, t("stray"), Cell::Empty, Cell::Empty],
        ]);
        let sheet = HeaderResolver::new("TAP-OUT").resolve(&g).unwrap();
        assert_eq!(sheet.orientation, Orientation::Vertical);
        assert_eq!(sheet.headers, vec!["TAP-OUT", "Currency", "Tax Value"]);
        assert_eq!(sheet.len(), 2);

        let records: Vec<_> = sheet.records().collect();
        assert_eq!(records[0].get("Currency"), &t("EUR"));
        assert_eq!(records[0].get("Tax Value"), &Cell::Float(0.2));
        assert_eq!(records[1].get("TAP-OUT"), &t("DEUD1"));
        assert_eq!(records[1].get("Tax Value"), &Cell::Empty);
    }

    #[test]
    fn test_vertical_marker_below_first_row() {
        let g = grid(vec![
            vec![t("BU PLMN Code"), t("X")],
            vec![t("TAP-OUT"), t("FRAF1")],
        ]);
        let sheet = HeaderResolver::new("TAP-OUT").resolve(&g).unwrap();
        assert_eq!(sheet.orientation, Orientation::Vertical);
        assert_eq!(sheet.records().next().unwrap().get("BU PLMN Code"), &t("X"));
    }

    #[test]
    fn test_missing_marker() {
        let g = grid(vec![vec![t("Foo"), t("Bar")], vec![t("1"), t("2")]]);
        let err = HeaderResolver::new("TAP-OUT").resolve(&g).unwrap_err();
        assert!(matches!(
            err,
            ParserError::MissingRequiredColumn { ref marker } if marker == "TAP-OUT"
        ));

        let err = HeaderResolver::new("TAP-OUT").resolve(&Grid::default()).unwrap_err();
        assert!(matches!(err, ParserError::MissingRequiredColumn { .. }));
    }

    #[test]
    fn test_header_only_sheet_has_no_records() {
        let g = grid(vec![vec![t("TAP-OUT"), t("Currency")]]);
        let sheet = HeaderResolver::new("TAP-OUT").resolve(&g).unwrap();
        assert!(sheet.is_empty());
    }

    #[test]
    fn test_duplicate_headers_and_fields_order() {
        let g = grid(vec![
            vec![t("Rate"), Cell::Empty, t("Rate"), t("Zone")],
            vec![Cell::Int(1), t("ignored"), Cell::Int(2), t("EU")],
        ]);
        let sheet = HeaderResolver::new("Rate").resolve(&g).unwrap();
        assert_eq!(sheet.headers, vec!["Rate", "", "Rate.1", "Zone"]);

        let record = sheet.records().next().unwrap();
        let fields: Vec<_> = record.fields().map(|(h, _)| h).collect();
        assert_eq!(fields, vec!["Rate", "Rate.1", "Zone"]);
        assert_eq!(record.get("Rate"), &Cell::Int(1));
        assert_eq!(record.get("rate.1"), &Cell::Int(2));
    }

    #[test]
    fn test_dedupe_skips_taken_suffixes() {
        let headers = |names: &[&str]| names.iter().map(|n| n.to_string()).collect::<Vec<_>>();
        assert_eq!(
            dedupe_headers(headers(&["X", "X", "X.1"])),
            vec!["X", "X.1", "X.1.1"]
        );
        assert_eq!(
            dedupe_headers(headers(&["X.1", "X", "X", "x"])),
            vec!["X.1", "X", "X.2", "x.3"]
        );
    }
}

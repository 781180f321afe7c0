//! Replace-on-upload ingestion
//!
//! ```text
//! Idle -> Reading -> Resolving -> Validating -> Replacing -> Inserting -> Committed
//!            \           \             \             \            \
//!             +-----------+-------------+-------------+------------+--> RolledBack
//! ```
//!
//! Reading and resolving never touch the store, so a bad file leaves the
//! current table contents alone. The truncate and every insert share one
//! transaction; the first failing row rolls the whole upload back.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use ratecard_core::{BlankMarkerPolicy, RateStore, RatecardError, Result, Table, TableRow};
use ratecard_parser::{
    normalize, Cell, ExcelReader, HeaderResolver, Orientation, ParserError, ResolvedSheet,
};

use crate::mapping::{
    map_bag, marker_field, FieldSpec, MappedRow, COUNTRY_FIELDS, RATE_FIELDS, TEMPLATE_FIELDS,
};

// ============================================================================
// Sheet Kinds
// ============================================================================

/// What an uploaded sheet contains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SheetKind {
    /// Typed ratesheet rows
    Rates,
    Countries,
    Templates,
    /// Ratesheet rows kept as ordered JSON objects
    RatesJson,
}

impl SheetKind {
    /// Header that must be present in row 0 or column 0
    pub fn marker(&self) -> &'static str {
        match self {
            Self::Rates | Self::RatesJson => "TAP-OUT",
            Self::Countries => "alpha-3",
            Self::Templates => "Destination",
        }
    }

    pub fn table(&self) -> Table {
        match self {
            Self::Rates => Table::Rates,
            Self::Countries => Table::Countries,
            Self::Templates => Table::Templates,
            Self::RatesJson => Table::RateBags,
        }
    }

    /// Declared fields; `None` for JSON-bag mode
    pub fn fields(&self) -> Option<&'static [FieldSpec]> {
        match self {
            Self::Rates => Some(&RATE_FIELDS),
            Self::Countries => Some(&COUNTRY_FIELDS),
            Self::Templates => Some(&TEMPLATE_FIELDS),
            Self::RatesJson => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Rates => "rates",
            Self::Countries => "countries",
            Self::Templates => "templates",
            Self::RatesJson => "rates-json",
        }
    }
}

impl std::fmt::Display for SheetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for SheetKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rates" | "ratesheet" => Ok(Self::Rates),
            "countries" | "country" => Ok(Self::Countries),
            "templates" | "template" => Ok(Self::Templates),
            "rates-json" | "json" => Ok(Self::RatesJson),
            other => Err(format!("unknown sheet kind: {other}")),
        }
    }
}

// ============================================================================
// Stages and Report
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStage {
    Idle,
    Reading,
    Resolving,
    Validating,
    Replacing,
    Inserting,
    Committed,
    RolledBack,
}

/// Outcome of a committed upload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReport {
    pub kind: SheetKind,
    pub table: &'static str,
    pub orientation: &'static str,
    pub rows_inserted: usize,
    /// Rows dropped because their marker cell was blank
    pub rows_skipped: usize,
    /// Non-blank cells that could not be converted and were stored as null
    pub cells_nulled: usize,
}

impl std::fmt::Display for IngestReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Loaded {} rows into {} ({} headers",
            self.rows_inserted, self.table, self.orientation
        )?;
        if self.rows_skipped > 0 {
            write!(f, ", {} rows skipped", self.rows_skipped)?;
        }
        if self.cells_nulled > 0 {
            write!(f, ", {} unreadable cells left empty", self.cells_nulled)?;
        }
        write!(f, ")")
    }
}

fn orientation_name(orientation: Orientation) -> &'static str {
    match orientation {
        Orientation::Horizontal => "horizontal",
        Orientation::Vertical => "vertical",
    }
}

/// Rows ready to insert, with their 1-based position on the sheet
struct PreparedRows {
    rows: Vec<(usize, TableRow)>,
    skipped: usize,
    cells_nulled: usize,
}

// ============================================================================
// Pipeline
// ============================================================================

/// One upload against one table
pub struct IngestPipeline {
    store: Arc<dyn RateStore>,
    marker_policy: BlankMarkerPolicy,
    reader: ExcelReader,
    stage: IngestStage,
}

impl IngestPipeline {
    pub fn new(store: Arc<dyn RateStore>) -> Self {
        Self {
            store,
            marker_policy: BlankMarkerPolicy::default(),
            reader: ExcelReader::new(),
            stage: IngestStage::Idle,
        }
    }

    /// Set how rows with a blank marker cell are handled
    pub fn with_marker_policy(mut self, policy: BlankMarkerPolicy) -> Self {
        self.marker_policy = policy;
        self
    }

    pub fn stage(&self) -> IngestStage {
        self.stage
    }

    fn enter(&mut self, stage: IngestStage) {
        debug!(from = ?self.stage, to = ?stage, "Ingest stage");
        self.stage = stage;
    }

    /// Replace the kind's table with the rows of an uploaded workbook
    pub async fn ingest(
        &mut self,
        kind: SheetKind,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<IngestReport> {
        self.enter(IngestStage::Reading);
        let grid = match self.reader.read_bytes(file_name, bytes) {
            Ok(grid) => grid,
            Err(e) => {
                self.enter(IngestStage::RolledBack);
                return Err(parser_error(e));
            }
        };
        info!(
            %kind,
            file = %file_name,
            rows = grid.height(),
            columns = grid.width(),
            "Sheet read"
        );

        self.enter(IngestStage::Resolving);
        let sheet = match HeaderResolver::new(kind.marker()).resolve(&grid) {
            Ok(sheet) => sheet,
            Err(e) => {
                warn!(%kind, marker = kind.marker(), "Marker header not found");
                self.enter(IngestStage::RolledBack);
                return Err(parser_error(e));
            }
        };
        debug!(
            %kind,
            orientation = %sheet.orientation,
            headers = ?sheet.headers,
            records = sheet.len(),
            "Headers resolved"
        );

        self.enter(IngestStage::Validating);
        let prepared = self.prepare(kind, &sheet);

        let inserted = self.replace(kind.table(), &prepared.rows).await?;

        self.enter(IngestStage::Committed);
        let report = IngestReport {
            kind,
            table: kind.table().name(),
            orientation: orientation_name(sheet.orientation),
            rows_inserted: inserted,
            rows_skipped: prepared.skipped,
            cells_nulled: prepared.cells_nulled,
        };
        info!(
            %kind,
            table = report.table,
            rows_inserted = report.rows_inserted,
            rows_skipped = report.rows_skipped,
            cells_nulled = report.cells_nulled,
            "Upload committed"
        );
        Ok(report)
    }

    /// Map every record, applying the blank marker policy
    fn prepare(&self, kind: SheetKind, sheet: &ResolvedSheet) -> PreparedRows {
        let marker = kind.marker();
        let mut prepared = PreparedRows {
            rows: Vec::with_capacity(sheet.len()),
            skipped: 0,
            cells_nulled: 0,
        };

        for (index, record) in sheet.records().enumerate() {
            let row_number = index + 1;
            let placeholder = if record.get(marker).is_missing() {
                match &self.marker_policy {
                    BlankMarkerPolicy::Skip => {
                        debug!(row = row_number, marker, "Blank marker, row skipped");
                        prepared.skipped += 1;
                        continue;
                    }
                    BlankMarkerPolicy::Default { placeholder } => {
                        debug!(row = row_number, marker, %placeholder, "Blank marker, placeholder used");
                        Some(placeholder.as_str())
                    }
                }
            } else {
                None
            };

            let row = match kind.fields() {
                Some(fields) => {
                    let mut mapped = MappedRow::map(&record, fields);
                    if let (Some(placeholder), Some(spec)) =
                        (placeholder, marker_field(fields, marker))
                    {
                        let value = normalize(&Cell::Text(placeholder.to_string()), spec.kind);
                        mapped.set(spec.column, value);
                    }
                    prepared.cells_nulled += mapped.cells_nulled;
                    typed_row(kind, &mapped)
                }
                None => {
                    let mut bag = map_bag(&record);
                    if let Some(placeholder) = placeholder {
                        let key = marker_header(sheet, marker);
                        bag.fields
                            .insert(key, serde_json::Value::String(placeholder.to_string()));
                    }
                    TableRow::Bag(bag)
                }
            };
            prepared.rows.push((row_number, row));
        }

        prepared
    }

    /// Truncate and refill a table inside one transaction
    async fn replace(&mut self, table: Table, rows: &[(usize, TableRow)]) -> Result<usize> {
        self.enter(IngestStage::Replacing);
        let mut tx = match self.store.begin().await {
            Ok(tx) => tx,
            Err(e) => {
                self.enter(IngestStage::RolledBack);
                return Err(insertion_failed(None, e));
            }
        };

        if let Err(e) = tx.truncate(table).await {
            self.enter(IngestStage::RolledBack);
            if let Err(rollback) = tx.rollback().await {
                warn!(error = %rollback, "Rollback failed");
            }
            return Err(insertion_failed(None, e));
        }
        debug!(%table, "Table truncated");

        self.enter(IngestStage::Inserting);
        for (row_number, row) in rows {
            if let Err(e) = tx.insert(row).await {
                warn!(%table, row = *row_number, error = %e, "Insert failed, rolling back");
                self.enter(IngestStage::RolledBack);
                if let Err(rollback) = tx.rollback().await {
                    warn!(error = %rollback, "Rollback failed");
                }
                return Err(insertion_failed(Some(*row_number), e));
            }
            debug!(%table, row = *row_number, "Row inserted");
        }

        if let Err(e) = tx.commit().await {
            self.enter(IngestStage::RolledBack);
            return Err(insertion_failed(None, e));
        }
        Ok(rows.len())
    }
}

fn typed_row(kind: SheetKind, mapped: &MappedRow) -> TableRow {
    match kind {
        SheetKind::Countries => TableRow::Country(mapped.to_country()),
        SheetKind::Templates => TableRow::Template(mapped.to_template()),
        SheetKind::Rates | SheetKind::RatesJson => TableRow::Rate(mapped.to_rate_record()),
    }
}

/// Header text as it appears on the sheet
fn marker_header(sheet: &ResolvedSheet, marker: &str) -> String {
    sheet
        .column(marker)
        .and_then(|i| sheet.headers.get(i))
        .cloned()
        .unwrap_or_else(|| marker.to_string())
}

fn parser_error(e: ParserError) -> RatecardError {
    match e {
        ParserError::MissingRequiredColumn { marker } => {
            RatecardError::MissingRequiredColumn { marker }
        }
        other => RatecardError::UnreadableFile(other.to_string()),
    }
}

fn insertion_failed(row: Option<usize>, cause: RatecardError) -> RatecardError {
    RatecardError::InsertionFailed {
        row,
        cause: cause.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sheet_kind_markers_and_tables() {
        assert_eq!(SheetKind::Rates.marker(), "TAP-OUT");
        assert_eq!(SheetKind::RatesJson.marker(), "TAP-OUT");
        assert_eq!(SheetKind::Countries.marker(), "alpha-3");
        assert_eq!(SheetKind::Templates.marker(), "Destination");
        assert_eq!(SheetKind::RatesJson.table(), Table::RateBags);
        assert!(SheetKind::RatesJson.fields().is_none());
        assert_eq!(SheetKind::Rates.fields().map(<[_]>::len), Some(29));
    }

    #[test]
    fn test_sheet_kind_parse() {
        assert_eq!("rates".parse::<SheetKind>().unwrap(), SheetKind::Rates);
        assert_eq!("Countries".parse::<SheetKind>().unwrap(), SheetKind::Countries);
        assert_eq!("rates-json".parse::<SheetKind>().unwrap(), SheetKind::RatesJson);
        assert!("invoices".parse::<SheetKind>().is_err());
    }

    #[test]
    fn test_parser_error_mapping() {
        let err = parser_error(ParserError::MissingRequiredColumn {
            marker: "TAP-OUT".to_string(),
        });
        assert!(matches!(err, RatecardError::MissingRequiredColumn { .. }));

        let err = parser_error(ParserError::UnsupportedFormat("a.csv".to_string()));
        assert!(matches!(err, RatecardError::UnreadableFile(_)));
    }

    #[test]
    fn test_report_display() {
        let report = IngestReport {
            kind: SheetKind::Rates,
            table: "ratesheet_v2",
            orientation: "vertical",
            rows_inserted: 3,
            rows_skipped: 1,
            cells_nulled: 0,
        };
        assert_eq!(
            report.to_string(),
            "Loaded 3 rows into ratesheet_v2 (vertical headers, 1 rows skipped)"
        );
    }
}

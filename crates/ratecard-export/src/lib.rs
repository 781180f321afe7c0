//! Ratecard Export - Derived ratecards as xlsx
//!
//! Four ratecards are built from the stored tables:
//! - Voice: rates joined with countries and destination templates
//! - GPRS, SMS and VoLTE: one line per ratesheet record
//!
//! Each is rendered into a single-sheet workbook in memory.

pub mod projection;
pub mod rounding;
pub mod sheet;
pub mod views;

pub use projection::{project_voice, VoiceCategory, VoiceRow};
pub use rounding::rounding_rule;
pub use sheet::{OutCell, RatecardSheet};

use thiserror::Error;
use tracing::info;

use ratecard_core::{RateStore, RatecardConfig, RatecardError, Snapshot};

/// MIME type of every ratecard download
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Excel write error: {detail}")]
    ExcelWrite { detail: String },
}

impl From<ExportError> for RatecardError {
    fn from(e: ExportError) -> Self {
        RatecardError::ExportError(e.to_string())
    }
}

// ============================================================================
// Ratecard Kinds
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatecardKind {
    Voice,
    Gprs,
    Sms,
    Volte,
}

impl RatecardKind {
    pub const ALL: [RatecardKind; 4] = [Self::Voice, Self::Gprs, Self::Sms, Self::Volte];

    /// Download file name
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Voice => "ratecard_national.xlsx",
            Self::Gprs => "gprs_ratecard.xlsx",
            Self::Sms => "sms_ratecard.xlsx",
            Self::Volte => "volte_ratecard.xlsx",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Voice => "voice",
            Self::Gprs => "gprs",
            Self::Sms => "sms",
            Self::Volte => "volte",
        }
    }

    /// Lay out the ratecard from a snapshot of the tables
    pub fn build(&self, snapshot: &Snapshot, config: &RatecardConfig) -> RatecardSheet {
        match self {
            Self::Voice => views::voice_sheet(&project_voice(snapshot, config)),
            Self::Gprs => views::gprs_sheet(&snapshot.rates),
            Self::Sms => views::sms_sheet(&snapshot.rates),
            Self::Volte => views::volte_sheet(&snapshot.rates),
        }
    }
}

impl std::fmt::Display for RatecardKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for RatecardKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "voice" | "national" => Ok(Self::Voice),
            "gprs" => Ok(Self::Gprs),
            "sms" => Ok(Self::Sms),
            "volte" => Ok(Self::Volte),
            other => Err(format!("unknown ratecard: {other}")),
        }
    }
}

// ============================================================================
// Export
// ============================================================================

/// A rendered ratecard
#[derive(Debug, Clone)]
pub struct RatecardFile {
    pub kind: RatecardKind,
    pub file_name: &'static str,
    /// Data rows, header excluded
    pub rows: usize,
    pub bytes: Vec<u8>,
}

/// Render a ratecard from a snapshot
pub fn render(
    kind: RatecardKind,
    snapshot: &Snapshot,
    config: &RatecardConfig,
) -> Result<RatecardFile, ExportError> {
    let sheet = kind.build(snapshot, config);
    let bytes = sheet.to_xlsx()?;
    Ok(RatecardFile {
        kind,
        file_name: kind.file_name(),
        rows: sheet.rows.len(),
        bytes,
    })
}

/// Load the tables and render a ratecard
pub async fn export(
    store: &dyn RateStore,
    kind: RatecardKind,
    config: &RatecardConfig,
) -> ratecard_core::Result<RatecardFile> {
    let snapshot = store.snapshot().await?;
    let file = render(kind, &snapshot, config)?;
    info!(
        %kind,
        rows = file.rows,
        bytes = file.bytes.len(),
        file = file.file_name,
        "Ratecard generated"
    );
    Ok(file)
}

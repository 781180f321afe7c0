//! Ratecard Core - Domain models, storage traits, and shared types
//!
//! This crate defines the core abstractions used throughout the ratecard system:
//! - Ratesheet, country and destination-template records
//! - Common error types
//! - The storage trait with PostgreSQL and in-memory backends
//! - Configuration management

pub mod config;
pub mod schema;
pub mod store;

pub use config::{AppConfig, BlankMarkerPolicy, ConfigError, DatabaseConfig, RatecardConfig};
pub use store::{MemoryStore, PgStore, RateStore, StoreTransaction};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for ratecard operations
#[derive(Error, Debug)]
pub enum RatecardError {
    /// Wrong extension or a spreadsheet the codec cannot decode
    #[error("Unreadable file: {0}")]
    UnreadableFile(String),

    /// The marker header was found in neither orientation
    #[error("Missing required column: {marker}")]
    MissingRequiredColumn { marker: String },

    /// Any failure inside the replace transaction; nothing was committed
    #[error("Insertion failed{}: {cause}", at_row(.row))]
    InsertionFailed { row: Option<usize>, cause: String },

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Constraint violation on {table}.{column}: {reason}")]
    ConstraintViolation {
        table: &'static str,
        column: &'static str,
        reason: String,
    },

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Export error: {0}")]
    ExportError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn at_row(row: &Option<usize>) -> String {
    row.map(|r| format!(" at row {r}")).unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, RatecardError>;

// ============================================================================
// Tables
// ============================================================================

/// The replace-on-upload tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Rates,
    Countries,
    Templates,
    RateBags,
}

impl Table {
    /// Physical table name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Rates => "ratesheet_v2",
            Self::Countries => "country_v2",
            Self::Templates => "template",
            Self::RateBags => "ratesheet_json",
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Ratesheet Records
// ============================================================================

/// Call/data categories that carry a (rate, charging interval) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateCategory {
    LocalCall,
    CallBackHome,
    RestOfWorld,
    PremiumNumbers,
    SpecialNumbers,
    Satellite,
    MtcCall,
    MoSms,
    GprsMb,
    VolteMb,
}

impl RateCategory {
    pub const ALL: [RateCategory; 10] = [
        Self::LocalCall,
        Self::CallBackHome,
        Self::RestOfWorld,
        Self::PremiumNumbers,
        Self::SpecialNumbers,
        Self::Satellite,
        Self::MtcCall,
        Self::MoSms,
        Self::GprsMb,
        Self::VolteMb,
    ];

    /// Column holding the rate value
    pub fn rate_column(&self) -> &'static str {
        match self {
            Self::LocalCall => "moc_call_local_call_rate_value",
            Self::CallBackHome => "moc_call_call_back_home_rate_value",
            Self::RestOfWorld => "moc_call_rest_of_the_world_rate_value",
            Self::PremiumNumbers => "moc_call_premium_numbers_rate_value",
            Self::SpecialNumbers => "moc_call_special_numbers_rate_value",
            Self::Satellite => "moc_call_satellite_rate_value",
            Self::MtcCall => "mtc_call_rate_value",
            Self::MoSms => "mo_sms_rate_value",
            Self::GprsMb => "gprs_rate_mb_rate_value",
            Self::VolteMb => "volte_rate_mb_rate_value",
        }
    }

    /// Column holding the charging interval description
    pub fn interval_column(&self) -> &'static str {
        match self {
            Self::LocalCall => "moc_call_local_call_charging_interval",
            Self::CallBackHome => "moc_call_call_back_home_charging_interval",
            Self::RestOfWorld => "moc_call_rest_of_the_world_charging_interval",
            Self::PremiumNumbers => "moc_call_premium_numbers_charging_interval",
            Self::SpecialNumbers => "moc_call_special_numbers_charging_interval",
            Self::Satellite => "moc_call_satellite_charging_interval",
            Self::MtcCall => "mtc_call_charging_interval",
            Self::MoSms => "mo_sms_charging_interval",
            Self::GprsMb => "gprs_rate_mb_charging_interval",
            Self::VolteMb => "volte_rate_mb_charging_interval",
        }
    }
}

/// A rate together with the interval it is charged in
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChargedRate {
    pub rate: Option<f64>,
    /// Descriptive interval such as "60 seconds" or "1 KB"
    pub interval: Option<String>,
}

/// One ratesheet row: an operator and its validity period
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RateRecord {
    /// Outbound route identifier (the ratesheet marker column)
    pub tap_out: Option<String>,
    pub bu_plmn_code: Option<String>,
    pub tax_included: bool,
    pub tax_value: Option<f64>,
    /// Carrier TADIG/PLMN code; its first three letters are the country alpha-3
    pub tadig_plmn_code: Option<String>,
    pub bearer_service_included: bool,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub currency: Option<String>,
    pub local_call: ChargedRate,
    pub call_back_home: ChargedRate,
    pub rest_of_world: ChargedRate,
    pub premium_numbers: ChargedRate,
    pub special_numbers: ChargedRate,
    pub satellite: ChargedRate,
    pub mtc_call: ChargedRate,
    pub mo_sms: ChargedRate,
    pub gprs_mb: ChargedRate,
    pub volte_mb: ChargedRate,
}

impl RateRecord {
    /// Rate pair for a category
    pub fn charge(&self, category: RateCategory) -> &ChargedRate {
        match category {
            RateCategory::LocalCall => &self.local_call,
            RateCategory::CallBackHome => &self.call_back_home,
            RateCategory::RestOfWorld => &self.rest_of_world,
            RateCategory::PremiumNumbers => &self.premium_numbers,
            RateCategory::SpecialNumbers => &self.special_numbers,
            RateCategory::Satellite => &self.satellite,
            RateCategory::MtcCall => &self.mtc_call,
            RateCategory::MoSms => &self.mo_sms,
            RateCategory::GprsMb => &self.gprs_mb,
            RateCategory::VolteMb => &self.volte_mb,
        }
    }

    /// Mutable rate pair for a category
    pub fn charge_mut(&mut self, category: RateCategory) -> &mut ChargedRate {
        match category {
            RateCategory::LocalCall => &mut self.local_call,
            RateCategory::CallBackHome => &mut self.call_back_home,
            RateCategory::RestOfWorld => &mut self.rest_of_world,
            RateCategory::PremiumNumbers => &mut self.premium_numbers,
            RateCategory::SpecialNumbers => &mut self.special_numbers,
            RateCategory::Satellite => &mut self.satellite,
            RateCategory::MtcCall => &mut self.mtc_call,
            RateCategory::MoSms => &mut self.mo_sms,
            RateCategory::GprsMb => &mut self.gprs_mb,
            RateCategory::VolteMb => &mut self.volte_mb,
        }
    }

    /// Country alpha-3 code derived from the carrier code: its first three
    /// characters, or the whole code when shorter
    pub fn home_alpha_3(&self) -> Option<&str> {
        let code = self.tadig_plmn_code.as_deref()?;
        let end = code
            .char_indices()
            .nth(3)
            .map(|(i, _)| i)
            .unwrap_or(code.len());
        (end > 0).then(|| &code[..end])
    }
}

/// A rate record with its storage identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRate {
    pub id: i64,
    pub record: RateRecord,
}

// ============================================================================
// Reference Data
// ============================================================================

/// Country reference row (ISO codes and region hierarchy)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CountryRef {
    pub name: Option<String>,
    pub alpha_2: Option<String>,
    pub alpha_3: Option<String>,
    pub country_code: Option<String>,
    pub iso_3166_2: Option<String>,
    pub region: Option<String>,
    pub sub_region: Option<String>,
    pub intermediate_region: Option<String>,
    pub region_code: Option<String>,
    pub sub_region_code: Option<String>,
    pub intermediate_region_code: Option<String>,
    /// Display name matched against template destinations
    pub custom_name: Option<String>,
}

/// Curated destination/category combination used as the ratecard right-hand side
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DestinationTemplate {
    pub destination: Option<String>,
    pub area_code: Option<String>,
    pub rate: Option<f64>,
    pub tariff_name: Option<String>,
    pub date: Option<NaiveDate>,
    pub rounding_rules: Option<String>,
    pub destination_type: Option<String>,
    pub setup_rate: Option<f64>,
    pub calls_type: Option<String>,
    pub remarks: Option<String>,
}

/// Schema-less ratesheet row: every observed header, in sheet order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RateBag {
    pub fields: serde_json::Map<String, serde_json::Value>,
}

/// A row destined for one of the replace-on-upload tables
#[derive(Debug, Clone, PartialEq)]
pub enum TableRow {
    Rate(RateRecord),
    Country(CountryRef),
    Template(DestinationTemplate),
    Bag(RateBag),
}

impl TableRow {
    /// Table this row belongs to
    pub fn table(&self) -> Table {
        match self {
            Self::Rate(_) => Table::Rates,
            Self::Country(_) => Table::Countries,
            Self::Template(_) => Table::Templates,
            Self::Bag(_) => Table::RateBags,
        }
    }
}

/// Everything the ratecard export reads, loaded in one pass
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub rates: Vec<StoredRate>,
    pub countries: Vec<CountryRef>,
    pub templates: Vec<DestinationTemplate>,
}

// ============================================================================
// Tests
// ============================================================================

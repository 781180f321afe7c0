//! Field-by-field edits of stored ratesheet records
//!
//! Edited values go through the same field table and cell normalizer as
//! uploaded cells, so a typed-in `30-Jun-26` or `yes` lands exactly as it
//! would from a sheet.

use std::sync::Arc;

use ratecard_core::{RateRecord, RateStore, RatecardError, Result, StoredRate, Table};
use ratecard_parser::{try_normalize, Cell, Value};
use tracing::info;

use crate::mapping::{FieldSpec, MappedRow, RATE_FIELDS};

fn text(value: &Option<String>) -> Value {
    value.clone().map(Value::Text).unwrap_or(Value::Null)
}

fn float(value: Option<f64>) -> Value {
    value.map(Value::Float).unwrap_or(Value::Null)
}

fn date(value: Option<chrono::NaiveDate>) -> Value {
    value.map(Value::Date).unwrap_or(Value::Null)
}

/// Typed values of a stored record, keyed by column
fn rate_values(record: &RateRecord) -> MappedRow {
    let mut row = MappedRow::default();
    row.set("tap_out", text(&record.tap_out));
    row.set("bu_plmn_code", text(&record.bu_plmn_code));
    row.set("tax_included", Value::Bool(record.tax_included));
    row.set("tax_value", float(record.tax_value));
    row.set("tadig_plmn_code", text(&record.tadig_plmn_code));
    row.set(
        "bearer_service_included",
        Value::Bool(record.bearer_service_included),
    );
    row.set("start_date", date(record.start_date));
    row.set("end_date", date(record.end_date));
    row.set("currency", text(&record.currency));
    for category in ratecard_core::RateCategory::ALL {
        let charge = record.charge(category);
        row.set(category.rate_column(), float(charge.rate));
        row.set(category.interval_column(), text(&charge.interval));
    }
    row
}

fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Text(s) => s.clone(),
        Value::Float(f) => f.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Bool(true) => "Yes".to_string(),
        Value::Bool(false) => "No".to_string(),
        Value::Date(d) => d.format("%Y-%m-%d").to_string(),
    }
}

/// Every declared field of a record with its editable text
pub fn rate_fields(record: &RateRecord) -> Vec<(&'static FieldSpec, String)> {
    let row = rate_values(record);
    RATE_FIELDS
        .iter()
        .map(|spec| (spec, display(row.value(spec.column))))
        .collect()
}

/// Apply one typed-in value to a record
///
/// An empty value clears the column. Text that cannot be read as the
/// column's kind is rejected rather than nulled.
pub fn edit_rate(record: &RateRecord, column: &str, raw: &str) -> Result<RateRecord> {
    let spec = RATE_FIELDS
        .iter()
        .find(|spec| spec.column == column)
        .ok_or_else(|| {
            RatecardError::RecordNotFound(format!("column {column} of {}", Table::Rates))
        })?;

    let value = try_normalize(&Cell::Text(raw.to_string()), spec.kind).map_err(|failure| {
        RatecardError::ConstraintViolation {
            table: Table::Rates.name(),
            column: spec.column,
            reason: failure.to_string(),
        }
    })?;

    let mut row = rate_values(record);
    row.set(spec.column, value);
    Ok(row.to_rate_record())
}

/// Load, edit and store one column of one record
pub async fn update_rate_field(
    store: &Arc<dyn RateStore>,
    id: i64,
    column: &str,
    raw: &str,
) -> Result<StoredRate> {
    let stored = store
        .get_rate(id)
        .await?
        .ok_or_else(|| RatecardError::RecordNotFound(format!("ratesheet record {id}")))?;

    let record = edit_rate(&stored.record, column, raw)?;
    store.update_rate(id, &record).await?;
    info!(id, column, "Rate record edited");

    Ok(StoredRate { id, record })
}

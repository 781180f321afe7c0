//! Column constraints of the replace-on-upload tables
//!
//! Mirrors `migrations/0001_schema.sql` so the in-memory store rejects the
//! same rows PostgreSQL would.

use crate::{RateCategory, RatecardError, Result, TableRow};

/// Schema DDL, idempotent
pub const SCHEMA_SQL: &str = include_str!("../migrations/0001_schema.sql");

pub const INTERVAL_MAX_LEN: usize = 20;

fn varchar(
    table: &'static str,
    column: &'static str,
    value: Option<&str>,
    max_len: usize,
) -> Result<()> {
    match value {
        Some(v) if v.chars().count() > max_len => Err(RatecardError::ConstraintViolation {
            table,
            column,
            reason: format!("value too long for type character varying({max_len})"),
        }),
        _ => Ok(()),
    }
}

fn not_null(table: &'static str, column: &'static str, value: Option<&str>) -> Result<()> {
    match value {
        Some(_) => Ok(()),
        None => Err(RatecardError::ConstraintViolation {
            table,
            column,
            reason: "null value violates not-null constraint".to_string(),
        }),
    }
}

/// Check a row against its table's column constraints
pub fn check_row(row: &TableRow) -> Result<()> {
    match row {
        TableRow::Rate(r) => {
            let t = "ratesheet_v2";
            not_null(t, "tap_out", r.tap_out.as_deref())?;
            varchar(t, "tap_out", r.tap_out.as_deref(), 50)?;
            varchar(t, "bu_plmn_code", r.bu_plmn_code.as_deref(), 50)?;
            varchar(t, "tadig_plmn_code", r.tadig_plmn_code.as_deref(), 50)?;
            varchar(t, "currency", r.currency.as_deref(), 10)?;
            for category in RateCategory::ALL {
                varchar(
                    t,
                    category.interval_column(),
                    r.charge(category).interval.as_deref(),
                    INTERVAL_MAX_LEN,
                )?;
            }
            Ok(())
        }
        TableRow::Country(c) => {
            let t = "country_v2";
            varchar(t, "name", c.name.as_deref(), 100)?;
            varchar(t, "alpha_2", c.alpha_2.as_deref(), 2)?;
            varchar(t, "alpha_3", c.alpha_3.as_deref(), 3)?;
            varchar(t, "country_code", c.country_code.as_deref(), 10)?;
            varchar(t, "iso_3166_2", c.iso_3166_2.as_deref(), 20)?;
            varchar(t, "region", c.region.as_deref(), 50)?;
            varchar(t, "sub_region", c.sub_region.as_deref(), 50)?;
            varchar(t, "intermediate_region", c.intermediate_region.as_deref(), 50)?;
            varchar(t, "region_code", c.region_code.as_deref(), 10)?;
            varchar(t, "sub_region_code", c.sub_region_code.as_deref(), 10)?;
            varchar(
                t,
                "intermediate_region_code",
                c.intermediate_region_code.as_deref(),
                10,
            )?;
            varchar(t, "custom_name", c.custom_name.as_deref(), 100)
        }
        TableRow::Template(tp) => {
            let t = "template";
            varchar(t, "destination", tp.destination.as_deref(), 100)?;
            varchar(t, "area_code", tp.area_code.as_deref(), 20)?;
            varchar(t, "tariff_name", tp.tariff_name.as_deref(), 100)?;
            varchar(t, "rounding_rules", tp.rounding_rules.as_deref(), 20)?;
            varchar(t, "destination_type", tp.destination_type.as_deref(), 50)?;
            varchar(t, "calls_type", tp.calls_type.as_deref(), 100)
        }
        TableRow::Bag(_) => Ok(()),
    }
}

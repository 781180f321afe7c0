//! Row mapping
//!
//! Static field tables tie a source header to a target column and a cell
//! kind. Only declared headers are read; anything else on the sheet is
//! ignored in typed mode and kept verbatim in JSON-bag mode.

use ratecard_core::{
    ChargedRate, CountryRef, DestinationTemplate, RateBag, RateCategory, RateRecord,
};
use ratecard_parser::cell::to_json;
use ratecard_parser::{try_normalize, Cell, CellKind, Record, Value};
use tracing::debug;

/// One declared source column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Header text on the uploaded sheet
    pub header: &'static str,
    /// Target column
    pub column: &'static str,
    pub kind: CellKind,
}

const fn field(header: &'static str, column: &'static str, kind: CellKind) -> FieldSpec {
    FieldSpec {
        header,
        column,
        kind,
    }
}

const TEXT: CellKind = CellKind::TEXT;

// ============================================================================
// Field Tables
// ============================================================================

/// Ratesheet columns (`ratesheet_v2`)
pub static RATE_FIELDS: [FieldSpec; 29] = [
    field("TAP-OUT", "tap_out", TEXT),
    field("BU PLMN Code", "bu_plmn_code", TEXT),
    field("Tax included in the rate Yes/No", "tax_included", CellKind::Bool),
    field("Tax Value", "tax_value", CellKind::Float),
    field("TADIG PLMN Code", "tadig_plmn_code", TEXT),
    field(
        "Bearer Service included in Special IOT Yes/No",
        "bearer_service_included",
        CellKind::Bool,
    ),
    field("Start date", "start_date", CellKind::Date),
    field("End date", "end_date", CellKind::Date),
    field("Currency", "currency", TEXT),
    field(
        "MOC Call Local Call Rate/Value",
        "moc_call_local_call_rate_value",
        CellKind::Float,
    ),
    field(
        "MOC Call Local Call Charging interval",
        "moc_call_local_call_charging_interval",
        TEXT,
    ),
    field(
        "MOC Call Call Back Home Rate/Value",
        "moc_call_call_back_home_rate_value",
        CellKind::Float,
    ),
    field(
        "MOC Call Call Back Home Charging interval",
        "moc_call_call_back_home_charging_interval",
        TEXT,
    ),
    field(
        "MOC Call Rest of the World Rate/Value",
        "moc_call_rest_of_the_world_rate_value",
        CellKind::Float,
    ),
    field(
        "MOC Call Rest of the World Charging interval",
        "moc_call_rest_of_the_world_charging_interval",
        TEXT,
    ),
    field(
        "MOC Call Premium Numbers Rate/Value",
        "moc_call_premium_numbers_rate_value",
        CellKind::Float,
    ),
    field(
        "MOC Call Premium Numbers Charging interval",
        "moc_call_premium_numbers_charging_interval",
        TEXT,
    ),
    field(
        "MOC Call Special Numbers Rate/Value",
        "moc_call_special_numbers_rate_value",
        CellKind::Float,
    ),
    field(
        "MOC Call Special Numbers Charging interval",
        "moc_call_special_numbers_charging_interval",
        TEXT,
    ),
    field(
        "MOC Call Satellite Rate/Value",
        "moc_call_satellite_rate_value",
        CellKind::Float,
    ),
    field(
        "MOC Call Satellite Charging interval",
        "moc_call_satellite_charging_interval",
        TEXT,
    ),
    field("MTC Call Rate/Value", "mtc_call_rate_value", CellKind::Float),
    field("MTC Call Charging interval", "mtc_call_charging_interval", TEXT),
    field("MO SMS Rate/Value", "mo_sms_rate_value", CellKind::Float),
    field("MO SMS Charging interval", "mo_sms_charging_interval", TEXT),
    field("GPRS Rate MB Rate/Value", "gprs_rate_mb_rate_value", CellKind::Float),
    field(
        "GPRS Rate MB Charging interval",
        "gprs_rate_mb_charging_interval",
        TEXT,
    ),
    field("VoLTE Rate MB Rate/Value", "volte_rate_mb_rate_value", CellKind::Float),
    field(
        "VoLTE Rate MB Charging interval",
        "volte_rate_mb_charging_interval",
        TEXT,
    ),
];

/// Country reference columns (`country_v2`)
pub static COUNTRY_FIELDS: [FieldSpec; 12] = [
    field("name", "name", CellKind::text(100)),
    field("alpha-2", "alpha_2", CellKind::upper(2)),
    field("alpha-3", "alpha_3", CellKind::upper(3)),
    field("country-code", "country_code", CellKind::text(10)),
    field("iso_3166-2", "iso_3166_2", CellKind::text(20)),
    field("region", "region", CellKind::text(50)),
    field("sub-region", "sub_region", CellKind::text(50)),
    field("intermediate-region", "intermediate_region", CellKind::text(50)),
    field("region-code", "region_code", CellKind::text(10)),
    field("sub-region-code", "sub_region_code", CellKind::text(10)),
    field(
        "intermediate-region-code",
        "intermediate_region_code",
        CellKind::text(10),
    ),
    field("custom-name", "custom_name", CellKind::text(100)),
];

/// Destination template columns (`template`)
pub static TEMPLATE_FIELDS: [FieldSpec; 10] = [
    field("Destination", "destination", TEXT),
    field("Area Code", "area_code", TEXT),
    field("Rate", "rate", CellKind::Float),
    field("TARIFF_NAME", "tariff_name", TEXT),
    field("Date", "date", CellKind::Date),
    field("Rounding Rules", "rounding_rules", TEXT),
    field("Destination Type", "destination_type", TEXT),
    field("Setup Rate", "setup_rate", CellKind::Float),
    field("calls based on number types", "calls_type", TEXT),
    field("remarks", "remarks", TEXT),
];

/// Field whose header is the marker, matched case-insensitively
pub fn marker_field<'a>(fields: &'a [FieldSpec], marker: &str) -> Option<&'a FieldSpec> {
    fields
        .iter()
        .find(|f| f.header.eq_ignore_ascii_case(marker.trim()))
}

// ============================================================================
// Mapped Rows
// ============================================================================

static NULL: Value = Value::Null;

/// Normalized values of one record, keyed by target column
#[derive(Debug, Clone, Default)]
pub struct MappedRow {
    values: Vec<(&'static str, Value)>,
    /// Cells that held something but could not be converted
    pub cells_nulled: usize,
}

impl MappedRow {
    /// Read every declared field of a record
    pub fn map(record: &Record<'_>, fields: &[FieldSpec]) -> Self {
        let mut row = Self::default();
        for spec in fields {
            let value = Self::convert(record.get(spec.header), spec, &mut row.cells_nulled);
            row.values.push((spec.column, value));
        }
        row
    }

    fn convert(cell: &Cell, spec: &FieldSpec, failures: &mut usize) -> Value {
        match try_normalize(cell, spec.kind) {
            Ok(value) => value,
            Err(failure) => {
                debug!(column = spec.column, error = %failure, "Cell nulled");
                *failures += 1;
                Value::Null
            }
        }
    }

    /// Value of a column, `Null` when undeclared
    pub fn value(&self, column: &str) -> &Value {
        self.values
            .iter()
            .find(|(c, _)| *c == column)
            .map(|(_, v)| v)
            .unwrap_or(&NULL)
    }

    /// Replace a column's value
    pub fn set(&mut self, column: &'static str, value: Value) {
        match self.values.iter_mut().find(|(c, _)| *c == column) {
            Some(slot) => slot.1 = value,
            None => self.values.push((column, value)),
        }
    }

    fn text(&self, column: &str) -> Option<String> {
        self.value(column).clone().into_text()
    }

    fn float(&self, column: &str) -> Option<f64> {
        self.value(column).as_f64()
    }

    fn date(&self, column: &str) -> Option<chrono::NaiveDate> {
        self.value(column).as_date()
    }

    fn flag(&self, column: &str) -> bool {
        self.value(column).as_bool()
    }

    /// Interval columns may be declared as integers; store their text form
    fn interval(&self, column: &str) -> Option<String> {
        match self.value(column) {
            Value::Int(i) => Some(i.to_string()),
            other => other.clone().into_text(),
        }
    }

    fn charged(&self, category: RateCategory) -> ChargedRate {
        ChargedRate {
            rate: self.float(category.rate_column()),
            interval: self.interval(category.interval_column()),
        }
    }

    pub fn to_rate_record(&self) -> RateRecord {
        let mut record = RateRecord {
            tap_out: self.text("tap_out"),
            bu_plmn_code: self.text("bu_plmn_code"),
            tax_included: self.flag("tax_included"),
            tax_value: self.float("tax_value"),
            tadig_plmn_code: self.text("tadig_plmn_code"),
            bearer_service_included: self.flag("bearer_service_included"),
            start_date: self.date("start_date"),
            end_date: self.date("end_date"),
            currency: self.text("currency"),
            ..Default::default()
        };
        for category in RateCategory::ALL {
            *record.charge_mut(category) = self.charged(category);
        }
        record
    }

    pub fn to_country(&self) -> CountryRef {
        CountryRef {
            name: self.text("name"),
            alpha_2: self.text("alpha_2"),
            alpha_3: self.text("alpha_3"),
            country_code: self.text("country_code"),
            iso_3166_2: self.text("iso_3166_2"),
            region: self.text("region"),
            sub_region: self.text("sub_region"),
            intermediate_region: self.text("intermediate_region"),
            region_code: self.text("region_code"),
            sub_region_code: self.text("sub_region_code"),
            intermediate_region_code: self.text("intermediate_region_code"),
            custom_name: self.text("custom_name"),
        }
    }

    pub fn to_template(&self) -> DestinationTemplate {
        DestinationTemplate {
            destination: self.text("destination"),
            area_code: self.text("area_code"),
            rate: self.float("rate"),
            tariff_name: self.text("tariff_name"),
            date: self.date("date"),
            rounding_rules: self.text("rounding_rules"),
            destination_type: self.text("destination_type"),
            setup_rate: self.float("setup_rate"),
            calls_type: self.text("calls_type"),
            remarks: self.text("remarks"),
        }
    }
}

/// Keep every header of a record, in sheet order
pub fn map_bag(record: &Record<'_>) -> RateBag {
    let fields = record
        .fields()
        .map(|(header, cell)| (header.to_string(), to_json(cell)))
        .collect();
    RateBag { fields }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use ratecard_parser::{Grid, HeaderResolver};

    fn t(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn resolve(rows: Vec<Vec<Cell>>, marker: &str) -> ratecard_parser::ResolvedSheet {
        HeaderResolver::new(marker)
            .resolve(&Grid::new("Sheet1", rows))
            .unwrap()
    }

    #[test]
    fn test_rate_fields_match_store_columns() {
        for category in RateCategory::ALL {
            assert!(RATE_FIELDS.iter().any(|f| f.column == category.rate_column()));
            assert!(RATE_FIELDS
                .iter()
                .any(|f| f.column == category.interval_column()));
        }
        assert_eq!(marker_field(&RATE_FIELDS, "tap-out").unwrap().column, "tap_out");
        assert_eq!(
            marker_field(&COUNTRY_FIELDS, "alpha-3").unwrap().column,
            "alpha_3"
        );
        assert!(marker_field(&TEMPLATE_FIELDS, "TAP-OUT").is_none());
    }

    #[test]
    fn test_map_rate_record() {
        let sheet = resolve(
            vec![
                vec![
                    t("TAP-OUT"),
                    t("TADIG PLMN Code"),
                    t("Tax included in the rate Yes/No"),
                    t("Start date"),
                    t("MTC Call Rate/Value"),
                    t("MTC Call Charging interval"),
                    t("Unrelated"),
                ],
                vec![
                    t("FRAF1"),
                    t("FRAF1"),
                    t("Yes"),
                    t("2025-07-01"),
                    Cell::Float(0.02),
                    t("60 seconds"),
                    t("ignored"),
                ],
            ],
            "TAP-OUT",
        );
        let record = sheet.records().next().unwrap();
        let row = MappedRow::map(&record, &RATE_FIELDS);
        assert_eq!(row.cells_nulled, 0);

        let rate = row.to_rate_record();
        assert_eq!(rate.tap_out.as_deref(), Some("FRAF1"));
        assert!(rate.tax_included);
        assert!(!rate.bearer_service_included);
        assert_eq!(rate.start_date, NaiveDate::from_ymd_opt(2025, 7, 1));
        assert_eq!(rate.end_date, None);
        assert_eq!(rate.mtc_call.rate, Some(0.02));
        assert_eq!(rate.mtc_call.interval.as_deref(), Some("60 seconds"));
        assert_eq!(rate.local_call, ChargedRate::default());
    }

    #[test]
    fn test_bad_cells_are_counted_and_nulled() {
        let sheet = resolve(
            vec![
                vec![t("TAP-OUT"), t("Tax Value"), t("End date")],
                vec![t("FRAF1"), t("twenty"), t("someday")],
            ],
            "TAP-OUT",
        );
        let record = sheet.records().next().unwrap();
        let row = MappedRow::map(&record, &RATE_FIELDS);
        assert_eq!(row.cells_nulled, 2);

        let rate = row.to_rate_record();
        assert_eq!(rate.tax_value, None);
        assert_eq!(rate.end_date, None);
        assert_eq!(rate.tap_out.as_deref(), Some("FRAF1"));
    }

    #[test]
    fn test_date_before_1900_is_nulled() {
        let sheet = resolve(
            vec![
                vec![t("TAP-OUT"), t("Start date")],
                vec![t("FRAF1"), t("01/06/1850")],
            ],
            "TAP-OUT",
        );
        let record = sheet.records().next().unwrap();
        let row = MappedRow::map(&record, &RATE_FIELDS);
        assert_eq!(row.cells_nulled, 1);
        assert_eq!(row.to_rate_record().start_date, None);
    }

    #[test]
    fn test_integer_interval_is_stored_as_text() {
        let mut row = MappedRow::default();
        row.set("mtc_call_charging_interval", Value::Int(60));
        assert_eq!(
            row.to_rate_record().mtc_call.interval.as_deref(),
            Some("60")
        );
    }

    #[test]
    fn test_map_country_truncates_and_uppercases() {
        let sheet = resolve(
            vec![
                vec![t("name"), t("alpha-2"), t("alpha-3"), t("country-code"), t("custom-name")],
                vec![t("France"), t("fr"), t("fraX"), Cell::Float(250.0), t("France")],
            ],
            "alpha-3",
        );
        let record = sheet.records().next().unwrap();
        let country = MappedRow::map(&record, &COUNTRY_FIELDS).to_country();
        assert_eq!(country.alpha_2.as_deref(), Some("FR"));
        assert_eq!(country.alpha_3.as_deref(), Some("FRA"));
        assert_eq!(country.country_code.as_deref(), Some("250"));
        assert_eq!(country.custom_name.as_deref(), Some("France"));
        assert_eq!(country.region, None);
    }

    #[test]
    fn test_map_template() {
        let sheet = resolve(
            vec![
                vec![
                    t("Destination"),
                    t("Rate"),
                    t("calls based on number types"),
                    t("remarks"),
                ],
                vec![t("National"), Cell::Float(0.1), t("ROW"), t("NaN")],
            ],
            "Destination",
        );
        let record = sheet.records().next().unwrap();
        let template = MappedRow::map(&record, &TEMPLATE_FIELDS).to_template();
        assert_eq!(template.destination.as_deref(), Some("National"));
        assert_eq!(template.rate, Some(0.1));
        assert_eq!(template.calls_type.as_deref(), Some("ROW"));
        assert_eq!(template.remarks, None);
    }

    #[test]
    fn test_map_bag_keeps_every_header_in_order() {
        let sheet = resolve(
            vec![
                vec![t("Zeta"), t("TAP-OUT"), t("Alpha")],
                vec![Cell::Int(1), t("FRAF1"), Cell::Empty],
            ],
            "TAP-OUT",
        );
        let record = sheet.records().next().unwrap();
        let bag = map_bag(&record);
        let keys: Vec<_> = bag.fields.keys().cloned().collect();
        assert_eq!(keys, vec!["Zeta", "TAP-OUT", "Alpha"]);
        assert_eq!(bag.fields["Zeta"], serde_json::json!(1));
        assert_eq!(bag.fields["Alpha"], serde_json::Value::Null);
    }
}

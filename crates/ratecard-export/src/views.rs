//! Sheet layouts of the four ratecards

use ratecard_core::{RateCategory, StoredRate};

use crate::projection::VoiceRow;
use crate::rounding::rounding_rule;
use crate::sheet::{OutCell, RatecardSheet};

pub const VOICE_HEADERS: [&str; 10] = [
    "Destination",
    "Area Code",
    "Rate",
    "TARIFF_NAME",
    "Date",
    "Rounding Rules",
    "Destination Type",
    "Setup Rate",
    "Calls Type",
    "Remarks",
];

pub const GPRS_HEADERS: [&str; 5] = [
    "Destination",
    "Area Code",
    "Rate",
    "Valid From",
    "rounding_rules",
];

pub const SMS_HEADERS: [&str; 5] = [
    "Destination",
    "Area Code",
    "Setup Rate",
    "Valid From (dd-mmm-yyyy)",
    "Rate",
];

pub const VOLTE_HEADERS: [&str; 5] = GPRS_HEADERS;

fn text(value: &Option<String>) -> OutCell {
    OutCell::from(value.clone())
}

/// Rate rounded to a fixed number of decimals
fn round_to(value: Option<f64>, decimals: i32) -> Option<f64> {
    let factor = 10f64.powi(decimals);
    value.map(|v| (v * factor).round() / factor)
}

fn by_id(rates: &[StoredRate]) -> Vec<&StoredRate> {
    let mut sorted: Vec<&StoredRate> = rates.iter().collect();
    sorted.sort_by_key(|r| r.id);
    sorted
}

pub fn voice_sheet(rows: &[VoiceRow]) -> RatecardSheet {
    let mut sheet = RatecardSheet::new("Ratecard", VOICE_HEADERS.to_vec(), "yyyy-mm-dd");
    for row in rows {
        sheet.push(vec![
            text(&row.destination),
            text(&row.area_code),
            OutCell::from(row.rate),
            OutCell::Text(row.tariff_name.clone()),
            OutCell::from(row.date),
            text(&row.rounding_rules),
            text(&row.destination_type),
            OutCell::from(row.setup_rate),
            text(&row.calls_type),
            text(&row.remarks),
        ]);
    }
    sheet
}

/// Per-carrier data rate sheet shared by GPRS and VoLTE
fn data_sheet(
    name: &'static str,
    rates: &[StoredRate],
    category: RateCategory,
    decimals: Option<i32>,
    date_format: &'static str,
) -> RatecardSheet {
    let mut sheet = RatecardSheet::new(name, GPRS_HEADERS.to_vec(), date_format);
    for rate in by_id(rates) {
        let record = &rate.record;
        let charge = record.charge(category);
        let value = match decimals {
            Some(d) => round_to(charge.rate, d),
            None => charge.rate,
        };
        sheet.push(vec![
            text(&record.tadig_plmn_code),
            text(&record.tadig_plmn_code),
            OutCell::from(value),
            OutCell::from(record.start_date),
            OutCell::from(rounding_rule(charge.interval.as_deref())),
        ]);
    }
    sheet
}

pub fn gprs_sheet(rates: &[StoredRate]) -> RatecardSheet {
    data_sheet("GPRS_Ratecard", rates, RateCategory::GprsMb, None, "yyyy-mm-dd")
}

pub fn volte_sheet(rates: &[StoredRate]) -> RatecardSheet {
    data_sheet("Sheet1", rates, RateCategory::VolteMb, Some(8), "dd-mmm-yy")
}

pub fn sms_sheet(rates: &[StoredRate]) -> RatecardSheet {
    let mut sheet = RatecardSheet::new("SMS_Ratecard", SMS_HEADERS.to_vec(), "dd-mmm-yyyy");
    for rate in by_id(rates) {
        let record = &rate.record;
        sheet.push(vec![
            text(&record.tadig_plmn_code),
            text(&record.tadig_plmn_code),
            OutCell::from(record.mo_sms.rate),
            OutCell::from(record.start_date),
            OutCell::Number(0.0),
        ]);
    }
    sheet
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use ratecard_core::{ChargedRate, RateRecord};

    fn stored(id: i64, tadig: &str) -> StoredRate {
        StoredRate {
            id,
            record: RateRecord {
                tap_out: Some(tadig.to_string()),
                tadig_plmn_code: Some(tadig.to_string()),
                start_date: NaiveDate::from_ymd_opt(2025, 7, 1),
                mo_sms: ChargedRate {
                    rate: Some(0.03),
                    interval: None,
                },
                gprs_mb: ChargedRate {
                    rate: Some(0.01),
                    interval: Some("10 KB".to_string()),
                },
                volte_mb: ChargedRate {
                    rate: Some(0.123456789123),
                    interval: Some("1 MB".to_string()),
                },
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_gprs_sheet() {
        let sheet = gprs_sheet(&[stored(2, "DEUD1"), stored(1, "FRAF1")]);
        assert_eq!(sheet.name, "GPRS_Ratecard");
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[0][0], OutCell::Text("FRAF1".to_string()));
        assert_eq!(sheet.rows[0][2], OutCell::Number(0.01));
        assert_eq!(sheet.rows[0][4], OutCell::Text("10240/10240".to_string()));
    }

    #[test]
    fn test_sms_sheet() {
        let sheet = sms_sheet(&[stored(1, "FRAF1")]);
        assert_eq!(sheet.headers[3], "Valid From (dd-mmm-yyyy)");
        assert_eq!(sheet.date_format, "dd-mmm-yyyy");
        assert_eq!(sheet.rows[0][2], OutCell::Number(0.03));
        assert_eq!(sheet.rows[0][4], OutCell::Number(0.0));
    }

    #[test]
    fn test_volte_sheet_rounds_rate() {
        let sheet = volte_sheet(&[stored(1, "FRAF1")]);
        assert_eq!(sheet.name, "Sheet1");
        assert_eq!(sheet.date_format, "dd-mmm-yy");
        assert_eq!(sheet.rows[0][2], OutCell::Number(0.12345679));
        assert_eq!(sheet.rows[0][4], OutCell::Text("1048576/1048576".to_string()));
    }

    #[test]
    fn test_missing_values_stay_empty() {
        let sheet = gprs_sheet(&[StoredRate {
            id: 1,
            record: RateRecord {
                tap_out: Some("X".to_string()),
                ..Default::default()
            },
        }]);
        assert!(sheet.rows[0].iter().all(|c| *c == OutCell::Empty));
    }
}

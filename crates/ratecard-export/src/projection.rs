//! Voice ratecard projection
//!
//! Every rate record is crossed with every destination template and kept
//! only where the carrier's home country (first three letters of its TADIG
//! code against `alpha_3`) exists in the country table. Five categories of
//! template rows are produced, each taking its rate and rounding rule from a
//! different source.

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use ratecard_core::{
    CountryRef, DestinationTemplate, RateCategory, RatecardConfig, Snapshot, StoredRate,
};

use crate::rounding::rounding_rule;

/// Template calls types billed at the template's own rate
pub const MISC_CALLS_TYPES: [&str; 7] = [
    "Customer Care",
    "directory calls",
    "emergency calls",
    "Satellite",
    "Local Short Code",
    "Premium",
    "Toll Free",
];

/// Output block; the numeric order is the sheet order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum VoiceCategory {
    National = 1,
    CallBackHome = 2,
    RestOfWorld = 3,
    Terminating = 4,
    Miscellaneous = 5,
}

impl VoiceCategory {
    pub const ALL: [VoiceCategory; 5] = [
        Self::National,
        Self::CallBackHome,
        Self::RestOfWorld,
        Self::Terminating,
        Self::Miscellaneous,
    ];

    /// Ratesheet rate pair feeding this block; `None` uses the template
    fn rate_category(&self) -> Option<RateCategory> {
        match self {
            Self::National => Some(RateCategory::LocalCall),
            Self::CallBackHome => Some(RateCategory::CallBackHome),
            Self::RestOfWorld => Some(RateCategory::RestOfWorld),
            Self::Terminating => Some(RateCategory::MtcCall),
            Self::Miscellaneous => None,
        }
    }

    fn matches(&self, template: &DestinationTemplate, country: &CountryRef) -> bool {
        let destination = template.destination.as_deref();
        let calls_type = template.calls_type.as_deref();
        match self {
            Self::National => destination == Some("National"),
            Self::CallBackHome => {
                destination.is_some() && destination == country.custom_name.as_deref()
            }
            Self::RestOfWorld => match (destination, country.custom_name.as_deref()) {
                (Some(d), Some(home)) => d != home && calls_type == Some("ROW"),
                _ => false,
            },
            Self::Terminating => calls_type == Some("MTC CALLS"),
            Self::Miscellaneous => calls_type.is_some_and(|c| MISC_CALLS_TYPES.contains(&c)),
        }
    }
}

/// One line of the voice ratecard
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoiceRow {
    pub destination: Option<String>,
    pub area_code: Option<String>,
    pub rate: Option<f64>,
    pub tariff_name: String,
    pub date: Option<NaiveDate>,
    pub rounding_rules: Option<String>,
    pub destination_type: Option<String>,
    pub setup_rate: Option<f64>,
    pub calls_type: Option<String>,
    pub remarks: Option<String>,
    #[serde(skip)]
    pub category: VoiceCategory,
}

impl VoiceRow {
    /// Secondary sort keys within a category
    fn sort_keys(&self) -> [Option<&str>; 2] {
        match self.category {
            VoiceCategory::National | VoiceCategory::CallBackHome => {
                [self.calls_type.as_deref(), None]
            }
            VoiceCategory::RestOfWorld | VoiceCategory::Terminating => {
                [self.destination.as_deref(), None]
            }
            VoiceCategory::Miscellaneous => {
                [self.calls_type.as_deref(), self.destination.as_deref()]
            }
        }
    }
}

/// Tariff name for a carrier
pub fn tariff_name(config: &RatecardConfig, tadig: &str) -> String {
    format!("{}{}{}", config.tariff_prefix, tadig, config.tariff_suffix)
}

fn clean_remarks(remarks: Option<&str>) -> Option<String> {
    match remarks {
        Some("NaN") | None => None,
        Some(r) => Some(r.to_string()),
    }
}

fn build_row(
    category: VoiceCategory,
    rate: &StoredRate,
    tadig: &str,
    template: &DestinationTemplate,
    config: &RatecardConfig,
) -> VoiceRow {
    let (value, interval) = match category.rate_category() {
        Some(rc) => {
            let charge = rate.record.charge(rc);
            (charge.rate, charge.interval.as_deref())
        }
        None => (template.rate, template.rounding_rules.as_deref()),
    };

    VoiceRow {
        destination: template.destination.clone(),
        area_code: template.area_code.clone(),
        rate: value,
        tariff_name: tariff_name(config, tadig),
        date: template.date,
        rounding_rules: rounding_rule(interval),
        destination_type: template.destination_type.clone(),
        setup_rate: template.setup_rate,
        calls_type: template.calls_type.clone(),
        remarks: clean_remarks(template.remarks.as_deref()),
        category,
    }
}

/// Nulls sort after every value
fn cmp_nulls_last(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn cmp_rows(a: &VoiceRow, b: &VoiceRow) -> Ordering {
    let [a1, a2] = a.sort_keys();
    let [b1, b2] = b.sort_keys();
    a.tariff_name
        .cmp(&b.tariff_name)
        .then(a.category.cmp(&b.category))
        .then_with(|| cmp_nulls_last(a1, b1))
        .then_with(|| cmp_nulls_last(a2, b2))
}

/// Build the voice ratecard, sorted for output
pub fn project_voice(snapshot: &Snapshot, config: &RatecardConfig) -> Vec<VoiceRow> {
    let mut rates: Vec<&StoredRate> = snapshot.rates.iter().collect();
    rates.sort_by_key(|r| r.id);

    // Inner join: a rate contributes once per matching country row
    let joined: Vec<(&StoredRate, &str, &CountryRef)> = rates
        .iter()
        .filter_map(|rate| {
            let tadig = rate.record.tadig_plmn_code.as_deref()?;
            let alpha_3 = rate.record.home_alpha_3()?;
            Some((*rate, tadig, alpha_3))
        })
        .flat_map(|(rate, tadig, alpha_3)| {
            snapshot
                .countries
                .iter()
                .filter(move |c| c.alpha_3.as_deref() == Some(alpha_3))
                .map(move |c| (rate, tadig, c))
        })
        .collect();

    let mut rows = Vec::new();
    for category in VoiceCategory::ALL {
        for (rate, tadig, country) in &joined {
            for template in &snapshot.templates {
                if category.matches(template, country) {
                    rows.push(build_row(category, rate, tadig, template, config));
                }
            }
        }
    }

    rows.sort_by(cmp_rows);
    debug!(
        rates = rates.len(),
        joined = joined.len(),
        templates = snapshot.templates.len(),
        rows = rows.len(),
        "Voice ratecard projected"
    );
    rows
}

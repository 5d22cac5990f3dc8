//! Observation normalization.
//!
//! Turns raw `{data, valor}` rows into sorted, finite `Observation`s.
//!
//! - **Locale-tolerant numbers**: the upstream source and the proxy layer do not
//!   agree on decimal separators, so both `1234.56` and `1.234,56` are accepted.
//! - **Row-level validation**: bad rows are dropped and reported, never fatal here.
//! - **Deterministic order**: output is sorted ascending by date; on duplicate
//!   dates the first-seen row wins.

use chrono::NaiveDate;
use tracing::warn;

use crate::domain::{DroppedRow, Observation, RawObservation, RawValue};

/// Normalization output: clean observations plus what was discarded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedSeries {
    pub observations: Vec<Observation>,
    pub dropped: Vec<DroppedRow>,
    /// Rows discarded because an earlier row had the same date.
    pub duplicates: usize,
}

impl NormalizedSeries {
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }
}

pub fn normalize(rows: &[RawObservation]) -> NormalizedSeries {
    let mut observations = Vec::with_capacity(rows.len());
    let mut dropped = Vec::new();

    for (index, row) in rows.iter().enumerate() {
        let date = match parse_date(&row.date) {
            Ok(d) => d,
            Err(reason) => {
                dropped.push(dropped_row(index, row, reason));
                continue;
            }
        };
        let value = match parse_value(&row.value) {
            Some(v) => v,
            None => {
                dropped.push(dropped_row(index, row, format!("Invalid value '{}'.", row.value)));
                continue;
            }
        };
        observations.push(Observation::new(date, value));
    }

    // Stable sort keeps first-seen order among equal dates, so dedup keeps the first.
    observations.sort_by_key(|o| o.date);
    let before = observations.len();
    observations.dedup_by_key(|o| o.date);
    let duplicates = before - observations.len();

    if !dropped.is_empty() {
        warn!(dropped = dropped.len(), kept = observations.len(), "discarded unparseable observation rows");
    }
    if duplicates > 0 {
        warn!(duplicates, "discarded observations with duplicate dates");
    }

    NormalizedSeries {
        observations,
        dropped,
        duplicates,
    }
}

fn dropped_row(index: usize, row: &RawObservation, reason: String) -> DroppedRow {
    DroppedRow {
        index,
        date: row.date.clone(),
        value: row.value.to_string(),
        reason,
    }
}

fn parse_value(raw: &RawValue) -> Option<f64> {
    match raw {
        RawValue::Number(v) => v.is_finite().then_some(*v),
        RawValue::Text(s) => parse_decimal(s),
        RawValue::Other(_) => None,
    }
}

/// Parse a decimal written with either `.` or `,` as the decimal separator.
///
/// Rules (a single dot with no comma is always the decimal point; the others
/// extend that rule to grouped and US-style input):
/// - only dots (no comma): one dot is the decimal point (`1234.56`, `0.5`);
///   several dots group thousands (`1.234.567`)
/// - only commas: thousands dots are absent, the comma is the decimal point (`1234,56`)
/// - both: the right-most separator is the decimal point and the other one
///   groups thousands (`1.234,56`, `1,234.56`)
///
/// Empty strings, SGS's `"."`/`"-"` placeholders and non-finite results yield `None`.
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "." || trimmed == "-" || trimmed == "," {
        return None;
    }

    let last_dot = trimmed.rfind('.');
    let last_comma = trimmed.rfind(',');

    let canonical: String = match (last_dot, last_comma) {
        (Some(_), None) => {
            // More than one dot means the dots group thousands ("1.234.567").
            if trimmed.matches('.').count() > 1 {
                trimmed.replace('.', "")
            } else {
                trimmed.to_string()
            }
        }
        (None, Some(_)) => trimmed.replace(',', "."),
        (Some(dot), Some(comma)) if dot > comma => trimmed.replace(',', ""),
        (Some(_), Some(_)) => trimmed.replace('.', "").replace(',', "."),
        (None, None) => trimmed.to_string(),
    };

    if canonical.chars().filter(|c| *c == '.').count() > 1 {
        return None;
    }

    let v = canonical.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

/// Parse an observation or contract date.
///
/// SGS uses `dd/mm/yyyy`. ISO dates and month-only forms (`mm/yyyy`, `yyyy-mm`,
/// resolved to the first day) are accepted as well.
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    let s = s.trim();
    const FMTS: [&str; 3] = ["%d/%m/%Y", "%Y-%m-%d", "%d-%m-%Y"];
    for fmt in FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }
    // Month-only forms: chrono needs a day, so pin it to the 1st.
    let month_only = [(format!("01/{s}"), "%d/%m/%Y"), (format!("{s}-01"), "%Y-%m-%d")];
    for (candidate, fmt) in &month_only {
        if let Ok(d) = NaiveDate::parse_from_str(candidate, fmt) {
            return Ok(d);
        }
    }
    Err(format!(
        "Invalid date '{s}'. Expected one of: DD/MM/YYYY, YYYY-MM-DD, MM/YYYY, YYYY-MM."
    ))
}

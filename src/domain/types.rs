//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during a calculation
//! - rendered as JSON for scripting
//! - written into exports and debug bundles

use std::fmt;

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// How often the contract is readjusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Periodicity {
    Monthly,
    Annual,
}

impl Periodicity {
    pub fn display_name(self) -> &'static str {
        match self {
            Periodicity::Monthly => "Monthly",
            Periodicity::Annual => "Annual",
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            Periodicity::Monthly => Periodicity::Annual,
            Periodicity::Annual => Periodicity::Monthly,
        }
    }
}

/// What a series publishes each month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    /// Monthly percentage variation (`0.50` means +0.5% in that month).
    Percentage,
    /// Absolute index level (e.g. `6543.21`).
    Level,
}

impl ValueKind {
    pub fn display_name(self) -> &'static str {
        match self {
            ValueKind::Percentage => "monthly %",
            ValueKind::Level => "index level",
        }
    }
}

/// Numeric SGS series code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeriesCode(pub u32);

impl fmt::Display for SeriesCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One statistical series the calculator can readjust by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesDescriptor {
    /// Short lowercase key used on the command line (`ipca`, `igpm`, ...).
    pub key: String,
    pub code: SeriesCode,
    pub label: String,
    pub kind: ValueKind,
}

impl SeriesDescriptor {
    pub fn new(key: &str, code: u32, label: &str, kind: ValueKind) -> Self {
        Self {
            key: key.to_string(),
            code: SeriesCode(code),
            label: label.to_string(),
            kind,
        }
    }

    /// A user-supplied series that is not part of the built-in catalog.
    pub fn custom(code: u32, kind: ValueKind) -> Self {
        Self {
            key: format!("sgs{code}"),
            code: SeriesCode(code),
            label: format!("SGS {code}"),
            kind,
        }
    }
}

/// A raw value as returned by the source: SGS sends strings, some proxies send numbers.
///
/// Anything else (`null`, objects, a missing field) lands in `Other` so one bad
/// row is dropped by the normalizer instead of failing the whole response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl Default for RawValue {
    fn default() -> Self {
        RawValue::Other(serde_json::Value::Null)
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Number(v) => write!(f, "{v}"),
            RawValue::Text(s) => write!(f, "{s}"),
            RawValue::Other(v) => write!(f, "{v}"),
        }
    }
}

/// A raw `{data, valor}` row as delivered by SGS or the proxy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawObservation {
    #[serde(rename = "data", default)]
    pub date: String,
    #[serde(rename = "valor", default)]
    pub value: RawValue,
}

impl RawObservation {
    pub fn text(date: &str, value: &str) -> Self {
        Self {
            date: date.to_string(),
            value: RawValue::Text(value.to_string()),
        }
    }

    pub fn number(date: &str, value: f64) -> Self {
        Self {
            date: date.to_string(),
            value: RawValue::Number(value),
        }
    }
}

/// A normalized, dated observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub value: f64,
}

impl Observation {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

/// What the caller asks the engine to compute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadjustmentRequest {
    pub principal: f64,
    pub start_date: NaiveDate,
    pub periodicity: Periodicity,
    pub series: SeriesDescriptor,
    pub lock_deflation: bool,
}

/// The derived calendar window of one readjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub start_date: NaiveDate,
    pub effective_date: NaiveDate,
    /// First day of the contract's start month.
    pub start_month: NaiveDate,
    /// First day of the month immediately preceding `effective_date`.
    pub end_month: NaiveDate,
}

/// What the engine hands back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadjustmentResult {
    pub effective_date: NaiveDate,
    pub factor: f64,
    pub variation_percent: f64,
    pub new_principal: f64,
    pub observations_used: Vec<Observation>,
}

/// A normalized row that was discarded, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroppedRow {
    /// Position of the row in the source response.
    pub index: usize,
    pub date: String,
    pub value: String,
    pub reason: String,
}

/// One line of the human-readable breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BreakdownLine {
    pub month: NaiveDate,
    pub value: f64,
    pub kind: ValueKind,
    /// Cumulative factor up to and including this month.
    pub cumulative_factor: f64,
}

/// Informational bundle that accompanies a result. Not part of the correctness contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub series_code: SeriesCode,
    pub series_label: String,
    pub kind: ValueKind,
    pub period: Period,
    pub raw_factor: f64,
    pub applied_factor: f64,
    pub lock_deflation: bool,
    pub observations_used: usize,
    pub dropped: Vec<DroppedRow>,
    pub duplicates: usize,
    /// Query parameters sent to the source (`serie`, `dataInicial`, `dataFinal`).
    pub query: Vec<(String, String)>,
}

/// Everything a front end needs to render one calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Readjustment {
    pub result: ReadjustmentResult,
    pub breakdown: Vec<BreakdownLine>,
    pub diagnostics: Diagnostics,
}

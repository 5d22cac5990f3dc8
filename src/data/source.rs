//! The seam between the engine and wherever index values come from.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use chrono::NaiveDate;

use crate::domain::{Period, RawObservation, SeriesCode};
use crate::engine::period::{first_day_of_month, last_day_of_month};
use crate::error::{AppError, EXIT_INPUT, ReadjustError};

/// Date format SGS expects in query strings.
pub const SGS_DATE_FMT: &str = "%d/%m/%Y";

/// Structured fetch key: one series over an inclusive month range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SeriesQuery {
    pub code: SeriesCode,
    /// First day of the first month.
    pub start_month: NaiveDate,
    /// First day of the last month (inclusive).
    pub end_month: NaiveDate,
}

impl SeriesQuery {
    pub fn new(code: SeriesCode, start: NaiveDate, end: NaiveDate) -> Result<Self, ReadjustError> {
        let start_month = first_day_of_month(start);
        let end_month = first_day_of_month(end);
        if end_month < start_month {
            return Err(ReadjustError::InvalidPeriod { start_month, end_month });
        }
        Ok(Self {
            code,
            start_month,
            end_month,
        })
    }

    pub fn for_period(code: SeriesCode, period: &Period) -> Self {
        let (start, end) = period.fetch_range();
        Self {
            code,
            start_month: start,
            end_month: first_day_of_month(end),
        }
    }

    /// `dataInicial`: first day of the start month.
    pub fn data_inicial(&self) -> String {
        self.start_month.format(SGS_DATE_FMT).to_string()
    }

    /// `dataFinal`: last day of the end month, so the whole month is covered.
    pub fn data_final(&self) -> String {
        last_day_of_month(self.end_month).format(SGS_DATE_FMT).to_string()
    }

    /// Query parameters in the proxy's naming.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("serie", self.code.to_string()),
            ("dataInicial", self.data_inicial()),
            ("dataFinal", self.data_final()),
        ]
    }
}

/// Anything that can answer a `SeriesQuery`.
///
/// Implementations return the raw rows untouched (possibly unordered);
/// normalization is the engine's job. A non-success answer must be
/// `ReadjustError::UpstreamUnavailable`.
pub trait SeriesSource {
    fn fetch(&self, query: &SeriesQuery) -> Result<Vec<RawObservation>, ReadjustError>;

    /// Short human-readable description for diagnostics.
    fn describe(&self) -> String;
}

impl<S: SeriesSource + ?Sized> SeriesSource for Box<S> {
    fn fetch(&self, query: &SeriesQuery) -> Result<Vec<RawObservation>, ReadjustError> {
        (**self).fetch(query)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// In-memory source: rows per series code, filtered by the query's month range.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    rows: HashMap<SeriesCode, Vec<RawObservation>>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(mut self, code: SeriesCode, rows: Vec<RawObservation>) -> Self {
        self.rows.insert(code, rows);
        self
    }

    /// Load SGS-shaped rows (`[{"data": "01/01/2024", "valor": "0.42"}, ...]`) from a JSON file.
    pub fn from_json_file(path: &Path, code: SeriesCode) -> Result<Self, AppError> {
        let file = File::open(path)
            .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to open offline data '{}': {e}", path.display())))?;
        let rows: Vec<RawObservation> = serde_json::from_reader(file)
            .map_err(|e| AppError::new(EXIT_INPUT, format!("Invalid offline data JSON '{}': {e}", path.display())))?;
        Ok(Self::new().with_series(code, rows))
    }
}

impl SeriesSource for StaticSource {
    fn fetch(&self, query: &SeriesQuery) -> Result<Vec<RawObservation>, ReadjustError> {
        let Some(rows) = self.rows.get(&query.code) else {
            return Err(ReadjustError::upstream(
                Some(404),
                format!("No offline data for series {}.", query.code),
            ));
        };

        // Rows whose date does not parse are passed through so the
        // normalizer can report them.
        Ok(rows
            .iter()
            .filter(|r| match crate::engine::parse_date(&r.date) {
                Ok(date) => {
                    let month = first_day_of_month(date);
                    month >= query.start_month && month <= query.end_month
                }
                Err(_) => true,
            })
            .cloned()
            .collect())
    }

    fn describe(&self) -> String {
        "offline data".to_string()
    }
}

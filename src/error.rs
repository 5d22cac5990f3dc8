//! Error types.
//!
//! Two layers:
//!
//! - [`ReadjustError`] is the calculation taxonomy. Every failure of a single
//!   readjustment attempt is one of these kinds, and all of them are
//!   user-visible and terminal for that attempt only.
//! - [`AppError`] is what the binary reports: a message plus a process exit code.

use chrono::NaiveDate;
use thiserror::Error;

/// Exit code for bad user input or configuration.
pub const EXIT_INPUT: u8 = 2;
/// Exit code for data that cannot produce a result.
pub const EXIT_DATA: u8 = 3;
/// Exit code for upstream/runtime failures.
pub const EXIT_RUNTIME: u8 = 4;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReadjustError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Index source unavailable{}: {message}", fmt_status(*status))]
    UpstreamUnavailable { status: Option<u16>, message: String },

    #[error("Insufficient data: {found} usable observation(s), at least {required} required")]
    InsufficientData { required: usize, found: usize },

    #[error("Missing index value for {}; narrow the period or try again after publication", month.format("%m/%Y"))]
    MissingMonth { month: NaiveDate },

    #[error("First index level of the period ({}) is zero", date.format("%m/%Y"))]
    DivisionByZero { date: NaiveDate },

    #[error("Invalid period: end month {} precedes start month {}", end_month.format("%m/%Y"), start_month.format("%m/%Y"))]
    InvalidPeriod {
        start_month: NaiveDate,
        end_month: NaiveDate,
    },

    #[error("Computed factor {factor} is not positive")]
    NonPositiveFactor { factor: f64 },
}

impl ReadjustError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn upstream(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::UpstreamUnavailable {
            status,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Self::InvalidInput(_) => EXIT_INPUT,
            Self::UpstreamUnavailable { .. } => EXIT_RUNTIME,
            Self::InsufficientData { .. }
            | Self::MissingMonth { .. }
            | Self::DivisionByZero { .. }
            | Self::InvalidPeriod { .. }
            | Self::NonPositiveFactor { .. } => EXIT_DATA,
        }
    }
}

fn fmt_status(status: Option<u16>) -> String {
    match status {
        Some(code) => format!(" (HTTP {code})"),
        None => String::new(),
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<ReadjustError> for AppError {
    fn from(err: ReadjustError) -> Self {
        Self::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

//! The readjustment engine.
//!
//! - period derivation (`period`)
//! - raw row normalization (`normalize`)
//! - factor compounding (`compound`)
//! - result assembly (`assemble`)
//!
//! Everything here is pure; fetching happens in `crate::data` and is wired up
//! by `crate::app::pipeline`.

pub mod assemble;
pub mod compound;
pub mod normalize;
pub mod period;

pub use assemble::assemble;
pub use compound::{Compounded, apply_lock, compound, variation_percent};
pub use normalize::{NormalizedSeries, normalize, parse_date, parse_decimal};
pub use period::{CalendarUnit, add_calendar_unit, derive_period};

use crate::domain::{RawObservation, Readjustment, ReadjustmentRequest, ValueKind};
use crate::error::ReadjustError;

/// Reject requests that must never reach the network.
pub fn validate_request(request: &ReadjustmentRequest) -> Result<(), ReadjustError> {
    if !(request.principal.is_finite() && request.principal > 0.0) {
        return Err(ReadjustError::invalid_input(format!(
            "Rent amount must be a positive number (got {}).",
            request.principal
        )));
    }
    Ok(())
}

/// Run the whole calculation over already-fetched raw rows.
pub fn readjust(request: &ReadjustmentRequest, rows: &[RawObservation]) -> Result<Readjustment, ReadjustError> {
    validate_request(request)?;
    let period = derive_period(request.start_date, request.periodicity)?;

    let normalized = normalize(rows);
    if normalized.is_empty() {
        let required = match request.series.kind {
            ValueKind::Percentage => period.month_count(),
            ValueKind::Level => 2,
        };
        return Err(ReadjustError::InsufficientData { required, found: 0 });
    }

    let compounded = compound(&normalized.observations, request.series.kind, &period)?;
    Ok(assemble(request, &period, &normalized, compounded))
}

//! Shared "readjustment pipeline" logic used by both CLI and TUI front-ends.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! validate -> derive period -> fetch -> normalize -> compound -> assemble
//!
//! The CLI and the TUI can then focus on presentation (printing vs widgets).

use std::path::Path;

use tracing::info;

use crate::config::Settings;
use crate::data::{CachedSource, SeriesQuery, SeriesSource, SgsClient, StaticSource};
use crate::domain::{Readjustment, ReadjustmentRequest, SeriesCode};
use crate::engine::{self, NormalizedSeries};
use crate::error::{AppError, ReadjustError};

/// Execute one calculation end to end.
///
/// Input problems are reported before any request is made; the source is hit
/// exactly once (or not at all on a cache hit).
pub fn run_readjustment<S: SeriesSource + ?Sized>(
    request: &ReadjustmentRequest,
    source: &S,
) -> Result<Readjustment, ReadjustError> {
    engine::validate_request(request)?;
    let period = engine::derive_period(request.start_date, request.periodicity)?;
    let query = SeriesQuery::for_period(request.series.code, &period);

    info!(
        series = %request.series.code,
        start = %period.start_month,
        end = %period.end_month,
        source = %source.describe(),
        "fetching observations"
    );
    let rows = source.fetch(&query)?;

    let readjustment = engine::readjust(request, &rows)?;
    info!(
        factor = readjustment.result.factor,
        raw_factor = readjustment.diagnostics.raw_factor,
        used = readjustment.diagnostics.observations_used,
        "readjustment computed"
    );
    Ok(readjustment)
}

/// Fetch and normalize a month range without compounding (for inspection).
pub fn fetch_normalized<S: SeriesSource + ?Sized>(
    query: &SeriesQuery,
    source: &S,
) -> Result<NormalizedSeries, ReadjustError> {
    let rows = source.fetch(query)?;
    let normalized = engine::normalize(&rows);
    if normalized.is_empty() {
        return Err(ReadjustError::InsufficientData { required: 1, found: 0 });
    }
    Ok(normalized)
}

/// Build the configured source: offline JSON when given, otherwise SGS behind the cache.
pub fn build_source(
    settings: &Settings,
    offline: Option<(&Path, SeriesCode)>,
) -> Result<Box<dyn SeriesSource>, AppError> {
    if let Some((path, code)) = offline {
        return Ok(Box::new(StaticSource::from_json_file(path, code)?));
    }
    let client = SgsClient::from_settings(settings)?;
    Ok(Box::new(CachedSource::new(client, settings.cache_ttl)))
}

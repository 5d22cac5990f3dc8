//! Result assembly: period + compounding output -> `Readjustment`.

use crate::data::SeriesQuery;
use crate::domain::{
    BreakdownLine, Diagnostics, Period, Readjustment, ReadjustmentRequest, ReadjustmentResult, ValueKind,
};
use crate::engine::compound::{Compounded, apply_lock, variation_percent};
use crate::engine::normalize::NormalizedSeries;
use crate::engine::period::first_day_of_month;

/// Build the caller-facing result. Pure; never fails.
pub fn assemble(
    request: &ReadjustmentRequest,
    period: &Period,
    normalized: &NormalizedSeries,
    compounded: Compounded,
) -> Readjustment {
    let applied = apply_lock(compounded.raw_factor, request.lock_deflation);
    let breakdown = breakdown(&compounded, request.series.kind);
    let query = SeriesQuery::for_period(request.series.code, period);

    let diagnostics = Diagnostics {
        series_code: request.series.code,
        series_label: request.series.label.clone(),
        kind: request.series.kind,
        period: *period,
        raw_factor: compounded.raw_factor,
        applied_factor: applied,
        lock_deflation: request.lock_deflation,
        observations_used: compounded.used.len(),
        dropped: normalized.dropped.clone(),
        duplicates: normalized.duplicates,
        query: query
            .params()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
    };

    Readjustment {
        result: ReadjustmentResult {
            effective_date: period.effective_date,
            factor: applied,
            variation_percent: variation_percent(applied),
            new_principal: request.principal * applied,
            observations_used: compounded.used,
        },
        breakdown,
        diagnostics,
    }
}

fn breakdown(compounded: &Compounded, kind: ValueKind) -> Vec<BreakdownLine> {
    let first_level = compounded.used.first().map(|o| o.value);
    let mut cumulative = 1.0_f64;
    compounded
        .used
        .iter()
        .map(|o| {
            cumulative = match (kind, first_level) {
                (ValueKind::Percentage, _) => cumulative * (1.0 + o.value / 100.0),
                (ValueKind::Level, Some(base)) if base != 0.0 => o.value / base,
                (ValueKind::Level, _) => cumulative,
            };
            BreakdownLine {
                month: first_day_of_month(o.date),
                value: o.value,
                kind,
                cumulative_factor: cumulative,
            }
        })
        .collect()
}

//! Debug bundle writer for inspecting one calculation's inputs and outputs.

use std::fmt::Write as _;
use std::fs::{create_dir_all, write};
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::domain::{Readjustment, ReadjustmentRequest};
use crate::error::{AppError, EXIT_RUNTIME};
use crate::report::{fmt_date, fmt_month, fmt_value};

/// Write a markdown bundle under `dir` and return its path.
pub fn write_debug_bundle(
    dir: &Path,
    request: &ReadjustmentRequest,
    readjustment: &Readjustment,
    source: &str,
) -> Result<PathBuf, AppError> {
    create_dir_all(dir).map_err(|e| AppError::new(EXIT_RUNTIME, format!("Failed to create debug dir: {e}")))?;

    let ts = Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!(
        "readjust_debug_{}_{}_{ts}.md",
        request.series.code,
        request.start_date.format("%Y%m%d"),
    ));

    let body = render_bundle(request, readjustment, source)
        .map_err(|e| AppError::new(EXIT_RUNTIME, format!("Failed to render debug bundle: {e}")))?;
    write(&path, body).map_err(|e| AppError::new(EXIT_RUNTIME, format!("Failed to write debug file: {e}")))?;

    Ok(path)
}

fn render_bundle(
    request: &ReadjustmentRequest,
    readjustment: &Readjustment,
    source: &str,
) -> Result<String, std::fmt::Error> {
    let d = &readjustment.diagnostics;
    let r = &readjustment.result;
    let mut out = String::new();

    writeln!(out, "# readjust debug bundle")?;
    writeln!(out, "- generated: {}", Local::now().to_rfc3339())?;
    writeln!(out, "- source: {source}")?;
    writeln!(out, "- series: {} (code {}, {})", d.series_label, d.series_code, d.kind.display_name())?;
    writeln!(out, "- principal: {}", request.principal)?;
    writeln!(out, "- start_date: {}", fmt_date(request.start_date))?;
    writeln!(out, "- periodicity: {}", request.periodicity.display_name())?;
    writeln!(out, "- lock_deflation: {}", request.lock_deflation)?;

    writeln!(out, "\n## Period")?;
    writeln!(out, "- effective_date: {}", fmt_date(d.period.effective_date))?;
    writeln!(out, "- start_month: {}", fmt_month(d.period.start_month))?;
    writeln!(out, "- end_month: {}", fmt_month(d.period.end_month))?;
    let query: Vec<String> = d.query.iter().map(|(k, v)| format!("{k}={v}")).collect();
    writeln!(out, "- query: {}", query.join("&"))?;

    writeln!(out, "\n## Result")?;
    writeln!(out, "| raw_factor | applied_factor | variation_pct | new_principal |")?;
    writeln!(out, "| - | - | - | - |")?;
    writeln!(
        out,
        "| {:.10} | {:.10} | {:.6} | {:.6} |",
        d.raw_factor, d.applied_factor, r.variation_percent, r.new_principal
    )?;

    writeln!(out, "\n## Observations used ({})", d.observations_used)?;
    writeln!(out, "| month | value | cumulative |")?;
    writeln!(out, "| - | - | - |")?;
    for line in &readjustment.breakdown {
        writeln!(
            out,
            "| {} | {} | {:.10} |",
            fmt_month(line.month),
            fmt_value(line.value, line.kind),
            line.cumulative_factor
        )?;
    }

    if !d.dropped.is_empty() || d.duplicates > 0 {
        writeln!(out, "\n## Discarded rows")?;
        writeln!(out, "- duplicates: {}", d.duplicates)?;
        writeln!(out, "| index | date | value | reason |")?;
        writeln!(out, "| - | - | - | - |")?;
        for row in &d.dropped {
            writeln!(out, "| {} | {} | {} | {} |", row.index, row.date, row.value, row.reason)?;
        }
    }

    Ok(out)
}

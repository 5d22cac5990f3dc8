//! Formatted terminal output.
//!
//! Presentation follows pt-BR conventions (`R$ 1.005,00`, `0,50%`) and is the
//! only place where numbers get rounded: 6 fractional digits for factors,
//! 2 for percentages and currency.

use chrono::NaiveDate;

use crate::domain::{Readjustment, SeriesDescriptor, ValueKind};
use crate::engine::NormalizedSeries;
use crate::error::{AppError, EXIT_RUNTIME};

/// `R$ 1.234,56`.
pub fn fmt_brl(v: f64) -> String {
    let body = fmt_decimal(v.abs(), 2);
    if is_negative_after_rounding(v, 2) {
        format!("-R$ {body}")
    } else {
        format!("R$ {body}")
    }
}

/// `0,50%` from a percentage value (`0.5`).
pub fn fmt_percent(v: f64) -> String {
    format!("{}%", fmt_signed(v, 2))
}

/// `1,005000`.
pub fn fmt_factor(v: f64) -> String {
    fmt_signed(v, 6)
}

pub fn fmt_date(d: NaiveDate) -> String {
    d.format("%d/%m/%Y").to_string()
}

pub fn fmt_month(d: NaiveDate) -> String {
    d.format("%m/%Y").to_string()
}

fn fmt_signed(v: f64, digits: usize) -> String {
    let body = fmt_decimal(v.abs(), digits);
    if is_negative_after_rounding(v, digits) {
        format!("-{body}")
    } else {
        body
    }
}

fn is_negative_after_rounding(v: f64, digits: usize) -> bool {
    v < 0.0 && format!("{:.*}", digits, v.abs()).chars().any(|c| c.is_ascii_digit() && c != '0')
}

/// Non-negative `v` with `.` thousands groups and `,` decimals.
fn fmt_decimal(v: f64, digits: usize) -> String {
    let s = format!("{v:.digits$}");
    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (s.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(f) => format!("{grouped},{f}"),
        None => grouped,
    }
}

/// Headline numbers of a calculation.
pub fn format_result_summary(r: &Readjustment, principal: f64) -> String {
    let d = &r.diagnostics;
    let mut out = String::new();

    out.push_str("=== readjust - rent readjustment ===\n");
    out.push_str(&format!("Index: {} ({})\n", d.series_label, d.kind.display_name()));
    out.push_str(&format!(
        "Period: {} to {} ({} month(s))\n",
        fmt_month(d.period.start_month),
        fmt_month(d.period.end_month),
        d.period.month_count(),
    ));
    out.push_str(&format!("Readjustment date: {}\n", fmt_date(r.result.effective_date)));
    out.push_str(&format!("Current rent: {}\n", fmt_brl(principal)));
    out.push_str(&format!("Variation: {}\n", fmt_percent(r.result.variation_percent)));
    out.push_str(&format!("Factor: {}\n", fmt_factor(r.result.factor)));
    if d.lock_deflation && d.raw_factor < d.applied_factor {
        out.push_str(&format!(
            "  (deflation lock applied; raw factor {})\n",
            fmt_factor(d.raw_factor)
        ));
    }
    out.push_str(&format!("New rent: {}\n", fmt_brl(r.result.new_principal)));

    out
}

/// One line per consumed observation: `01/2024: 0,42%` or `01/2024: 6.543,21`.
pub fn format_breakdown(r: &Readjustment) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", r.diagnostics.series_label));
    out.push_str(&format!("Months considered: {}\n\n", r.breakdown.len()));
    for line in &r.breakdown {
        out.push_str(&format!(
            "{}: {:<14} cumulative {}\n",
            fmt_month(line.month),
            fmt_value(line.value, line.kind),
            fmt_factor(line.cumulative_factor),
        ));
    }
    out
}

pub fn fmt_value(v: f64, kind: ValueKind) -> String {
    match kind {
        ValueKind::Percentage => fmt_percent(v),
        ValueKind::Level => fmt_signed(v, 2),
    }
}

/// Informational block: what was asked, what came back, what was discarded.
pub fn format_diagnostics(r: &Readjustment, source: &str) -> String {
    let d = &r.diagnostics;
    let mut out = String::new();

    let query: Vec<String> = d.query.iter().map(|(k, v)| format!("{k}={v}")).collect();
    out.push_str(&format!("Source: {source}\n"));
    out.push_str(&format!("Query: {}\n", query.join("&")));
    out.push_str(&format!(
        "Period: {} to {}\n",
        fmt_date(d.period.start_month),
        fmt_date(d.period.end_month)
    ));
    out.push_str(&format!("Items: {}\n", d.observations_used));
    out.push_str(&format!("Raw factor: {}\n", d.raw_factor));
    out.push_str(&format!("Applied factor: {}\n", d.applied_factor));
    if d.duplicates > 0 {
        out.push_str(&format!("Duplicate dates discarded: {}\n", d.duplicates));
    }
    for row in &d.dropped {
        out.push_str(&format!(
            "Dropped row #{} ({} = {}): {}\n",
            row.index, row.date, row.value, row.reason
        ));
    }

    out
}

/// Built-in series table for `readjust series`.
pub fn format_series_table(series: &[SeriesDescriptor]) -> String {
    let mut out = String::new();
    out.push_str(format!("{:<10} {:>6} {:<12} {}", "key", "code", "kind", "label").trim_end());
    out.push('\n');
    out.push_str(format!("{:-<10} {:-<6} {:-<12} {:-<24}", "", "", "", "").trim_end());
    out.push('\n');
    for s in series {
        out.push_str(
            format!(
                "{:<10} {:>6} {:<12} {}",
                s.key,
                s.code,
                s.kind.display_name(),
                s.label
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

/// Normalized observations for `readjust fetch`.
pub fn format_observations(series: &NormalizedSeries, kind: ValueKind) -> String {
    let mut out = String::new();
    for o in &series.observations {
        out.push_str(&format!("{}  {}\n", fmt_date(o.date), fmt_value(o.value, kind)));
    }
    out.push_str(&format!(
        "\n{} observation(s), {} dropped, {} duplicate(s)\n",
        series.len(),
        series.dropped.len(),
        series.duplicates
    ));
    for row in &series.dropped {
        out.push_str(&format!("  dropped #{}: {}\n", row.index, row.reason));
    }
    out
}

/// Pretty JSON of the full calculation.
pub fn to_json(r: &Readjustment) -> Result<String, AppError> {
    serde_json::to_string_pretty(r)
        .map_err(|e| AppError::new(EXIT_RUNTIME, format!("Failed to serialize result: {e}")))
}

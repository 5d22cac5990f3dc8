//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - turns user text (rent, dates, series) into a request
//! - runs the readjustment pipeline
//! - prints reports and writes optional exports

use std::path::Path;

use clap::Parser;
use tracing::debug;

use crate::cli::{CalcArgs, Command, FetchArgs, KindArg, OutputFormat, SeriesArgs, SeriesListArgs, ShowArgs, SourceArgs};
use crate::config::Settings;
use crate::data::{SeriesQuery, SeriesSource};
use crate::domain::{ReadjustmentRequest, SeriesDescriptor, ValueKind, catalog, find_series};
use crate::engine::{self, period::first_day_of_month};
use crate::error::{AppError, ReadjustError};

pub mod pipeline;

/// Directory used by `--debug-bundle` and the TUI `d` key.
pub const DEBUG_DIR: &str = "debug";

/// Entry point for the `readjust` binary.
pub fn run() -> Result<(), AppError> {
    // We want `readjust` and `readjust -r 1000` to behave like `readjust tui ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    if !matches!(cli.command, Command::Tui(_)) {
        crate::logging::init_logging();
    }

    match cli.command {
        Command::Calc(args) => handle_calc(args),
        Command::Fetch(args) => handle_fetch(args),
        Command::Series(args) => handle_series(args),
        Command::Show(args) => handle_show(args),
        Command::Tui(args) => crate::tui::run(args),
    }
}

fn handle_calc(args: CalcArgs) -> Result<(), AppError> {
    let principal = parse_rent(&args.rent)?;
    let start_date = parse_start_date(&args.start)?;
    let (series, guess_kind) = series_from_args(&args.series);

    let mut request = ReadjustmentRequest {
        principal,
        start_date,
        periodicity: args.periodicity,
        series,
        lock_deflation: args.lock_deflation,
    };
    engine::validate_request(&request)?;

    let settings = settings_from_args(&args.source)?;
    let source = open_source(&settings, &args.source, &request.series)?;

    if guess_kind {
        request.series.kind = resolve_auto_kind(&request, source.as_ref())?;
    }

    let readjustment = pipeline::run_readjustment(&request, source.as_ref())?;

    match args.format {
        OutputFormat::Text => {
            println!("{}", crate::report::format_result_summary(&readjustment, request.principal));
            println!("{}", crate::report::format_breakdown(&readjustment));
            if args.diagnostics {
                println!("{}", crate::report::format_diagnostics(&readjustment, &source.describe()));
            }
        }
        OutputFormat::Json => println!("{}", crate::report::to_json(&readjustment)?),
    }

    if let Some(path) = &args.export {
        let export = crate::io::ExportFile::new(&request, &readjustment);
        crate::io::write_export_json(path, &export)?;
        eprintln!("Wrote {}", path.display());
    }
    if args.debug_bundle {
        let path = crate::debug::write_debug_bundle(Path::new(DEBUG_DIR), &request, &readjustment, &source.describe())?;
        eprintln!("Wrote debug bundle: {}", path.display());
    }

    Ok(())
}

fn handle_fetch(args: FetchArgs) -> Result<(), AppError> {
    let from = first_day_of_month(parse_month(&args.from)?);
    let to = match &args.to {
        Some(s) => first_day_of_month(parse_month(s)?),
        None => from,
    };
    let (series, guess_kind) = series_from_args(&args.series);
    let query = SeriesQuery::new(series.code, from, to)?;

    let settings = settings_from_args(&args.source)?;
    let source = open_source(&settings, &args.source, &series)?;
    let normalized = pipeline::fetch_normalized(&query, source.as_ref())?;

    let kind = if guess_kind {
        let values: Vec<f64> = normalized.observations.iter().map(|o| o.value).collect();
        guess_value_kind(&values)
    } else {
        series.kind
    };

    println!("{} | {} to {}", series.label, query.data_inicial(), query.data_final());
    println!("{}", crate::report::format_observations(&normalized, kind));
    Ok(())
}

fn handle_series(args: SeriesListArgs) -> Result<(), AppError> {
    let series = match &args.needle {
        None => catalog(),
        Some(needle) => match find_series(needle) {
            Some(found) => vec![found],
            None => {
                return Err(ReadjustError::invalid_input(format!("Unknown index '{needle}'; run `readjust series`.")).into());
            }
        },
    };
    println!("{}", crate::report::format_series_table(&series));
    Ok(())
}

fn handle_show(args: ShowArgs) -> Result<(), AppError> {
    let export = crate::io::read_export_json(&args.file)?;
    println!(
        "{}",
        crate::report::format_result_summary(&export.readjustment, export.request.principal)
    );
    println!("{}", crate::report::format_breakdown(&export.readjustment));
    println!(
        "{}",
        crate::report::format_diagnostics(&export.readjustment, &format!("export {}", args.file.display()))
    );
    Ok(())
}

/// Load settings from the environment and apply CLI overrides.
pub fn settings_from_args(source: &SourceArgs) -> Result<Settings, AppError> {
    Ok(Settings::from_env()?.with_overrides(source.proxy_url.clone(), source.timeout))
}

/// Open the offline file or the configured network source for `series`.
pub fn open_source(
    settings: &Settings,
    source: &SourceArgs,
    series: &SeriesDescriptor,
) -> Result<Box<dyn SeriesSource>, AppError> {
    let offline = source.offline_file.as_deref().map(|path| (path, series.code));
    pipeline::build_source(settings, offline)
}

/// Resolve `--index` / `--series-code` into a descriptor.
///
/// The flag is `true` when the value kind still has to be guessed from data.
fn series_from_args(args: &SeriesArgs) -> (SeriesDescriptor, bool) {
    match args.series_code {
        None => (args.index.descriptor(), false),
        Some(code) => match args.kind {
            KindArg::Percentage => (SeriesDescriptor::custom(code, ValueKind::Percentage), false),
            KindArg::Level => (SeriesDescriptor::custom(code, ValueKind::Level), false),
            KindArg::Auto => (SeriesDescriptor::custom(code, ValueKind::Percentage), true),
        },
    }
}

/// Fetch the period once and decide the value kind of a custom series.
///
/// The fetch goes through the same source as the calculation, so with the cache
/// in front of SGS the pipeline's own fetch is a hit.
fn resolve_auto_kind<S: SeriesSource + ?Sized>(
    request: &ReadjustmentRequest,
    source: &S,
) -> Result<ValueKind, ReadjustError> {
    let period = engine::derive_period(request.start_date, request.periodicity)?;
    let query = SeriesQuery::for_period(request.series.code, &period);
    let rows = source.fetch(&query)?;
    let values: Vec<f64> = engine::normalize(&rows).observations.iter().map(|o| o.value).collect();
    let kind = guess_value_kind(&values);
    debug!(series = %request.series.code, kind = kind.display_name(), "guessed value kind");
    Ok(kind)
}

/// Monthly variations stay small; index levels are in the tens or more.
pub const LEVEL_THRESHOLD: f64 = 50.0;

/// Guess whether `values` are monthly percentages or index levels.
///
/// An empty slice is treated as percentages.
pub fn guess_value_kind(values: &[f64]) -> ValueKind {
    let max_abs = values.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    if max_abs > LEVEL_THRESHOLD {
        ValueKind::Level
    } else {
        ValueKind::Percentage
    }
}

/// Parse a rent amount typed by a user (`R$ 10.000,00`, `10000`, `1234.56`).
pub fn parse_rent(input: &str) -> Result<f64, ReadjustError> {
    let cleaned: String = input
        .trim()
        .trim_start_matches("R$")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    match engine::parse_decimal(&cleaned) {
        Some(v) if v > 0.0 => Ok(v),
        _ => Err(ReadjustError::invalid_input(format!(
            "Rent amount must be a positive number (got '{}').",
            input.trim()
        ))),
    }
}

/// Parse a contract start date (`dd/mm/yyyy` or `yyyy-mm-dd`).
pub fn parse_start_date(input: &str) -> Result<chrono::NaiveDate, ReadjustError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ReadjustError::invalid_input("Start date is required."));
    }
    engine::parse_date(trimmed).map_err(ReadjustError::invalid_input)
}

fn parse_month(input: &str) -> Result<chrono::NaiveDate, ReadjustError> {
    engine::parse_date(input.trim()).map_err(ReadjustError::invalid_input)
}

/// Rewrite argv so `readjust` defaults to `readjust tui`.
///
/// Rules:
/// - `readjust`                      -> `readjust tui`
/// - `readjust -r 1000 ...`          -> `readjust tui -r 1000 ...`
/// - `readjust --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "calc" | "fetch" | "series" | "show" | "tui");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "tui flags".
    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
        return argv;
    }

    argv
}

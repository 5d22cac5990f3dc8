//! Command-line parsing for the rent readjustment calculator.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the engine and data code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::domain::{IndexKey, Periodicity};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "readjust", version, about = "Rent readjustment by official price indices (BCB/SGS)")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compute the readjusted rent for a contract.
    Calc(CalcArgs),
    /// Fetch and print normalized observations for a month range.
    Fetch(FetchArgs),
    /// List the built-in price indices.
    Series(SeriesListArgs),
    /// Re-render a JSON export produced by `readjust calc --export`.
    Show(ShowArgs),
    /// Launch the interactive TUI.
    ///
    /// This uses the same underlying pipeline as `readjust calc`, but collects
    /// inputs in a form and renders results in a terminal UI using Ratatui.
    Tui(TuiArgs),
}

/// Output format for `calc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Value kind for user-supplied series codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    /// Guess from the magnitude of the returned values.
    Auto,
    Percentage,
    Level,
}

/// Where observations come from.
#[derive(Debug, Args, Clone, Default)]
pub struct SourceArgs {
    /// Use a same-origin proxy endpoint (e.g. https://site/api/sgs) instead of SGS.
    #[arg(long)]
    pub proxy_url: Option<String>,

    /// Request timeout in seconds.
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Read SGS-shaped JSON rows from a file instead of the network.
    #[arg(long, value_name = "JSON")]
    pub offline_file: Option<PathBuf>,
}

/// Which series to use.
#[derive(Debug, Args, Clone)]
pub struct SeriesArgs {
    /// Built-in index.
    #[arg(short = 'i', long, value_enum, default_value_t = IndexKey::Igpm)]
    pub index: IndexKey,

    /// Any SGS series code (overrides `--index`).
    #[arg(long)]
    pub series_code: Option<u32>,

    /// Value kind of `--series-code`.
    #[arg(long, value_enum, default_value_t = KindArg::Auto, requires = "series_code")]
    pub kind: KindArg,
}

/// Options for `calc`.
#[derive(Debug, Parser, Clone)]
pub struct CalcArgs {
    /// Current rent (accepts `R$ 10.000,00`, `10000`, `1234.56`).
    #[arg(short = 'r', long)]
    pub rent: String,

    /// Contract start date (DD/MM/YYYY or YYYY-MM-DD).
    #[arg(short = 's', long)]
    pub start: String,

    #[command(flatten)]
    pub series: SeriesArgs,

    /// Readjustment periodicity.
    #[arg(short = 'p', long, value_enum, default_value_t = Periodicity::Annual)]
    pub periodicity: Periodicity,

    /// Never let the factor fall below 1 (no rent decrease on deflation).
    #[arg(long)]
    pub lock_deflation: bool,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Also print the diagnostic block (query, raw factor, dropped rows).
    #[arg(long)]
    pub diagnostics: bool,

    /// Write request + result to a JSON file.
    #[arg(long, value_name = "JSON")]
    pub export: Option<PathBuf>,

    /// Write a markdown debug bundle under `debug/`.
    #[arg(long)]
    pub debug_bundle: bool,

    #[command(flatten)]
    pub source: SourceArgs,
}

/// Options for `fetch`.
#[derive(Debug, Parser, Clone)]
pub struct FetchArgs {
    #[command(flatten)]
    pub series: SeriesArgs,

    /// First month (MM/YYYY, YYYY-MM or a full date).
    #[arg(long)]
    pub from: String,

    /// Last month, inclusive (defaults to `--from`).
    #[arg(long)]
    pub to: Option<String>,

    #[command(flatten)]
    pub source: SourceArgs,
}

/// Options for `series`.
#[derive(Debug, Parser, Clone)]
pub struct SeriesListArgs {
    /// Only show the index matching this key or SGS code.
    pub needle: Option<String>,
}

/// Options for `show`.
#[derive(Debug, Parser, Clone)]
pub struct ShowArgs {
    /// Export JSON file produced by `readjust calc --export`.
    #[arg(long, value_name = "JSON")]
    pub file: PathBuf,
}

/// Initial form values for the TUI.
#[derive(Debug, Parser, Clone)]
pub struct TuiArgs {
    /// Prefilled rent.
    #[arg(short = 'r', long)]
    pub rent: Option<String>,

    /// Prefilled start date.
    #[arg(short = 's', long)]
    pub start: Option<String>,

    /// Initial index.
    #[arg(short = 'i', long, value_enum, default_value_t = IndexKey::Igpm)]
    pub index: IndexKey,

    /// Initial periodicity.
    #[arg(short = 'p', long, value_enum, default_value_t = Periodicity::Annual)]
    pub periodicity: Periodicity,

    /// Start with the deflation lock enabled.
    #[arg(long)]
    pub lock_deflation: bool,

    #[command(flatten)]
    pub source: SourceArgs,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calc_parses_defaults() {
        let cli = Cli::try_parse_from(["readjust", "calc", "-r", "R$ 1.000,00", "-s", "10/01/2024"]).unwrap();
        let Command::Calc(args) = cli.command else {
            panic!("expected calc");
        };
        assert_eq!(args.rent, "R$ 1.000,00");
        assert_eq!(args.series.index, IndexKey::Igpm);
        assert_eq!(args.periodicity, Periodicity::Annual);
        assert!(!args.lock_deflation);
        assert_eq!(args.format, OutputFormat::Text);
    }

    #[test]
    fn calc_parses_custom_series() {
        let cli = Cli::try_parse_from([
            "readjust",
            "calc",
            "-r",
            "1000",
            "-s",
            "2024-01-10",
            "--series-code",
            "11773",
            "--kind",
            "level",
            "-p",
            "monthly",
            "--lock-deflation",
            "--proxy-url",
            "http://localhost:3000/api/sgs",
        ])
        .unwrap();
        let Command::Calc(args) = cli.command else {
            panic!("expected calc");
        };
        assert_eq!(args.series.series_code, Some(11773));
        assert_eq!(args.series.kind, KindArg::Level);
        assert_eq!(args.periodicity, Periodicity::Monthly);
        assert!(args.lock_deflation);
        assert_eq!(args.source.proxy_url.as_deref(), Some("http://localhost:3000/api/sgs"));
    }

    #[test]
    fn kind_requires_series_code() {
        assert!(Cli::try_parse_from(["readjust", "calc", "-r", "1", "-s", "2024-01-01", "--kind", "level"]).is_err());
    }
}

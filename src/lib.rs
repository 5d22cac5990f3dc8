//! `rent-readjust` library crate.
//!
//! The binary (`readjust`) is a thin wrapper around this library so that:
//!
//! - the calculation engine is testable without spawning processes or touching the network
//! - the CLI and the TUI share one pipeline

pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod debug;
pub mod domain;
pub mod engine;
pub mod error;
pub mod io;
pub mod logging;
pub mod report;
pub mod tui;

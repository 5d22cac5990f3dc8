//! Input/output helpers.
//!
//! - calculation exports (JSON) (`export`)

pub mod export;

pub use export::*;

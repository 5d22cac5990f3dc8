//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - input enums (`Periodicity`, `ValueKind`)
//! - series descriptors and the built-in catalog (`SeriesDescriptor`, `catalog`)
//! - raw and normalized observations (`RawObservation`, `Observation`)
//! - request/result types (`ReadjustmentRequest`, `Readjustment`, etc.)

pub mod catalog;
pub mod types;

pub use catalog::*;
pub use types::*;

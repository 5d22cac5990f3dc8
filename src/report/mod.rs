//! Reporting utilities: pt-BR number formatting and terminal/JSON renderings.
//!
//! We keep formatting code in one place so:
//! - the engine stays free of presentation concerns (no rounding there)
//! - output changes are localized

pub mod format;

pub use format::*;

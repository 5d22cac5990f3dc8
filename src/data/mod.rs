//! Index data sources.
//!
//! - `source`: the `SeriesSource` seam, the structured `SeriesQuery` and an in-memory source
//! - `sgs`: blocking HTTP client for SGS (direct or through the `/api/sgs` proxy)
//! - `cache`: read-through TTL cache keyed by `SeriesQuery`

pub mod cache;
pub mod sgs;
pub mod source;

pub use cache::CachedSource;
pub use sgs::{Endpoint, SgsClient};
pub use source::{SeriesQuery, SeriesSource, StaticSource};
